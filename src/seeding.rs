//! Initial conditions for stage fields.
//!
//! The canonical patches are the only non-uniform source anywhere in the
//! simulation, which keeps every reseed bit-for-bit reproducible.

use crate::field::Field;
use crate::reaction_diffusion::drive_input;
use crate::types::Patch;

/// Substrate value written inside a base-stage patch.
const PATCH_SUBSTRATE: f32 = 0.5;

/// Visit every cell covered by `patch`, with wrap-around coordinates.
fn for_each_cell(patch: &Patch, side: usize, mut visit: impl FnMut(usize)) {
    let (cx, cy, r) = patch.resolve(side);
    let n = side as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let px = (cx + dx).rem_euclid(n) as usize;
            let py = (cy + dy).rem_euclid(n) as usize;
            visit(py * side + px);
        }
    }
}

/// Baseline `(X = 1, Y = 0)` with each patch stamped as `X = 0.5, Y = value`.
pub fn seed_base(field: &mut Field, patches: &[Patch]) {
    let side = field.side();
    let (xs, ys) = field.pair_mut();
    xs.fill(1.0);
    ys.fill(0.0);
    for patch in patches {
        for_each_cell(patch, side, |idx| {
            xs[idx] = PATCH_SUBSTRATE;
            ys[idx] = patch.value;
        });
    }
}

/// Seed a freshly added stage from the one below it: `X` takes the drive
/// readout of `lower`, `Y` starts at 0 and the patches are stamped onto `Y`
/// only.
pub fn seed_from_lower(field: &mut Field, lower: &Field, patches: &[Patch]) {
    let side = field.side();
    let lower_x = lower.channel(0);
    let lower_y = lower.channel(1);
    let (xs, ys) = field.pair_mut();
    for (idx, x) in xs.iter_mut().enumerate() {
        *x = drive_input(lower_x[idx], lower_y[idx]);
    }
    ys.fill(0.0);
    for patch in patches {
        for_each_cell(patch, side, |idx| ys[idx] = ys[idx].max(patch.value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Addressing;
    use crate::types::CANONICAL_PATCHES;

    #[test]
    fn base_seed_stamps_canonical_patches() {
        let mut field = Field::new(256, 2, Addressing::Wrap);
        seed_base(&mut field, &CANONICAL_PATCHES);
        assert_eq!(field.get(0, 128, 128), 0.5);
        assert_eq!(field.get(1, 128, 128), 0.85);
        assert_eq!(field.get(1, 168, 98), 0.75);
        assert_eq!(field.get(1, 78, 163), 0.7);
        // Just outside the first patch's radius.
        assert_eq!(field.get(0, 128 + 13, 128), 1.0);
        assert_eq!(field.get(1, 128 + 13, 128), 0.0);
        assert_eq!(field.get(1, 0, 0), 0.0);
    }

    #[test]
    fn patches_wrap_around_edges() {
        let patch = Patch {
            center_x: 0.0,
            center_y: 0.0,
            radius: 2.0 / 16.0,
            value: 0.6,
        };
        let mut field = Field::new(16, 2, Addressing::Wrap);
        seed_base(&mut field, &[patch]);
        assert_eq!(field.get(1, 15, 0), 0.6);
        assert_eq!(field.get(1, 0, 15), 0.6);
        assert_eq!(field.get(1, 14, 0), 0.6);
        assert_eq!(field.get(1, 15, 15), 0.6);
        assert_eq!(field.get(1, 13, 0), 0.0);
    }

    #[test]
    fn derived_seed_reads_lower_readout() {
        let mut lower = Field::new(32, 2, Addressing::Wrap);
        seed_base(&mut lower, &CANONICAL_PATCHES);
        let mut field = Field::new(32, 2, Addressing::Wrap);
        seed_from_lower(&mut field, &lower, &CANONICAL_PATCHES);

        // Inside a base patch: X = 0.5 * 0.85^2.
        assert_eq!(field.get(0, 16, 16), drive_input(0.5, 0.85));
        assert_eq!(field.get(1, 16, 16), 0.85);
        // Outside: lower Y = 0, so X and Y are both 0.
        assert_eq!(field.get(0, 0, 0), 0.0);
        assert_eq!(field.get(1, 0, 0), 0.0);
    }
}
