#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Hard cap on the number of cascade stages.
pub const MAX_STAGES: usize = 4;
/// Hard cap on the number of structure layers.
pub const MAX_LAYERS: usize = 5;
/// Grid side used when nothing else is asked for.
pub const DEFAULT_SIDE: usize = 256;

/// Parameters shared by every tick: stage 0's kernel, the cascade time step
/// and the feedback loop.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalParams {
    pub diff_a: f32,
    pub diff_b: f32,
    pub feed: f32,
    pub kill: f32,
    pub dt: f32,
    /// Strength of the `inh * C * X` term in stage 0 (structure mode only).
    pub inhibition: f32,
    /// Exponential smoothing applied to the feedback scalar, in `[0, 1)`.
    pub smoothing: f32,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            diff_a: 1.0,
            diff_b: 0.5,
            feed: 0.055,
            kill: 0.062,
            dt: 1.0,
            inhibition: 0.5,
            smoothing: 0.9,
        }
    }
}

impl GlobalParams {
    /// `4 * dt * max(diff_a, diff_b)`. The explicit stencil is only well behaved
    /// below 1; nothing in the core enforces it.
    pub fn diffusion_number(&self) -> f32 {
        4.0 * self.dt * self.diff_a.max(self.diff_b)
    }
}

/// Kernel parameters owned by a driven (non-base) stage.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageParams {
    pub diff_x: f32,
    pub diff_y: f32,
    pub feed: f32,
    pub kill: f32,
    /// Pull of `X` towards the readout of the stage below.
    pub drive: f32,
}

impl Default for StageParams {
    fn default() -> Self {
        Self {
            diff_x: 0.291,
            diff_y: 0.359,
            feed: 0.1,
            kill: 0.1,
            drive: 2.0,
        }
    }
}

impl StageParams {
    /// Inherit diffusion and reaction rates from the current global set.
    pub fn from_global(global: &GlobalParams) -> Self {
        Self {
            diff_x: global.diff_a,
            diff_y: global.diff_b,
            feed: global.feed,
            kill: global.kill,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerParams {
    pub gain: f32,
}

impl LayerParams {
    /// Gain 10 for layer 0, which reads the base substrate; 5 above it.
    pub fn for_layer(index: usize) -> Self {
        let gain = if index == 0 { 10.0 } else { 5.0 };
        Self { gain }
    }
}

impl Default for LayerParams {
    fn default() -> Self {
        Self::for_layer(0)
    }
}

/// Exclusive operating mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// Structure layers are computed and feed back into stage 0.
    #[default]
    Structure,
    /// Pure cascade: no structure pass, no feedback.
    Cascade,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Structure => "structure",
            Mode::Cascade => "cascade",
        }
    }
}

/// A circular seed patch in grid-relative units, so the same set scales to
/// any grid side. Centers lie in `[0, 1]`, radii in `(0, 0.5]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Patch {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
    /// Target `Y` inside the patch.
    pub value: f32,
}

impl Patch {
    /// Cell-space center and radius for a grid of `side` cells.
    pub fn resolve(&self, side: usize) -> (i64, i64, i64) {
        let s = side as f32;
        let cx = (self.center_x * s).round() as i64;
        let cy = (self.center_y * s).round() as i64;
        let r = ((self.radius * s).round() as i64).max(1);
        (cx, cy, r)
    }
}

/// The three canonical patches. At a side of 256 they land on
/// (128, 128) r12, (168, 98) r10 and (78, 163) r9.
pub const CANONICAL_PATCHES: [Patch; 3] = [
    Patch {
        center_x: 0.5,
        center_y: 0.5,
        radius: 12.0 / 256.0,
        value: 0.85,
    },
    Patch {
        center_x: 168.0 / 256.0,
        center_y: 98.0 / 256.0,
        radius: 10.0 / 256.0,
        value: 0.75,
    },
    Patch {
        center_x: 78.0 / 256.0,
        center_y: 163.0 / 256.0,
        radius: 9.0 / 256.0,
        value: 0.7,
    },
];

/// Construction-time configuration of a [`Simulation`](crate::Simulation).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimConfig {
    /// Grid side in cells. Must be a power of two so the reduction pyramid
    /// ends in a single cell.
    pub side: usize,
    pub patches: [Patch; 3],
}

impl SimConfig {
    pub fn new(side: usize) -> Self {
        Self {
            side,
            patches: CANONICAL_PATCHES,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.side < 4 || !self.side.is_power_of_two() {
            return Err(CoreError::InvalidConfig(
                "side must be a power of two and at least 4",
            ));
        }
        for patch in &self.patches {
            if !(0.0..=1.0).contains(&patch.value) {
                return Err(CoreError::InvalidConfig("patch value must be in [0, 1]"));
            }
            if !(0.0..=1.0).contains(&patch.center_x) || !(0.0..=1.0).contains(&patch.center_y) {
                return Err(CoreError::InvalidConfig("patch center must be in [0, 1]"));
            }
            let radius_ok = patch.radius > 0.0 && patch.radius <= 0.5;
            if !radius_ok {
                return Err(CoreError::InvalidConfig("patch radius must be in (0, 0.5]"));
            }
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE)
    }
}

/// Summary statistics of one field channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldStats {
    pub mean: f32,
    pub variance: f32,
    pub min: f32,
    pub max: f32,
}
