//! Explicit-Euler Gray–Scott step on a two-channel field.
//!
//! Channel 0 is the substrate `X`, channel 1 the autocatalyst `Y`. Neighbors
//! are fetched with the field's own addressing (wrap for stage buffers). The
//! result is clamped to `[0, 1]`; that clamp is the only guard against the
//! scheme running away when `4 * dt * diff >= 1`.

use crate::field::Field;
use crate::types::{GlobalParams, StageParams};

#[derive(Clone, Copy, Debug)]
struct Rates {
    diff_x: f32,
    diff_y: f32,
    feed: f32,
    kill: f32,
    dt: f32,
}

/// Nonlinear readout of a lower stage that drives the stage above it.
#[inline]
pub fn drive_input(x: f32, y: f32) -> f32 {
    (x * y * y).clamp(0.0, 1.0)
}

/// Advance the base stage by one step. `feedback` is the scalar `C`; the
/// inhibition term is `global.inhibition * feedback * X`, so passing 0 turns
/// it off.
pub fn step_base(current: &Field, next: &mut Field, global: &GlobalParams, feedback: f32) {
    let rates = Rates {
        diff_x: global.diff_a,
        diff_y: global.diff_b,
        feed: global.feed,
        kill: global.kill,
        dt: global.dt,
    };
    let inh = global.inhibition * feedback;
    integrate(current, next, rates, |_, x| -inh * x);
}

/// Advance a driven stage, reading the stage below (`lower`) as it was at the
/// start of the tick.
pub fn step_driven(
    current: &Field,
    lower: &Field,
    next: &mut Field,
    params: &StageParams,
    dt: f32,
) {
    let rates = Rates {
        diff_x: params.diff_x,
        diff_y: params.diff_y,
        feed: params.feed,
        kill: params.kill,
        dt,
    };
    let lower_x = lower.channel(0);
    let lower_y = lower.channel(1);
    let drive = params.drive;
    integrate(current, next, rates, |idx, x| {
        drive * (drive_input(lower_x[idx], lower_y[idx]) - x)
    });
}

fn integrate(current: &Field, next: &mut Field, rates: Rates, extra: impl Fn(usize, f32) -> f32) {
    let side = current.side();
    let addressing = current.addressing();
    let xs = current.channel(0);
    let ys = current.channel(1);
    let (next_x, next_y) = next.pair_mut();

    for row in 0..side {
        let up = addressing.step(row, -1, side) * side;
        let down = addressing.step(row, 1, side) * side;
        let here = row * side;
        for col in 0..side {
            let left = addressing.step(col, -1, side);
            let right = addressing.step(col, 1, side);
            let idx = here + col;

            let x = xs[idx];
            let y = ys[idx];
            let lap_x = xs[up + col] + xs[down + col] + xs[here + left] + xs[here + right] - 4.0 * x;
            let lap_y = ys[up + col] + ys[down + col] + ys[here + left] + ys[here + right] - 4.0 * y;
            let reaction = x * y * y;

            let dx = rates.diff_x * lap_x - reaction + rates.feed * (1.0 - x) + extra(idx, x);
            let dy = rates.diff_y * lap_y + reaction - (rates.kill + rates.feed) * y;

            next_x[idx] = (x + dx * rates.dt).clamp(0.0, 1.0);
            next_y[idx] = (y + dy * rates.dt).clamp(0.0, 1.0);
        }
    }
}
