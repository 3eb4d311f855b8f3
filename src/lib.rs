//! Hierarchical reaction-diffusion with structural feedback.
//!
//! A base Gray–Scott stage drives a cascade of up to four higher stages,
//! each pulled towards the `X * Y^2` readout of the stage below. In
//! structure mode a chain of gradient-magnitude layers is computed from the
//! base substrate, reduced to a scalar, smoothed into the feedback value `C`
//! and fed back as an inhibition term on the next tick.
//!
//! ```
//! use hierarchical_rd::{GlobalParams, Mode, SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::new(64))?;
//! let params = GlobalParams { dt: 0.2, ..GlobalParams::default() };
//! for _ in 0..10 {
//!     sim.advance(Mode::Structure, &params);
//! }
//! assert!((0.0..=1.0).contains(&sim.current_feedback_value()));
//! # Ok::<(), hierarchical_rd::CoreError>(())
//! ```
//!
//! Parameters are not bounded here. Keeping `4 * dt * diff` below 1
//! ([`GlobalParams::diffusion_number`]) is the caller's job; outside that
//! range the per-step clamp keeps values in `[0, 1]` but the dynamics are
//! no longer a faithful integration.

pub mod cascade;
pub mod error;
pub mod feedback;
pub mod field;
pub mod reaction_diffusion;
pub mod seeding;
pub mod simulation;
pub mod structure;
pub mod telemetry;
pub mod types;
pub mod view;

pub use cascade::{Stage, StageId, StageRole};
pub use error::{Capacity, CoreError};
pub use field::{Addressing, DoubleBuffer, Field, Region};
pub use simulation::Simulation;
pub use structure::{reduce, LayerId, StructureLayer};
pub use types::{
    FieldStats, GlobalParams, LayerParams, Mode, Patch, SimConfig, StageParams, CANONICAL_PATCHES,
    MAX_LAYERS, MAX_STAGES,
};
pub use view::{Channel, FieldView, Selector};
