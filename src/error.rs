use crate::cascade::StageId;
use crate::structure::LayerId;

/// Which arena a capacity error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capacity {
    Stages,
    Layers,
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capacity::Stages => f.write_str("stages"),
            Capacity::Layers => f.write_str("structure layers"),
        }
    }
}

/// Errors reported by the simulation core. Every variant leaves state untouched.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CoreError {
    #[error("at most {max} {kind} allowed")]
    CapacityExceeded { kind: Capacity, max: usize },
    #[error("no stage with id {0}")]
    UnknownStage(StageId),
    #[error("no structure layer with id {0}")]
    UnknownLayer(LayerId),
    #[error("stage 0 is driven by the global parameters and has no own parameter set")]
    BaseStageParams,
    #[error("unrecognised view selector {0:?}")]
    InvalidSelector(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("region {x},{y} {width}x{height} does not fit a {side}x{side} field")]
    RegionOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        side: usize,
    },
    #[error("channel {channel} out of range for a {channels}-channel field")]
    ChannelOutOfRange { channel: usize, channels: usize },
    #[error("expected {expected} values, got {actual}")]
    DataLength { expected: usize, actual: usize },
}
