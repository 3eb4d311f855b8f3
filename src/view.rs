//! Read-only views of stage and layer fields for the compositor.

use std::fmt;
use std::str::FromStr;

use crate::cascade::StageId;
use crate::error::CoreError;
use crate::field::Field;
use crate::structure::LayerId;
use crate::types::FieldStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `X` (`a` on the base stage).
    Primary,
    /// `Y` (`b`, `c`, `d`, `e` up the cascade).
    Secondary,
}

impl Channel {
    pub fn index(self) -> usize {
        match self {
            Channel::Primary => 0,
            Channel::Secondary => 1,
        }
    }
}

/// Names one displayable field channel.
///
/// The textual form matches the viewer's picker values: `state-a` and
/// `state-b` for the base stage, `state-c`..`state-e` for the secondary
/// channel of stages 1..3, `rdx-N` / `rdy-N` for any stage, `struct-N` for
/// structure layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    Stage { stage: StageId, channel: Channel },
    Layer(LayerId),
}

impl Selector {
    pub const BASE_X: Selector = Selector::Stage {
        stage: StageId(0),
        channel: Channel::Primary,
    };
    pub const BASE_Y: Selector = Selector::Stage {
        stage: StageId(0),
        channel: Channel::Secondary,
    };

    pub fn stage_x(stage: usize) -> Self {
        Selector::Stage {
            stage: StageId(stage),
            channel: Channel::Primary,
        }
    }

    pub fn stage_y(stage: usize) -> Self {
        Selector::Stage {
            stage: StageId(stage),
            channel: Channel::Secondary,
        }
    }

    pub fn layer(layer: usize) -> Self {
        Selector::Layer(LayerId(layer))
    }

    /// Human-readable name for pickers.
    pub fn label(&self) -> String {
        match *self {
            Selector::Stage {
                stage: StageId(0),
                channel: Channel::Primary,
            } => "RD: a (X0)".to_owned(),
            Selector::Stage {
                stage: StageId(0),
                channel: Channel::Secondary,
            } => "RD: b (Y0)".to_owned(),
            Selector::Stage {
                stage: StageId(n),
                channel: Channel::Primary,
            } => format!("RD: X{n}"),
            Selector::Stage {
                stage: StageId(n),
                channel: Channel::Secondary,
            } => format!("RD: {} (Y{n})", crate::cascade::secondary_name(n)),
            Selector::Layer(LayerId(n)) => format!("Structure {n}"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Selector::Stage {
                stage: StageId(0),
                channel: Channel::Primary,
            } => f.write_str("state-a"),
            Selector::Stage {
                stage: StageId(0),
                channel: Channel::Secondary,
            } => f.write_str("state-b"),
            Selector::Stage {
                stage,
                channel: Channel::Primary,
            } => write!(f, "rdx-{stage}"),
            Selector::Stage {
                stage,
                channel: Channel::Secondary,
            } => write!(f, "rdy-{stage}"),
            Selector::Layer(layer) => write!(f, "struct-{layer}"),
        }
    }
}

impl FromStr for Selector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidSelector(s.to_owned());
        let (kind, arg) = s.split_once('-').ok_or_else(invalid)?;
        let index = || arg.parse::<usize>().map_err(|_| invalid());
        match kind {
            "state" => match arg {
                "a" => Ok(Selector::BASE_X),
                "b" => Ok(Selector::BASE_Y),
                "c" => Ok(Selector::stage_y(1)),
                "d" => Ok(Selector::stage_y(2)),
                "e" => Ok(Selector::stage_y(3)),
                _ => Err(invalid()),
            },
            "rdx" => Ok(Selector::stage_x(index()?)),
            "rdy" => Ok(Selector::stage_y(index()?)),
            "struct" => Ok(Selector::layer(index()?)),
            _ => Err(invalid()),
        }
    }
}

/// A field plus the channel a compositor should sample.
#[derive(Clone, Copy, Debug)]
pub struct FieldView<'a> {
    field: &'a Field,
    channel: usize,
    selector: Selector,
}

impl<'a> FieldView<'a> {
    pub(crate) fn new(field: &'a Field, channel: usize, selector: Selector) -> Self {
        Self {
            field,
            channel,
            selector,
        }
    }

    pub fn field(&self) -> &'a Field {
        self.field
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// The selector actually served, which differs from the request after a
    /// fallback.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn side(&self) -> usize {
        self.field.side()
    }

    pub fn values(&self) -> &'a [f32] {
        self.field.channel(self.channel)
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.field.get(self.channel, x, y)
    }

    pub fn stats(&self) -> FieldStats {
        let values = self.values();
        if values.is_empty() {
            return FieldStats::default();
        }
        let n = values.len() as f32;
        let mut sum = 0.0;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in values {
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        let mean = sum / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        FieldStats {
            mean,
            variance,
            min,
            max,
        }
    }
}
