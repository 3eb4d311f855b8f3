use tracing::debug;

use crate::structure::LayerId;

/// Smoothed feedback scalar `C` coupling a structure layer's global value
/// back into stage 0.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackController {
    value: f32,
    enabled: bool,
    /// Selected layer; `None` means the last one.
    source: Option<LayerId>,
}

impl Default for FeedbackController {
    fn default() -> Self {
        Self {
            value: 0.0,
            enabled: true,
            source: None,
        }
    }
}

impl FeedbackController {
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolve the selected layer against `layer_count`, clamping ids that
    /// run past the end.
    pub fn resolve_source(&self, layer_count: usize) -> Option<LayerId> {
        let last = layer_count.checked_sub(1)?;
        Some(LayerId(self.source.map_or(last, |id| id.0.min(last))))
    }

    pub fn set_source(&mut self, source: Option<LayerId>) {
        if self.source != source {
            debug!(?source, "feedback source changed");
        }
        self.source = source;
        self.reset();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    /// Fold one raw reading into `C`. `smoothing` is clamped to `[0, 0.999]`.
    pub fn update(&mut self, raw: f32, smoothing: f32) -> f32 {
        self.value = if self.enabled {
            let s = smoothing.clamp(0.0, 0.999);
            (s * self.value + (1.0 - s) * raw.clamp(0.0, 1.0)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.value
    }
}
