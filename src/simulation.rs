//! The simulation facade: tick entry point, structural mutations, mode
//! lifecycle and the read interface used by renderers.

use tracing::{debug, info, trace, warn};

use crate::cascade::{Cascade, Stage, StageId};
use crate::error::CoreError;
use crate::field::Region;
use crate::feedback::FeedbackController;
use crate::structure::{LayerId, StructureLayer, StructurePipeline};
use crate::types::{GlobalParams, LayerParams, Mode, SimConfig, StageParams};
use crate::view::{Channel, FieldView, Selector};

/// Full simulation state.
///
/// One call to [`advance`](Self::advance) is one tick, executed in a fixed
/// order: every non-frozen stage (bottom-up, each reading the start-of-tick
/// state of the stage below), then in structure mode every structure layer
/// and finally the feedback scalar. `C` computed on tick `t` is first seen
/// by stage 0 on tick `t + 1`.
///
/// In cascade mode structure layers are not recomputed. They stay
/// addressable through [`sample_field`](Self::sample_field) and
/// [`layer_global_value`](Self::layer_global_value), but hold whatever the
/// last structure-mode tick (or reset) left in them.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimConfig,
    mode: Mode,
    cascade: Cascade,
    layers: StructurePipeline,
    feedback: FeedbackController,
    ticks: u64,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let cascade = Cascade::new(config.side, &config.patches);
        let layers = StructurePipeline::new(config.side)?;
        info!(side = config.side, "simulation created");
        Ok(Self {
            config,
            mode: Mode::default(),
            cascade,
            layers,
            feedback: FeedbackController::default(),
            ticks: 0,
        })
    }

    pub fn side(&self) -> usize {
        self.config.side
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Run one tick in `mode`. A mode different from the current one is
    /// switched to first, with the full reset that implies.
    pub fn advance(&mut self, mode: Mode, params: &GlobalParams) {
        self.switch_mode(mode);

        let structure = self.mode == Mode::Structure;
        let c = if structure { self.feedback.value() } else { 0.0 };
        self.cascade.step(params, c);

        if structure {
            self.layers.compute(self.cascade.base().field().channel(0));
            let raw = self
                .feedback
                .resolve_source(self.layers.len())
                .and_then(|id| self.layers.get(id))
                .map_or(0.0, StructureLayer::global_value);
            self.feedback.update(raw, params.smoothing);
        } else {
            self.feedback.reset();
        }

        self.ticks += 1;
        trace!(tick = self.ticks, c = self.feedback.value(), "tick");
    }

    /// Switch operating mode. Returns `false` (and does nothing) if already
    /// in `mode`; otherwise every field is reseeded and `C` cleared, while
    /// stage and layer parameters are kept.
    pub fn switch_mode(&mut self, mode: Mode) -> bool {
        if mode == self.mode {
            return false;
        }
        info!(from = self.mode.label(), to = mode.label(), "mode switched");
        self.mode = mode;
        self.reset_fields();
        true
    }

    /// Reinitialise all stage and layer fields and clear `C`.
    pub fn reseed(&mut self) {
        info!("reseed");
        self.reset_fields();
    }

    fn reset_fields(&mut self) {
        self.cascade.reseed(&self.config.patches);
        self.layers.clear();
        self.feedback.reset();
        self.ticks = 0;
    }

    /// Seed raw values into one channel of a stage, e.g. to start from a
    /// recorded state instead of the canonical patches. The next reseed or
    /// mode switch restores the patches.
    pub fn write_stage(
        &mut self,
        stage: StageId,
        region: Region,
        channel: Channel,
        data: &[f32],
    ) -> Result<(), CoreError> {
        self.cascade.write(stage, region, channel.index(), data)?;
        debug!(%stage, ?region, "stage field written");
        Ok(())
    }

    /// Append a driven stage. The previous top stage is frozen and the new
    /// one seeded from it.
    pub fn add_stage(&mut self, params: StageParams) -> Result<StageId, CoreError> {
        self.cascade.add_stage(params, &self.config.patches)
    }

    /// Append a structure layer fed by the current last layer. The new layer
    /// becomes the feedback source and `C` restarts from 0.
    pub fn add_layer(&mut self, params: LayerParams) -> Result<LayerId, CoreError> {
        let id = self.layers.add_layer(params)?;
        self.feedback.set_source(Some(id));
        Ok(id)
    }

    pub fn set_frozen(&mut self, stage: StageId, frozen: bool) -> Result<(), CoreError> {
        self.cascade.set_frozen(stage, frozen)
    }

    pub fn is_frozen(&self, stage: StageId) -> Result<bool, CoreError> {
        self.cascade
            .get(stage)
            .map(Stage::is_frozen)
            .ok_or(CoreError::UnknownStage(stage))
    }

    pub fn stage_params_mut(&mut self, stage: StageId) -> Result<&mut StageParams, CoreError> {
        self.cascade.params_mut(stage)
    }

    pub fn layer_params_mut(&mut self, layer: LayerId) -> Result<&mut LayerParams, CoreError> {
        self.layers.params_mut(layer)
    }

    pub fn stages(&self) -> &[Stage] {
        self.cascade.stages()
    }

    pub fn layers(&self) -> &[StructureLayer] {
        self.layers.layers()
    }

    pub fn set_feedback_enabled(&mut self, enabled: bool) {
        debug!(enabled, "feedback toggled");
        self.feedback.set_enabled(enabled);
    }

    pub fn feedback_enabled(&self) -> bool {
        self.feedback.is_enabled()
    }

    /// Pick the layer whose global value drives `C`. Ids past the end resolve
    /// to the last layer. `C` restarts from 0.
    pub fn set_feedback_source(&mut self, layer: LayerId) {
        self.feedback.set_source(Some(layer));
    }

    pub fn feedback_source(&self) -> Option<LayerId> {
        self.feedback.resolve_source(self.layers.len())
    }

    /// Current feedback scalar `C`, in `[0, 1]`.
    pub fn current_feedback_value(&self) -> f32 {
        self.feedback.value()
    }

    /// Last reduced value of a layer, in `[0, 1]`. Stale in cascade mode.
    pub fn layer_global_value(&self, layer: LayerId) -> Result<f32, CoreError> {
        self.layers
            .get(layer)
            .map(StructureLayer::global_value)
            .ok_or(CoreError::UnknownLayer(layer))
    }

    /// Resolve a selector to a field and channel. Unknown stages or layers
    /// fall back to stage 0's `X` channel; the returned view reports what
    /// was actually served.
    pub fn sample_field(&self, selector: Selector) -> FieldView<'_> {
        match selector {
            Selector::Stage { stage, channel } => {
                if let Some(s) = self.cascade.get(stage) {
                    return FieldView::new(s.field(), channel.index(), selector);
                }
            }
            Selector::Layer(layer) => {
                if let Some(l) = self.layers.get(layer) {
                    return FieldView::new(l.field(), 0, selector);
                }
            }
        }
        warn!(%selector, "unknown view selector, falling back to stage 0 X");
        FieldView::new(
            self.cascade.base().field(),
            Channel::Primary.index(),
            Selector::BASE_X,
        )
    }

    /// Selectors worth offering in the current mode: the base stage always,
    /// structure layers in structure mode, every stage in cascade mode.
    pub fn views(&self) -> Vec<Selector> {
        let mut views = vec![Selector::BASE_X, Selector::BASE_Y];
        match self.mode {
            Mode::Structure => {
                views.extend((0..self.layers.len()).map(Selector::layer));
            }
            Mode::Cascade => {
                for stage in 1..self.cascade.len() {
                    views.push(Selector::stage_x(stage));
                    views.push(Selector::stage_y(stage));
                }
            }
        }
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulation {
        Simulation::new(SimConfig::new(32)).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        assert_eq!(
            Simulation::new(SimConfig::new(48)).err(),
            Some(CoreError::InvalidConfig(
                "side must be a power of two and at least 4"
            ))
        );
    }

    #[test]
    fn starts_in_structure_mode_with_one_layer() {
        let s = sim();
        assert_eq!(s.mode(), Mode::Structure);
        assert_eq!(s.stages().len(), 1);
        assert_eq!(s.layers().len(), 1);
        assert_eq!(s.feedback_source(), Some(LayerId(0)));
        assert_eq!(s.current_feedback_value(), 0.0);
    }

    #[test]
    fn structure_tick_updates_feedback() {
        let mut s = sim();
        let params = GlobalParams {
            smoothing: 0.0,
            ..GlobalParams::default()
        };
        s.advance(Mode::Structure, &params);
        let g = s.layer_global_value(LayerId(0)).unwrap();
        assert!(g > 0.0);
        assert_eq!(s.current_feedback_value(), g);
        assert_eq!(s.tick_count(), 1);
    }

    #[test]
    fn cascade_mode_forces_zero_feedback_and_stale_layers() {
        let mut s = sim();
        let params = GlobalParams::default();
        s.advance(Mode::Structure, &params);
        s.advance(Mode::Cascade, &params);
        assert_eq!(s.mode(), Mode::Cascade);
        assert_eq!(s.current_feedback_value(), 0.0);
        // The switch cleared the layers and nothing recomputes them.
        let stale = s.sample_field(Selector::layer(0));
        assert_eq!(stale.selector(), Selector::layer(0));
        assert!(stale.values().iter().all(|&v| v == 0.0));
        assert_eq!(s.layer_global_value(LayerId(0)), Ok(0.0));
    }

    #[test]
    fn switching_to_current_mode_is_a_no_op() {
        let mut s = sim();
        s.advance(Mode::Structure, &GlobalParams::default());
        assert!(!s.switch_mode(Mode::Structure));
        assert_eq!(s.tick_count(), 1);
    }

    #[test]
    fn add_layer_selects_it_as_feedback_source() {
        let mut s = sim();
        let params = GlobalParams {
            smoothing: 0.0,
            ..GlobalParams::default()
        };
        s.advance(Mode::Structure, &params);
        let id = s.add_layer(LayerParams::for_layer(1)).unwrap();
        assert_eq!(s.feedback_source(), Some(id));
        assert_eq!(s.current_feedback_value(), 0.0);
        s.advance(Mode::Structure, &params);
        assert_eq!(s.current_feedback_value(), s.layer_global_value(id).unwrap());

        s.set_feedback_source(LayerId(0));
        assert_eq!(s.feedback_source(), Some(LayerId(0)));
        assert_eq!(s.current_feedback_value(), 0.0);
    }

    #[test]
    fn unknown_selectors_fall_back_to_base_x() {
        let s = sim();
        for selector in [Selector::stage_y(3), Selector::layer(4)] {
            let view = s.sample_field(selector);
            assert_eq!(view.selector(), Selector::BASE_X);
            assert_eq!(view.channel(), 0);
            assert_eq!(view.values(), s.stages()[0].field().channel(0));
        }
    }

    #[test]
    fn write_stage_seeds_raw_values_until_reseed() {
        let mut s = sim();
        let region = Region {
            x: 0,
            y: 0,
            width: 2,
            height: 1,
        };
        s.write_stage(StageId(0), region, Channel::Secondary, &[0.3, 0.4]).unwrap();
        let view = s.sample_field(Selector::BASE_Y);
        assert_eq!((view.get(0, 0), view.get(1, 0)), (0.3, 0.4));

        assert_eq!(
            s.write_stage(StageId(1), region, Channel::Primary, &[0.0, 0.0]),
            Err(CoreError::UnknownStage(StageId(1)))
        );
        assert!(matches!(
            s.write_stage(StageId(0), Region::full(64), Channel::Primary, &[0.0; 64 * 64]),
            Err(CoreError::RegionOutOfBounds { .. })
        ));

        s.reseed();
        assert_eq!(s.sample_field(Selector::BASE_Y).get(0, 0), 0.0);
    }

    #[test]
    fn views_follow_mode() {
        let mut s = sim();
        s.add_layer(LayerParams::for_layer(1)).unwrap();
        s.add_stage(StageParams::default()).unwrap();
        assert_eq!(
            s.views(),
            vec![
                Selector::BASE_X,
                Selector::BASE_Y,
                Selector::layer(0),
                Selector::layer(1)
            ]
        );
        s.switch_mode(Mode::Cascade);
        assert_eq!(
            s.views(),
            vec![
                Selector::BASE_X,
                Selector::BASE_Y,
                Selector::stage_x(1),
                Selector::stage_y(1)
            ]
        );
    }

    #[test]
    fn parameter_edits_reach_stages_and_layers() {
        let mut s = sim();
        let id = s.add_stage(StageParams::default()).unwrap();
        s.stage_params_mut(id).unwrap().drive = 3.5;
        s.layer_params_mut(LayerId(0)).unwrap().gain = 2.0;
        assert_eq!(s.layers()[0].params().gain, 2.0);
        assert_eq!(s.layer_params_mut(LayerId(3)).err(), Some(CoreError::UnknownLayer(LayerId(3))));
        assert_eq!(s.is_frozen(StageId(0)), Ok(true));
        assert_eq!(s.is_frozen(id), Ok(false));
    }
}
