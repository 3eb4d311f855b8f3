//! The ordered chain of reaction-diffusion stages.
//!
//! Stages live in a fixed-capacity arena: appended in order, never removed,
//! and retired from evolution by freezing rather than deletion.

use tracing::{debug, info, warn};

use crate::error::{Capacity, CoreError};
use crate::field::{Addressing, DoubleBuffer, Field, Region};
use crate::reaction_diffusion::{step_base, step_driven};
use crate::seeding::{seed_base, seed_from_lower};
use crate::types::{GlobalParams, Patch, StageParams, MAX_STAGES};

/// Position of a stage in the cascade; 0 is the base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub usize);

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a stage takes its kernel parameters from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StageRole {
    /// Stage 0: global parameters plus the feedback inhibition term.
    Base,
    /// Higher stages: own parameters plus the drive from the stage below.
    Driven(StageParams),
}

#[derive(Clone, Debug)]
pub struct Stage {
    id: StageId,
    role: StageRole,
    frozen: bool,
    buffers: DoubleBuffer,
}

impl Stage {
    fn new(id: StageId, role: StageRole, side: usize) -> Self {
        Self {
            id,
            role,
            frozen: false,
            buffers: DoubleBuffer::new(Field::new(side, 2, Addressing::Wrap)),
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn role(&self) -> &StageRole {
        &self.role
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn field(&self) -> &Field {
        self.buffers.current()
    }

    /// Display name, e.g. `Stage 0 (a, b)` or `Stage 2 (X2, d)`.
    pub fn label(&self) -> String {
        match self.id.0 {
            0 => "Stage 0 (a, b)".to_owned(),
            n => format!("Stage {n} (X{n}, {})", secondary_name(n)),
        }
    }
}

/// Letter naming a driven stage's secondary channel: `c`, `d`, `e`.
pub fn secondary_name(stage: usize) -> char {
    match stage {
        0 => 'b',
        n => char::from(b'c' + (n - 1) as u8),
    }
}

#[derive(Clone, Debug)]
pub struct Cascade {
    side: usize,
    stages: Vec<Stage>,
}

impl Cascade {
    /// A cascade holding only the base stage, seeded with `patches`.
    pub fn new(side: usize, patches: &[Patch]) -> Self {
        let mut stages = Vec::with_capacity(MAX_STAGES);
        stages.push(Stage::new(StageId(0), StageRole::Base, side));
        let mut cascade = Self { side, stages };
        cascade.reseed(patches);
        cascade
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    fn get_mut(&mut self, id: StageId) -> Result<&mut Stage, CoreError> {
        self.stages.get_mut(id.0).ok_or(CoreError::UnknownStage(id))
    }

    pub fn base(&self) -> &Stage {
        &self.stages[0]
    }

    pub fn top(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    /// Append a driven stage on top of the cascade. The current top is frozen
    /// and the new stage is seeded from it.
    pub fn add_stage(&mut self, params: StageParams, patches: &[Patch]) -> Result<StageId, CoreError> {
        if self.stages.len() >= MAX_STAGES {
            warn!(max = MAX_STAGES, "stage capacity reached, add rejected");
            return Err(CoreError::CapacityExceeded {
                kind: Capacity::Stages,
                max: MAX_STAGES,
            });
        }

        let id = StageId(self.stages.len());
        let lower = self.stages.len() - 1;
        self.stages[lower].frozen = true;

        let mut stage = Stage::new(id, StageRole::Driven(params), self.side);
        let lower_field = self.stages[lower].field();
        stage
            .buffers
            .seed_with(|field| seed_from_lower(field, lower_field, patches));
        self.stages.push(stage);

        info!(stage = id.0, frozen_below = lower, "stage added");
        Ok(id)
    }

    pub fn set_frozen(&mut self, id: StageId, frozen: bool) -> Result<(), CoreError> {
        let stage = self.get_mut(id)?;
        if stage.frozen != frozen {
            debug!(stage = id.0, frozen, "stage freeze changed");
        }
        stage.frozen = frozen;
        Ok(())
    }

    pub fn params_mut(&mut self, id: StageId) -> Result<&mut StageParams, CoreError> {
        match &mut self.get_mut(id)?.role {
            StageRole::Base => Err(CoreError::BaseStageParams),
            StageRole::Driven(params) => Ok(params),
        }
    }

    /// Overwrite `region` of one channel of a stage, in both of its buffers.
    pub fn write(
        &mut self,
        id: StageId,
        region: Region,
        channel: usize,
        data: &[f32],
    ) -> Result<(), CoreError> {
        self.get_mut(id)?.buffers.write(region, channel, data)
    }

    /// Reset every stage's field contents, bottom-up, leaving parameters and
    /// freeze flags alone.
    pub fn reseed(&mut self, patches: &[Patch]) {
        self.stages[0]
            .buffers
            .seed_with(|field| seed_base(field, patches));
        for i in 1..self.stages.len() {
            let (below, above) = self.stages.split_at_mut(i);
            let lower_field = below[i - 1].field();
            above[0]
                .buffers
                .seed_with(|field| seed_from_lower(field, lower_field, patches));
        }
    }

    /// One cascade tick. Every non-frozen stage computes its next state from
    /// the start-of-tick state of itself and the stage below; the swaps happen
    /// only after all stages have been computed.
    pub fn step(&mut self, global: &GlobalParams, feedback: f32) {
        for i in 0..self.stages.len() {
            let (below, above) = self.stages.split_at_mut(i);
            let stage = &mut above[0];
            if stage.frozen {
                continue;
            }
            let (current, next) = stage.buffers.split();
            match &stage.role {
                StageRole::Base => step_base(current, next, global, feedback),
                StageRole::Driven(params) => {
                    step_driven(current, below[i - 1].field(), next, params, global.dt)
                }
            }
        }
        for stage in self.stages.iter_mut().filter(|s| !s.frozen) {
            stage.buffers.swap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CANONICAL_PATCHES;

    fn cascade() -> Cascade {
        Cascade::new(32, &CANONICAL_PATCHES)
    }

    #[test]
    fn add_stage_freezes_previous_top() {
        let mut c = cascade();
        let id = c.add_stage(StageParams::default(), &CANONICAL_PATCHES).unwrap();
        assert_eq!(id, StageId(1));
        assert!(c.base().is_frozen());
        assert!(!c.top().is_frozen());
        c.add_stage(StageParams::default(), &CANONICAL_PATCHES).unwrap();
        assert!(c.get(StageId(1)).unwrap().is_frozen());
    }

    #[test]
    fn capacity_is_enforced_without_side_effects() {
        let mut c = cascade();
        for _ in 1..MAX_STAGES {
            c.add_stage(StageParams::default(), &CANONICAL_PATCHES).unwrap();
        }
        let before: Vec<Field> = c.stages().iter().map(|s| s.field().clone()).collect();
        let frozen: Vec<bool> = c.stages().iter().map(Stage::is_frozen).collect();
        let err = c.add_stage(StageParams::default(), &CANONICAL_PATCHES);
        assert_eq!(
            err,
            Err(CoreError::CapacityExceeded {
                kind: Capacity::Stages,
                max: MAX_STAGES
            })
        );
        assert_eq!(c.len(), MAX_STAGES);
        let after: Vec<Field> = c.stages().iter().map(|s| s.field().clone()).collect();
        assert_eq!(before, after);
        assert_eq!(frozen, c.stages().iter().map(Stage::is_frozen).collect::<Vec<_>>());
    }

    #[test]
    fn frozen_stage_is_not_stepped() {
        let mut c = cascade();
        c.set_frozen(StageId(0), true).unwrap();
        let before = c.base().field().clone();
        for _ in 0..5 {
            c.step(&GlobalParams::default(), 0.0);
        }
        assert_eq!(&before, c.base().field());
    }

    #[test]
    fn stages_read_start_of_tick_state_below() {
        let mut c = cascade();
        c.add_stage(StageParams::default(), &CANONICAL_PATCHES).unwrap();
        c.set_frozen(StageId(0), false).unwrap();

        let base_before = c.base().field().clone();
        let stage_before = c.top().field().clone();
        let params = match c.top().role() {
            StageRole::Driven(p) => *p,
            StageRole::Base => unreachable!(),
        };
        let global = GlobalParams::default();

        let mut expected = Field::new(32, 2, Addressing::Wrap);
        step_driven(&stage_before, &base_before, &mut expected, &params, global.dt);

        c.step(&global, 0.0);
        assert_eq!(&expected, c.top().field());
        assert_ne!(&base_before, c.base().field());
    }

    #[test]
    fn base_stage_has_no_own_params() {
        let mut c = cascade();
        assert_eq!(c.params_mut(StageId(0)).err(), Some(CoreError::BaseStageParams));
        assert_eq!(c.set_frozen(StageId(3), true), Err(CoreError::UnknownStage(StageId(3))));
        let id = c.add_stage(StageParams::default(), &CANONICAL_PATCHES).unwrap();
        c.params_mut(id).unwrap().drive = 4.0;
        assert!(matches!(c.top().role(), StageRole::Driven(p) if p.drive == 4.0));
    }

    #[test]
    fn labels_name_secondary_channels() {
        let mut c = cascade();
        for _ in 1..MAX_STAGES {
            c.add_stage(StageParams::default(), &CANONICAL_PATCHES).unwrap();
        }
        let labels: Vec<String> = c.stages().iter().map(Stage::label).collect();
        assert_eq!(
            labels,
            ["Stage 0 (a, b)", "Stage 1 (X1, c)", "Stage 2 (X2, d)", "Stage 3 (X3, e)"]
        );
    }
}
