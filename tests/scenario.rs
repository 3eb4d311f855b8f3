use approx::assert_abs_diff_eq;
use hierarchical_rd::{
    reduce, GlobalParams, LayerParams, Mode, Selector, SimConfig, Simulation, StageId, StageParams,
    MAX_LAYERS,
};

const SIDE: usize = 64;

fn assert_unit_interval(sim: &Simulation) {
    for stage in sim.stages() {
        for channel in 0..2 {
            assert!(stage
                .field()
                .channel(channel)
                .iter()
                .all(|v| (0.0..=1.0).contains(v)));
        }
    }
}

fn assert_non_degenerate(sim: &Simulation, selector: Selector) {
    let stats = sim.sample_field(selector).stats();
    assert!(stats.max > stats.min, "{selector} is uniform: {stats:?}");
    assert!(stats.mean > 0.0 && stats.mean < 1.0, "{selector} saturated: {stats:?}");
}

/// Share of cells pinned to exactly 0 or 1 by the per-step clamp.
fn saturated_fraction(sim: &Simulation, selector: Selector) -> f32 {
    let values = sim.sample_field(selector).values();
    let pinned = values.iter().filter(|&&v| v == 0.0 || v == 1.0).count();
    pinned as f32 / values.len() as f32
}

#[test]
fn unstable_step_stays_bounded_but_saturates() {
    let mut sim = Simulation::new(SimConfig::new(SIDE)).unwrap();
    let params = GlobalParams {
        diff_a: 1.0,
        diff_b: 0.5,
        feed: 0.055,
        kill: 0.062,
        dt: 1.0,
        inhibition: 0.0,
        ..GlobalParams::default()
    };

    for _ in 0..1000 {
        sim.advance(Mode::Structure, &params);
    }

    // 4 * dt * diffA = 4: the clamp holds the field in [0, 1], but what is
    // left is a 0/1 checkerboard rather than a Turing pattern.
    assert!(params.diffusion_number() >= 1.0);
    assert_unit_interval(&sim);
    assert_non_degenerate(&sim, Selector::BASE_X);
    for selector in [Selector::BASE_X, Selector::BASE_Y] {
        let pinned = saturated_fraction(&sim, selector);
        assert!(pinned > 0.9, "{selector}: only {pinned} of cells saturated");
    }
}

#[test]
fn pattern_grows_under_a_stable_step() {
    let mut sim = Simulation::new(SimConfig::new(SIDE)).unwrap();
    let params = GlobalParams {
        dt: 0.2,
        inhibition: 0.0,
        ..GlobalParams::default()
    };
    let seeded = sim.sample_field(Selector::BASE_Y).stats();

    for _ in 0..1000 {
        sim.advance(Mode::Structure, &params);
    }

    let grown = sim.sample_field(Selector::BASE_Y).stats();
    assert!(params.diffusion_number() < 1.0);
    assert_non_degenerate(&sim, Selector::BASE_X);
    assert_non_degenerate(&sim, Selector::BASE_Y);
    assert!(grown.mean > seeded.mean, "{grown:?} vs {seeded:?}");
    for selector in [Selector::BASE_X, Selector::BASE_Y] {
        let pinned = saturated_fraction(&sim, selector);
        assert!(pinned < 0.1, "{selector}: {pinned} of cells saturated");
    }
}

#[test]
fn layer_global_values_are_spatial_means() {
    let mut sim = Simulation::new(SimConfig::new(SIDE)).unwrap();
    for i in 1..MAX_LAYERS {
        sim.add_layer(LayerParams::for_layer(i)).unwrap();
    }
    let params = GlobalParams {
        dt: 0.2,
        ..GlobalParams::default()
    };
    for tick in 0..200 {
        sim.advance(Mode::Structure, &params);
        if tick % 50 != 49 {
            continue;
        }
        for layer in sim.layers() {
            let values = layer.field().channel(0);
            let view = sim.sample_field(Selector::Layer(layer.id()));
            let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
            let g = layer.global_value();
            assert!((0.0..=1.0).contains(&g));
            assert_abs_diff_eq!(g as f64, mean, epsilon = 1e-5);
            assert_abs_diff_eq!(reduce(view), g, epsilon = 1e-6);
        }
        let c = sim.current_feedback_value();
        assert!((0.0..=1.0).contains(&c));
    }
}

#[test]
fn feedback_inhibits_the_base_stage() {
    let params = GlobalParams {
        dt: 0.2,
        inhibition: 2.0,
        smoothing: 0.0,
        ..GlobalParams::default()
    };
    let mut with_feedback = Simulation::new(SimConfig::new(SIDE)).unwrap();
    let mut without = Simulation::new(SimConfig::new(SIDE)).unwrap();
    without.set_feedback_enabled(false);

    // Tick 1 runs with C = 0 in both: the loop is one tick delayed.
    with_feedback.advance(Mode::Structure, &params);
    without.advance(Mode::Structure, &params);
    assert_eq!(
        with_feedback.sample_field(Selector::BASE_X).values(),
        without.sample_field(Selector::BASE_X).values()
    );
    assert!(with_feedback.current_feedback_value() > 0.0);
    assert_eq!(without.current_feedback_value(), 0.0);

    with_feedback.advance(Mode::Structure, &params);
    without.advance(Mode::Structure, &params);
    let inhibited = with_feedback.sample_field(Selector::BASE_X).stats().mean;
    let free = without.sample_field(Selector::BASE_X).stats().mean;
    assert!(inhibited < free, "{inhibited} !< {free}");
}

#[test]
fn cascade_stays_bounded_with_all_stages() {
    let mut sim = Simulation::new(SimConfig::new(SIDE)).unwrap();
    let params = GlobalParams {
        dt: 0.2,
        ..GlobalParams::default()
    };
    sim.switch_mode(Mode::Cascade);
    for _ in 1..4 {
        sim.add_stage(StageParams::from_global(&params)).unwrap();
        for _ in 0..50 {
            sim.advance(Mode::Cascade, &params);
        }
        assert_unit_interval(&sim);
    }
    for id in 0..3 {
        sim.set_frozen(StageId(id), false).unwrap();
    }
    for _ in 0..100 {
        sim.advance(Mode::Cascade, &params);
    }
    assert_unit_interval(&sim);
    assert_eq!(sim.current_feedback_value(), 0.0);
}
