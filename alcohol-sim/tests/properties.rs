//! Whole-run properties that hold for any seed or scenario.

use alcohol_sim::prob::NormalParam;
use alcohol_sim::{Calibration, CityReport, Intervention, InterventionTarget, RunConfig, World};

// === TEST FIXTURES ===

fn base_config(num_agents: usize, num_hoods: usize, stop_tick: u32) -> RunConfig {
    RunConfig {
        num_agents,
        world_width: 100,
        world_height: 100,
        num_hoods,
        burn_in: 2,
        stop_tick,
        outlets_per_hood: 3,
        seed: 2024,
        ..Default::default()
    }
}

/// Run to the stop tick, collecting the report after every tick.
fn run_reports(config: RunConfig) -> Vec<CityReport> {
    let mut world = World::new(config).unwrap();
    let mut reports = Vec::new();
    while world.run_tick() {
        reports.push(world.report());
    }
    reports
}

/// Field-by-field equality, bitwise so NaN compares equal to itself.
fn assert_reports_match(a: &[CityReport], b: &[CityReport], skip: &[&str]) {
    assert_eq!(a.len(), b.len());
    for (ra, rb) in a.iter().zip(b) {
        assert_eq!(ra.tick, rb.tick);
        assert_eq!(ra.fields.len(), rb.fields.len());
        for (fa, fb) in ra.fields.iter().zip(&rb.fields) {
            assert_eq!(fa.name, fb.name);
            if skip.contains(&fa.name.as_str()) {
                continue;
            }
            assert_eq!(
                fa.value.to_bits(),
                fb.value.to_bits(),
                "tick {}: {} differs ({} vs {})",
                ra.tick,
                fa.name,
                fa.value,
                fb.value
            );
        }
    }
}

// === PROPERTY TESTS ===

#[test]
fn property_replay_is_deterministic() {
    let config = base_config(10_000, 10, 50);
    let first = run_reports(config.clone());
    let second = run_reports(config);
    assert_eq!(first.len(), 50);
    assert_reports_match(&first, &second, &[]);
}

#[test]
fn property_seed_changes_the_run() {
    let a = run_reports(base_config(1_000, 4, 5));
    let b = run_reports(RunConfig {
        seed: 2025,
        ..base_config(1_000, 4, 5)
    });
    assert_ne!(a, b);
}

#[test]
fn property_burn_in_gates_deaths_and_moves() {
    let config = RunConfig {
        burn_in: 5,
        ..base_config(3_000, 4, 15)
    };
    let reports = run_reports(config);

    for report in reports.iter().filter(|r| r.tick <= 5) {
        assert_eq!(report.get("pdied"), Some(0.0), "death during burn-in at {}", report.tick);
        assert_eq!(report.get("pmoved"), Some(0.0), "move during burn-in at {}", report.tick);
    }
    let moved_after: f64 = reports
        .iter()
        .filter(|r| r.tick > 5)
        .filter_map(|r| r.get("pmoved"))
        .sum();
    assert!(moved_after > 0.0, "nobody moved after burn-in");
}

#[test]
fn property_report_only_interventions_change_nothing() {
    let baseline = run_reports(base_config(2_000, 5, 20));

    let scenarios = [
        (Intervention::DrinkingNorms, 0.3),
        (Intervention::ViolentOutletClosure, 0.3),
        (Intervention::Policing, 0.3),
        (Intervention::ViolenceInterrupters, 0.3),
        (Intervention::PolicingAndInterrupters, 0.3),
        (Intervention::Taxation, 0.0),
    ];
    for (intervention, change) in scenarios {
        let config = RunConfig {
            intervention,
            intervention_change: change,
            num_outreach: 2,
            ..base_config(2_000, 5, 20)
        };
        let reports = run_reports(config);
        assert_reports_match(&baseline, &reports, &["pvioltarget", "numvioltarget"]);
    }
}

#[test]
fn property_outreach_targets_are_reported() {
    let config = RunConfig {
        intervention: Intervention::ViolenceInterrupters,
        num_outreach: 2,
        ..base_config(2_000, 5, 6)
    };
    let mut world = World::new(config).unwrap();
    for _ in 0..6 {
        world.run_tick();
    }
    assert_eq!(world.hoods.iter().filter(|h| h.targeted).count(), 2);
    assert_eq!(world.report().get("numvioltarget"), Some(2.0));
}

#[test]
fn property_taxation_lowers_heavy_drinking() {
    let run = |intervention: Intervention| {
        let config = RunConfig {
            intervention,
            intervention_target: InterventionTarget::Universal,
            intervention_change: 1.0,
            burn_in: 1,
            ..base_config(5_000, 4, 25)
        };
        let mut world = World::new(config).unwrap();
        while world.run_tick() {}
        world.pct_heavy_drinkers()
    };
    let untaxed = run(Intervention::None);
    let taxed = run(Intervention::Taxation);
    assert!(
        taxed < untaxed,
        "taxation should lower heavy drinking: taxed={taxed:.2}%, untaxed={untaxed:.2}%"
    );
}

#[test]
fn property_early_closing_lowers_heavy_drinking() {
    let calibration = Calibration {
        early_closing: NormalParam::new(0.9, 0.0),
        ..Default::default()
    };
    let run = |intervention: Intervention| {
        let config = RunConfig {
            intervention,
            intervention_change: 0.5,
            burn_in: 1,
            ..base_config(5_000, 4, 25)
        };
        let mut world = World::with_calibration(config, calibration.clone()).unwrap();
        while world.run_tick() {}
        world.pct_heavy_drinkers()
    };
    let open = run(Intervention::None);
    let closing = run(Intervention::EarlyClosing);
    assert!(
        closing < open,
        "early closing should lower heavy drinking: closing={closing:.2}%, open={open:.2}%"
    );
}

#[test]
fn property_network_saturates() {
    let world = World::new(base_config(1_000, 4, 1)).unwrap();
    let saturation = world.network.saturation();
    assert!(saturation >= 0.95, "only {:.1}% saturated", saturation * 100.0);

    for agent in world.agents.iter() {
        assert!(agent.friends.len() as u32 <= agent.friend_target);
        for friend in &agent.friends {
            assert!(world.get_agent(*friend).unwrap().has_friend(agent.id));
        }
    }
}

#[test]
fn property_report_values_are_finite() {
    let mut world = World::new(base_config(1_500, 4, 8)).unwrap();
    while world.run_tick() {
        let report = world.report();
        assert_eq!(report.tick, world.tick);
        assert_eq!(report.get("numAgents"), Some(world.agents.len() as f64));
        for field in &report.fields {
            assert!(field.value.is_finite(), "{} = {}", field.name, field.value);
        }
    }
}
