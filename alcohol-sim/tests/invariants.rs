use std::collections::{HashMap, HashSet};

use alcohol_sim::aggregates::{RecomputeScope, recompute};
use alcohol_sim::geography::{CensusTable, block_layout};
use alcohol_sim::{AgentId, Calibration, DrinkingStatus, RunConfig, World};

fn config(num_agents: usize, num_hoods: usize, seed: u64) -> RunConfig {
    RunConfig {
        num_agents,
        world_width: 60,
        world_height: 60,
        num_hoods,
        burn_in: 2,
        stop_tick: 40,
        outlets_per_hood: 2,
        seed,
        ..Default::default()
    }
}

/// Calibration with a flat, high death rate.
fn deadly_calibration() -> Calibration {
    let mut calibration = Calibration::default();
    calibration.mortality.by_age_band = [0.2; 6];
    calibration
}

/// Every agent sits in exactly its own neighborhood, inside its rectangle,
/// and every member is a live agent.
fn assert_membership(world: &World) {
    let mut seen: HashSet<AgentId> = HashSet::new();
    for hood in &world.hoods {
        for id in &hood.members {
            assert!(seen.insert(*id), "agent {id:?} listed in two neighborhoods");
            let agent = world
                .get_agent(*id)
                .unwrap_or_else(|| panic!("hood {:?} lists dead agent {id:?}", hood.id));
            assert_eq!(agent.hood, Some(hood.id));
            assert!(hood.rect.contains(agent.x, agent.y));
        }
    }
    assert_eq!(seen.len(), world.agents.len());
}

#[test]
fn invariant_population_constant_with_recycling() {
    let config = RunConfig {
        agent_recycle: true,
        ..config(800, 4, 11)
    };
    let mut world = World::with_calibration(config, deadly_calibration()).unwrap();

    let mut deaths = 0;
    while world.run_tick() {
        assert_eq!(world.agents.len(), 800);
        deaths += world.agents.iter().filter(|a| a.died).count();
        assert_membership(&world);
    }
    assert!(deaths > 0, "mortality never fired");
    assert!(world.agents.iter().any(|a| a.do_not_count));
}

#[test]
fn invariant_population_shrinks_without_recycling() {
    let config = RunConfig {
        agent_recycle: false,
        stop_tick: 15,
        ..config(800, 4, 12)
    };
    let mut world = World::with_calibration(config, deadly_calibration()).unwrap();

    let mut last = world.agents.len();
    while world.run_tick() {
        assert!(world.agents.len() <= last);
        last = world.agents.len();
        assert_membership(&world);

        // No cell still points at a removed agent
        for x in 0..world.grid.width() {
            for y in 0..world.grid.height() {
                if let Some(id) = world.grid.get(x, y).and_then(|c| c.resident) {
                    assert!(world.agents.contains(id), "cell ({x}, {y}) holds removed {id:?}");
                }
            }
        }
    }
    assert!(world.agents.len() < 800);
    assert!(world.agents.iter().all(|a| !a.do_not_count));
}

#[test]
fn invariant_drinking_transitions_stay_adjacent() {
    let mut world = World::new(config(1500, 4, 13)).unwrap();

    let mut before: HashMap<AgentId, DrinkingStatus> =
        world.agents.iter().map(|a| (a.id, a.drinking)).collect();
    for _ in 0..20 {
        world.run_tick();
        for agent in world.agents.iter().filter(|a| !a.do_not_count) {
            let from = before[&agent.id];
            assert_eq!(agent.last_drinking, from);
            let jump = matches!(
                (from, agent.drinking),
                (DrinkingStatus::NonDrinker, DrinkingStatus::Heavy)
                    | (DrinkingStatus::Heavy, DrinkingStatus::NonDrinker)
            );
            assert!(!jump, "agent {:?} jumped {from:?} -> {:?}", agent.id, agent.drinking);

            let p = agent.drink_probs;
            assert!((p.non + p.light + p.heavy - 1.0).abs() < 1e-9);
            if !agent.drinking.is_drinker() {
                assert!(!agent.beverages.has_any());
            }
            if agent.drinking == DrinkingStatus::Heavy {
                assert!(agent.ever_heavy);
            }
        }
        before = world.agents.iter().map(|a| (a.id, a.drinking)).collect();
    }
}

#[test]
fn invariant_victims_are_exclusive() {
    let config = RunConfig {
        look_distance: 5,
        ..config(3000, 4, 14)
    };
    let mut world = World::new(config).unwrap();

    let mut total = 0;
    for _ in 0..15 {
        world.run_tick();

        let perps: HashSet<AgentId> = world.incidents.iter().map(|i| i.perp).collect();
        let victims: HashSet<AgentId> = world.incidents.iter().map(|i| i.victim).collect();
        assert_eq!(perps.len(), world.incidents.len(), "perpetrator matched twice");
        assert_eq!(victims.len(), world.incidents.len(), "victim matched twice");
        total += world.incidents.len();

        let flagged_perps = world.agents.iter().filter(|a| a.violence.perp).count();
        let flagged_victims = world.agents.iter().filter(|a| a.violence.victimized()).count();
        assert_eq!(flagged_perps, world.incidents.len());
        assert_eq!(flagged_victims, world.incidents.len());

        for agent in world.agents.iter() {
            let v = &agent.violence;
            assert!(!(v.victim && v.homicide), "agent {:?} is victim and homicide", agent.id);
            if v.perp {
                assert!(v.potential_perp);
                assert!(v.prior_perp);
            }
            if v.victimized() {
                assert!(v.prior_victim);
            }
        }
        for incident in &world.incidents {
            assert!(incident.distance <= 5);
            let victim = world.get_agent(incident.victim).unwrap();
            assert_eq!(victim.violence.homicide, incident.homicide);
            assert_eq!(incident.hood, victim.hood);
        }
    }
    assert!(total > 0, "no incidents in 15 ticks");
}

#[test]
fn invariant_aggregates_are_pure() {
    let mut world = World::new(config(1000, 5, 15)).unwrap();
    for _ in 0..6 {
        world.run_tick();
    }
    let before = world.hood_rows();
    let thresholds = world.calibration().income_thresholds.clone();
    recompute(
        &mut world.hoods,
        &world.agents,
        RecomputeScope::END_OF_TICK.with_income(true),
        &thresholds,
    );
    recompute(
        &mut world.hoods,
        &world.agents,
        RecomputeScope::END_OF_TICK.with_income(true),
        &thresholds,
    );
    assert_eq!(world.hood_rows(), before);
}

#[test]
fn invariant_empty_neighborhood_reads_sentinel() {
    let config = RunConfig {
        burn_in: 10,
        stop_tick: 5,
        ..config(600, 3, 16)
    };
    let rects = block_layout(3, 60, 60).unwrap();
    let mut census = CensusTable::uniform(3);
    for record in census.records.iter_mut() {
        record.population_share = Some(1.0);
    }
    census.records[2].population_share = Some(0.0);

    let mut world = World::with_layout(config, Calibration::default(), rects, census).unwrap();
    while world.run_tick() {
        let empty = &world.hoods[2];
        assert_eq!(empty.residents(), 0);
        assert_eq!(empty.mean_income.current, -1.0);
        assert_eq!(empty.violence_rate.current, -1.0);
        assert_eq!(empty.pct_heavy, -1.0);
        assert_eq!(empty.mean_age, -1.0);
        assert!(!empty.high_income && !empty.high_violence);

        assert!(world.hoods[0].residents() > 0);
        assert!(world.hoods[0].mean_income.current > 0.0);
    }
}

#[test]
fn invariant_resize_ignored_after_start() {
    let mut world = World::new(config(300, 3, 17)).unwrap();
    world.run_tick();
    world.set_num_agents(50).unwrap();
    assert_eq!(world.agents.len(), 300);
    assert_eq!(world.num_agents(), 50);
    assert!(world.run_tick());
    assert_eq!(world.agents.len(), 300);
}
