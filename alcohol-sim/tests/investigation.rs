#![cfg(feature = "instrument")]

use polars::prelude::*;

use alcohol_sim::instrument::ScopedRecorder;
use alcohol_sim::{Intervention, InterventionTarget, RunConfig, World};

const TICKS: u32 = 60;
const BURN_IN: u32 = 10;

struct Scenario {
    name: &'static str,
    intervention: Intervention,
    target: InterventionTarget,
    change: f64,
}

fn create_world(scenario: &Scenario) -> World {
    let config = RunConfig {
        num_agents: 20_000,
        world_width: 200,
        world_height: 200,
        num_hoods: 16,
        burn_in: BURN_IN,
        stop_tick: TICKS,
        outlets_per_hood: 4,
        intervention: scenario.intervention,
        intervention_target: scenario.target,
        intervention_change: scenario.change,
        num_outreach: 3,
        seed: 7,
        ..Default::default()
    };
    World::new(config).unwrap()
}

fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        0.0
    } else {
        v.iter().sum::<f64>() / v.len() as f64
    }
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    if values.len() <= n {
        values
    } else {
        &values[values.len() - n..]
    }
}

fn col_f64(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

#[test]
#[ignore = "investigation workflow; run manually"]
fn investigate_policy_scenarios_with_dataframes() {
    let scenarios = [
        Scenario {
            name: "no_intervention",
            intervention: Intervention::None,
            target: InterventionTarget::Universal,
            change: 0.0,
        },
        Scenario {
            name: "universal_tax_20pct",
            intervention: Intervention::Taxation,
            target: InterventionTarget::Universal,
            change: 0.2,
        },
        Scenario {
            name: "beer_tax_20pct",
            intervention: Intervention::Taxation,
            target: InterventionTarget::Targeted,
            change: 0.2,
        },
        Scenario {
            name: "early_closing_half",
            intervention: Intervention::EarlyClosing,
            target: InterventionTarget::Universal,
            change: 0.5,
        },
        Scenario {
            name: "outlet_reduction_half",
            intervention: Intervention::OutletReduction,
            target: InterventionTarget::Universal,
            change: 0.5,
        },
    ];

    println!("\n=== Policy Scenarios (Instrumented DataFrames) ===");
    println!(
        "{:>22} {:>9} {:>9} {:>10} {:>10} {:>9} {:>9}",
        "scenario", "heavy", "viol", "incidents", "alc_share", "hom", "moved"
    );

    for scenario in &scenarios {
        let mut world = create_world(scenario);

        let mut rec = ScopedRecorder::with_targets(
            "data/investigation",
            scenario.name,
            &["city", "hood", "incident"],
        );
        while world.run_tick() {}

        let dfs = rec.get();
        let city = dfs.get("city").expect("city dataframe");
        let incident = dfs.get("incident").expect("incident dataframe");
        let hood = dfs.get("hood").expect("hood dataframe");
        assert_eq!(city.height(), TICKS as usize);

        let heavy = col_f64(city, "pct_heavy");
        let violence = col_f64(city, "violence_rate");
        let moved = col_f64(city, "pct_moved");

        let by_tick = incident
            .clone()
            .lazy()
            .group_by([col("tick")])
            .agg([
                col("perp_id").count().alias("incidents"),
                col("alcohol")
                    .cast(DataType::Float64)
                    .mean()
                    .alias("alc_share"),
                col("homicide").cast(DataType::Int32).sum().alias("homicides"),
            ])
            .filter(col("tick").gt(lit(BURN_IN as u64)))
            .sort(["tick"], Default::default())
            .collect()
            .unwrap();
        let incidents = col_f64(&by_tick, "incidents");
        let alc_share = col_f64(&by_tick, "alc_share");
        let homicides = col_f64(&by_tick, "homicides");

        println!(
            "{:>22} {:>8.3}% {:>8.4} {:>10.1} {:>10.3} {:>9.2} {:>8.3}%",
            scenario.name,
            mean(tail(&heavy, 20)) * 100.0,
            mean(tail(&violence, 20)),
            mean(tail(&incidents, 20)),
            mean(tail(&alc_share, 20)),
            mean(tail(&homicides, 20)),
            mean(tail(&moved, 20)) * 100.0,
        );

        // Concentration: how much violence the most violent fifth of
        // neighborhoods carries at the end of the run
        let last = hood
            .clone()
            .lazy()
            .filter(col("tick").eq(lit(TICKS as u64)))
            .sort(
                ["violent_events"],
                SortMultipleOptions::default().with_order_descending(true),
            )
            .collect()
            .unwrap();
        let events = col_f64(&last, "violent_events");
        let total: f64 = events.iter().sum();
        let top: f64 = events.iter().take(events.len().div_ceil(5)).sum();
        if total > 0.0 {
            println!(
                "{:>22} top-quintile hoods hold {:.1}% of violent events ({})",
                "",
                top / total * 100.0,
                rec.run_name()
            );
        }
    }
}

#[test]
#[ignore = "investigation workflow; run manually"]
fn investigate_heavy_drinking_by_neighborhood_income() {
    let scenario = Scenario {
        name: "hood_income_gradient",
        intervention: Intervention::None,
        target: InterventionTarget::Universal,
        change: 0.0,
    };
    let mut world = create_world(&scenario);

    let mut rec = ScopedRecorder::with_targets("data/investigation", scenario.name, &["hood"]);
    while world.run_tick() {}

    let dfs = rec.get();
    let hood = dfs.get("hood").expect("hood dataframe");

    let by_hood = hood
        .clone()
        .lazy()
        .filter(col("tick").gt(lit(BURN_IN as u64)))
        .group_by([col("hood_id")])
        .agg([
            col("mean_income").mean().alias("income"),
            col("pct_heavy").mean().alias("heavy"),
            col("violence_rate").mean().alias("violence"),
            col("residents").mean().alias("residents"),
        ])
        .sort(["income"], Default::default())
        .collect()
        .unwrap();

    println!("\n=== Heavy Drinking and Violence by Neighborhood Income ===");
    println!(
        "{:>8} {:>10} {:>9} {:>9} {:>10}",
        "hood", "income", "heavy", "viol", "residents"
    );
    let ids = col_f64(&by_hood, "hood_id");
    let income = col_f64(&by_hood, "income");
    let heavy = col_f64(&by_hood, "heavy");
    let violence = col_f64(&by_hood, "violence");
    let residents = col_f64(&by_hood, "residents");
    for i in 0..by_hood.height() {
        println!(
            "{:>8} {:>10.0} {:>8.3}% {:>9.4} {:>10.0}",
            ids[i],
            income[i],
            heavy[i] * 100.0,
            violence[i],
            residents[i]
        );
    }
    assert_eq!(by_hood.height(), 16);
}
