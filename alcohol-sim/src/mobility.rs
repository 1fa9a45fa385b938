//! Residential mobility: whether an agent moves this year and where to.

use rand::Rng;

use crate::agents::Agent;
use crate::calibration::{IncomeThresholds, MobilityModel};
use crate::geography::{HoodRect, IncomeTier, Neighborhood};
use crate::prob::{cumulative_boundaries, logistic, pick_interval};

/// Annual probability of moving, from residence duration, income and the
/// violence rate of the agent's neighborhood as of last tick.
pub fn moving_probability(model: &MobilityModel, agent: &Agent, hood_violence: f64) -> f64 {
    let z = model.individual.predict(&agent.covariates())
        + model.duration[agent.residence_band().index()]
        + model.hood_violence * hood_violence.max(0.0);
    logistic(z)
}

/// Unnormalized attraction of every neighborhood for `agent`.
///
/// Census population weight times `exp` of the income-match, violence and
/// stability terms. The agent's current neighborhood gets zero weight.
pub fn destination_weights(
    model: &MobilityModel,
    thresholds: &IncomeThresholds,
    agent: &Agent,
    hoods: &[Neighborhood],
    current: Option<usize>,
) -> Vec<f64> {
    let own_tier = IncomeTier::classify(agent.income.midpoint(), thresholds);
    let d = &model.destination;
    hoods
        .iter()
        .enumerate()
        .map(|(i, hood)| {
            if Some(i) == current {
                return 0.0;
            }
            let same_tier = if hood.income_tier == Some(own_tier) { 1.0 } else { 0.0 };
            let z = d.same_income_tier * same_tier
                + d.violence * hood.violence_rate.current.max(0.0)
                + d.stability * hood.pct_stable.max(0.0);
            hood.placement_weight() * z.exp()
        })
        .collect()
}

/// Inverse-CDF draw over `weights`, never returning `current`.
///
/// `None` when the draw lands on no open interval; the agent stays put.
pub fn choose_destination<R: Rng>(
    rng: &mut R,
    weights: &[f64],
    current: Option<usize>,
) -> Option<usize> {
    let bounds = cumulative_boundaries(weights);
    let u: f64 = rng.random();
    pick_interval(&bounds, u, current)
}

/// Uniformly random coordinates inside `rect`.
pub fn random_cell<R: Rng>(rng: &mut R, rect: &HoodRect) -> (u32, u32) {
    (
        rng.random_range(rect.min_x..rect.max_x),
        rng.random_range(rect.min_y..rect.max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Demographics;
    use crate::geography::CensusTable;
    use crate::types::{AgentId, Education, Gender, HoodId, IncomeCategory, Race};
    use rand::SeedableRng;

    fn make_agent(duration: u32) -> Agent {
        let d = Demographics {
            age: 30,
            gender: Gender::Female,
            race: Race::White,
            education: Education::MoreThanHighSchool,
            income: IncomeCategory::new(12),
        };
        let mut agent = Agent::new(AgentId::new(0), d, 5);
        agent.residence_duration = duration;
        agent
    }

    fn make_hoods(n: u32) -> Vec<Neighborhood> {
        let census = CensusTable::uniform(n as usize);
        (0..n)
            .map(|i| {
                let rect = HoodRect::new(i * 10, i * 10 + 10, 0, 10);
                let mut hood = Neighborhood::new(HoodId::new(i), rect, census.records[i as usize]);
                hood.violence_rate.set(0.0);
                hood.pct_stable = 0.5;
                hood
            })
            .collect()
    }

    #[test]
    fn test_long_residents_move_less() {
        let model = MobilityModel::default();
        let newcomer = moving_probability(&model, &make_agent(0), 0.0);
        let settled = moving_probability(&model, &make_agent(15), 0.0);
        assert!(newcomer > settled, "{} <= {}", newcomer, settled);
    }

    #[test]
    fn test_violence_pushes_people_out() {
        let model = MobilityModel::default();
        let agent = make_agent(3);
        let calm = moving_probability(&model, &agent, 0.0);
        let violent = moving_probability(&model, &agent, 0.3);
        assert!(violent > calm);
        // Sentinel values do not lower the probability
        assert_eq!(moving_probability(&model, &agent, -1.0), calm);
    }

    #[test]
    fn test_destination_never_current() {
        let model = MobilityModel::default();
        let thresholds = IncomeThresholds::default();
        let hoods = make_hoods(4);
        let agent = make_agent(0);
        let weights = destination_weights(&model, &thresholds, &agent, &hoods, Some(2));
        assert_eq!(weights[2], 0.0);
        assert!(weights.iter().enumerate().all(|(i, w)| i == 2 || *w > 0.0));

        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..500 {
            if let Some(j) = choose_destination(&mut rng, &weights, Some(2)) {
                assert_ne!(j, 2);
            }
        }
    }

    #[test]
    fn test_violent_destinations_less_attractive() {
        let model = MobilityModel::default();
        let thresholds = IncomeThresholds::default();
        let mut hoods = make_hoods(3);
        hoods[1].violence_rate.set(0.4);
        let weights = destination_weights(&model, &thresholds, &make_agent(0), &hoods, None);
        assert!(weights[1] < weights[0]);
    }

    #[test]
    fn test_no_positive_weight_keeps_agent() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert_eq!(choose_destination(&mut rng, &[0.0, 0.0], Some(0)), None);
    }

    #[test]
    fn test_random_cell_inside_rect() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let rect = HoodRect::new(5, 8, 10, 12);
        for _ in 0..200 {
            let (x, y) = random_cell(&mut rng, &rect);
            assert!(rect.contains(x, y));
        }
    }
}
