//! Drinking status: baseline assignment, beverage choice and the annual
//! non/light/heavy transition models.
//!
//! Each transition blends three terms:
//! `(1 - α - β) · individual + β · network + α · neighborhood`, where the
//! network term rescales the individual probability by friends' drinking
//! status with normally drawn per-friend coefficients.

use rand::Rng;

use crate::agents::{Agent, BeveragePrefs, DrinkProbs};
use crate::calibration::{BeverageModels, Calibration, Covariates, HoodCovariates};
use crate::prob::{bernoulli, logistic, multinomial};
use crate::types::{Beverage, DrinkingStatus};

/// Weights of the neighborhood (`alpha`) and network (`beta`) terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub alpha: f64,
    pub beta: f64,
}

impl Blend {
    pub fn mix(&self, individual: f64, network: f64, hood: f64) -> f64 {
        (1.0 - self.alpha - self.beta) * individual + self.beta * network + self.alpha * hood
    }
}

/// Intervention adjustments that reach one agent this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolicyEffect {
    /// Proportional taxation effect, 0 when not taxed
    pub tax: f64,
    /// Early closing lowers this light drinker's escalation risk
    pub early_closing: bool,
    /// The agent's own outlet closes early
    pub outlet_closes_early: bool,
}

/// Outcome of one transition evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: DrinkingStatus,
    pub to: DrinkingStatus,
    pub probs: DrinkProbs,
}

// === BASELINE ===

/// Cross-sectional probabilities, blending individual and neighborhood
/// multinomial models with weight `alpha`.
pub fn baseline_probs(
    calibration: &Calibration,
    alpha: f64,
    x: &Covariates,
    hood: &HoodCovariates,
) -> DrinkProbs {
    let m = &calibration.baseline_drinking;
    let (i_light, i_heavy) = multinomial(m.light.predict(x), m.heavy.predict(x));
    let (n_light, n_heavy) = multinomial(m.hood_light.predict(hood), m.hood_heavy.predict(hood));
    let light = (1.0 - alpha) * i_light + alpha * n_light;
    let heavy = (1.0 - alpha) * i_heavy + alpha * n_heavy;
    DrinkProbs {
        non: 1.0 - light - heavy,
        light,
        heavy,
    }
}

/// Draw a baseline status; thresholds run non, then light, then heavy.
pub fn assign_baseline<R: Rng>(
    rng: &mut R,
    calibration: &Calibration,
    alpha: f64,
    agent: &Agent,
    hood: &HoodCovariates,
) -> (DrinkingStatus, DrinkProbs) {
    let probs = baseline_probs(calibration, alpha, &agent.covariates(), hood);
    let roll: f64 = rng.random();
    let status = if roll < probs.non {
        DrinkingStatus::NonDrinker
    } else if roll < probs.non + probs.light {
        DrinkingStatus::Light
    } else {
        DrinkingStatus::Heavy
    };
    (status, probs)
}

// === BEVERAGES ===

/// Draw beer, wine and spirits flags in that order. The preferred beverage
/// is the most likely one among those drawn.
pub fn draw_beverages<R: Rng>(rng: &mut R, models: &BeverageModels, x: &Covariates) -> BeveragePrefs {
    let prob = [
        logistic(models.beer.predict(x)),
        logistic(models.wine.predict(x)),
        logistic(models.spirits.predict(x)),
    ];
    let mut any = [false; 3];
    for (flag, p) in any.iter_mut().zip(prob) {
        *flag = bernoulli(rng, p);
    }
    let preferred = Beverage::ALL
        .into_iter()
        .filter(|b| any[b.index()])
        .max_by(|a, b| prob[a.index()].total_cmp(&prob[b.index()]));
    BeveragePrefs {
        any,
        prob,
        preferred,
    }
}

// === TRANSITIONS ===

/// Evaluate and draw this year's transition from `agent.last_drinking`.
///
/// `outlet_light_share` is the light-drinker share at the agent's outlet, if
/// affiliated.
pub fn transition<R: Rng>(
    rng: &mut R,
    calibration: &Calibration,
    blend: Blend,
    agent: &Agent,
    hood: &HoodCovariates,
    outlet_light_share: Option<f64>,
    policy: &PolicyEffect,
) -> Transition {
    let from = agent.last_drinking;
    let x = agent.covariates();
    let friends = &agent.friend_counts;
    let (n_non, n_light, n_heavy) = (
        friends.non as f64,
        friends.light as f64,
        friends.heavy as f64,
    );

    let (to, probs) = match from {
        DrinkingStatus::NonDrinker => {
            let m = &calibration.from_non_drinker;
            let individual = logistic(m.individual.predict(&x));
            let abstainer = m.friend_abstainer.sample(rng);
            let light = m.friend_light.sample(rng);
            let network = (light * n_light - abstainer * n_non + 1.0) * individual;
            let neighborhood = logistic(m.hood.predict(hood));
            let p_light = blend.mix(individual, network, neighborhood);

            let to = if bernoulli(rng, p_light) {
                DrinkingStatus::Light
            } else {
                DrinkingStatus::NonDrinker
            };
            let probs = DrinkProbs {
                non: 1.0 - p_light,
                light: p_light,
                heavy: 0.0,
            };
            (to, probs)
        }
        DrinkingStatus::Light => {
            let m = &calibration.from_light;
            let (i_non, i_heavy) = multinomial(m.to_non.predict(&x), m.to_heavy.predict(&x));

            let quit_abstainer = m.quit_friend_abstainer.sample(rng);
            let quit_light = m.quit_friend_light.sample(rng);
            let quit_heavy = m.quit_friend_heavy.sample(rng);
            let net_non =
                (quit_abstainer * n_non - quit_light * n_light - quit_heavy * n_heavy + 1.0) * i_non;

            let escalate_abstainer = m.escalate_friend_abstainer.sample(rng);
            let escalate_heavy = m.escalate_friend_heavy.sample(rng);
            let net_heavy = (escalate_heavy * n_heavy - escalate_abstainer * n_non + 1.0) * i_heavy;

            let (h_non, h_heavy) =
                multinomial(m.hood_to_non.predict(hood), m.hood_to_heavy.predict(hood));

            let p_non = blend.mix(i_non, net_non, h_non);
            let mut p_heavy = blend.mix(i_heavy, net_heavy, h_heavy);
            if policy.tax > 0.0 {
                p_heavy -= p_heavy * policy.tax;
            }
            if policy.early_closing {
                let decrease = calibration.early_closing.sample(rng);
                p_heavy -= p_heavy * decrease;
            }
            let p_light = 1.0 - p_non - p_heavy;

            let roll: f64 = rng.random();
            let to = if roll < p_light {
                DrinkingStatus::Light
            } else if roll < p_light + p_non {
                DrinkingStatus::NonDrinker
            } else {
                DrinkingStatus::Heavy
            };
            let probs = DrinkProbs {
                non: p_non,
                light: p_light,
                heavy: p_heavy,
            };
            (to, probs)
        }
        DrinkingStatus::Heavy => {
            let m = &calibration.from_heavy;
            let individual = logistic(m.individual.predict(&x));
            let abstainer = m.friend_abstainer.sample(rng);
            let light = m.friend_light.sample(rng);
            let mut network = (light * n_light - abstainer * n_non + 1.0) * individual;
            if outlet_light_share.is_some_and(|share| share >= m.outlet_light_share) {
                network -= m.outlet_discount * network;
            }
            let neighborhood = logistic(m.hood.predict(hood));

            let mut p_light = blend.mix(individual, network, neighborhood);
            if policy.tax > 0.0 {
                p_light += p_light * policy.tax;
            }
            if policy.outlet_closes_early {
                let increase = calibration.early_closing.sample(rng);
                p_light += p_light * increase;
            }

            let to = if bernoulli(rng, p_light) {
                DrinkingStatus::Light
            } else {
                DrinkingStatus::Heavy
            };
            let probs = DrinkProbs {
                non: 0.0,
                light: p_light,
                heavy: 1.0 - p_light,
            };
            (to, probs)
        }
    };

    Transition { from, to, probs }
}
