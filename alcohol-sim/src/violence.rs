//! Violence in two phases.
//!
//! Phase A scores every agent's homicide, victimization and perpetration
//! risk and draws who is a potential victim or perpetrator this tick.
//! Phase B walks potential perpetrators in random order; each takes the
//! first open potential victim found in its Moore neighborhood.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::agents::{Agent, Population};
use crate::calibration::{Calibration, HoodCovariates};
use crate::drinking::Blend;
use crate::geography::{Grid, Neighborhood};
use crate::prob::{bernoulli, logistic};
use crate::types::{AgentId, DrinkingStatus, HoodId};

// === PHASE A ===

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskProfile {
    pub p_homicide: f64,
    pub p_victim: f64,
    pub p_perp: f64,
}

impl RiskProfile {
    pub fn overall(&self) -> f64 {
        self.p_homicide.max(self.p_victim).max(self.p_perp)
    }
}

/// Individual term `i` and neighborhood term `n` combined as
/// `(1 - β - α)·i + α·n` after burn-in, `(1 - β)·i` before.
fn combine(blend: Blend, burn_in_done: bool, individual: f64, hood: impl FnOnce() -> f64) -> f64 {
    if burn_in_done {
        (1.0 - blend.beta - blend.alpha) * individual + blend.alpha * hood()
    } else {
        (1.0 - blend.beta) * individual
    }
}

pub fn risk_profile(
    calibration: &Calibration,
    blend: Blend,
    burn_in_done: bool,
    agent: &Agent,
    hood: &HoodCovariates,
) -> RiskProfile {
    let x = agent.covariates();

    let m = &calibration.homicide;
    let mut i_hom = logistic(m.individual.predict(&x));
    i_hom *= if agent.violence.prior_victim || agent.violence.prior_perp {
        m.history_multiplier
    } else {
        m.no_history_multiplier
    };
    i_hom *= if agent.drinking == DrinkingStatus::Heavy {
        m.heavy_multiplier
    } else {
        m.non_heavy_multiplier
    };
    let p_homicide = combine(blend, burn_in_done, i_hom, || {
        m.hood_link.apply(m.hood.predict(hood))
    });

    let v = &calibration.victimization;
    let p_victim = combine(blend, burn_in_done, logistic(v.individual.predict(&x)), || {
        logistic(v.hood.predict(hood))
    });

    let p = &calibration.perpetration;
    let p_perp = combine(blend, burn_in_done, logistic(p.individual.predict(&x)), || {
        logistic(p.hood.predict(hood))
    });

    RiskProfile {
        p_homicide,
        p_victim,
        p_perp,
    }
}

/// Store the risk on the agent and draw the potential flags in the order
/// homicide, victim, perpetrator.
pub fn draw_potentials<R: Rng>(rng: &mut R, agent: &mut Agent, risk: &RiskProfile) {
    let v = &mut agent.violence;
    v.p_homicide = risk.p_homicide;
    v.p_victim = risk.p_victim;
    v.p_perp = risk.p_perp;
    v.p_violence = risk.overall();
    v.potential_homicide = bernoulli(rng, risk.p_homicide);
    v.potential_victim = bernoulli(rng, risk.p_victim);
    v.potential_perp = bernoulli(rng, risk.p_perp);
}

/// Mark the agent's cell if it may be victimized this tick.
pub fn flag_cell(grid: &mut Grid, agent: &Agent) {
    if agent.violence.potential_homicide || agent.violence.potential_victim {
        if let Some(cell) = grid.get_mut(agent.x, agent.y) {
            cell.potential_victim = Some(agent.id);
        }
    }
}

// === PHASE B ===

/// One confirmed perpetrator–victim pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incident {
    pub perp: AgentId,
    pub victim: AgentId,
    pub hood: Option<HoodId>,
    pub homicide: bool,
    /// Either party is a heavy drinker
    pub alcohol: bool,
    /// Chebyshev distance between the two
    pub distance: u32,
}

/// Match potential perpetrators to potential victims.
///
/// At most one victim per perpetrator and one perpetrator per cell; a
/// perpetrator with no open cell in range does nothing.
pub fn resolve_incidents<R: Rng>(
    rng: &mut R,
    agents: &mut Population,
    grid: &mut Grid,
    hoods: &mut [Neighborhood],
    look_distance: u32,
) -> Vec<Incident> {
    let mut perps: Vec<AgentId> = agents
        .iter()
        .filter(|a| a.violence.potential_perp)
        .map(|a| a.id)
        .collect();
    perps.shuffle(rng);

    let mut incidents = Vec::new();
    for perp_id in perps {
        let Some(perp) = agents.get(perp_id) else { continue };
        let (px, py) = (perp.x, perp.y);
        let perp_heavy = perp.drinking == DrinkingStatus::Heavy;

        let found = grid.moore(px, py, look_distance).find_map(|(x, y)| {
            grid.get(x, y)
                .filter(|c| c.is_open_target())
                .and_then(|c| c.potential_victim)
                .filter(|v| *v != perp_id)
                .map(|v| (x, y, v))
        });
        let Some((vx, vy, victim_id)) = found else { continue };

        let Some(victim) = agents.get_mut(victim_id) else { continue };
        let homicide = victim.violence.potential_homicide;
        let alcohol = perp_heavy || victim.drinking == DrinkingStatus::Heavy;
        if homicide {
            victim.violence.homicide = true;
            victim.violence.alcohol_homicide = alcohol;
        } else {
            victim.violence.victim = true;
            victim.violence.alcohol_violence = alcohol;
        }
        victim.violence.prior_victim = true;
        let victim_hood = victim.hood;

        if let Some(perp) = agents.get_mut(perp_id) {
            perp.violence.perp = true;
            perp.violence.prior_perp = true;
        }
        if let Some(cell) = grid.get_mut(vx, vy) {
            cell.confirmed_victim = true;
        }
        if let Some(hood) = victim_hood.and_then(|h| hoods.get_mut(h.index())) {
            hood.violent_events += 1;
        }

        incidents.push(Incident {
            perp: perp_id,
            victim: victim_id,
            hood: victim_hood,
            homicide,
            alcohol,
            distance: px.abs_diff(vx).max(py.abs_diff(vy)),
        });
    }
    incidents
}
