//! Policy interventions: activation window and per-agent effects.
//!
//! Only taxation, early closing and outlet reduction change behavior.
//! Policing and violence-interrupter scenarios select their target
//! neighborhoods each tick so they show up in reports, but carry no
//! behavioral effect.

use crate::agents::Agent;
use crate::calibration::TaxationModel;
use crate::config::{Intervention, InterventionTarget, RunConfig};
use crate::drinking::PolicyEffect;
use crate::geography::Neighborhood;
use crate::outlets::Outlets;
use crate::types::Beverage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterventionPlan {
    pub kind: Intervention,
    pub target: InterventionTarget,
    pub change: f64,
    /// First tick the intervention is in force
    pub start_tick: u32,
    /// 0 = until the end of the run
    pub duration: u32,
    pub num_outreach: u32,
}

impl InterventionPlan {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            kind: config.intervention,
            target: config.intervention_target,
            change: config.intervention_change,
            start_tick: config.burn_in + 1,
            duration: config.intervention_duration,
            num_outreach: config.num_outreach,
        }
    }

    pub fn is_active(&self, tick: u32) -> bool {
        self.kind != Intervention::None
            && tick >= self.start_tick
            && (self.duration == 0 || tick < self.start_tick + self.duration)
    }

    /// Outlet changes are applied once, on the first active tick.
    pub fn starts_at(&self, tick: u32) -> bool {
        self.kind != Intervention::None && tick == self.start_tick
    }

    /// Taxation passes through to prices one tick after the plan starts.
    pub fn taxes_at(&self, tick: u32) -> bool {
        self.kind.is_taxation() && self.is_active(tick) && tick > self.start_tick
    }

    /// Effects reaching `agent` this tick.
    ///
    /// The early-closing discount reaches every light drinker; the
    /// high-density variants only narrow which outlets close.
    pub fn effect_for(
        &self,
        tick: u32,
        agent: &Agent,
        outlets: &Outlets,
        taxation: &TaxationModel,
    ) -> PolicyEffect {
        if !self.is_active(tick) {
            return PolicyEffect::default();
        }
        let mut effect = PolicyEffect::default();
        if self.taxes_at(tick) {
            effect.tax = tax_effect(taxation, self.change, self.target, agent);
        }
        if self.kind.is_early_closing() {
            effect.early_closing = true;
            effect.outlet_closes_early = outlets.closes_early(agent);
        }
        effect
    }
}

/// Proportional change in transition risk from an alcohol tax of size
/// `change`.
///
/// Universal taxes reach everyone, at a reduced rate for agents with a
/// beverage preference. Targeted (beer) taxes reach beer drinkers only, at
/// a reduced rate for those who prefer beer. The result is scaled by the
/// income band multiplier.
pub fn tax_effect(
    model: &TaxationModel,
    change: f64,
    target: InterventionTarget,
    agent: &Agent,
) -> f64 {
    let base = change * model.elasticity;
    let prefs = &agent.beverages;
    let raw = match target {
        InterventionTarget::Universal => {
            if prefs.preferred.is_some() {
                base * model.preference_factor
            } else {
                base
            }
        }
        InterventionTarget::Targeted => {
            if !prefs.drinks(Beverage::Beer) {
                0.0
            } else if prefs.prefers(Beverage::Beer) {
                base * model.preference_factor
            } else {
                base
            }
        }
    };
    (raw * model.income_multipliers[agent.income_band().index()]).clamp(0.0, 1.0)
}

/// Flag policing and outreach neighborhoods: the `num_outreach` most
/// violent populated neighborhoods. Returns how many were selected.
pub fn select_outreach(plan: &InterventionPlan, tick: u32, hoods: &mut [Neighborhood]) -> usize {
    let policing = matches!(
        plan.kind,
        Intervention::Policing | Intervention::PolicingAndInterrupters
    );
    let interrupters = matches!(
        plan.kind,
        Intervention::ViolenceInterrupters | Intervention::PolicingAndInterrupters
    );
    if !plan.is_active(tick) || !(policing || interrupters) {
        return 0;
    }

    let mut ranked: Vec<(usize, f64)> = hoods
        .iter()
        .enumerate()
        .filter(|(_, h)| h.residents() > 0)
        .map(|(i, h)| (i, h.violence_rate.current))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let selected: Vec<usize> = ranked
        .into_iter()
        .take(plan.num_outreach as usize)
        .map(|(i, _)| i)
        .collect();
    for &i in &selected {
        hoods[i].policed = policing;
        hoods[i].targeted = interrupters;
    }
    selected.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{BeveragePrefs, Demographics};
    use crate::geography::{CensusTable, HoodRect};
    use crate::types::{AgentId, Education, Gender, HoodId, IncomeCategory, Race};

    fn make_agent(income: u8, prefs: BeveragePrefs) -> Agent {
        let d = Demographics {
            age: 33,
            gender: Gender::Male,
            race: Race::White,
            education: Education::HighSchool,
            income: IncomeCategory::new(income),
        };
        let mut agent = Agent::new(AgentId::new(0), d, 5);
        agent.beverages = prefs;
        agent
    }

    fn beer_lover() -> BeveragePrefs {
        BeveragePrefs {
            any: [true, false, false],
            prob: [0.6, 0.1, 0.1],
            preferred: Some(Beverage::Beer),
        }
    }

    fn plan(kind: Intervention, duration: u32) -> InterventionPlan {
        let config = RunConfig {
            intervention: kind,
            intervention_change: 0.2,
            intervention_duration: duration,
            burn_in: 10,
            num_outreach: 2,
            ..Default::default()
        };
        InterventionPlan::from_config(&config)
    }

    #[test]
    fn test_activation_window() {
        let p = plan(Intervention::Taxation, 5);
        assert!(!p.is_active(10));
        assert!(p.is_active(11));
        assert!(p.is_active(15));
        assert!(!p.is_active(16));
        assert!(p.starts_at(11));

        let open_ended = plan(Intervention::Taxation, 0);
        assert!(open_ended.is_active(500));
        assert!(!plan(Intervention::None, 0).is_active(20));
    }

    #[test]
    fn test_universal_tax_by_income_and_preference() {
        let model = TaxationModel::default();
        let poor = make_agent(2, BeveragePrefs::default());
        let rich = make_agent(16, BeveragePrefs::default());
        let poor_pref = make_agent(2, beer_lover());

        let u = InterventionTarget::Universal;
        assert!((tax_effect(&model, 0.2, u, &poor) - 0.2 * 0.53 * 1.6).abs() < 1e-12);
        assert!((tax_effect(&model, 0.2, u, &rich) - 0.2 * 0.53 * 0.27).abs() < 1e-12);
        assert!((tax_effect(&model, 0.2, u, &poor_pref) - 0.2 * 0.53 * 0.5 * 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_targeted_tax_reaches_beer_drinkers_only() {
        let model = TaxationModel::default();
        let t = InterventionTarget::Targeted;
        let non_beer = make_agent(6, BeveragePrefs::default());
        assert_eq!(tax_effect(&model, 0.2, t, &non_beer), 0.0);

        let mut casual = beer_lover();
        casual.preferred = None;
        let casual = make_agent(6, casual);
        let lover = make_agent(6, beer_lover());
        let full = tax_effect(&model, 0.2, t, &casual);
        let half = tax_effect(&model, 0.2, t, &lover);
        assert!((full - 0.2 * 0.53 * 1.08).abs() < 1e-12);
        assert!((half - full * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tax_starts_one_tick_after_plan() {
        let p = plan(Intervention::Taxation, 0);
        let agent = make_agent(2, BeveragePrefs::default());
        let model = TaxationModel::default();
        let outlets = Outlets::default();

        assert!(p.is_active(11));
        assert!(!p.taxes_at(11));
        assert_eq!(p.effect_for(11, &agent, &outlets, &model).tax, 0.0);

        assert!(p.taxes_at(12));
        let tax = p.effect_for(12, &agent, &outlets, &model).tax;
        assert!((tax - 0.2 * 0.53 * 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_early_closing_discount_reaches_every_light_drinker() {
        let mut agent = make_agent(6, BeveragePrefs::default());
        agent.drinking = crate::types::DrinkingStatus::Light;
        let model = TaxationModel::default();
        let outlets = Outlets::default();

        for kind in [
            Intervention::EarlyClosing,
            Intervention::HighDensityEarlyClosing,
        ] {
            let p = plan(kind, 0);
            assert_eq!(p.effect_for(10, &agent, &outlets, &model), PolicyEffect::default());

            let effect = p.effect_for(12, &agent, &outlets, &model);
            assert!(effect.early_closing, "{kind:?} skipped the escalation discount");
            // Unaffiliated agents have no outlet to close early
            assert!(!effect.outlet_closes_early);
            assert_eq!(effect.tax, 0.0);
        }
    }

    #[test]
    fn test_outreach_picks_most_violent() {
        let census = CensusTable::uniform(4);
        let mut hoods: Vec<Neighborhood> = (0..4u32)
            .map(|i| {
                let mut hood = Neighborhood::new(
                    HoodId::new(i),
                    HoodRect::new(0, 5, 0, 5),
                    census.records[i as usize],
                );
                hood.add_member(AgentId::new(i));
                hood.violence_rate.set(i as f64 * 0.01);
                hood
            })
            .collect();

        let p = plan(Intervention::ViolenceInterrupters, 0);
        assert_eq!(select_outreach(&p, 5, &mut hoods), 0);
        assert_eq!(select_outreach(&p, 12, &mut hoods), 2);
        let targeted: Vec<bool> = hoods.iter().map(|h| h.targeted).collect();
        assert_eq!(targeted, vec![false, false, true, true]);
        assert!(hoods.iter().all(|h| !h.policed));
    }
}
