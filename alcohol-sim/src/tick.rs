// Annual tick: fixed phase order over the world state

use crate::aggregates::{
    CityAverages, RecomputeScope, SENTINEL, recompute, update_high_income, update_high_violence,
};
use crate::agents::BeveragePrefs;
use crate::drinking::{draw_beverages, transition};
use crate::intervention::select_outreach;
use crate::mobility::{choose_destination, destination_weights, moving_probability, random_cell};
use crate::mortality::{MortalityOutcome, check_mortality, death_probability};
use crate::network::{count_friend_drinking, count_friend_violence};
use crate::prob::bernoulli;
use crate::types::{AgentId, DrinkingStatus, HoodId};
use crate::violence::{draw_potentials, flag_cell, resolve_incidents, risk_profile};
use crate::world::{World, assign_drinking, hood_covariates};

#[cfg(feature = "instrument")]
fn hood_code(hood: Option<HoodId>) -> i64 {
    hood.map_or(-1, |h| h.0 as i64)
}

impl World {
    /// Advance the simulation by one year.
    ///
    /// Returns false, leaving the world untouched, once the stop tick has
    /// been reached.
    pub fn run_tick(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.tick += 1;
        let burn_in_done = self.burn_in_done();

        self.grid.reset_flags();
        for hood in self.hoods.iter_mut() {
            hood.reset_tick_counters();
            hood.violence_rate.roll();
            hood.mean_income.roll();
        }

        // 1. Aging, mortality and residential moves, agent by agent
        for id in self.agents.ids() {
            self.run_lifecycle(id, burn_in_done);
        }

        // 2. Post-migration aggregates; violence stays one tick stale
        recompute(
            &mut self.hoods,
            &self.agents,
            RecomputeScope::POST_MIGRATION.with_income(burn_in_done),
            &self.calibration.income_thresholds,
        );
        self.city = CityAverages::compute(&self.hoods);
        update_high_income(&mut self.hoods, &self.city);
        self.mark_income_history();

        // 3. Interventions
        self.apply_interventions();

        // 4. Drinking transitions
        if burn_in_done {
            self.run_drinking();
        }
        count_friend_drinking(&mut self.agents);

        // 5. Violence: risk and potentials, then spatial matching
        self.run_violence_risk(burn_in_done);
        let look_distance = self.look_distance();
        self.incidents = resolve_incidents(
            &mut self.rng,
            &mut self.agents,
            &mut self.grid,
            &mut self.hoods,
            look_distance,
        );
        count_friend_violence(&mut self.agents);

        // 6. End-of-tick aggregates
        recompute(
            &mut self.hoods,
            &self.agents,
            RecomputeScope::END_OF_TICK.with_income(burn_in_done),
            &self.calibration.income_thresholds,
        );
        self.city = CityAverages::compute(&self.hoods);
        update_high_violence(&mut self.hoods, &self.city);
        update_high_income(&mut self.hoods, &self.city);

        #[cfg(feature = "instrument")]
        self.emit_tick_events();

        true
    }

    // === Lifecycle & Mobility ===

    fn run_lifecycle(&mut self, id: AgentId, burn_in_done: bool) {
        let died = match self.agents.get_mut(id) {
            Some(agent) => {
                if burn_in_done {
                    agent.age += 1;
                }
                agent.died
            }
            None => return,
        };

        if died {
            if !self.agent_recycle() {
                self.remove_agent(id);
                return;
            }
            self.recycle_agent(id);
        } else if let Some(agent) = self.agents.get_mut(id) {
            agent.reset_transients();
        }

        if self.allow_death() {
            self.check_death(id, burn_in_done);
        }
        if burn_in_done {
            self.relocate(id);
        }
    }

    /// Reset a deceased agent in place as a new 18-year-old with a freshly
    /// drawn drinking status.
    fn recycle_agent(&mut self, id: AgentId) {
        let alpha = self.alpha();
        let Some(agent) = self.agents.get_mut(id) else {
            return;
        };
        agent.recycle();
        let hood = hood_covariates(&self.hoods, agent);
        assign_drinking(&mut self.rng, &self.calibration, alpha, agent, &hood);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "mobility",
            tick = self.tick,
            agent_id = id.0,
            event = "recycled",
            from_hood = hood_code(agent.hood),
            to_hood = hood_code(agent.hood),
        );
    }

    /// Drop a deceased agent from the population, its neighborhood and its
    /// cell. Friends keep the dangling id; counts skip it.
    fn remove_agent(&mut self, id: AgentId) {
        let Some(agent) = self.agents.remove(id) else {
            return;
        };
        if let Some(hood) = agent.hood.and_then(|h| self.hoods.get_mut(h.index())) {
            hood.remove_member(id);
        }
        self.grid.vacate(agent.x, agent.y, id);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "mobility",
            tick = self.tick,
            agent_id = id.0,
            event = "removed",
            from_hood = hood_code(agent.hood),
            to_hood = -1i64,
        );
    }

    /// Death probability is kept current every tick; the draw only happens
    /// after burn-in.
    fn check_death(&mut self, id: AgentId, burn_in_done: bool) {
        let Some(agent) = self.agents.get_mut(id) else {
            return;
        };
        let p_death = death_probability(&self.calibration.mortality, agent.age);
        agent.p_death = p_death;
        if !burn_in_done {
            return;
        }
        if check_mortality(&mut self.rng, p_death) == MortalityOutcome::Dies {
            agent.died = true;

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "mobility",
                tick = self.tick,
                agent_id = id.0,
                event = "died",
                from_hood = hood_code(agent.hood),
                to_hood = hood_code(agent.hood),
            );
        }
    }

    fn relocate(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get_mut(id) else {
            return;
        };
        let current = agent.hood.map(|h| h.index());
        let hood_violence = current
            .and_then(|i| self.hoods.get(i))
            .map_or(SENTINEL, |h| h.violence_rate.current);
        let calibration = &self.calibration;
        agent.p_move = moving_probability(&calibration.mobility, agent, hood_violence);

        if !bernoulli(&mut self.rng, agent.p_move) {
            agent.residence_duration += 1;
            return;
        }
        agent.moved = true;
        agent.residence_duration = 0;

        let weights = destination_weights(
            &calibration.mobility,
            &calibration.income_thresholds,
            agent,
            &self.hoods,
            current,
        );
        let Some(dest) = choose_destination(&mut self.rng, &weights, current) else {
            tracing::debug!(
                tick = self.tick,
                agent_id = id.0,
                "destination draw matched no neighborhood; staying put"
            );
            return;
        };
        let (x, y) = random_cell(&mut self.rng, &self.hoods[dest].rect);

        if let Some(old) = current.and_then(|i| self.hoods.get_mut(i)) {
            old.remove_member(id);
        }
        self.grid.vacate(agent.x, agent.y, id);
        self.hoods[dest].add_member(id);
        self.grid.place(x, y, id);
        let from = agent.hood;
        agent.x = x;
        agent.y = y;
        agent.hood = Some(HoodId::new(dest as u32));

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "mobility",
            tick = self.tick,
            agent_id = id.0,
            event = "moved",
            from_hood = hood_code(from),
            to_hood = dest as i64,
        );
        #[cfg(not(feature = "instrument"))]
        let _ = from;
    }

    /// Movers remember having lived in a high or low income neighborhood.
    fn mark_income_history(&mut self) {
        for agent in self.agents.iter_mut().filter(|a| a.moved) {
            let high = agent
                .hood
                .and_then(|h| self.hoods.get(h.index()))
                .is_some_and(|h| h.high_income);
            if high {
                agent.ever_high_income_hood = true;
            } else {
                agent.ever_low_income_hood = true;
            }
        }
    }

    // === Interventions ===

    fn apply_interventions(&mut self) {
        let tick = self.tick;
        let plan = self.plan;
        if plan.starts_at(tick) && !self.outlets.is_empty() {
            let high_density_only = plan.kind.high_density_only();
            if plan.kind.is_early_closing() {
                let changed = self.outlets.apply_early_closing(
                    &mut self.rng,
                    &self.hoods,
                    plan.change,
                    high_density_only,
                );
                tracing::debug!(tick, outlets = changed, "outlets moved to early closing");
            }
            if plan.kind.is_outlet_reduction() {
                let closed = self.outlets.apply_reduction(
                    &mut self.rng,
                    &mut self.hoods,
                    &mut self.agents,
                    plan.change,
                    high_density_only,
                );
                tracing::debug!(tick, outlets = closed, "outlets closed");
            }
        }
        select_outreach(&plan, tick, &mut self.hoods);
    }

    // === Drinking ===

    fn run_drinking(&mut self) {
        let tick = self.tick;
        let blend = self.blend();
        let plan = self.plan;
        let calibration = &self.calibration;

        for agent in self.agents.iter_mut() {
            let Some(hood) = agent.hood.and_then(|h| self.hoods.get(h.index())) else {
                continue;
            };
            let policy = plan.effect_for(tick, agent, &self.outlets, &calibration.taxation);
            let t = transition(
                &mut self.rng,
                calibration,
                blend,
                agent,
                &hood.covariates(),
                self.outlets.light_share(agent),
                &policy,
            );
            agent.drinking = t.to;
            agent.drink_probs = t.probs;
            if t.to == DrinkingStatus::Heavy {
                agent.ever_heavy = true;
            }
            agent.beverages = if t.to.is_drinker() {
                draw_beverages(&mut self.rng, &calibration.beverages, &agent.covariates())
            } else {
                BeveragePrefs::default()
            };

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "drink_transition",
                tick = tick,
                agent_id = agent.id.0,
                from = t.from.label(),
                to = t.to.label(),
                p_non = t.probs.non,
                p_light = t.probs.light,
                p_heavy = t.probs.heavy,
            );
        }
        self.affiliate_outlets();
    }

    // === Violence ===

    fn run_violence_risk(&mut self, burn_in_done: bool) {
        let blend = self.blend();
        let calibration = &self.calibration;
        for agent in self.agents.iter_mut() {
            let hood = hood_covariates(&self.hoods, agent);
            let risk = risk_profile(calibration, blend, burn_in_done, agent, &hood);
            draw_potentials(&mut self.rng, agent, &risk);
            flag_cell(&mut self.grid, agent);
        }
    }

    // === Instrumentation ===

    #[cfg(feature = "instrument")]
    fn emit_tick_events(&self) {
        use crate::aggregates::compute_stats;

        let tick = self.tick;
        let city = compute_stats(self.agents.iter());
        let n = self.agents.len().max(1) as f64;
        tracing::info!(
            target: "city",
            tick = tick,
            num_agents = self.agents.len(),
            mean_age = city.mean_age,
            pct_heavy = city.pct_heavy,
            violence_rate = city.violence_rate,
            homicide_rate = city.homicide_rate,
            perpetration_rate = city.perp_rate,
            pct_moved = self.agents.iter().filter(|a| a.moved).count() as f64 / n,
            pct_died = self.agents.iter().filter(|a| a.died).count() as f64 / n,
        );

        for hood in &self.hoods {
            tracing::info!(
                target: "hood",
                tick = tick,
                hood_id = hood.id.0,
                residents = hood.residents(),
                mean_income = hood.mean_income.current,
                violence_rate = hood.violence_rate.current,
                prev_violence_rate = hood.violence_rate.previous,
                pct_light = hood.pct_light,
                pct_heavy = hood.pct_heavy,
                pct_black = hood.pct_black,
                pct_hisp = hood.pct_hisp,
                pct_stable = hood.pct_stable,
                violent_events = hood.violent_events,
            );
        }

        for incident in &self.incidents {
            tracing::info!(
                target: "incident",
                tick = tick,
                perp_id = incident.perp.0,
                victim_id = incident.victim.0,
                hood_id = hood_code(incident.hood),
                homicide = incident.homicide,
                alcohol = incident.alcohol,
                distance = incident.distance,
            );
        }
    }
}
