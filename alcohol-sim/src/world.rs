// World state for the alcohol and violence simulation

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::aggregates::{
    CityAverages, RecomputeScope, recompute, update_high_income, update_high_violence,
};
use crate::agents::{Agent, BeveragePrefs, IncomeHoodClass, Population};
use crate::calibration::{Calibration, HoodCovariates};
use crate::config::{Intervention, RunConfig};
use crate::drinking::{Blend, assign_baseline, draw_beverages};
use crate::error::{SimError, SimResult};
use crate::geography::{
    CensusTable, Grid, HoodRect, NYC_HEIGHT, NYC_HOODS, NYC_WIDTH, Neighborhood, layout_for,
    validate_layout,
};
use crate::intervention::InterventionPlan;
use crate::mobility::random_cell;
use crate::network::{NetworkSummary, build_network, count_friend_drinking};
use crate::outlets::Outlets;
use crate::prob::sample_weighted;
use crate::report::{AgentStepRow, CityReport, HoodStepRow, agent_row, city_report, hood_row, percent};
use crate::types::{AgentId, DrinkingStatus, HoodId};
use crate::violence::Incident;

/// Complete state of one simulation run
#[derive(Debug, Clone)]
pub struct World {
    /// Ticks completed; the first tick run is tick 1
    pub tick: u32,

    pub(crate) config: RunConfig,
    pub(crate) calibration: Calibration,

    // Agents
    pub agents: Population,

    // Geography
    pub hoods: Vec<Neighborhood>,
    pub grid: Grid,
    pub outlets: Outlets,

    pub plan: InterventionPlan,
    pub city: CityAverages,
    pub network: NetworkSummary,
    /// Incidents confirmed on the latest tick
    pub incidents: Vec<Incident>,

    pub(crate) rng: StdRng,
}

/// Census districts matching the layout [`layout_for`] picks.
fn census_for(config: &RunConfig) -> CensusTable {
    if config.num_hoods == NYC_HOODS
        && config.world_width == NYC_WIDTH
        && config.world_height == NYC_HEIGHT
    {
        CensusTable::nyc()
    } else {
        CensusTable::uniform(config.num_hoods)
    }
}

/// Neighborhood-level predictors for the agent's home, zeros if unplaced.
pub(crate) fn hood_covariates(hoods: &[Neighborhood], agent: &Agent) -> HoodCovariates {
    agent
        .hood
        .and_then(|h| hoods.get(h.index()))
        .map(|h| h.covariates())
        .unwrap_or_default()
}

/// Draw a baseline drinking status and beverage flags. Used at setup and
/// when a deceased agent is recycled.
pub(crate) fn assign_drinking(
    rng: &mut StdRng,
    calibration: &Calibration,
    alpha: f64,
    agent: &mut Agent,
    hood: &HoodCovariates,
) {
    let (status, probs) = assign_baseline(rng, calibration, alpha, agent, hood);
    agent.drinking = status;
    agent.last_drinking = status;
    agent.baseline_drinking = status;
    agent.drink_probs = probs;
    agent.ever_heavy = status == DrinkingStatus::Heavy;
    agent.beverages = if status.is_drinker() {
        draw_beverages(rng, &calibration.beverages, &agent.covariates())
    } else {
        BeveragePrefs::default()
    };
}

impl World {
    /// Build a world with the shipped calibration.
    pub fn new(config: RunConfig) -> SimResult<Self> {
        Self::with_calibration(config, Calibration::default())
    }

    pub fn with_calibration(config: RunConfig, calibration: Calibration) -> SimResult<Self> {
        config.validate()?;
        let rects = layout_for(config.num_hoods, config.world_width, config.world_height)?;
        let census = census_for(&config);
        Self::with_layout(config, calibration, rects, census)
    }

    /// Build a world on an explicit neighborhood layout and census table.
    ///
    /// Runs the full setup: population, neighborhoods and cells, placement,
    /// baseline aggregates, baseline drinking, outlets, then the social
    /// network.
    pub fn with_layout(
        config: RunConfig,
        calibration: Calibration,
        rects: Vec<HoodRect>,
        census: CensusTable,
    ) -> SimResult<Self> {
        config.validate()?;
        calibration.validate()?;
        validate_layout(
            &rects,
            config.num_hoods,
            config.world_width,
            config.world_height,
        )?;
        census.check_len(config.num_hoods)?;

        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut agents = Population::new();
        for _ in 0..config.num_agents {
            agents.spawn(&mut rng, &config.demographics, &config.friend_target);
        }

        let mut grid = Grid::new(config.world_width, config.world_height);
        let mut hoods = Vec::with_capacity(rects.len());
        for (i, (rect, record)) in rects.iter().zip(&census.records).enumerate() {
            let id = HoodId::new(i as u32);
            let mut hood = Neighborhood::new(id, *rect, *record);
            hood.num_cells = rect.cells().filter(|&(x, y)| grid.create_cell(x, y, id)).count();
            hoods.push(hood);
        }

        let plan = InterventionPlan::from_config(&config);
        let mut world = Self {
            tick: 0,
            config,
            calibration,
            agents,
            hoods,
            grid,
            outlets: Outlets::default(),
            plan,
            city: CityAverages::compute(&[]),
            network: NetworkSummary::default(),
            incidents: Vec::new(),
            rng,
        };
        world.place_agents()?;
        world.setup_baseline();
        world.setup_drinking();
        world.setup_outlets();

        world.network = build_network(&mut world.rng, &mut world.agents);
        count_friend_drinking(&mut world.agents);

        if world.plan.kind != Intervention::None && !world.plan.kind.has_engine_effect() {
            tracing::warn!(
                intervention = ?world.plan.kind,
                "intervention has no behavioral effect; target neighborhoods are reported only"
            );
        }
        tracing::debug!(
            agents = world.agents.len(),
            hoods = world.hoods.len(),
            cells = world.grid.num_cells(),
            outlets = world.outlets.len(),
            "world initialized"
        );
        Ok(world)
    }

    // === Setup ===

    /// Inverse-CDF draw over census population weights, then a uniform
    /// cell inside the chosen rectangle.
    fn place_agents(&mut self) -> SimResult<()> {
        let weights: Vec<f64> = self.hoods.iter().map(|h| h.placement_weight()).collect();
        for id in self.agents.ids() {
            let Some(h) = sample_weighted(&mut self.rng, &weights) else {
                return Err(SimError::Config(
                    "no neighborhood has a positive placement weight".into(),
                ));
            };
            let hood = &mut self.hoods[h];
            let (x, y) = random_cell(&mut self.rng, &hood.rect);
            hood.add_member(id);
            self.grid.place(x, y, id);
            if let Some(agent) = self.agents.get_mut(id) {
                agent.x = x;
                agent.y = y;
                agent.hood = Some(hood.id);
            }
        }
        Ok(())
    }

    fn setup_baseline(&mut self) {
        recompute(
            &mut self.hoods,
            &self.agents,
            RecomputeScope::BASELINE,
            &self.calibration.income_thresholds,
        );
        self.city = CityAverages::compute(&self.hoods);
        update_high_income(&mut self.hoods, &self.city);
        update_high_violence(&mut self.hoods, &self.city);

        for agent in self.agents.iter_mut() {
            let high = agent
                .hood
                .and_then(|h| self.hoods.get(h.index()))
                .is_some_and(|h| h.high_income);
            agent.base_income_hood = Some(if high {
                IncomeHoodClass::High
            } else {
                IncomeHoodClass::Low
            });
            agent.ever_high_income_hood = high;
            agent.ever_low_income_hood = !high;
        }
    }

    fn setup_drinking(&mut self) {
        let alpha = self.config.alpha;
        for agent in self.agents.iter_mut() {
            let hood = hood_covariates(&self.hoods, agent);
            assign_drinking(&mut self.rng, &self.calibration, alpha, agent, &hood);
        }
        recompute(
            &mut self.hoods,
            &self.agents,
            RecomputeScope::DRINKING,
            &self.calibration.income_thresholds,
        );
    }

    fn setup_outlets(&mut self) {
        self.outlets = Outlets::create(&mut self.rng, &mut self.hoods, self.config.outlets_per_hood);
        if self.outlets.is_empty() {
            return;
        }
        self.outlets.mark_high_density(&mut self.hoods);
        self.affiliate_outlets();
    }

    /// Re-affiliate every agent and refresh outlet patron shares.
    pub(crate) fn affiliate_outlets(&mut self) {
        if self.outlets.is_empty() {
            return;
        }
        for agent in self.agents.iter_mut() {
            if let Some(hood) = agent.hood.and_then(|h| self.hoods.get(h.index())) {
                self.outlets.affiliate(&mut self.rng, agent, hood);
            }
        }
        self.outlets.recompute_shares(&self.agents);
    }

    // === Run State ===

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Swap the coefficient table; takes effect on the next tick.
    pub fn set_calibration(&mut self, calibration: Calibration) -> SimResult<()> {
        calibration.validate()?;
        tracing::debug!(version = %calibration.version, "calibration replaced");
        self.calibration = calibration;
        Ok(())
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn has_started(&self) -> bool {
        self.tick > 0
    }

    pub fn is_finished(&self) -> bool {
        self.tick >= self.config.stop_tick
    }

    pub fn burn_in_done(&self) -> bool {
        self.tick > self.config.burn_in
    }

    pub fn blend(&self) -> Blend {
        Blend {
            alpha: self.config.alpha,
            beta: self.config.beta,
        }
    }

    pub fn get_agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_hood(&self, id: HoodId) -> Option<&Neighborhood> {
        self.hoods.get(id.index())
    }

    // === Parameters ===

    pub fn num_agents(&self) -> usize {
        self.config.num_agents
    }

    /// Before the first tick the world is rebuilt at the new size. Once the
    /// run has started the value is recorded but the population is not
    /// resized.
    pub fn set_num_agents(&mut self, num_agents: usize) -> SimResult<()> {
        if self.has_started() {
            tracing::warn!(
                tick = self.tick,
                requested = num_agents,
                current = self.agents.len(),
                "population cannot be resized after the run has started"
            );
            self.config.num_agents = num_agents;
            return Ok(());
        }
        let config = RunConfig {
            num_agents,
            ..self.config.clone()
        };
        *self = Self::with_calibration(config, self.calibration.clone())?;
        Ok(())
    }

    pub fn burn_in(&self) -> u32 {
        self.config.burn_in
    }

    pub fn set_burn_in(&mut self, burn_in: u32) {
        self.config.burn_in = burn_in;
        self.plan = InterventionPlan::from_config(&self.config);
    }

    pub fn stop_tick(&self) -> u32 {
        self.config.stop_tick
    }

    pub fn set_stop_tick(&mut self, stop_tick: u32) {
        self.config.stop_tick = stop_tick;
    }

    pub fn alpha(&self) -> f64 {
        self.config.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> SimResult<()> {
        self.update_config(RunConfig {
            alpha,
            ..self.config.clone()
        })
    }

    pub fn beta(&self) -> f64 {
        self.config.beta
    }

    pub fn set_beta(&mut self, beta: f64) -> SimResult<()> {
        self.update_config(RunConfig {
            beta,
            ..self.config.clone()
        })
    }

    pub fn allow_death(&self) -> bool {
        self.config.allow_death
    }

    pub fn set_allow_death(&mut self, allow_death: bool) {
        self.config.allow_death = allow_death;
    }

    pub fn agent_recycle(&self) -> bool {
        self.config.agent_recycle
    }

    pub fn set_agent_recycle(&mut self, agent_recycle: bool) {
        self.config.agent_recycle = agent_recycle;
    }

    pub fn look_distance(&self) -> u32 {
        self.config.look_distance
    }

    pub fn set_look_distance(&mut self, look_distance: u32) {
        self.config.look_distance = look_distance;
    }

    pub fn intervention(&self) -> Intervention {
        self.config.intervention
    }

    pub fn set_intervention(&mut self, intervention: Intervention) {
        self.config.intervention = intervention;
        self.plan = InterventionPlan::from_config(&self.config);
    }

    pub fn intervention_change(&self) -> f64 {
        self.config.intervention_change
    }

    pub fn set_intervention_change(&mut self, change: f64) -> SimResult<()> {
        self.update_config(RunConfig {
            intervention_change: change,
            ..self.config.clone()
        })
    }

    pub fn intervention_duration(&self) -> u32 {
        self.config.intervention_duration
    }

    pub fn set_intervention_duration(&mut self, duration: u32) {
        self.config.intervention_duration = duration;
        self.plan = InterventionPlan::from_config(&self.config);
    }

    pub fn num_outreach(&self) -> u32 {
        self.config.num_outreach
    }

    pub fn set_num_outreach(&mut self, num_outreach: u32) {
        self.config.num_outreach = num_outreach;
        self.plan = InterventionPlan::from_config(&self.config);
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    fn update_config(&mut self, config: RunConfig) -> SimResult<()> {
        config.validate()?;
        self.config = config;
        self.plan = InterventionPlan::from_config(&self.config);
        Ok(())
    }

    // === Reporting ===

    pub fn report(&self) -> CityReport {
        city_report(self.tick, &self.agents, &self.hoods, &self.city)
    }

    pub fn agent_rows(&self) -> Vec<AgentStepRow> {
        self.agents
            .iter()
            .map(|a| agent_row(self.tick, a, &self.outlets))
            .collect()
    }

    pub fn hood_rows(&self) -> Vec<HoodStepRow> {
        self.hoods.iter().map(|h| hood_row(self.tick, h)).collect()
    }

    pub fn pct_heavy_drinkers(&self) -> f64 {
        percent(&self.agents, |a| a.drinking == DrinkingStatus::Heavy)
    }

    pub fn pct_victims(&self) -> f64 {
        percent(&self.agents, |a| a.violence.victimized())
    }

    pub fn pct_ever_victims(&self) -> f64 {
        percent(&self.agents, |a| a.violence.prior_victim)
    }

    pub fn pct_perpetrators(&self) -> f64 {
        percent(&self.agents, |a| a.violence.perp)
    }

    pub fn pct_ever_perpetrators(&self) -> f64 {
        percent(&self.agents, |a| a.violence.prior_perp)
    }

    pub fn pct_died(&self) -> f64 {
        percent(&self.agents, |a| a.died)
    }

    pub fn pct_moved(&self) -> f64 {
        percent(&self.agents, |a| a.moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RunConfig {
        RunConfig {
            num_agents: 500,
            world_width: 60,
            world_height: 40,
            num_hoods: 6,
            outlets_per_hood: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_setup_places_every_agent() {
        let world = World::new(small_config()).unwrap();
        assert_eq!(world.agents.len(), 500);
        assert_eq!(world.hoods.len(), 6);
        let members: usize = world.hoods.iter().map(|h| h.residents()).sum();
        assert_eq!(members, 500);
        for agent in world.agents.iter() {
            let hood = world.get_hood(agent.hood.unwrap()).unwrap();
            assert!(hood.members.contains(&agent.id));
            assert!(hood.rect.contains(agent.x, agent.y));
            assert_eq!(agent.drinking, agent.baseline_drinking);
            assert!(agent.base_income_hood.is_some());
            if !agent.drinking.is_drinker() {
                assert!(!agent.beverages.has_any());
                assert!(agent.outlet.is_none());
            }
        }
        assert_eq!(world.outlets.len(), 12);
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let config = RunConfig {
            num_hoods: 0,
            ..small_config()
        };
        assert!(World::new(config).is_err());

        let rects = vec![HoodRect::new(0, 30, 0, 40)];
        let config = RunConfig {
            num_hoods: 2,
            ..small_config()
        };
        let err = World::with_layout(
            config,
            Calibration::default(),
            rects,
            CensusTable::uniform(2),
        )
        .unwrap_err();
        assert!(matches!(err, SimError::LayoutMismatch { layout: 1, expected: 2 }));
    }

    #[test]
    fn test_resize_before_start_rebuilds() {
        let mut world = World::new(small_config()).unwrap();
        world.set_num_agents(200).unwrap();
        assert_eq!(world.agents.len(), 200);
        assert_eq!(world.num_agents(), 200);
    }

    #[test]
    fn test_setters_validate() {
        let mut world = World::new(small_config()).unwrap();
        assert!(world.set_alpha(0.95).is_err());
        assert_eq!(world.alpha(), 0.10);
        world.set_beta(0.2).unwrap();
        assert_eq!(world.blend().beta, 0.2);

        world.set_burn_in(3);
        assert_eq!(world.plan.start_tick, 4);
    }
}
