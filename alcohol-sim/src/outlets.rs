//! Alcohol outlets: per-neighborhood bars and stores that drinkers are
//! affiliated with.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::agents::{Agent, Population};
use crate::geography::Neighborhood;
use crate::mobility::random_cell;
use crate::types::{DrinkingStatus, HoodId, OutletId};

#[derive(Debug, Clone, PartialEq)]
pub struct Outlet {
    pub id: OutletId,
    pub hood: HoodId,
    pub x: u32,
    pub y: u32,
    pub open: bool,
    pub closes_early: bool,
    pub patrons: u32,
    /// Shares among affiliated drinkers; -1 without patrons
    pub pct_light: f64,
    pub pct_heavy: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Outlets {
    outlets: Vec<Outlet>,
}

impl Outlets {
    /// Place `per_hood` outlets at random cells of every neighborhood.
    pub fn create<R: Rng>(rng: &mut R, hoods: &mut [Neighborhood], per_hood: u32) -> Self {
        let mut outlets = Vec::new();
        for hood in hoods.iter_mut() {
            for _ in 0..per_hood {
                let id = OutletId::new(outlets.len() as u32);
                let (x, y) = random_cell(rng, &hood.rect);
                outlets.push(Outlet {
                    id,
                    hood: hood.id,
                    x,
                    y,
                    open: true,
                    closes_early: false,
                    patrons: 0,
                    pct_light: -1.0,
                    pct_heavy: -1.0,
                });
                hood.outlets.push(id);
            }
        }
        Self { outlets }
    }

    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    pub fn get(&self, id: OutletId) -> Option<&Outlet> {
        self.outlets.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outlet> {
        self.outlets.iter()
    }

    pub fn num_open(&self) -> usize {
        self.outlets.iter().filter(|o| o.open).count()
    }

    /// Light-drinker share at the agent's outlet, if affiliated.
    pub fn light_share(&self, agent: &Agent) -> Option<f64> {
        agent
            .outlet
            .and_then(|id| self.get(id))
            .filter(|o| o.patrons > 0)
            .map(|o| o.pct_light)
    }

    pub fn closes_early(&self, agent: &Agent) -> bool {
        agent
            .outlet
            .and_then(|id| self.get(id))
            .is_some_and(|o| o.open && o.closes_early)
    }

    /// Keep drinkers affiliated with an open outlet in their own
    /// neighborhood; non-drinkers have none.
    pub fn affiliate<R: Rng>(&self, rng: &mut R, agent: &mut Agent, hood: &Neighborhood) {
        if agent.drinking == DrinkingStatus::NonDrinker {
            agent.outlet = None;
            return;
        }
        let still_valid = agent
            .outlet
            .and_then(|id| self.get(id))
            .is_some_and(|o| o.open && o.hood == hood.id);
        if still_valid {
            return;
        }
        let open: Vec<OutletId> = hood
            .outlets
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some_and(|o| o.open))
            .collect();
        agent.outlet = if open.is_empty() {
            None
        } else {
            Some(open[rng.random_range(0..open.len())])
        };
    }

    /// Recount patrons and their drinking shares.
    pub fn recompute_shares(&mut self, agents: &Population) {
        let mut counts = vec![[0u32; 3]; self.outlets.len()];
        for agent in agents.iter() {
            if let Some(slot) = agent.outlet.and_then(|id| counts.get_mut(id.index())) {
                slot[agent.drinking.code() as usize - 1] += 1;
            }
        }
        for (outlet, [non, light, heavy]) in self.outlets.iter_mut().zip(counts) {
            outlet.patrons = non + light + heavy;
            if outlet.patrons == 0 {
                outlet.pct_light = -1.0;
                outlet.pct_heavy = -1.0;
            } else {
                outlet.pct_light = light as f64 / outlet.patrons as f64;
                outlet.pct_heavy = heavy as f64 / outlet.patrons as f64;
            }
        }
    }

    /// Flag the top quarter of neighborhoods by open outlets per cell.
    pub fn mark_high_density(&self, hoods: &mut [Neighborhood]) {
        let mut density: Vec<(usize, f64)> = hoods
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let open = h
                    .outlets
                    .iter()
                    .filter(|id| self.get(**id).is_some_and(|o| o.open))
                    .count();
                (i, open as f64 / h.num_cells.max(1) as f64)
            })
            .collect();
        density.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let top = hoods.len().div_ceil(4);
        for hood in hoods.iter_mut() {
            hood.high_outlet_density = false;
        }
        for &(i, d) in density.iter().take(top) {
            if d > 0.0 {
                hoods[i].high_outlet_density = true;
            }
        }
    }

    /// Open outlets eligible for an intervention, in id order.
    fn eligible(&self, hoods: &[Neighborhood], high_density_only: bool) -> Vec<OutletId> {
        self.outlets
            .iter()
            .filter(|o| o.open)
            .filter(|o| {
                !high_density_only
                    || hoods
                        .get(o.hood.index())
                        .is_some_and(|h| h.high_outlet_density)
            })
            .map(|o| o.id)
            .collect()
    }

    fn pick_share<R: Rng>(rng: &mut R, mut ids: Vec<OutletId>, share: f64) -> Vec<OutletId> {
        ids.shuffle(rng);
        let n = (share.clamp(0.0, 1.0) * ids.len() as f64).round() as usize;
        ids.truncate(n);
        ids
    }

    /// Move closing time earlier at a `share` of eligible outlets.
    /// Returns how many outlets changed.
    pub fn apply_early_closing<R: Rng>(
        &mut self,
        rng: &mut R,
        hoods: &[Neighborhood],
        share: f64,
        high_density_only: bool,
    ) -> usize {
        let chosen = Self::pick_share(rng, self.eligible(hoods, high_density_only), share);
        for id in &chosen {
            self.outlets[id.index()].closes_early = true;
        }
        chosen.len()
    }

    /// Close a `share` of eligible outlets. Patrons lose their affiliation
    /// and are re-affiliated on the next pass.
    pub fn apply_reduction<R: Rng>(
        &mut self,
        rng: &mut R,
        hoods: &mut [Neighborhood],
        agents: &mut Population,
        share: f64,
        high_density_only: bool,
    ) -> usize {
        let chosen = Self::pick_share(rng, self.eligible(hoods, high_density_only), share);
        for id in &chosen {
            self.outlets[id.index()].open = false;
        }
        for agent in agents.iter_mut() {
            if agent.outlet.is_some_and(|id| chosen.contains(&id)) {
                agent.outlet = None;
            }
        }
        self.mark_high_density(hoods);
        chosen.len()
    }
}
