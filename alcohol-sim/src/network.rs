//! One-time social network formation.
//!
//! Constrained random matching: each agent draws candidates from the pool
//! of agents still below their target and accepts the first that passes
//! the spatial and homophily filters. Each homophily filter is enforced only
//! when its own per-candidate draw activates it.

use std::collections::HashMap;

use rand::Rng;

use crate::agents::{Agent, Population};
use crate::prob::bernoulli;
use crate::types::AgentId;

/// Candidate draws per agent before giving up.
pub const MAX_ATTEMPTS: u32 = 10_000;

/// Share of attempts that only accept nearby candidates
pub const SPATIAL_SHARE: f64 = 0.25;
pub const SPATIAL_RADIUS: u32 = 100;

pub const MAX_AGE_GAP: u32 = 10;
pub const AGE_FILTER: f64 = 0.815;
pub const GENDER_FILTER: f64 = 0.005;
pub const RACE_FILTER: f64 = 0.99;
pub const EDUCATION_FILTER: f64 = 0.75;
pub const DRINKING_FILTER: f64 = 0.15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkSummary {
    pub agents: usize,
    pub edges: u64,
    /// Agents that reached their target
    pub saturated: usize,
}

impl NetworkSummary {
    pub fn saturation(&self) -> f64 {
        if self.agents == 0 {
            0.0
        } else {
            self.saturated as f64 / self.agents as f64
        }
    }
}

/// Agents still accepting friends, with O(1) removal.
struct Pool {
    ids: Vec<AgentId>,
    position: HashMap<AgentId, usize>,
}

impl Pool {
    fn new(ids: Vec<AgentId>) -> Self {
        let position = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self { ids, position }
    }

    fn remove(&mut self, id: AgentId) {
        let Some(i) = self.position.remove(&id) else {
            return;
        };
        self.ids.swap_remove(i);
        if let Some(moved) = self.ids.get(i) {
            self.position.insert(*moved, i);
        }
    }

    fn pick<R: Rng>(&self, rng: &mut R) -> Option<AgentId> {
        if self.ids.is_empty() {
            return None;
        }
        Some(self.ids[rng.random_range(0..self.ids.len())])
    }
}

fn near(a: &Agent, b: &Agent) -> bool {
    a.x.abs_diff(b.x) <= SPATIAL_RADIUS && a.y.abs_diff(b.y) <= SPATIAL_RADIUS
}

/// Whether `b` passes the homophily filters for `a`, drawing one activation
/// roll per filter in a fixed order.
fn passes_filters<R: Rng>(rng: &mut R, a: &Agent, b: &Agent) -> bool {
    let age_ok = !bernoulli(rng, AGE_FILTER) || a.age.abs_diff(b.age) <= MAX_AGE_GAP;
    let gender_ok = !bernoulli(rng, GENDER_FILTER) || a.gender == b.gender;
    let race_ok = !bernoulli(rng, RACE_FILTER) || a.race == b.race;
    let education_ok = !bernoulli(rng, EDUCATION_FILTER) || a.education == b.education;
    let drinking_ok = !bernoulli(rng, DRINKING_FILTER) || a.drinking == b.drinking;
    age_ok && gender_ok && race_ok && education_ok && drinking_ok
}

/// Build undirected ties over the whole population, in id order.
pub fn build_network<R: Rng>(rng: &mut R, agents: &mut Population) -> NetworkSummary {
    let ids = agents.ids();
    let open: Vec<AgentId> = ids
        .iter()
        .copied()
        .filter(|id| agents.get(*id).is_some_and(|a| !a.is_saturated()))
        .collect();
    let mut pool = Pool::new(open);
    let mut edges = 0u64;

    for &a_id in &ids {
        let mut attempts = 0;
        while attempts < MAX_ATTEMPTS {
            let Some(a) = agents.get(a_id) else { break };
            if a.is_saturated() {
                break;
            }
            attempts += 1;

            let spatial = bernoulli(rng, SPATIAL_SHARE);
            let Some(b_id) = pool.pick(rng) else { break };
            if b_id == a_id || a.has_friend(b_id) {
                continue;
            }
            let Some(b) = agents.get(b_id) else { continue };
            if b.is_saturated() || (spatial && !near(a, b)) {
                continue;
            }
            if !passes_filters(rng, a, b) {
                continue;
            }

            for (from, to) in [(a_id, b_id), (b_id, a_id)] {
                if let Some(agent) = agents.get_mut(from) {
                    agent.friends.push(to);
                    if agent.is_saturated() {
                        pool.remove(from);
                    }
                }
            }
            edges += 1;
        }
    }

    let summary = NetworkSummary {
        agents: agents.len(),
        edges,
        saturated: agents.iter().filter(|a| a.is_saturated()).count(),
    };
    tracing::debug!(
        agents = summary.agents,
        edges = summary.edges,
        saturated = summary.saturated,
        "social network built"
    );
    summary
}

// === FRIEND COUNTS ===

/// Refresh each agent's count of non, light and heavy drinking friends.
/// Ties to agents no longer in the population are skipped.
pub fn count_friend_drinking(agents: &mut Population) {
    let counts: Vec<(AgentId, [u32; 3])> = agents
        .iter()
        .map(|a| {
            let mut c = [0u32; 3];
            for friend in a.friends.iter().filter_map(|f| agents.get(*f)) {
                c[friend.drinking.code() as usize - 1] += 1;
            }
            (a.id, c)
        })
        .collect();
    for (id, [non, light, heavy]) in counts {
        if let Some(agent) = agents.get_mut(id) {
            agent.friend_counts.non = non;
            agent.friend_counts.light = light;
            agent.friend_counts.heavy = heavy;
        }
    }
}

/// Refresh each agent's count of friends who were non-fatal victims or
/// perpetrators this tick. Homicide victims are not counted.
pub fn count_friend_violence(agents: &mut Population) {
    let counts: Vec<(AgentId, u32, u32)> = agents
        .iter()
        .map(|a| {
            let friends = || a.friends.iter().filter_map(|f| agents.get(*f));
            let victims = friends().filter(|f| f.violence.victim).count() as u32;
            let perps = friends().filter(|f| f.violence.perp).count() as u32;
            (a.id, victims, perps)
        })
        .collect();
    for (id, victims, perps) in counts {
        if let Some(agent) = agents.get_mut(id) {
            agent.friend_counts.victims = victims;
            agent.friend_counts.perps = perps;
        }
    }
}
