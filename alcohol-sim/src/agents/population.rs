use std::collections::BTreeMap;

use rand::Rng;

use crate::agents::agent::Agent;
use crate::agents::demographics::DemographicProfile;
use crate::config::FriendTarget;
use crate::types::{AgentId, DrinkingStatus, Education, Gender, Race};

/// Master agent store, iterated in id order.
///
/// Subgroups (by race, gender, education, baseline drinking) are filtered
/// views over this store rather than separately maintained lists.
#[derive(Debug, Clone, Default)]
pub struct Population {
    agents: BTreeMap<AgentId, Agent>,
    next_agent_id: u32,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a new agent and return its id.
    pub fn spawn<R: Rng>(
        &mut self,
        rng: &mut R,
        profile: &DemographicProfile,
        friend_target: &FriendTarget,
    ) -> AgentId {
        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id += 1;

        let demographics = profile.sample(rng);
        let target = friend_target.sample(rng);
        self.agents.insert(id, Agent::new(id, demographics, target));
        id
    }

    pub fn insert(&mut self, agent: Agent) {
        self.next_agent_id = self.next_agent_id.max(agent.id.0 + 1);
        self.agents.insert(agent.id, agent);
    }

    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Snapshot of ids in iteration order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    // === Derived views ===

    pub fn by_race(&self, race: Race) -> impl Iterator<Item = &Agent> {
        self.iter().filter(move |a| a.race == race)
    }

    pub fn by_gender(&self, gender: Gender) -> impl Iterator<Item = &Agent> {
        self.iter().filter(move |a| a.gender == gender)
    }

    pub fn by_education(&self, education: Education) -> impl Iterator<Item = &Agent> {
        self.iter().filter(move |a| a.education == education)
    }

    pub fn by_baseline_drinking(&self, status: DrinkingStatus) -> impl Iterator<Item = &Agent> {
        self.iter().filter(move |a| a.baseline_drinking == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_ids_monotonic_after_removal() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let profile = DemographicProfile::default();
        let target = FriendTarget::default();
        let mut pop = Population::new();

        let a = pop.spawn(&mut rng, &profile, &target);
        let b = pop.spawn(&mut rng, &profile, &target);
        pop.remove(b);
        let c = pop.spawn(&mut rng, &profile, &target);

        assert_eq!(a, AgentId::new(0));
        assert_eq!(c, AgentId::new(2));
        assert_eq!(pop.ids(), vec![a, c]);
    }

    #[test]
    fn test_views_partition_population() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let profile = DemographicProfile::default();
        let target = FriendTarget::default();
        let mut pop = Population::new();
        for _ in 0..300 {
            pop.spawn(&mut rng, &profile, &target);
        }

        let by_race: usize = Race::ALL.iter().map(|r| pop.by_race(*r).count()).sum();
        let by_gender =
            pop.by_gender(Gender::Male).count() + pop.by_gender(Gender::Female).count();
        let by_education: usize = Education::ALL
            .iter()
            .map(|e| pop.by_education(*e).count())
            .sum();
        assert_eq!(by_race, 300);
        assert_eq!(by_gender, 300);
        assert_eq!(by_education, 300);
        // Everyone starts as a non-drinker until baseline assignment
        assert_eq!(pop.by_baseline_drinking(DrinkingStatus::NonDrinker).count(), 300);
    }
}
