use crate::agents::demographics::{Demographics, ENTRY_AGE};
use crate::calibration::Covariates;
use crate::types::{
    AgeBand, AgentId, Beverage, DrinkingStatus, Education, Gender, HoodId, IncomeBand,
    IncomeCategory, OutletId, Race, ResidenceBand,
};

// === DRINKING ===

/// Latest transition probabilities; they always describe the model that
/// produced `Agent::drinking`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrinkProbs {
    pub non: f64,
    pub light: f64,
    pub heavy: f64,
}

impl Default for DrinkProbs {
    fn default() -> Self {
        Self {
            non: 1.0,
            light: 0.0,
            heavy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeveragePrefs {
    pub any: [bool; 3],
    pub prob: [f64; 3],
    pub preferred: Option<Beverage>,
}

impl BeveragePrefs {
    pub fn drinks(&self, beverage: Beverage) -> bool {
        self.any[beverage.index()]
    }

    pub fn prefers(&self, beverage: Beverage) -> bool {
        self.preferred == Some(beverage)
    }

    pub fn has_any(&self) -> bool {
        self.any.iter().any(|b| *b)
    }
}

// === VIOLENCE ===

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViolenceState {
    /// Max of the three risks below
    pub p_violence: f64,
    pub p_homicide: f64,
    pub p_victim: f64,
    pub p_perp: f64,

    pub potential_homicide: bool,
    pub potential_victim: bool,
    pub potential_perp: bool,

    // Confirmed this tick
    pub homicide: bool,
    pub victim: bool,
    pub perp: bool,
    pub alcohol_homicide: bool,
    pub alcohol_violence: bool,

    // Previous tick
    pub last_victim: bool,
    pub last_perp: bool,

    // Ever, cleared only on recycling
    pub prior_victim: bool,
    pub prior_perp: bool,
}

impl ViolenceState {
    pub fn victimized(&self) -> bool {
        self.victim || self.homicide
    }
}

/// Drinking and violence status of the agent's friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FriendCounts {
    pub non: u32,
    pub light: u32,
    pub heavy: u32,
    pub victims: u32,
    pub perps: u32,
}

/// Income class of the agent's neighborhood at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeHoodClass {
    High,
    Low,
}

impl IncomeHoodClass {
    /// 1 = above city average, 2 = below
    pub fn code(self) -> u8 {
        match self {
            IncomeHoodClass::High => 1,
            IncomeHoodClass::Low => 2,
        }
    }
}

// === AGENT ===

/// One adult resident.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,

    // Demographics
    pub age: u32,
    pub gender: Gender,
    pub race: Race,
    pub education: Education,
    pub income: IncomeCategory,
    /// Income at creation
    pub base_income: IncomeCategory,

    // Location
    pub x: u32,
    pub y: u32,
    pub hood: Option<HoodId>,

    // Drinking
    pub drinking: DrinkingStatus,
    pub last_drinking: DrinkingStatus,
    /// Status drawn at setup
    pub baseline_drinking: DrinkingStatus,
    pub drink_probs: DrinkProbs,
    pub beverages: BeveragePrefs,
    pub ever_heavy: bool,
    /// Recycled agents are excluded from transition rates
    pub do_not_count: bool,
    pub outlet: Option<OutletId>,

    pub violence: ViolenceState,

    // Mobility
    pub residence_duration: u32,
    pub p_move: f64,
    pub moved: bool,
    pub ever_high_income_hood: bool,
    pub ever_low_income_hood: bool,
    pub base_income_hood: Option<IncomeHoodClass>,

    // Lifecycle
    pub p_death: f64,
    pub died: bool,

    // Network
    pub friend_target: u32,
    pub friends: Vec<AgentId>,
    pub friend_counts: FriendCounts,
}

impl Agent {
    pub fn new(id: AgentId, demographics: Demographics, friend_target: u32) -> Self {
        Self {
            id,
            age: demographics.age,
            gender: demographics.gender,
            race: demographics.race,
            education: demographics.education,
            income: demographics.income,
            base_income: demographics.income,
            x: 0,
            y: 0,
            hood: None,
            drinking: DrinkingStatus::NonDrinker,
            last_drinking: DrinkingStatus::NonDrinker,
            baseline_drinking: DrinkingStatus::NonDrinker,
            drink_probs: DrinkProbs::default(),
            beverages: BeveragePrefs::default(),
            ever_heavy: false,
            do_not_count: false,
            outlet: None,
            violence: ViolenceState::default(),
            residence_duration: 0,
            p_move: 0.0,
            moved: false,
            ever_high_income_hood: false,
            ever_low_income_hood: false,
            base_income_hood: None,
            p_death: 0.0,
            died: false,
            friend_target,
            friends: Vec::new(),
            friend_counts: FriendCounts::default(),
        }
    }

    pub fn age_band(&self) -> AgeBand {
        AgeBand::from_age(self.age)
    }

    pub fn income_band(&self) -> IncomeBand {
        self.income.band()
    }

    pub fn residence_band(&self) -> ResidenceBand {
        ResidenceBand::from_duration(self.residence_duration)
    }

    pub fn is_young_male(&self) -> bool {
        self.gender.is_male() && self.age_band() == AgeBand::From18To24
    }

    /// Lived in the same place for more than one year
    pub fn is_stable(&self) -> bool {
        self.residence_duration > 1
    }

    pub fn has_friend(&self, other: AgentId) -> bool {
        self.friends.contains(&other)
    }

    pub fn is_saturated(&self) -> bool {
        self.friends.len() as u32 >= self.friend_target
    }

    /// Roll this tick's status into the previous-tick fields and clear
    /// every per-tick flag.
    pub fn reset_transients(&mut self) {
        self.last_drinking = self.drinking;

        let v = &mut self.violence;
        v.last_victim = v.victimized();
        v.last_perp = v.perp;
        v.potential_homicide = false;
        v.potential_victim = false;
        v.potential_perp = false;
        v.homicide = false;
        v.victim = false;
        v.perp = false;
        v.alcohol_homicide = false;
        v.alcohol_violence = false;

        self.moved = false;
    }

    /// Reset a deceased agent as a new 18-year-old in the same home.
    /// Lifetime violence and drinking history is cleared; the caller redraws
    /// the drinking status.
    pub fn recycle(&mut self) {
        self.age = ENTRY_AGE;
        self.reset_transients();
        self.violence = ViolenceState::default();
        self.ever_heavy = false;
        self.do_not_count = true;
        self.died = false;
        self.p_death = 0.0;
    }

    /// Design vector for the individual-level models.
    pub fn covariates(&self) -> Covariates {
        let mut x = Covariates {
            male: if self.gender.is_male() { 1.0 } else { 0.0 },
            light_drinker: flag(self.drinking == DrinkingStatus::Light),
            heavy_drinker: flag(self.drinking == DrinkingStatus::Heavy),
            prior_victim: flag(self.violence.prior_victim),
            prior_perp: flag(self.violence.prior_perp),
            last_victim: flag(self.violence.last_victim),
            ..Default::default()
        };
        x.age[self.age_band().index()] = 1.0;
        x.race[self.race.index()] = 1.0;
        x.education[self.education.index()] = 1.0;
        x.income[self.income_band().index()] = 1.0;
        x
    }
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_agent() -> Agent {
        let d = Demographics {
            age: 22,
            gender: Gender::Male,
            race: Race::Hispanic,
            education: Education::HighSchool,
            income: IncomeCategory::new(11),
        };
        Agent::new(AgentId::new(7), d, 10)
    }

    #[test]
    fn test_covariates_one_hot() {
        let mut agent = make_agent();
        agent.drinking = DrinkingStatus::Heavy;
        let x = agent.covariates();
        assert_eq!(x.male, 1.0);
        assert_eq!(x.age, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(x.race, [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(x.education, [0.0, 1.0, 0.0]);
        assert_eq!(x.income, [0.0, 0.0, 1.0, 0.0]);
        assert_eq!((x.light_drinker, x.heavy_drinker), (0.0, 1.0));
        assert!(agent.is_young_male());
    }

    #[test]
    fn test_reset_rolls_into_last_tick() {
        let mut agent = make_agent();
        agent.drinking = DrinkingStatus::Light;
        agent.violence.homicide = true;
        agent.violence.perp = true;
        agent.violence.potential_victim = true;
        agent.moved = true;

        agent.reset_transients();

        assert_eq!(agent.last_drinking, DrinkingStatus::Light);
        assert!(agent.violence.last_victim);
        assert!(agent.violence.last_perp);
        assert!(!agent.violence.homicide && !agent.violence.perp);
        assert!(!agent.violence.potential_victim);
        assert!(!agent.moved);
    }

    #[test]
    fn test_recycle_clears_history() {
        let mut agent = make_agent();
        agent.age = 71;
        agent.died = true;
        agent.ever_heavy = true;
        agent.violence.prior_victim = true;
        agent.violence.prior_perp = true;
        agent.violence.victim = true;
        agent.friends.push(AgentId::new(3));

        agent.recycle();

        assert_eq!(agent.age, ENTRY_AGE);
        assert!(!agent.died);
        assert!(agent.do_not_count);
        assert!(!agent.ever_heavy);
        assert_eq!(agent.violence, ViolenceState::default());
        // Ties survive recycling
        assert_eq!(agent.friends.len(), 1);
    }
}
