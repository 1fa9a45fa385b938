//! Neighborhood aggregates recomputed from current residents.
//!
//! [`compute_stats`] is a pure function of a resident set. The tick applies
//! it at three points with different scopes (baseline, post-migration, end
//! of tick); fields outside a scope keep the value from the last time they
//! were in scope. Violence rate and mean income additionally keep the
//! previous generation for one-tick-lagged readers.

use crate::agents::{Agent, Population};
use crate::calibration::IncomeThresholds;
use crate::geography::{IncomeTier, Neighborhood};
use crate::types::{DrinkingStatus, Race};

/// Value reported by any aggregate over an empty resident set.
pub const SENTINEL: f64 = -1.0;

// === TWO-GENERATION VALUE ===

/// A value with its previous generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Generational<T> {
    pub current: T,
    pub previous: T,
}

impl<T: Copy> Generational<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            previous: value,
        }
    }

    /// Start a new generation: previous takes the current value.
    pub fn roll(&mut self) {
        self.previous = self.current;
    }

    pub fn set(&mut self, value: T) {
        self.current = value;
    }
}

impl Generational<f64> {
    pub fn change(&self) -> f64 {
        self.current - self.previous
    }
}

// === PURE COMPUTATION ===

/// Everything a resident set determines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoodStats {
    pub residents: usize,
    pub mean_income: f64,
    /// Share of residents victimized (non-homicide) this tick
    pub violence_rate: f64,
    pub homicide_rate: f64,
    pub alc_homicide_rate: f64,
    pub perp_rate: f64,
    pub pct_race: [f64; 4],
    pub mean_age: f64,
    pub pct_young_male: f64,
    pub pct_stable: f64,
    pub pct_light: f64,
    pub pct_heavy: f64,
}

impl HoodStats {
    pub const EMPTY: HoodStats = HoodStats {
        residents: 0,
        mean_income: SENTINEL,
        violence_rate: SENTINEL,
        homicide_rate: SENTINEL,
        alc_homicide_rate: SENTINEL,
        perp_rate: SENTINEL,
        pct_race: [SENTINEL; 4],
        mean_age: SENTINEL,
        pct_young_male: SENTINEL,
        pct_stable: SENTINEL,
        pct_light: SENTINEL,
        pct_heavy: SENTINEL,
    };
}

pub fn compute_stats<'a>(residents: impl IntoIterator<Item = &'a Agent>) -> HoodStats {
    let mut n = 0usize;
    let mut income = 0.0;
    let mut victims = 0usize;
    let mut homicides = 0usize;
    let mut alc_homicides = 0usize;
    let mut perps = 0usize;
    let mut race = [0usize; 4];
    let mut age = 0.0;
    let mut young_male = 0usize;
    let mut stable = 0usize;
    let mut light = 0usize;
    let mut heavy = 0usize;

    for agent in residents {
        n += 1;
        income += agent.income.midpoint();
        victims += agent.violence.victim as usize;
        homicides += agent.violence.homicide as usize;
        alc_homicides += agent.violence.alcohol_homicide as usize;
        perps += agent.violence.perp as usize;
        race[agent.race.index()] += 1;
        age += agent.age as f64;
        young_male += agent.is_young_male() as usize;
        stable += agent.is_stable() as usize;
        match agent.drinking {
            DrinkingStatus::Light => light += 1,
            DrinkingStatus::Heavy => heavy += 1,
            DrinkingStatus::NonDrinker => {}
        }
    }

    if n == 0 {
        return HoodStats::EMPTY;
    }
    let share = |count: usize| count as f64 / n as f64;
    HoodStats {
        residents: n,
        mean_income: income / n as f64,
        violence_rate: share(victims),
        homicide_rate: share(homicides),
        alc_homicide_rate: share(alc_homicides),
        perp_rate: share(perps),
        pct_race: race.map(share),
        mean_age: age / n as f64,
        pct_young_male: share(young_male),
        pct_stable: share(stable),
        pct_light: share(light),
        pct_heavy: share(heavy),
    }
}

/// Residents of `hood` resolved against the store.
pub fn hood_stats(hood: &Neighborhood, agents: &Population) -> HoodStats {
    compute_stats(hood.members.iter().filter_map(|id| agents.get(*id)))
}

// === SCOPED APPLICATION ===

/// Which aggregates a recompute refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecomputeScope {
    pub income: bool,
    pub violence: bool,
    pub composition: bool,
    pub stability: bool,
    pub drinking: bool,
    pub age: bool,
}

impl RecomputeScope {
    /// Everything, once at setup
    pub const BASELINE: RecomputeScope = RecomputeScope {
        income: true,
        violence: true,
        composition: true,
        stability: true,
        drinking: true,
        age: true,
    };

    /// After residential moves; violence stays one tick stale.
    pub const POST_MIGRATION: RecomputeScope = RecomputeScope {
        income: false,
        violence: false,
        composition: true,
        stability: true,
        drinking: true,
        age: true,
    };

    /// After violence resolution.
    pub const END_OF_TICK: RecomputeScope = RecomputeScope {
        income: false,
        violence: true,
        composition: false,
        stability: false,
        drinking: true,
        age: true,
    };

    /// Drinking shares only, after baseline drinking assignment
    pub const DRINKING: RecomputeScope = RecomputeScope {
        income: false,
        violence: false,
        composition: false,
        stability: false,
        drinking: true,
        age: false,
    };

    pub const fn with_income(mut self, income: bool) -> Self {
        self.income = income;
        self
    }
}

pub fn apply_stats(
    hood: &mut Neighborhood,
    stats: &HoodStats,
    scope: RecomputeScope,
    thresholds: &IncomeThresholds,
) {
    if scope.income {
        hood.mean_income.set(stats.mean_income);
        hood.income_tier =
            (stats.residents > 0).then(|| IncomeTier::classify(stats.mean_income, thresholds));
    }
    if scope.violence {
        hood.violence_rate.set(stats.violence_rate);
        hood.homicide_rate = stats.homicide_rate;
        hood.alc_homicide_rate = stats.alc_homicide_rate;
        hood.perp_rate = stats.perp_rate;
    }
    if scope.composition {
        hood.pct_white = stats.pct_race[Race::White.index()];
        hood.pct_black = stats.pct_race[Race::Black.index()];
        hood.pct_hisp = stats.pct_race[Race::Hispanic.index()];
        hood.pct_other = stats.pct_race[Race::Other.index()];
    }
    if scope.stability {
        hood.pct_stable = stats.pct_stable;
    }
    if scope.drinking {
        hood.pct_light = stats.pct_light;
        hood.pct_heavy = stats.pct_heavy;
    }
    if scope.age {
        hood.mean_age = stats.mean_age;
        hood.pct_young_male = stats.pct_young_male;
    }
}

/// Recompute every neighborhood in `scope`.
pub fn recompute(
    hoods: &mut [Neighborhood],
    agents: &Population,
    scope: RecomputeScope,
    thresholds: &IncomeThresholds,
) {
    for hood in hoods.iter_mut() {
        let stats = hood_stats(hood, agents);
        apply_stats(hood, &stats, scope, thresholds);
    }
}

// === CITY AVERAGES ===

/// Means of neighborhood aggregates across populated neighborhoods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityAverages {
    pub income: f64,
    pub violence: f64,
    pub stable: f64,
    pub heavy: f64,
}

impl CityAverages {
    /// Sums are divided only when more than one neighborhood contributes.
    pub fn compute(hoods: &[Neighborhood]) -> Self {
        let populated: Vec<&Neighborhood> = hoods.iter().filter(|h| h.residents() > 0).collect();
        let divisor = if populated.len() > 1 {
            populated.len() as f64
        } else {
            1.0
        };
        let mean = |f: fn(&Neighborhood) -> f64| populated.iter().map(|h| f(h)).sum::<f64>() / divisor;
        Self {
            income: mean(|h| h.mean_income.current),
            violence: mean(|h| h.violence_rate.current),
            stable: mean(|h| h.pct_stable),
            heavy: mean(|h| h.pct_heavy),
        }
    }
}

pub fn update_high_income(hoods: &mut [Neighborhood], city: &CityAverages) {
    for hood in hoods.iter_mut() {
        hood.high_income = hood.residents() > 0 && hood.mean_income.current > city.income;
    }
}

pub fn update_high_violence(hoods: &mut [Neighborhood], city: &CityAverages) {
    for hood in hoods.iter_mut() {
        hood.high_violence = hood.residents() > 0 && hood.violence_rate.current > city.violence;
    }
}
