use std::collections::BTreeSet;

use crate::aggregates::{Generational, SENTINEL};
use crate::calibration::{HoodCovariates, IncomeThresholds};
use crate::geography::census::CensusRecord;
use crate::geography::layout::HoodRect;
use crate::types::{AgentId, HoodId, OutletId};

/// Income tercile of a neighborhood's mean household income.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeTier {
    Low,
    Middle,
    High,
}

impl IncomeTier {
    pub fn classify(mean_income: f64, thresholds: &IncomeThresholds) -> Self {
        if mean_income < thresholds.low {
            IncomeTier::Low
        } else if mean_income < thresholds.middle {
            IncomeTier::Middle
        } else {
            IncomeTier::High
        }
    }

    /// 1 low, 2 middle, 3 high
    pub fn code(self) -> i32 {
        match self {
            IncomeTier::Low => 1,
            IncomeTier::Middle => 2,
            IncomeTier::High => 3,
        }
    }
}

/// A neighborhood: fixed rectangle and census record, resident set, and
/// aggregates recomputed from residents at fixed points in the tick.
///
/// Aggregates read -1 while the neighborhood has no residents.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub id: HoodId,
    pub rect: HoodRect,
    pub census: CensusRecord,
    pub members: BTreeSet<AgentId>,
    pub num_cells: usize,

    // Aggregates
    pub mean_income: Generational<f64>,
    pub income_tier: Option<IncomeTier>,
    pub violence_rate: Generational<f64>,
    pub homicide_rate: f64,
    pub alc_homicide_rate: f64,
    pub perp_rate: f64,
    pub pct_white: f64,
    pub pct_black: f64,
    pub pct_hisp: f64,
    pub pct_other: f64,
    pub mean_age: f64,
    pub pct_young_male: f64,
    pub pct_stable: f64,
    pub pct_light: f64,
    pub pct_heavy: f64,

    // Relative to the city average
    pub high_income: bool,
    pub high_violence: bool,

    /// Violent events with a victim living here, this tick
    pub violent_events: u32,
    /// Selected for violence-interrupter outreach this tick
    pub targeted: bool,
    /// Selected for additional policing this tick
    pub policed: bool,

    pub outlets: Vec<OutletId>,
    pub high_outlet_density: bool,
}

impl Neighborhood {
    pub fn new(id: HoodId, rect: HoodRect, census: CensusRecord) -> Self {
        Self {
            id,
            rect,
            census,
            members: BTreeSet::new(),
            num_cells: 0,
            mean_income: Generational::new(SENTINEL),
            income_tier: None,
            violence_rate: Generational::new(SENTINEL),
            homicide_rate: SENTINEL,
            alc_homicide_rate: SENTINEL,
            perp_rate: SENTINEL,
            pct_white: SENTINEL,
            pct_black: SENTINEL,
            pct_hisp: SENTINEL,
            pct_other: SENTINEL,
            mean_age: SENTINEL,
            pct_young_male: SENTINEL,
            pct_stable: SENTINEL,
            pct_light: SENTINEL,
            pct_heavy: SENTINEL,
            high_income: false,
            high_violence: false,
            violent_events: 0,
            targeted: false,
            policed: false,
            outlets: Vec::new(),
            high_outlet_density: false,
        }
    }

    pub fn add_member(&mut self, id: AgentId) -> bool {
        self.members.insert(id)
    }

    pub fn remove_member(&mut self, id: AgentId) -> bool {
        self.members.remove(&id)
    }

    pub fn residents(&self) -> usize {
        self.members.len()
    }

    /// Census population weight used for initial placement.
    pub fn placement_weight(&self) -> f64 {
        self.census
            .population_share
            .unwrap_or(self.rect.area() as f64)
    }

    /// 1/0 dummies for the low and middle income terciles.
    pub fn income_dummies(&self) -> (f64, f64) {
        match self.income_tier {
            Some(IncomeTier::Low) => (1.0, 0.0),
            Some(IncomeTier::Middle) => (0.0, 1.0),
            _ => (0.0, 0.0),
        }
    }

    /// Per-tick counters and outreach flags.
    pub fn reset_tick_counters(&mut self) {
        self.violent_events = 0;
        self.targeted = false;
        self.policed = false;
    }

    /// Design vector for the neighborhood-level models.
    pub fn covariates(&self) -> HoodCovariates {
        let (hoodinc1, hoodinc2) = self.income_dummies();
        HoodCovariates {
            hoodinc1,
            hoodinc2,
            violence: self.violence_rate.current,
            pct_light: self.pct_light,
            pct_heavy: self.pct_heavy,
            pct_black: self.pct_black,
            pct_hisp: self.pct_hisp,
            pct_foreign_born: self.census.pct_foreign_born,
            pct_managerial: self.census.pct_managerial,
            pct_young_male: self.pct_young_male,
            pct_stable: self.pct_stable,
            pct_unemployed: self.census.unemployed,
            pct_female_headed: self.census.female_headed,
        }
    }
}
