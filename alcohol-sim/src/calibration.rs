//! Calibrated coefficient tables for every behavioral model.
//!
//! All regression coefficients live here as data rather than inline
//! literals. A table is plain serde JSON, so a recalibrated version can be
//! loaded with [`Calibration::from_json`] and swapped into a running world
//! without touching code. Coefficients that a model does not use stay zero.
//!
//! Index conventions for the one-hot arrays:
//! - `age`: 18–24, 25–34, 35–44, 45–54, 55–64, 65+
//! - `race`: white, black, hispanic, other
//! - `education`: <HS, HS, >HS
//! - `income`: <$25k, $25–50k, $50–100k, $100k+

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::prob::{Link, NormalParam};

// === DESIGN VECTORS ===

/// Individual-level predictors of one agent, as 0/1 dummies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Covariates {
    pub male: f64,
    pub age: [f64; 6],
    pub race: [f64; 4],
    pub education: [f64; 3],
    pub income: [f64; 4],
    pub light_drinker: f64,
    pub heavy_drinker: f64,
    pub prior_victim: f64,
    pub prior_perp: f64,
    pub last_victim: f64,
}

/// Neighborhood-level predictors read from the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoodCovariates {
    pub hoodinc1: f64,
    pub hoodinc2: f64,
    pub violence: f64,
    pub pct_light: f64,
    pub pct_heavy: f64,
    pub pct_black: f64,
    pub pct_hisp: f64,
    pub pct_foreign_born: f64,
    pub pct_managerial: f64,
    pub pct_young_male: f64,
    pub pct_stable: f64,
    pub pct_unemployed: f64,
    pub pct_female_headed: f64,
}

fn dot<const N: usize>(coefs: &[f64; N], x: &[f64; N]) -> f64 {
    coefs.iter().zip(x).map(|(c, v)| c * v).sum()
}

// === COEFFICIENT TABLES ===

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndividualCoefs {
    pub intercept: f64,
    pub male: f64,
    pub age: [f64; 6],
    pub race: [f64; 4],
    pub education: [f64; 3],
    pub income: [f64; 4],
    pub light_drinker: f64,
    pub heavy_drinker: f64,
    pub prior_victim: f64,
    pub prior_perp: f64,
    pub last_victim: f64,
    /// Interaction between male gender and last-tick victimization
    pub male_last_victim: f64,
}

impl IndividualCoefs {
    /// Linear predictor `z` for one agent.
    pub fn predict(&self, x: &Covariates) -> f64 {
        self.intercept
            + self.male * x.male
            + dot(&self.age, &x.age)
            + dot(&self.race, &x.race)
            + dot(&self.education, &x.education)
            + dot(&self.income, &x.income)
            + self.light_drinker * x.light_drinker
            + self.heavy_drinker * x.heavy_drinker
            + self.prior_victim * x.prior_victim
            + self.prior_perp * x.prior_perp
            + self.last_victim * x.last_victim
            + self.male_last_victim * x.male * x.last_victim
    }

    fn all_finite(&self) -> bool {
        [
            self.intercept,
            self.male,
            self.light_drinker,
            self.heavy_drinker,
            self.prior_victim,
            self.prior_perp,
            self.last_victim,
            self.male_last_victim,
        ]
        .iter()
        .chain(&self.age)
        .chain(&self.race)
        .chain(&self.education)
        .chain(&self.income)
        .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoodCoefs {
    pub intercept: f64,
    pub hoodinc1: f64,
    pub hoodinc2: f64,
    pub violence: f64,
    pub pct_light: f64,
    pub pct_heavy: f64,
    pub pct_black: f64,
    pub pct_hisp: f64,
    pub pct_foreign_born: f64,
    pub pct_managerial: f64,
    pub pct_young_male: f64,
    pub pct_stable: f64,
    pub pct_unemployed: f64,
    pub pct_female_headed: f64,
}

impl HoodCoefs {
    pub fn predict(&self, x: &HoodCovariates) -> f64 {
        self.intercept
            + self.hoodinc1 * x.hoodinc1
            + self.hoodinc2 * x.hoodinc2
            + self.violence * x.violence
            + self.pct_light * x.pct_light
            + self.pct_heavy * x.pct_heavy
            + self.pct_black * x.pct_black
            + self.pct_hisp * x.pct_hisp
            + self.pct_foreign_born * x.pct_foreign_born
            + self.pct_managerial * x.pct_managerial
            + self.pct_young_male * x.pct_young_male
            + self.pct_stable * x.pct_stable
            + self.pct_unemployed * x.pct_unemployed
            + self.pct_female_headed * x.pct_female_headed
    }

    fn all_finite(&self) -> bool {
        [
            self.intercept,
            self.hoodinc1,
            self.hoodinc2,
            self.violence,
            self.pct_light,
            self.pct_heavy,
            self.pct_black,
            self.pct_hisp,
            self.pct_foreign_born,
            self.pct_managerial,
            self.pct_young_male,
            self.pct_stable,
            self.pct_unemployed,
            self.pct_female_headed,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

// === MODEL TABLES ===

/// Cross-sectional drinking status at setup and on recycling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineDrinking {
    pub light: IndividualCoefs,
    pub heavy: IndividualCoefs,
    pub hood_light: HoodCoefs,
    pub hood_heavy: HoodCoefs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeverageModels {
    pub beer: IndividualCoefs,
    pub wine: IndividualCoefs,
    pub spirits: IndividualCoefs,
}

/// Non-drinker → light drinker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartDrinking {
    pub individual: IndividualCoefs,
    pub hood: HoodCoefs,
    /// Per abstaining friend (pulls the probability down)
    pub friend_abstainer: NormalParam,
    /// Per light-drinking friend (pushes the probability up)
    pub friend_light: NormalParam,
}

/// Light drinker → non-drinker or heavy drinker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightTransitions {
    pub to_non: IndividualCoefs,
    pub to_heavy: IndividualCoefs,
    pub hood_to_non: HoodCoefs,
    pub hood_to_heavy: HoodCoefs,
    pub quit_friend_abstainer: NormalParam,
    pub quit_friend_light: NormalParam,
    pub quit_friend_heavy: NormalParam,
    pub escalate_friend_abstainer: NormalParam,
    pub escalate_friend_heavy: NormalParam,
}

/// Heavy drinker → light drinker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopHeavy {
    pub individual: IndividualCoefs,
    pub hood: HoodCoefs,
    pub friend_abstainer: NormalParam,
    pub friend_light: NormalParam,
    /// Outlet light-drinker share at or above which the network term is discounted
    pub outlet_light_share: f64,
    pub outlet_discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomicideModel {
    pub individual: IndividualCoefs,
    /// Applied when the agent was ever a victim or perpetrator
    pub history_multiplier: f64,
    pub no_history_multiplier: f64,
    pub heavy_multiplier: f64,
    pub non_heavy_multiplier: f64,
    pub hood: HoodCoefs,
    pub hood_link: Link,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolenceModel {
    pub individual: IndividualCoefs,
    pub hood: HoodCoefs,
}

/// Alcohol tax pass-through to drinking transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxationModel {
    /// Elasticity of heavy drinking with respect to price
    pub elasticity: f64,
    /// Extra factor for agents with a beverage preference
    pub preference_factor: f64,
    /// Multiplier per income band
    pub income_multipliers: [f64; 4],
}

/// Annual death probability by age band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MortalityTable {
    pub by_age_band: [f64; 6],
}

/// Residential mobility: whether to move and where to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobilityModel {
    pub individual: IndividualCoefs,
    /// Indexed by residence band: <2 years, 2–9 years, 10+ years
    pub duration: [f64; 3],
    /// Coefficient on last tick's neighborhood violence rate
    pub hood_violence: f64,
    pub destination: DestinationModel,
}

/// Log-weights added to a destination's census population weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationModel {
    /// Destination income tercile equals the mover's own tercile
    pub same_income_tier: f64,
    pub violence: f64,
    pub stability: f64,
}

/// Dollar cut points for the neighborhood income terciles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeThresholds {
    pub low: f64,
    pub middle: f64,
}

// === FULL TABLE ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub version: String,
    pub baseline_drinking: BaselineDrinking,
    pub beverages: BeverageModels,
    pub from_non_drinker: StartDrinking,
    pub from_light: LightTransitions,
    pub from_heavy: StopHeavy,
    pub homicide: HomicideModel,
    pub victimization: ViolenceModel,
    pub perpetration: ViolenceModel,
    pub taxation: TaxationModel,
    pub early_closing: NormalParam,
    pub mortality: MortalityTable,
    pub mobility: MobilityModel,
    pub income_thresholds: IncomeThresholds,
}

impl Calibration {
    /// Parse and validate a JSON table. Missing sections fall back to the
    /// shipped defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let calibration: Calibration = serde_json::from_str(json)?;
        calibration.validate()?;
        Ok(calibration)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> SimResult<()> {
        let individual = [
            ("baseline_drinking.light", &self.baseline_drinking.light),
            ("baseline_drinking.heavy", &self.baseline_drinking.heavy),
            ("beverages.beer", &self.beverages.beer),
            ("beverages.wine", &self.beverages.wine),
            ("beverages.spirits", &self.beverages.spirits),
            ("from_non_drinker.individual", &self.from_non_drinker.individual),
            ("from_light.to_non", &self.from_light.to_non),
            ("from_light.to_heavy", &self.from_light.to_heavy),
            ("from_heavy.individual", &self.from_heavy.individual),
            ("homicide.individual", &self.homicide.individual),
            ("victimization.individual", &self.victimization.individual),
            ("perpetration.individual", &self.perpetration.individual),
            ("mobility.individual", &self.mobility.individual),
        ];
        for (table, coefs) in individual {
            if !coefs.all_finite() {
                return Err(invalid(table, "non-finite coefficient"));
            }
        }

        let hood = [
            ("baseline_drinking.hood_light", &self.baseline_drinking.hood_light),
            ("baseline_drinking.hood_heavy", &self.baseline_drinking.hood_heavy),
            ("from_non_drinker.hood", &self.from_non_drinker.hood),
            ("from_light.hood_to_non", &self.from_light.hood_to_non),
            ("from_light.hood_to_heavy", &self.from_light.hood_to_heavy),
            ("from_heavy.hood", &self.from_heavy.hood),
            ("homicide.hood", &self.homicide.hood),
            ("victimization.hood", &self.victimization.hood),
            ("perpetration.hood", &self.perpetration.hood),
        ];
        for (table, coefs) in hood {
            if !coefs.all_finite() {
                return Err(invalid(table, "non-finite coefficient"));
            }
        }

        let normals = [
            ("from_non_drinker.friend_abstainer", self.from_non_drinker.friend_abstainer),
            ("from_non_drinker.friend_light", self.from_non_drinker.friend_light),
            ("from_light.quit_friend_abstainer", self.from_light.quit_friend_abstainer),
            ("from_light.quit_friend_light", self.from_light.quit_friend_light),
            ("from_light.quit_friend_heavy", self.from_light.quit_friend_heavy),
            ("from_light.escalate_friend_abstainer", self.from_light.escalate_friend_abstainer),
            ("from_light.escalate_friend_heavy", self.from_light.escalate_friend_heavy),
            ("from_heavy.friend_abstainer", self.from_heavy.friend_abstainer),
            ("from_heavy.friend_light", self.from_heavy.friend_light),
            ("early_closing", self.early_closing),
        ];
        for (table, param) in normals {
            if !param.is_valid() {
                return Err(invalid(table, "normal parameters need finite mean and sd >= 0"));
            }
        }

        if self
            .mortality
            .by_age_band
            .iter()
            .any(|p| !(0.0..=1.0).contains(p))
        {
            return Err(invalid("mortality", "probabilities must lie in [0, 1]"));
        }

        if !(self.income_thresholds.low < self.income_thresholds.middle) {
            return Err(invalid(
                "income_thresholds",
                "low cut point must be below the middle cut point",
            ));
        }

        let scalars = [
            self.homicide.history_multiplier,
            self.homicide.no_history_multiplier,
            self.homicide.heavy_multiplier,
            self.homicide.non_heavy_multiplier,
            self.taxation.elasticity,
            self.taxation.preference_factor,
            self.from_heavy.outlet_light_share,
            self.from_heavy.outlet_discount,
            self.mobility.hood_violence,
            self.mobility.destination.same_income_tier,
            self.mobility.destination.violence,
            self.mobility.destination.stability,
        ];
        if scalars
            .iter()
            .chain(&self.taxation.income_multipliers)
            .chain(&self.mobility.duration)
            .any(|v| !v.is_finite())
        {
            return Err(invalid("scalars", "non-finite value"));
        }

        Ok(())
    }
}

fn invalid(table: &str, reason: &str) -> SimError {
    SimError::Calibration {
        table: table.to_string(),
        reason: reason.to_string(),
    }
}

// === SHIPPED DEFAULTS ===

impl Default for Calibration {
    fn default() -> Self {
        Self {
            version: "2016-01-calibrated".to_string(),
            baseline_drinking: BaselineDrinking::default(),
            beverages: BeverageModels::default(),
            from_non_drinker: StartDrinking::default(),
            from_light: LightTransitions::default(),
            from_heavy: StopHeavy::default(),
            homicide: HomicideModel::default(),
            victimization: ViolenceModel {
                individual: IndividualCoefs {
                    intercept: -5.70,
                    male: 0.2796,
                    age: [2.2, 0.85, 0.5763, 0.0143, -0.17, 0.0],
                    education: [1.45, 0.90, 0.0],
                    income: [1.75, 0.55, 0.128, 0.0],
                    light_drinker: -0.6113,
                    heavy_drinker: 0.6341,
                    prior_victim: 1.614,
                    prior_perp: 0.4095,
                    ..Default::default()
                },
                hood: violence_hood(-2.20),
            },
            perpetration: ViolenceModel {
                individual: IndividualCoefs {
                    intercept: -8.00,
                    male: 1.0901,
                    age: [1.1434, 1.25, 0.15, -0.9339, -2.3138, 0.0],
                    education: [1.00, 0.65, 0.0],
                    income: [0.95, 0.55, 0.125, 0.0],
                    light_drinker: 0.0072,
                    heavy_drinker: 0.4521,
                    prior_victim: 2.1887,
                    prior_perp: 1.25,
                    ..Default::default()
                },
                hood: violence_hood(-4.40),
            },
            taxation: TaxationModel::default(),
            early_closing: NormalParam::new(0.037, 0.01),
            mortality: MortalityTable::default(),
            mobility: MobilityModel::default(),
            income_thresholds: IncomeThresholds::default(),
        }
    }
}

/// Victimization and perpetration share one neighborhood equation and
/// differ only in the intercept.
fn violence_hood(intercept: f64) -> HoodCoefs {
    HoodCoefs {
        intercept,
        hoodinc1: 3.5,
        hoodinc2: 1.5,
        pct_black: 20.0,
        pct_hisp: 2.5,
        violence: 16.4594,
        pct_young_male: 10.0,
        pct_stable: -0.5,
        pct_unemployed: 5.0,
        pct_female_headed: 4.5,
        ..Default::default()
    }
}

impl Default for BaselineDrinking {
    fn default() -> Self {
        Self {
            light: IndividualCoefs {
                intercept: 1.00,
                male: 0.2366,
                age: [0.0, 0.0459, -0.5747, 0.1098, -0.3769, 0.0],
                race: [0.0, -0.55, -0.05, -0.6482],
                education: [0.0, -0.9647, 0.071],
                income: [0.0, -0.1861, -0.0348, 0.351],
                ..Default::default()
            },
            heavy: IndividualCoefs {
                intercept: -0.80,
                male: 0.6944,
                age: [0.0, 0.7533, 0.4989, 0.1481, -1.1003, 0.0],
                race: [0.0, -1.125, -0.375, -0.88],
                education: [0.0, -0.2528, -1.1088],
                income: [0.0, -0.2107, -0.7835, -0.3612],
                ..Default::default()
            },
            hood_light: HoodCoefs {
                intercept: -2.4707,
                hoodinc1: 0.0196,
                hoodinc2: 0.0138,
                pct_black: -0.1922,
                pct_hisp: -0.0186,
                violence: -0.8008,
                pct_light: 5.1653,
                pct_heavy: 2.5315,
                ..Default::default()
            },
            hood_heavy: HoodCoefs {
                intercept: -3.9946,
                hoodinc1: 0.7399,
                hoodinc2: 0.6614,
                pct_black: -1.5819,
                pct_hisp: -2.5387,
                violence: -0.8384,
                pct_light: 2.7012,
                pct_heavy: 14.4055,
                ..Default::default()
            },
        }
    }
}

impl Default for BeverageModels {
    fn default() -> Self {
        Self {
            beer: IndividualCoefs {
                intercept: -2.017,
                male: 1.378,
                age: [0.0, 0.303, 0.215, 0.280, -0.039, -0.348],
                race: [0.0, -0.004, -0.463, -0.293],
                education: [0.0, -0.019, 0.127],
                income: [0.0, -0.043, -0.104, 0.005],
                heavy_drinker: 1.553,
                ..Default::default()
            },
            wine: IndividualCoefs {
                intercept: -2.494,
                male: -0.199,
                age: [0.0, 0.165, 0.032, 0.352, 0.470, 0.799],
                race: [0.0, -0.443, -0.424, -0.388],
                education: [0.0, 0.181, 0.808],
                income: [0.0, -0.038, 0.076, 0.716],
                heavy_drinker: 0.259,
                ..Default::default()
            },
            spirits: IndividualCoefs {
                intercept: -2.997,
                male: 0.520,
                age: [0.0, -0.231, -0.423, -0.245, 0.043, 0.495],
                race: [0.0, 0.528, -0.625, -0.471],
                education: [0.0, 0.287, 0.62],
                income: [0.0, 0.002, 0.010, 0.139],
                heavy_drinker: 1.151,
                ..Default::default()
            },
        }
    }
}

impl Default for StartDrinking {
    fn default() -> Self {
        Self {
            individual: IndividualCoefs {
                intercept: -0.5359,
                male: 0.2904,
                age: [0.0, -0.0929, -0.6975, -0.4944, -0.9467, -1.0075],
                education: [0.0, -0.4353, -0.136],
                income: [0.0, -0.5011, 0.0282, 0.4882],
                last_victim: 0.7624,
                ..Default::default()
            },
            hood: HoodCoefs {
                intercept: -4.6586,
                hoodinc1: -0.107,
                hoodinc2: 0.4702,
                violence: 3.1459,
                pct_light: 5.994,
                pct_heavy: 2.2168,
                ..Default::default()
            },
            friend_abstainer: NormalParam::new(0.11, 0.0153),
            friend_light: NormalParam::new(0.06, 0.0179),
        }
    }
}

impl Default for LightTransitions {
    fn default() -> Self {
        Self {
            to_non: IndividualCoefs {
                intercept: -0.3288,
                male: -0.3634,
                age: [0.0, -0.1896, -0.0468, -0.3016, 0.1488, 0.0493],
                education: [0.0, -0.4643, -0.8307],
                income: [0.0, -0.3614, -0.7598, -1.2792],
                last_victim: 0.1279,
                ..Default::default()
            },
            to_heavy: IndividualCoefs {
                intercept: -0.2061,
                male: -0.0842,
                age: [0.0, -1.0687, -1.4939, -2.2607, -2.3726, -2.8945],
                education: [0.0, 0.1972, -1.0469],
                income: [0.0, -0.1372, -0.8733, -0.1993],
                last_victim: 0.05,
                ..Default::default()
            },
            hood_to_non: HoodCoefs {
                intercept: 0.3414,
                hoodinc1: -0.4257,
                hoodinc2: -0.4381,
                violence: 3.2196,
                pct_light: -3.532,
                pct_heavy: 0.833,
                ..Default::default()
            },
            hood_to_heavy: HoodCoefs {
                intercept: -2.28,
                hoodinc1: -0.2088,
                hoodinc2: -0.0903,
                violence: 1.9665,
                pct_light: -2.5772,
                pct_heavy: 13.8191,
                pct_black: 1.25,
                pct_hisp: 1.7474,
                ..Default::default()
            },
            quit_friend_abstainer: NormalParam::new(0.22, 0.0281),
            quit_friend_light: NormalParam::new(0.05, 0.0179),
            quit_friend_heavy: NormalParam::new(0.07, 0.0255),
            escalate_friend_abstainer: NormalParam::new(0.10, 0.0281),
            escalate_friend_heavy: NormalParam::new(0.18, 0.0357),
        }
    }
}

impl Default for StopHeavy {
    fn default() -> Self {
        Self {
            individual: IndividualCoefs {
                intercept: 0.35,
                male: -0.35,
                age: [0.0, -0.075, -0.6443, -0.15, -1.0192, -0.5927],
                education: [0.0, 0.15, 0.13],
                income: [0.0, -0.05, -0.10, -0.15],
                last_victim: -0.35,
                male_last_victim: 8.75,
                ..Default::default()
            },
            hood: HoodCoefs {
                intercept: 1.20,
                hoodinc1: -1.0433,
                hoodinc2: -1.906,
                violence: -7.5086,
                pct_light: 1.0108,
                pct_heavy: -16.456,
                pct_black: 6.5,
                pct_hisp: 6.7193,
                ..Default::default()
            },
            friend_abstainer: NormalParam::new(0.11, 0.0153),
            friend_light: NormalParam::new(0.06, 0.0179),
            outlet_light_share: 0.50,
            outlet_discount: 0.25,
        }
    }
}

impl Default for HomicideModel {
    fn default() -> Self {
        Self {
            individual: IndividualCoefs {
                intercept: -15.0,
                male: 1.8814,
                age: [3.0, 1.3167, 0.8021, 0.6588, 0.2296, 0.0],
                income: [4.95, 3.15, 0.10, 0.0],
                ..Default::default()
            },
            history_multiplier: 1.5,
            no_history_multiplier: 0.75,
            heavy_multiplier: 2.0,
            non_heavy_multiplier: 0.8,
            hood: HoodCoefs {
                intercept: -11.15,
                hoodinc1: 2.50,
                hoodinc2: 0.85,
                violence: 1.25,
                pct_light: -0.0834,
                pct_heavy: -0.044,
                pct_black: 3.00,
                pct_hisp: 2.75,
                pct_foreign_born: -0.007,
                pct_managerial: -0.005,
                pct_young_male: 8.10,
                pct_stable: 0.01,
                pct_unemployed: 2.20,
                pct_female_headed: 3.9179,
            },
            hood_link: Link::Exp,
        }
    }
}

impl Default for TaxationModel {
    fn default() -> Self {
        Self {
            elasticity: 0.53,
            preference_factor: 0.50,
            income_multipliers: [1.6, 1.08, 0.76, 0.27],
        }
    }
}

impl Default for MortalityTable {
    fn default() -> Self {
        Self {
            by_age_band: [0.0009, 0.0011, 0.0021, 0.0043, 0.0098, 0.0500],
        }
    }
}

impl Default for MobilityModel {
    fn default() -> Self {
        Self {
            individual: IndividualCoefs {
                intercept: -1.75,
                age: [0.60, 0.45, 0.0, -0.35, -0.60, -0.90],
                income: [0.25, 0.10, 0.0, -0.15],
                ..Default::default()
            },
            duration: [0.0, -0.55, -1.25],
            hood_violence: 2.0,
            destination: DestinationModel::default(),
        }
    }
}

impl Default for DestinationModel {
    fn default() -> Self {
        Self {
            same_income_tier: 0.8,
            violence: -3.0,
            stability: 0.5,
        }
    }
}

impl Default for IncomeThresholds {
    fn default() -> Self {
        Self {
            low: 44_000.0,
            middle: 58_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        Calibration::default().validate().unwrap();
    }

    #[test]
    fn test_json_round_trip_preserves_table() {
        let original = Calibration::default();
        let json = original.to_json().unwrap();
        let parsed = Calibration::from_json(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_partial_json_overrides_one_coefficient() {
        // Hot-swap only the homicide intercept, everything else keeps defaults
        let json = r#"{
            "version": "recalibrated",
            "homicide": { "individual": { "intercept": -12.25 } }
        }"#;
        let parsed = Calibration::from_json(json).unwrap();
        assert_eq!(parsed.version, "recalibrated");
        assert_eq!(parsed.homicide.individual.intercept, -12.25);
        // Sibling fields inside an overridden section fall back to that section's default
        assert_eq!(parsed.homicide.heavy_multiplier, 2.0);
        assert_eq!(parsed.victimization, Calibration::default().victimization);
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let json = r#"{ "early_closing": { "mean": 0.03, "sd": -0.5 } }"#;
        let err = Calibration::from_json(json).unwrap_err();
        assert!(matches!(err, SimError::Calibration { .. }), "{err}");

        let json = r#"{ "mortality": { "by_age_band": [0.1, 0.1, 0.1, 0.1, 0.1, 1.5] } }"#;
        assert!(Calibration::from_json(json).is_err());

        assert!(matches!(
            Calibration::from_json("{ not json"),
            Err(SimError::Parse(_))
        ));
    }

    #[test]
    fn test_interaction_term_only_for_male_victims() {
        let coefs = &Calibration::default().from_heavy.individual;
        let mut x = Covariates::default();
        x.last_victim = 1.0;
        let female = coefs.predict(&x);
        x.male = 1.0;
        let male = coefs.predict(&x);
        // male coefficient -0.35 plus interaction 8.75
        assert!((male - female - (8.75 - 0.35)).abs() < 1e-12);
    }

    #[test]
    fn test_hood_predictor() {
        let coefs = violence_hood(-4.40);
        let x = HoodCovariates {
            hoodinc1: 1.0,
            violence: 0.1,
            pct_black: 0.5,
            ..Default::default()
        };
        let z = coefs.predict(&x);
        let expected = -4.40 + 3.5 + 16.4594 * 0.1 + 20.0 * 0.5;
        assert!((z - expected).abs() < 1e-12);
    }
}
