// Demographic profile the synthetic population is drawn from

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::prob::sample_weighted;
use crate::types::{AgeBand, Education, Gender, IncomeCategory, Race};

/// Inclusive age range of each band. The top band is capped at 89.
const AGE_RANGES: [(u32, u32); 6] = [(18, 24), (25, 34), (35, 44), (45, 54), (55, 64), (65, 89)];

/// Age recycled agents re-enter the population at.
pub const ENTRY_AGE: u32 = 18;

/// Marginal distributions of the adult population.
///
/// Weights need not sum to one. Income is drawn conditional on education.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicProfile {
    pub male_share: f64,
    pub age_bands: [f64; 6],
    pub race: [f64; 4],
    pub education: [f64; 3],
    /// Row per education level, column per income category 1..=16
    pub income_by_education: [[f64; 16]; 3],
}

impl Default for DemographicProfile {
    fn default() -> Self {
        Self {
            male_share: 0.47,
            age_bands: [0.13, 0.20, 0.18, 0.17, 0.14, 0.18],
            race: [0.35, 0.23, 0.27, 0.15],
            education: [0.20, 0.25, 0.55],
            income_by_education: [
                [
                    0.20, 0.11, 0.08, 0.07, 0.07, 0.06, 0.05, 0.05, 0.04, 0.07, 0.07, 0.06, 0.03,
                    0.02, 0.01, 0.01,
                ],
                [
                    0.11, 0.08, 0.07, 0.06, 0.06, 0.06, 0.06, 0.05, 0.05, 0.09, 0.10, 0.10, 0.05,
                    0.03, 0.02, 0.01,
                ],
                [
                    0.05, 0.04, 0.03, 0.03, 0.04, 0.04, 0.04, 0.04, 0.04, 0.08, 0.12, 0.16, 0.10,
                    0.07, 0.06, 0.06,
                ],
            ],
        }
    }
}

/// One drawn set of demographic attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Demographics {
    pub age: u32,
    pub gender: Gender,
    pub race: Race,
    pub education: Education,
    pub income: IncomeCategory,
}

impl DemographicProfile {
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.male_share) {
            return Err(SimError::Config(format!(
                "male_share must lie in [0, 1], got {}",
                self.male_share
            )));
        }
        let rows: [(&str, &[f64]); 3] = [
            ("age_bands", &self.age_bands),
            ("race", &self.race),
            ("education", &self.education),
        ];
        let income_rows = self
            .income_by_education
            .iter()
            .map(|row| ("income_by_education", row.as_slice()));
        for (name, weights) in rows.into_iter().chain(income_rows) {
            let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0)
                && weights.iter().any(|w| *w > 0.0);
            if !valid {
                return Err(SimError::Config(format!(
                    "demographic weights '{name}' need at least one positive finite entry"
                )));
            }
        }
        Ok(())
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Demographics {
        let band = sample_weighted(rng, &self.age_bands).unwrap_or(0);
        let (lo, hi) = AGE_RANGES[band];
        let age = rng.random_range(lo..=hi);

        let roll: f64 = rng.random();
        let gender = if roll < self.male_share {
            Gender::Male
        } else {
            Gender::Female
        };

        let race = Race::ALL[sample_weighted(rng, &self.race).unwrap_or(0)];
        let education = Education::ALL[sample_weighted(rng, &self.education).unwrap_or(0)];
        let income_row = &self.income_by_education[education.index()];
        let income = IncomeCategory::new(sample_weighted(rng, income_row).unwrap_or(0) as u8 + 1);

        Demographics {
            age,
            gender,
            race,
            education,
            income,
        }
    }
}

impl Demographics {
    pub fn age_band(&self) -> AgeBand {
        AgeBand::from_age(self.age)
    }
}
