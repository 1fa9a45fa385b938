// Core ids and demographic categories

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

// === NEWTYPE IDS ===

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct HoodId(pub u32);

impl HoodId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OutletId(pub u32);

impl OutletId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// === DEMOGRAPHICS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn is_male(self) -> bool {
        self == Gender::Male
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Race {
    White,
    Black,
    Hispanic,
    Other,
}

impl Race {
    pub const ALL: [Race; 4] = [Race::White, Race::Black, Race::Hispanic, Race::Other];

    pub fn index(self) -> usize {
        match self {
            Race::White => 0,
            Race::Black => 1,
            Race::Hispanic => 2,
            Race::Other => 3,
        }
    }

    /// One-letter prefix used by subgroup report fields (`pwheavy`, `pbdied`, ...)
    pub fn prefix(self) -> &'static str {
        match self {
            Race::White => "w",
            Race::Black => "b",
            Race::Hispanic => "h",
            Race::Other => "o",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Education {
    LessThanHighSchool,
    HighSchool,
    MoreThanHighSchool,
}

impl Education {
    pub const ALL: [Education; 3] = [
        Education::LessThanHighSchool,
        Education::HighSchool,
        Education::MoreThanHighSchool,
    ];

    pub fn index(self) -> usize {
        match self {
            Education::LessThanHighSchool => 0,
            Education::HighSchool => 1,
            Education::MoreThanHighSchool => 2,
        }
    }
}

/// Six age bands used throughout the risk models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBand {
    From18To24,
    From25To34,
    From35To44,
    From45To54,
    From55To64,
    Over65,
}

impl AgeBand {
    pub const ALL: [AgeBand; 6] = [
        AgeBand::From18To24,
        AgeBand::From25To34,
        AgeBand::From35To44,
        AgeBand::From45To54,
        AgeBand::From55To64,
        AgeBand::Over65,
    ];

    pub fn from_age(age: u32) -> Self {
        match age {
            0..=24 => AgeBand::From18To24,
            25..=34 => AgeBand::From25To34,
            35..=44 => AgeBand::From35To44,
            45..=54 => AgeBand::From45To54,
            55..=64 => AgeBand::From55To64,
            _ => AgeBand::Over65,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Household income on the 16-category census scale (1..=16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IncomeCategory(u8);

impl IncomeCategory {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 16;

    /// Clamps into 1..=16.
    pub fn new(category: u8) -> Self {
        Self(category.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Dollar midpoint of the category, used for neighborhood mean income.
    ///
    /// - 1 (< $10k) → 5,000
    /// - 10 ($50–59k) → 55,000
    /// - 16 ($200k+) → 225,000
    pub fn midpoint(self) -> f64 {
        match self.0 {
            1 => 5_000.0,
            2 => 12_500.0,
            3 => 17_500.0,
            4 => 22_500.0,
            5 => 27_500.0,
            6 => 32_500.0,
            7 => 37_500.0,
            8 => 42_500.0,
            9 => 47_500.0,
            10 => 55_000.0,
            11 => 67_500.0,
            12 => 87_500.0,
            13 => 112_500.0,
            14 => 137_500.0,
            15 => 175_000.0,
            _ => 225_000.0,
        }
    }

    pub fn band(self) -> IncomeBand {
        match self.0 {
            0..=4 => IncomeBand::Under25k,
            5..=9 => IncomeBand::From25To50k,
            10..=12 => IncomeBand::From50To100k,
            _ => IncomeBand::Over100k,
        }
    }
}

/// Collapsed four-band household income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncomeBand {
    Under25k,
    From25To50k,
    From50To100k,
    Over100k,
}

impl IncomeBand {
    pub const ALL: [IncomeBand; 4] = [
        IncomeBand::Under25k,
        IncomeBand::From25To50k,
        IncomeBand::From50To100k,
        IncomeBand::Over100k,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Residence duration band (`durres1..3` in the output tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidenceBand {
    UnderTwoYears,
    TwoToNineYears,
    TenYearsPlus,
}

impl ResidenceBand {
    pub fn from_duration(years: u32) -> Self {
        match years {
            0..=1 => ResidenceBand::UnderTwoYears,
            2..=9 => ResidenceBand::TwoToNineYears,
            _ => ResidenceBand::TenYearsPlus,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

// === DRINKING ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum DrinkingStatus {
    NonDrinker,
    Light,
    Heavy,
}

impl DrinkingStatus {
    pub const ALL: [DrinkingStatus; 3] = [
        DrinkingStatus::NonDrinker,
        DrinkingStatus::Light,
        DrinkingStatus::Heavy,
    ];

    /// Numeric code used by step reports: 1 non-drinker, 2 light, 3 heavy.
    pub fn code(self) -> u8 {
        match self {
            DrinkingStatus::NonDrinker => 1,
            DrinkingStatus::Light => 2,
            DrinkingStatus::Heavy => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(DrinkingStatus::NonDrinker),
            2 => Some(DrinkingStatus::Light),
            3 => Some(DrinkingStatus::Heavy),
            _ => None,
        }
    }

    pub fn is_drinker(self) -> bool {
        self != DrinkingStatus::NonDrinker
    }

    pub fn label(self) -> &'static str {
        match self {
            DrinkingStatus::NonDrinker => "non",
            DrinkingStatus::Light => "light",
            DrinkingStatus::Heavy => "heavy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Beverage {
    Beer,
    Wine,
    Spirits,
}

impl Beverage {
    pub const ALL: [Beverage; 3] = [Beverage::Beer, Beverage::Wine, Beverage::Spirits];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_bands() {
        assert_eq!(AgeBand::from_age(18), AgeBand::From18To24);
        assert_eq!(AgeBand::from_age(24), AgeBand::From18To24);
        assert_eq!(AgeBand::from_age(25), AgeBand::From25To34);
        assert_eq!(AgeBand::from_age(64), AgeBand::From55To64);
        assert_eq!(AgeBand::from_age(65), AgeBand::Over65);
        assert_eq!(AgeBand::from_age(101), AgeBand::Over65);
    }

    #[test]
    fn test_income_category_collapse() {
        assert_eq!(IncomeCategory::new(1).band(), IncomeBand::Under25k);
        assert_eq!(IncomeCategory::new(4).band(), IncomeBand::Under25k);
        assert_eq!(IncomeCategory::new(5).band(), IncomeBand::From25To50k);
        assert_eq!(IncomeCategory::new(12).band(), IncomeBand::From50To100k);
        assert_eq!(IncomeCategory::new(16).band(), IncomeBand::Over100k);
        // Out-of-range input clamps
        assert_eq!(IncomeCategory::new(0).get(), 1);
        assert_eq!(IncomeCategory::new(40).get(), 16);
    }

    #[test]
    fn test_income_midpoints_increase() {
        let mids: Vec<f64> = (1..=16).map(|c| IncomeCategory::new(c).midpoint()).collect();
        assert!(mids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(mids[0], 5_000.0);
        assert_eq!(mids[15], 225_000.0);
    }

    #[test]
    fn test_drinking_codes_roundtrip() {
        for status in DrinkingStatus::ALL {
            assert_eq!(DrinkingStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DrinkingStatus::from_code(0), None);
        assert_eq!(DrinkingStatus::from_code(4), None);
    }

    #[test]
    fn test_residence_bands() {
        assert_eq!(ResidenceBand::from_duration(0), ResidenceBand::UnderTwoYears);
        assert_eq!(ResidenceBand::from_duration(1), ResidenceBand::UnderTwoYears);
        assert_eq!(ResidenceBand::from_duration(2), ResidenceBand::TwoToNineYears);
        assert_eq!(ResidenceBand::from_duration(10), ResidenceBand::TenYearsPlus);
    }
}
