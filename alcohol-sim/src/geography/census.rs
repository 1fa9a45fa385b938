//! Static census attributes per neighborhood, keyed by borough/community
//! district code (`101` = Manhattan CD 1, `503` = Staten Island CD 3).

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// One community district.
///
/// Units follow the source tables: foreign-born and managerial shares are
/// percentages (0–100), unemployment and female-headed households are
/// proportions (0–1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CensusRecord {
    pub cd_code: u16,
    pub pct_foreign_born: f64,
    pub pct_managerial: f64,
    pub unemployed: f64,
    pub female_headed: f64,
    /// Relative share of initial residents; `None` weights by area
    #[serde(default)]
    pub population_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusTable {
    pub records: Vec<CensusRecord>,
}

impl CensusTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for the neighborhood at `index`.
    pub fn get(&self, index: usize) -> Option<&CensusRecord> {
        self.records.get(index)
    }

    pub fn by_code(&self, cd_code: u16) -> Option<&CensusRecord> {
        self.records.iter().find(|r| r.cd_code == cd_code)
    }

    pub fn check_len(&self, expected: usize) -> SimResult<()> {
        if self.records.len() != expected {
            return Err(SimError::CensusMismatch {
                rows: self.records.len(),
                expected,
            });
        }
        Ok(())
    }

    /// The 59 New York City community districts, in neighborhood id order.
    pub fn nyc() -> Self {
        let records = NYC_DISTRICTS
            .iter()
            .map(|&(cd_code, fb, mp, un, fh)| CensusRecord {
                cd_code,
                pct_foreign_born: fb,
                pct_managerial: mp,
                unemployed: un,
                female_headed: fh,
                population_share: None,
            })
            .collect();
        Self { records }
    }

    /// `n` identical districts at city-wide average values.
    pub fn uniform(n: usize) -> Self {
        let records = (0..n)
            .map(|i| CensusRecord {
                cd_code: 900 + i as u16,
                pct_foreign_born: 36.0,
                pct_managerial: 7.5,
                unemployed: 0.10,
                female_headed: 0.11,
                population_share: None,
            })
            .collect();
        Self { records }
    }
}

/// Community district code for neighborhood `index` in the city layout.
///
/// - 0..=11 → 101..=112 (Manhattan)
/// - 12..=29 → 201..=218 (Bronx)
/// - 30..=41 → 301..=312 (Brooklyn)
/// - 42..=55 → 401..=414 (Queens)
/// - 56..=58 → 501..=503 (Staten Island)
pub fn cd_code_for(index: usize) -> Option<u16> {
    let i = index as u16;
    match index {
        0..=11 => Some(101 + i),
        12..=29 => Some(i + 189),
        30..=41 => Some(i + 271),
        42..=55 => Some(i + 359),
        56..=58 => Some(i + 445),
        _ => None,
    }
}

// (cd code, % foreign born, % managerial/professional, unemployment, female-headed households)
const NYC_DISTRICTS: [(u16, f64, f64, f64, f64); 59] = [
    (101, 21.70, 2.98, 0.239056004, 0.252644818),
    (102, 27.25, 4.00, 0.23804333, 0.258508526),
    (103, 19.80, 2.73, 0.218621679, 0.274661077),
    (104, 35.30, 2.57, 0.181693429, 0.251452354),
    (105, 34.83, 2.35, 0.200382897, 0.282641631),
    (106, 23.50, 2.46, 0.206879465, 0.274036544),
    (107, 36.68, 4.20, 0.149455771, 0.216658342),
    (108, 30.02, 8.09, 0.093840797, 0.091473392),
    (109, 24.35, 4.17, 0.141445666, 0.202170757),
    (110, 17.44, 5.75, 0.065352499, 0.081092919),
    (111, 30.16, 4.43, 0.085037205, 0.10884926),
    (112, 37.13, 4.79, 0.105679723, 0.162672864),
    (201, 32.55, 6.59, 0.106102408, 0.094196533),
    (202, 16.33, 15.53, 0.099762109, 0.079732141),
    (203, 18.53, 4.13, 0.180239994, 0.221187473),
    (204, 34.82, 3.38, 0.169613465, 0.229335623),
    (205, 32.97, 3.39, 0.162748962, 0.223823893),
    (206, 16.40, 15.77, 0.055426491, 0.067773404),
    (207, 42.70, 6.20, 0.083532814, 0.092984736),
    (208, 30.61, 6.41, 0.142484209, 0.179426481),
    (209, 46.22, 3.82, 0.13512394, 0.172189909),
    (210, 37.07, 7.48, 0.059996568, 0.03798134),
    (211, 50.78, 6.62, 0.071361137, 0.047743909),
    (212, 41.66, 5.32, 0.07591611, 0.047751153),
    (213, 47.31, 5.70, 0.105203863, 0.09459619),
    (214, 49.76, 6.24, 0.109363652, 0.125163245),
    (215, 45.38, 7.10, 0.06734187, 0.04677514),
    (216, 21.21, 3.29, 0.228641888, 0.282505869),
    (217, 54.71, 3.51, 0.125976904, 0.181951604),
    (218, 36.99, 5.23, 0.079770946, 0.11711739),
    (301, 24.39, 20.29, 0.077729526, 0.032185033),
    (302, 23.60, 19.57, 0.050798642, 0.014760919),
    (303, 40.11, 10.78, 0.094488189, 0.065689209),
    (304, 25.09, 18.03, 0.068985128, 0.021704791),
    (305, 25.26, 22.38, 0.073307488, 0.010516619),
    (306, 24.17, 20.60, 0.042781212, 0.015548135),
    (307, 22.06, 18.71, 0.050553118, 0.033471878),
    (308, 21.48, 19.92, 0.037082616, 0.019535706),
    (309, 35.73, 7.16, 0.179983576, 0.131245452),
    (310, 17.76, 5.31, 0.183986164, 0.189759762),
    (311, 21.02, 5.58, 0.170458589, 0.174336588),
    (312, 53.29, 5.39, 0.145225916, 0.158827192),
    (401, 49.25, 7.46, 0.07789514, 0.064288804),
    (402, 60.28, 7.21, 0.071818001, 0.046789857),
    (403, 61.67, 4.63, 0.098798845, 0.07808299),
    (404, 67.86, 4.02, 0.094107788, 0.074066747),
    (405, 36.04, 6.09, 0.072727273, 0.073130902),
    (406, 51.69, 12.75, 0.052124345, 0.02836959),
    (407, 50.29, 7.07, 0.055314018, 0.04192957),
    (408, 44.43, 7.66, 0.06198662, 0.057627682),
    (409, 48.64, 6.38, 0.082748245, 0.078486644),
    (410, 39.27, 5.42, 0.070215056, 0.070096668),
    (411, 35.88, 8.63, 0.040852791, 0.03298946),
    (412, 34.41, 3.90, 0.10827852, 0.130343248),
    (413, 38.41, 5.02, 0.072244103, 0.080299803),
    (414, 24.41, 4.35, 0.127718466, 0.142914936),
    (501, 19.17, 6.48, 0.082084629, 0.112144153),
    (502, 18.41, 6.82, 0.050624633, 0.045675328),
    (503, 11.70, 6.82, 0.041798684, 0.037290558),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nyc_table_matches_district_codes() {
        let table = CensusTable::nyc();
        table.check_len(59).unwrap();
        for (i, record) in table.records.iter().enumerate() {
            assert_eq!(Some(record.cd_code), cd_code_for(i), "row {}", i);
        }
        assert_eq!(cd_code_for(59), None);
    }

    #[test]
    fn test_lookup_by_code() {
        let table = CensusTable::nyc();
        let bronx_1 = table.by_code(201).unwrap();
        assert_eq!(bronx_1.pct_foreign_born, 32.55);
        assert!((bronx_1.unemployed - 0.106102408).abs() < 1e-12);
        assert!(table.by_code(999).is_none());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let table = CensusTable::uniform(10);
        assert!(matches!(
            table.check_len(59),
            Err(SimError::CensusMismatch { rows: 10, expected: 59 })
        ));
    }
}
