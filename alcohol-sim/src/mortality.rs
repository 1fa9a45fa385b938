//! Age-specific mortality.
//!
//! Death is decided during a tick but applied at the start of the next one,
//! so a dying agent still appears in that tick's aggregates.

use rand::Rng;

use crate::calibration::MortalityTable;
use crate::types::AgeBand;

/// Annual probability of death for an age.
///
/// With the shipped table:
/// - 18–24 → 0.09%
/// - 45–54 → 0.43%
/// - 65+ → 5%
pub fn death_probability(table: &MortalityTable, age: u32) -> f64 {
    table.by_age_band[AgeBand::from_age(age).index()].clamp(0.0, 1.0)
}

/// Result of a mortality check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MortalityOutcome {
    Survives,
    /// Marked dead; removal or recycling happens next tick
    Dies,
}

/// Roll against a death probability.
pub fn check_mortality<R: Rng>(rng: &mut R, p_death: f64) -> MortalityOutcome {
    let roll: f64 = rng.random();
    if roll < p_death {
        MortalityOutcome::Dies
    } else {
        MortalityOutcome::Survives
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_death_probability_rises_with_age() {
        let table = MortalityTable::default();
        let young = death_probability(&table, 20);
        let middle = death_probability(&table, 50);
        let old = death_probability(&table, 80);
        assert!(young < middle && middle < old);
        assert_eq!(old, 0.05);
        assert_eq!(death_probability(&table, 65), old);
    }

    #[test]
    fn test_table_values_are_clamped() {
        let table = MortalityTable {
            by_age_band: [-0.5, 0.0, 0.0, 0.0, 0.0, 2.0],
        };
        assert_eq!(death_probability(&table, 18), 0.0);
        assert_eq!(death_probability(&table, 70), 1.0);
    }

    #[test]
    fn test_check_mortality_distribution() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        let trials = 20_000;
        let deaths = (0..trials)
            .filter(|_| check_mortality(&mut rng, 0.05) == MortalityOutcome::Dies)
            .count();

        // Expect ~5% deaths
        let death_rate = deaths as f64 / trials as f64;
        assert!(
            death_rate > 0.04 && death_rate < 0.06,
            "death_rate = {}",
            death_rate
        );

        assert_eq!(check_mortality(&mut rng, 0.0), MortalityOutcome::Survives);
    }
}
