//! Run configuration: the flat set of named scalars a run is built from.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::DemographicProfile;
use crate::error::{SimError, SimResult};

// === INTERVENTIONS ===

/// Policy scenario, numbered as in the batch parameter files (0–10).
///
/// Deserializes from either its snake_case name or its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    #[default]
    None,
    DrinkingNorms,
    OutletReduction,
    ViolentOutletClosure,
    Policing,
    ViolenceInterrupters,
    Taxation,
    EarlyClosing,
    PolicingAndInterrupters,
    HighDensityOutletReduction,
    HighDensityEarlyClosing,
}

impl Intervention {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        let intervention = match code {
            0 => Intervention::None,
            1 => Intervention::DrinkingNorms,
            2 => Intervention::OutletReduction,
            3 => Intervention::ViolentOutletClosure,
            4 => Intervention::Policing,
            5 => Intervention::ViolenceInterrupters,
            6 => Intervention::Taxation,
            7 => Intervention::EarlyClosing,
            8 => Intervention::PolicingAndInterrupters,
            9 => Intervention::HighDensityOutletReduction,
            10 => Intervention::HighDensityEarlyClosing,
            _ => return None,
        };
        Some(intervention)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let intervention = match name {
            "none" => Intervention::None,
            "drinking_norms" => Intervention::DrinkingNorms,
            "outlet_reduction" => Intervention::OutletReduction,
            "violent_outlet_closure" => Intervention::ViolentOutletClosure,
            "policing" => Intervention::Policing,
            "violence_interrupters" => Intervention::ViolenceInterrupters,
            "taxation" => Intervention::Taxation,
            "early_closing" => Intervention::EarlyClosing,
            "policing_and_interrupters" => Intervention::PolicingAndInterrupters,
            "high_density_outlet_reduction" => Intervention::HighDensityOutletReduction,
            "high_density_early_closing" => Intervention::HighDensityEarlyClosing,
            _ => return None,
        };
        Some(intervention)
    }

    pub fn is_taxation(self) -> bool {
        self == Intervention::Taxation
    }

    pub fn is_early_closing(self) -> bool {
        matches!(
            self,
            Intervention::EarlyClosing | Intervention::HighDensityEarlyClosing
        )
    }

    pub fn is_outlet_reduction(self) -> bool {
        matches!(
            self,
            Intervention::OutletReduction | Intervention::HighDensityOutletReduction
        )
    }

    /// Only applies to high outlet-density neighborhoods
    pub fn high_density_only(self) -> bool {
        matches!(
            self,
            Intervention::HighDensityOutletReduction | Intervention::HighDensityEarlyClosing
        )
    }

    /// Whether the engine changes any behavior for this scenario.
    pub fn has_engine_effect(self) -> bool {
        self.is_taxation() || self.is_early_closing() || self.is_outlet_reduction()
    }
}

impl<'de> Deserialize<'de> for Intervention {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(InterventionVisitor)
    }
}

struct InterventionVisitor;

impl serde::de::Visitor<'_> for InterventionVisitor {
    type Value = Intervention;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an intervention name or a code from 0 to 10")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Intervention, E> {
        u8::try_from(v)
            .ok()
            .and_then(Intervention::from_code)
            .ok_or_else(|| E::custom(format!("unknown intervention code {v}")))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Intervention, E> {
        match u64::try_from(v) {
            Ok(v) => self.visit_u64(v),
            Err(_) => Err(E::custom(format!("unknown intervention code {v}"))),
        }
    }

    // JavaScript numbers arrive as floats
    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Intervention, E> {
        if v.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(&v) {
            self.visit_u64(v as u64)
        } else {
            Err(E::custom(format!("unknown intervention code {v}")))
        }
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Intervention, E> {
        Intervention::from_name(v).ok_or_else(|| E::unknown_variant(v, INTERVENTION_NAMES))
    }
}

const INTERVENTION_NAMES: &[&str] = &[
    "none",
    "drinking_norms",
    "outlet_reduction",
    "violent_outlet_closure",
    "policing",
    "violence_interrupters",
    "taxation",
    "early_closing",
    "policing_and_interrupters",
    "high_density_outlet_reduction",
    "high_density_early_closing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum InterventionTarget {
    #[default]
    Universal,
    /// Only agents drinking the taxed beverage
    Targeted,
}

// === FRIEND TARGETS ===

/// Distribution of each agent's target number of friends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FriendTarget {
    /// Inclusive on both ends
    Uniform { min: u32, max: u32 },
    Fixed { count: u32 },
}

impl Default for FriendTarget {
    fn default() -> Self {
        FriendTarget::Uniform { min: 5, max: 15 }
    }
}

impl FriendTarget {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> u32 {
        match *self {
            FriendTarget::Uniform { min, max } if min < max => rng.random_range(min..=max),
            FriendTarget::Uniform { min, .. } => min,
            FriendTarget::Fixed { count } => count,
        }
    }
}

// === RUN CONFIG ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub num_agents: usize,
    pub world_width: u32,
    pub world_height: u32,
    pub num_hoods: usize,
    /// Ticks before behavior dynamics switch on
    pub burn_in: u32,
    pub stop_tick: u32,
    /// Weight of the neighborhood term in blended probabilities
    pub alpha: f64,
    /// Weight of the network term
    pub beta: f64,
    pub allow_death: bool,
    /// Replace the dead with 18-year-olds instead of shrinking the population
    pub agent_recycle: bool,
    /// Moore radius perpetrators search for victims
    pub look_distance: u32,
    pub intervention: Intervention,
    pub intervention_target: InterventionTarget,
    /// Effect magnitude, e.g. tax increase or share of outlets affected
    pub intervention_change: f64,
    /// Ticks the intervention stays active; 0 keeps it on for the whole run
    pub intervention_duration: u32,
    pub num_outreach: u32,
    pub outlets_per_hood: u32,
    pub friend_target: FriendTarget,
    pub demographics: DemographicProfile,
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_agents: 513_000,
            world_width: 400,
            world_height: 625,
            num_hoods: 59,
            burn_in: 10,
            stop_tick: 500,
            alpha: 0.10,
            beta: 0.15,
            allow_death: true,
            agent_recycle: true,
            look_distance: 15,
            intervention: Intervention::None,
            intervention_target: InterventionTarget::Universal,
            intervention_change: 0.0,
            intervention_duration: 0,
            num_outreach: 1,
            outlets_per_hood: 0,
            friend_target: FriendTarget::default(),
            demographics: DemographicProfile::default(),
            seed: 42,
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.num_agents == 0 {
            return Err(SimError::Config("num_agents must be positive".into()));
        }
        if self.num_hoods == 0 {
            return Err(SimError::Config("num_hoods must be positive".into()));
        }
        if self.world_width == 0 || self.world_height == 0 {
            return Err(SimError::Config(format!(
                "world must have positive size, got {}x{}",
                self.world_width, self.world_height
            )));
        }
        for (name, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("intervention_change", self.intervention_change),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::Config(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.alpha + self.beta > 1.0 {
            return Err(SimError::Config(format!(
                "alpha + beta must not exceed 1, got {}",
                self.alpha + self.beta
            )));
        }
        if let FriendTarget::Uniform { min, max } = self.friend_target {
            if min > max {
                return Err(SimError::Config(format!(
                    "friend target range {min}..={max} is empty"
                )));
            }
        }
        self.demographics.validate()
    }
}
