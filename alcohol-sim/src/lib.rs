use wasm_bindgen::prelude::*;

pub mod aggregates;
pub mod agents;
pub mod calibration;
pub mod config;
pub mod drinking;
pub mod error;
pub mod geography;
pub mod intervention;
pub mod mobility;
pub mod mortality;
pub mod network;
pub mod outlets;
pub mod prob;
pub mod report;
mod tick;
pub mod types;
pub mod violence;
pub mod world;

pub use agents::{Agent, Population};
pub use calibration::Calibration;
pub use config::{FriendTarget, Intervention, InterventionTarget, RunConfig};
pub use error::{SimError, SimResult};
pub use geography::Neighborhood;
pub use report::{AgentStepRow, CityReport, HoodStepRow, StateSnapshot};
pub use types::*;
pub use world::World;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Simulation
// ============================================================================

fn to_js(err: SimError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct Simulation {
    world: World,
}

#[wasm_bindgen]
impl Simulation {
    /// Build a run from a `RunConfig`-shaped object; missing fields take
    /// their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<Simulation, JsValue> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let config: RunConfig = if config.is_undefined() || config.is_null() {
            RunConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        let world = World::new(config).map_err(to_js)?;
        Ok(Self { world })
    }

    /// Build a run from JSON text
    #[wasm_bindgen]
    pub fn from_json(config_json: &str) -> Result<Simulation, JsValue> {
        console_error_panic_hook::set_once();

        let config = RunConfig::from_json(config_json).map_err(to_js)?;
        let world = World::new(config).map_err(to_js)?;
        Ok(Self { world })
    }

    /// Advance the simulation by one tick. Returns false once the stop tick
    /// has been reached.
    #[wasm_bindgen]
    pub fn advance_tick(&mut self) -> bool {
        self.world.run_tick()
    }

    #[wasm_bindgen]
    pub fn get_tick(&self) -> u32 {
        self.world.tick()
    }

    /// Get a snapshot of the current state for rendering
    #[wasm_bindgen]
    pub fn get_state_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            tick: self.world.tick(),
            report: self.world.report(),
            hoods: self.world.hood_rows(),
        }
    }

    /// Replace the calibration table from JSON text
    #[wasm_bindgen]
    pub fn load_calibration(&mut self, json: &str) -> Result<(), JsValue> {
        let calibration = Calibration::from_json(json).map_err(to_js)?;
        self.world.set_calibration(calibration).map_err(to_js)
    }

    /// Replace the calibration table from a JS object
    #[wasm_bindgen]
    pub fn load_calibration_object(&mut self, table: JsValue) -> Result<(), JsValue> {
        let calibration: Calibration = serde_wasm_bindgen::from_value(table)?;
        self.world.set_calibration(calibration).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn pct_heavy_drinkers(&self) -> f64 {
        self.world.pct_heavy_drinkers()
    }

    #[wasm_bindgen]
    pub fn pct_victims(&self) -> f64 {
        self.world.pct_victims()
    }
}

impl Simulation {
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
