pub mod agent;
pub mod demographics;
pub mod population;

pub use agent::*;
pub use demographics::*;
pub use population::*;
