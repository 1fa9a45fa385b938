pub mod census;
pub mod grid;
pub mod layout;
pub mod neighborhood;

pub use census::*;
pub use grid::*;
pub use layout::*;
pub use neighborhood::*;
