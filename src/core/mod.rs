//! Landscape core: coordinates, score functions, the gem grid, neighborhood
//! sampling and screen layout.

pub mod coord;
pub mod error;
pub mod landscape;
pub mod layout;
pub mod neighborhood;
pub mod score;
