//! Force-directed layout.

pub mod forces;
pub mod geometry;
pub mod simulation;

pub use forces::DateBand;
pub use geometry::{Point, Rect, Size, bounding_box};
pub use simulation::{NodeState, Simulation};
