//! Static floorplan handling: occupancy grid plus the matcher that clamps
//! dead-reckoned motion to walkable space.

pub mod matcher;
pub mod occupancy;

pub use matcher::{CorrectionMode, MapMatcher, MatchOutcome};
pub use occupancy::OccupancyMap;
