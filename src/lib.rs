//! Pedestrian dead-reckoning tracker.
//!
//! Estimates a walker's 2D trajectory from accelerometer and gyroscope
//! streams (step detection + gyro heading + Weinberg stride lengths) and
//! corrects it against a static floorplan occupancy map, feeding wall
//! collisions back into a heading bias.

pub mod config;
pub mod engine;
pub mod error;
pub mod heading;
pub mod map;
pub mod preprocess;
pub mod steps;
pub mod types;
pub mod window;

pub use config::{GyroAxis, MapCalibration, TrackerConfig};
pub use engine::{EngineState, PdrEngine, WindowReport};
pub use error::{Result, TrackerError};
pub use map::{CorrectionMode, MapMatcher, OccupancyMap};
pub use types::{Position, SensorSample, StepEvent, Track};
pub use window::{Window, WindowSource};
