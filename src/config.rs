use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::types::Position;

/// Which gyroscope axis carries the rotation to integrate into heading.
///
/// Depends on how the device is held; a phone flat in the hand rotates about
/// its x axis in the source recordings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GyroAxis {
    X,
    Y,
    Z,
}

impl Default for GyroAxis {
    fn default() -> Self {
        GyroAxis::X
    }
}

/// All pipeline tunables in one place with documented defaults.
///
/// The experiment scripts this engine replaces each hard-coded their own
/// copies of these values; a preset is now just a different `TrackerConfig`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Anchor position seeding the track (meters, world frame)
    pub initial_position: Position,

    /// Initial heading bias aligning the device frame with the world frame (radians)
    pub initial_heading_bias: f64,

    /// Moving-average window applied to the acceleration norm (seconds)
    pub accel_lowpass_secs: f64,

    /// Moving-average window applied to the integrated heading (seconds)
    pub gyro_lowpass_secs: f64,

    /// Minimum spacing between detected step peaks (seconds)
    pub peak_distance_secs: f64,

    /// Minimum peak height above the smoothed-norm baseline (m/s^2)
    pub peak_height: f64,

    /// Weinberg stride constant K
    pub weinberg_k: f64,

    /// Stride used when the first step has an empty acceleration interval (meters)
    pub default_stride: f64,

    /// Heading-bias nudge applied per collision with a resolvable corridor (radians)
    pub correction_increment: f64,

    /// Gyroscope axis integrated into heading
    pub gyro_axis: GyroAxis,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            initial_position: Position::new(0.0, 0.0, 0.0),
            initial_heading_bias: 0.0,
            accel_lowpass_secs: 1.0,
            gyro_lowpass_secs: 1.0,
            peak_distance_secs: 0.5,
            peak_height: 1.0,
            weinberg_k: 0.45,
            default_stride: 0.4,
            correction_increment: 3.0_f64.to_radians(),
            gyro_axis: GyroAxis::X,
        }
    }
}

impl TrackerConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.accel_lowpass_secs.is_finite() || self.accel_lowpass_secs <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "accel_lowpass_secs must be positive, got {}",
                self.accel_lowpass_secs
            )));
        }
        if !self.gyro_lowpass_secs.is_finite() || self.gyro_lowpass_secs <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "gyro_lowpass_secs must be positive, got {}",
                self.gyro_lowpass_secs
            )));
        }
        if !self.peak_distance_secs.is_finite() || self.peak_distance_secs <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "peak_distance_secs must be positive, got {}",
                self.peak_distance_secs
            )));
        }
        if !self.peak_height.is_finite() || self.peak_height <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "peak_height must be positive, got {}",
                self.peak_height
            )));
        }
        if !self.weinberg_k.is_finite() || self.weinberg_k <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "weinberg_k must be positive, got {}",
                self.weinberg_k
            )));
        }
        if !self.default_stride.is_finite() || self.default_stride <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "default_stride must be positive, got {}",
                self.default_stride
            )));
        }
        if !self.correction_increment.is_finite() || self.correction_increment < 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "correction_increment must be non-negative, got {}",
                self.correction_increment
            )));
        }
        Ok(())
    }
}

/// Geometric calibration mapping the occupancy bitmap into the world frame.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MapCalibration {
    /// Map resolution (meters per pixel)
    pub resolution: f64,

    /// Pixel that world (0, 0) maps to
    pub origin_pixel: (f64, f64),

    /// Grayscale value above which a pixel counts as walkable (0-255)
    pub walkable_threshold: u8,

    /// Search radius in pixels for the nearest-walkable fallback matcher
    pub neighbor_search_radius: u32,
}

impl Default for MapCalibration {
    fn default() -> Self {
        MapCalibration {
            resolution: 0.01,
            origin_pixel: (0.0, 0.0),
            walkable_threshold: 200,
            neighbor_search_radius: 10,
        }
    }
}

impl MapCalibration {
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(TrackerError::InvalidCalibration(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if !self.origin_pixel.0.is_finite() || !self.origin_pixel.1.is_finite() {
            return Err(TrackerError::InvalidCalibration(
                "origin_pixel must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
