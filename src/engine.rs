use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::heading::integrate_heading;
use crate::map::MapMatcher;
use crate::preprocess::{moving_average, norms, sampling_frequency, window_samples, MotionFrame};
use crate::steps::{baseline, detect_peaks, weinberg_strides};
use crate::types::{Position, SensorSample, StepEvent, Track};

/// State carried across windows, threaded through each `process_window` call
/// and returned updated so the engine stays reentrant.
///
/// `last_step_timestamp` keys step deduplication: windows hand the engine
/// *cumulative* slices, so a later window re-detects every peak an earlier
/// one already turned into a step. Only peaks strictly newer than the last
/// consumed one are walked. Deduplication is by timestamp rather than list
/// position because a longer slice shifts the detection baseline and can
/// retroactively promote an earlier bump into a peak, renumbering the list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EngineState {
    pub current_position: Position,
    pub heading_bias: f64,
    pub last_step_timestamp: Option<f64>,
}

impl EngineState {
    pub fn seed(config: &TrackerConfig) -> Self {
        EngineState {
            current_position: config.initial_position,
            heading_bias: config.initial_heading_bias,
            last_step_timestamp: None,
        }
    }
}

/// What one window of processing did.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct WindowReport {
    /// Window skipped entirely (fewer than 2 samples on a sensor)
    pub skipped: bool,
    /// Step events emitted this window
    pub steps_emitted: usize,
    /// How many of those steps hit a wall
    pub collisions: usize,
}

/// Step-and-heading dead-reckoning engine.
///
/// Per window: preprocess the cumulative slices, detect step peaks, assign
/// Weinberg strides, and integrate each new step through the map matcher.
/// Windows must be processed in arrival order; the returned `EngineState`
/// from one call feeds the next.
pub struct PdrEngine {
    config: TrackerConfig,
    matcher: Option<MapMatcher>,
}

impl PdrEngine {
    /// Build an engine, validating the configuration up front. A `None`
    /// matcher runs pure dead reckoning with no map correction.
    pub fn new(config: TrackerConfig, matcher: Option<MapMatcher>) -> Result<Self> {
        config.validate()?;
        Ok(PdrEngine { config, matcher })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Recompute the derived motion signals for a window's cumulative
    /// slices. None when either sensor's sampling frequency is undefined.
    pub fn compute_frame(
        &self,
        accel: &[SensorSample],
        gyro: &[SensorSample],
    ) -> Option<MotionFrame> {
        let accel_fs = sampling_frequency(accel)?;
        let gyro_fs = sampling_frequency(gyro)?;

        let accel_norm = norms(accel);
        let smoothed_norm = moving_average(
            &accel_norm,
            window_samples(self.config.accel_lowpass_secs, accel_fs),
        );
        let heading = integrate_heading(gyro, self.config.gyro_axis, gyro_fs);
        let smoothed_heading = moving_average(
            &heading,
            window_samples(self.config.gyro_lowpass_secs, gyro_fs),
        );

        Some(MotionFrame {
            accel_norm,
            smoothed_norm,
            heading,
            smoothed_heading,
            accel_fs,
            gyro_fs,
        })
    }

    /// Process one window.
    ///
    /// `accel` and `gyro` are the cumulative slices from stream start.
    /// Corrected positions are appended to `track`; the updated state and a
    /// report of what happened come back to the caller.
    pub fn process_window(
        &self,
        mut state: EngineState,
        accel: &[SensorSample],
        gyro: &[SensorSample],
        track: &mut Track,
    ) -> (EngineState, WindowReport) {
        let mut report = WindowReport::default();

        let frame = match self.compute_frame(accel, gyro) {
            Some(frame) => frame,
            None => {
                // Degenerate window: no state mutation, no step work
                debug!(
                    "window skipped: {} accel / {} gyro samples",
                    accel.len(),
                    gyro.len()
                );
                report.skipped = true;
                return (state, report);
            }
        };

        let peaks = detect_peaks(
            &frame.smoothed_norm,
            window_samples(self.config.peak_distance_secs, frame.accel_fs),
            self.config.peak_height,
            baseline(&frame.smoothed_norm),
        );
        let strides = weinberg_strides(
            &frame.accel_norm,
            &peaks,
            self.config.weinberg_k,
            self.config.default_stride,
        );

        // Only peaks strictly newer than the last consumed step are new this
        // window; re-detected earlier peaks (including ones the shifted
        // baseline just promoted) are stale
        for (&peak, &stride) in peaks.iter().zip(strides.iter()) {
            let timestamp = accel[peak].timestamp;
            if state
                .last_step_timestamp
                .map_or(false, |last| timestamp <= last)
            {
                continue;
            }
            let event = StepEvent {
                sample_index: peak,
                timestamp,
                stride_length: stride,
            };
            let collided = self.integrate_step(&mut state, &frame, gyro, event, track);
            state.last_step_timestamp = Some(timestamp);
            report.steps_emitted += 1;
            if collided {
                report.collisions += 1;
            }
        }

        debug!(
            "window done: {} peaks total, {} new steps, {} collisions, bias {:.4} rad",
            peaks.len(),
            report.steps_emitted,
            report.collisions,
            state.heading_bias
        );
        (state, report)
    }

    /// Advance the state by one step event. Returns whether the step
    /// collided with the map.
    fn integrate_step(
        &self,
        state: &mut EngineState,
        frame: &MotionFrame,
        gyro: &[SensorSample],
        event: StepEvent,
        track: &mut Track,
    ) -> bool {
        // Nearest-neighbor join from the accel time grid onto the gyro grid
        let gyro_index = match nearest_index(gyro, event.timestamp) {
            Some(i) => i,
            None => return false,
        };
        let heading = frame.smoothed_heading[gyro_index] + state.heading_bias;

        let current = state.current_position;
        let candidate = Position::new(
            current.x + event.stride_length * heading.cos(),
            current.y + event.stride_length * heading.sin(),
            current.z,
        );

        let (corrected, bias_delta, collided) = match &self.matcher {
            Some(matcher) => {
                let outcome = matcher.match_step(current, candidate, heading);
                (outcome.corrected, outcome.bias_delta, outcome.collided)
            }
            None => (candidate, 0.0, false),
        };

        state.current_position = corrected;
        state.heading_bias += bias_delta;
        track.push(corrected);
        collided
    }
}

/// Index of the sample whose timestamp is nearest to `t`; the earlier sample
/// wins ties. None only for an empty slice.
fn nearest_index(samples: &[SensorSample], t: f64) -> Option<usize> {
    if samples.is_empty() {
        return None;
    }
    let after = samples.partition_point(|s| s.timestamp < t);
    if after == 0 {
        return Some(0);
    }
    if after == samples.len() {
        return Some(samples.len() - 1);
    }
    let before = after - 1;
    let d_before = (t - samples[before].timestamp).abs();
    let d_after = (samples[after].timestamp - t).abs();
    if d_before <= d_after {
        Some(before)
    } else {
        Some(after)
    }
}
