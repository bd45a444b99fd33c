use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use log::warn;

use crate::error::{Result, TrackerError};
use crate::types::SensorSample;

/// One batch handed to the engine: the samples that arrived since the last
/// window plus the cumulative slices from stream start. The engine operates
/// on the cumulative slices; the recent ones exist for callers that want to
/// know what is new.
#[derive(Clone, Copy, Debug)]
pub struct Window<'a> {
    pub accel_recent: &'a [SensorSample],
    pub gyro_recent: &'a [SensorSample],
    pub accel_cumulative: &'a [SensorSample],
    pub gyro_cumulative: &'a [SensorSample],
}

/// Replays recorded accelerometer/gyroscope logs as periodic windows, the
/// way a live pipeline would receive them.
///
/// Every call to `next_window` advances a timestamp cursor by `maxwait`
/// seconds and yields the recent and cumulative slices for both sensors.
/// The stream ends once the cursor passes the smaller of the two sensors'
/// final timestamps, so both cumulative slices always cover the full span
/// of the window.
pub struct WindowSource {
    accel: Vec<SensorSample>,
    gyro: Vec<SensorSample>,
    maxwait: f64,
    current_timestamp: f64,
    max_timestamp: f64,
}

impl WindowSource {
    /// Build a source from already-loaded sample streams. Samples are sorted
    /// by timestamp; the stream bound is the earlier of the two sensors'
    /// last timestamps.
    pub fn new(
        mut accel: Vec<SensorSample>,
        mut gyro: Vec<SensorSample>,
        maxwait: f64,
    ) -> Result<Self> {
        if !maxwait.is_finite() || maxwait <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "maxwait must be positive, got {}",
                maxwait
            )));
        }
        accel.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        gyro.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let accel_max = accel.last().map(|s| s.timestamp).unwrap_or(0.0);
        let gyro_max = gyro.last().map(|s| s.timestamp).unwrap_or(0.0);
        let max_timestamp = accel_max.min(gyro_max);

        Ok(WindowSource {
            accel,
            gyro,
            maxwait,
            current_timestamp: 0.0,
            max_timestamp,
        })
    }

    /// Load both sensor logs from semicolon-separated CSV files
    /// (`type;app_timestamp;sensor_timestamp;x;y;z;accuracy`), gzipped or
    /// plain.
    pub fn from_files<P: AsRef<Path>>(
        accel_path: P,
        gyro_path: P,
        maxwait: f64,
    ) -> Result<Self> {
        let accel = load_samples(accel_path.as_ref())?;
        let gyro = load_samples(gyro_path.as_ref())?;
        Self::new(accel, gyro, maxwait)
    }

    pub fn max_timestamp(&self) -> f64 {
        self.max_timestamp
    }

    /// Next window, or None once the stream bound is reached.
    pub fn next_window(&mut self) -> Option<Window<'_>> {
        if self.current_timestamp >= self.max_timestamp {
            return None;
        }

        let start = self.current_timestamp;
        let end = start + self.maxwait;

        let accel_start = lower_bound(&self.accel, start);
        let accel_end = lower_bound(&self.accel, end);
        let gyro_start = lower_bound(&self.gyro, start);
        let gyro_end = lower_bound(&self.gyro, end);

        self.current_timestamp = end;

        Some(Window {
            accel_recent: &self.accel[accel_start..accel_end],
            gyro_recent: &self.gyro[gyro_start..gyro_end],
            accel_cumulative: &self.accel[..accel_end],
            gyro_cumulative: &self.gyro[..gyro_end],
        })
    }
}

/// First index with timestamp >= t (slice sorted by timestamp)
fn lower_bound(samples: &[SensorSample], t: f64) -> usize {
    samples.partition_point(|s| s.timestamp < t)
}

/// Parse a semicolon-separated sensor log, gzipped or plain. Unparseable
/// lines are logged and skipped rather than failing the whole load.
pub fn load_samples(path: &Path) -> Result<Vec<SensorSample>> {
    let file = File::open(path)
        .map_err(|e| TrackerError::LogLoad(format!("{}: {}", path.display(), e)))?;

    let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut samples = Vec::new();
    let mut bad_lines = 0usize;
    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|e| TrackerError::LogLoad(format!("{}: {}", path.display(), e)))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Some(sample) => samples.push(sample),
            None => bad_lines += 1,
        }
    }

    if bad_lines > 0 {
        warn!("{}: skipped {} unparseable lines", path.display(), bad_lines);
    }
    if samples.is_empty() {
        return Err(TrackerError::LogLoad(format!(
            "{}: no samples parsed",
            path.display()
        )));
    }
    Ok(samples)
}

/// One log line: `TYPE;app_timestamp;sensor_timestamp;x;y;z;accuracy`.
/// The sensor-side timestamp is ignored; windowing runs on app timestamps.
fn parse_line(line: &str) -> Option<SensorSample> {
    let mut fields = line.split(';');

    let _sensor_type = fields.next()?;
    let timestamp: f64 = fields.next()?.trim().parse().ok()?;
    let _sensor_timestamp = fields.next()?;
    let x: f64 = fields.next()?.trim().parse().ok()?;
    let y: f64 = fields.next()?.trim().parse().ok()?;
    let z: f64 = fields.next()?.trim().parse().ok()?;
    let accuracy = fields
        .next()
        .and_then(|f| f.trim().parse::<f64>().ok());

    Some(SensorSample {
        timestamp,
        x,
        y,
        z,
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(times: &[f64]) -> Vec<SensorSample> {
        times
            .iter()
            .map(|&t| SensorSample::new(t, 0.0, 0.0, 9.8))
            .collect()
    }

    #[test]
    fn test_parse_line() {
        let sample = parse_line("ACCE;0.245;1234567;0.1;-0.2;9.81;3").unwrap();
        assert_eq!(sample.timestamp, 0.245);
        assert_eq!(sample.x, 0.1);
        assert_eq!(sample.y, -0.2);
        assert_eq!(sample.z, 9.81);
        assert_eq!(sample.accuracy, Some(3.0));
    }

    #[test]
    fn test_parse_line_missing_accuracy() {
        let sample = parse_line("GYRO;1.5;99;0.0;0.0;0.1").unwrap();
        assert_eq!(sample.accuracy, None);
        assert!(parse_line("not a sample line").is_none());
        assert!(parse_line("ACCE;abc;1;2;3;4;5").is_none());
    }

    #[test]
    fn test_windows_advance_by_maxwait() {
        let accel = stream(&[0.1, 0.3, 0.6, 0.9, 1.2, 1.4]);
        let gyro = stream(&[0.2, 0.4, 0.7, 1.0, 1.3, 1.5]);
        let mut source = WindowSource::new(accel, gyro, 0.5).unwrap();

        let w = source.next_window().unwrap();
        assert_eq!(w.accel_recent.len(), 2); // 0.1, 0.3
        assert_eq!(w.gyro_recent.len(), 2); // 0.2, 0.4
        assert_eq!(w.accel_cumulative.len(), 2);

        let w = source.next_window().unwrap();
        assert_eq!(w.accel_recent.len(), 2); // 0.6, 0.9
        assert_eq!(w.accel_cumulative.len(), 4);

        let w = source.next_window().unwrap();
        assert_eq!(w.accel_cumulative.len(), 6);

        // Cursor at 1.5 >= min(1.4, 1.5): stream exhausted
        assert!(source.next_window().is_none());
    }

    #[test]
    fn test_cumulative_is_superset_of_previous() {
        let accel = stream(&[0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.2]);
        let gyro = stream(&[0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.2]);
        let mut source = WindowSource::new(accel, gyro, 0.3).unwrap();

        let mut previous_len = 0;
        while let Some(w) = source.next_window() {
            assert!(w.accel_cumulative.len() >= previous_len);
            // Non-decreasing timestamps within the slice
            for pair in w.accel_cumulative.windows(2) {
                assert!(pair[0].timestamp <= pair[1].timestamp);
            }
            previous_len = w.accel_cumulative.len();
        }
    }

    #[test]
    fn test_bound_is_shorter_sensor() {
        let accel = stream(&[0.0, 0.5, 1.0, 5.0]);
        let gyro = stream(&[0.0, 0.5, 1.0]);
        let source = WindowSource::new(accel, gyro, 0.5).unwrap();
        assert_eq!(source.max_timestamp(), 1.0);
    }

    #[test]
    fn test_rejects_bad_maxwait() {
        assert!(WindowSource::new(stream(&[0.0]), stream(&[0.0]), 0.0).is_err());
        assert!(WindowSource::new(stream(&[0.0]), stream(&[0.0]), f64::NAN).is_err());
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let accel = stream(&[1.0, 0.2, 0.6]);
        let gyro = stream(&[0.9, 0.1, 0.5]);
        let mut source = WindowSource::new(accel, gyro, 2.0).unwrap();
        let w = source.next_window().unwrap();
        assert_eq!(w.accel_cumulative[0].timestamp, 0.2);
        assert_eq!(w.accel_cumulative[2].timestamp, 1.0);
    }
}
