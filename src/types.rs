use serde::{Deserialize, Serialize};

/// One reading from an inertial sensor (accelerometer or gyroscope).
///
/// Timestamps are seconds from stream start. `accuracy` is the platform's
/// self-reported accuracy class and is carried through but never interpreted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl SensorSample {
    pub fn new(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        SensorSample {
            timestamp,
            x,
            y,
            z,
            accuracy: None,
        }
    }

    /// Euclidean norm of the 3-axis reading
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Estimated position in meters, world frame. Immutable value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }
}

/// A detected footstep: where it sits in the cumulative accel slice,
/// when it happened, and the stride length assigned to it.
#[derive(Clone, Copy, Debug)]
pub struct StepEvent {
    pub sample_index: usize,
    pub timestamp: f64,
    pub stride_length: f64,
}

/// Append-only position history. First element is the anchor position;
/// one element is appended per processed step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Track {
    positions: Vec<Position>,
}

impl Track {
    pub fn new(initial: Position) -> Self {
        Track {
            positions: vec![initial],
        }
    }

    pub fn push(&mut self, position: Position) {
        self.positions.push(position);
    }

    pub fn last(&self) -> Option<&Position> {
        self.positions.last()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_norm() {
        let sample = SensorSample::new(0.0, 3.0, 4.0, 0.0);
        assert_eq!(sample.norm(), 5.0);
    }

    #[test]
    fn test_track_append_only() {
        let mut track = Track::new(Position::new(1.0, 2.0, 0.0));
        assert_eq!(track.len(), 1);
        track.push(Position::new(1.4, 2.0, 0.0));
        assert_eq!(track.len(), 2);
        assert_eq!(track.last().unwrap().x, 1.4);
        assert_eq!(track.positions()[0].x, 1.0);
    }
}
