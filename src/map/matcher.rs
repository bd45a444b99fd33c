use std::sync::Arc;

use log::debug;

use super::occupancy::OccupancyMap;
use crate::heading::{angle_difference, wrap_angle};
use crate::types::Position;

/// Result of matching one candidate step against the floorplan
#[derive(Clone, Copy, Debug)]
pub struct MatchOutcome {
    /// Position the engine should move to
    pub corrected: Position,
    /// Heading-bias adjustment to fold into subsequent steps (radians)
    pub bias_delta: f64,
    /// Whether the step ran into a blocked pixel
    pub collided: bool,
}

/// How a blocked candidate is corrected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrectionMode {
    /// Clamp at the wall and nudge the heading bias toward the local
    /// corridor direction. The default closed-loop behavior.
    CorridorFeedback,
    /// Snap a blocked candidate to the nearest walkable pixel within the
    /// calibration's search radius; no heading feedback.
    NearestWalkable,
}

/// Orientation of the corridor around a clamp pixel, from its four
/// axis-aligned neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Corridor {
    Horizontal,
    Vertical,
    Both,
    Neither,
}

/// Constrains dead-reckoned motion to walkable space.
///
/// # Architecture
/// - Rasterizes the segment between the previous and candidate positions
///   and walks it pixel by pixel until it leaves walkable space
/// - On collision, clamps at the last walkable pixel and classifies the
///   local corridor to derive a heading-bias nudge
/// - The nudge feeds back into the position integrator, so heading error is
///   corrected progressively over the following steps rather than in one go
pub struct MapMatcher {
    map: Arc<OccupancyMap>,
    mode: CorrectionMode,
    correction_increment: f64,
}

impl MapMatcher {
    /// Create a matcher in the default corridor-feedback mode.
    ///
    /// `correction_increment` is the per-collision bias nudge in radians.
    pub fn new(map: Arc<OccupancyMap>, correction_increment: f64) -> Self {
        MapMatcher {
            map,
            mode: CorrectionMode::CorridorFeedback,
            correction_increment,
        }
    }

    pub fn with_mode(mut self, mode: CorrectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn map(&self) -> &OccupancyMap {
        &self.map
    }

    /// Match one candidate step.
    ///
    /// # Arguments
    /// * `current` - Position the step starts from (already map-validated)
    /// * `candidate` - Dead-reckoned position the step would reach
    /// * `heading` - Heading used to compute the candidate, bias included
    ///
    /// Either endpoint landing outside the map bounds skips matching
    /// entirely and passes the candidate through unchanged.
    pub fn match_step(&self, current: Position, candidate: Position, heading: f64) -> MatchOutcome {
        let from = self.map.world_to_pixel(current.x, current.y);
        let to = self.map.world_to_pixel(candidate.x, candidate.y);

        if !self.map.in_bounds(from.0, from.1) || !self.map.in_bounds(to.0, to.1) {
            return MatchOutcome {
                corrected: candidate,
                bias_delta: 0.0,
                collided: false,
            };
        }

        match self.mode {
            CorrectionMode::CorridorFeedback => self.corridor_match(current, candidate, heading, from, to),
            CorrectionMode::NearestWalkable => self.nearest_walkable_match(current, candidate, to),
        }
    }

    fn corridor_match(
        &self,
        current: Position,
        candidate: Position,
        heading: f64,
        from: (i64, i64),
        to: (i64, i64),
    ) -> MatchOutcome {
        let mut last_walkable: Option<(i64, i64)> = None;

        for pixel in rasterize_line(from, to) {
            if self.map.is_walkable(pixel.0, pixel.1) {
                last_walkable = Some(pixel);
            } else {
                // Collision: clamp at the wall
                let clamp = match last_walkable {
                    Some(p) => p,
                    // Even the starting pixel is blocked; hold position
                    None => {
                        return MatchOutcome {
                            corrected: current,
                            bias_delta: 0.0,
                            collided: true,
                        }
                    }
                };

                let (x, y) = self.map.pixel_to_world(clamp.0, clamp.1);
                let corrected = Position::new(x, y, candidate.z);
                let bias_delta = self.corridor_bias(clamp, heading);
                debug!(
                    "collision at pixel ({}, {}), clamped to ({:.2}, {:.2}), bias_delta {:.4}",
                    pixel.0, pixel.1, x, y, bias_delta
                );
                return MatchOutcome {
                    corrected,
                    bias_delta,
                    collided: true,
                };
            }
        }

        // Destination reached without collision
        MatchOutcome {
            corrected: candidate,
            bias_delta: 0.0,
            collided: false,
        }
    }

    /// Bias nudge toward the corridor direction at a clamp pixel, or zero
    /// when no walkable neighbor gives a usable corridor.
    fn corridor_bias(&self, clamp: (i64, i64), heading: f64) -> f64 {
        let corridor_angle = match self.classify_corridor(clamp) {
            Corridor::Horizontal => horizontal_corridor_angle(heading),
            Corridor::Vertical => vertical_corridor_angle(heading),
            Corridor::Both => {
                // Prefer the orientation perpendicular to the heading's
                // dominant axis; that is the one the collision suggests we
                // should have been walking along.
                if heading.cos().abs() >= heading.sin().abs() {
                    vertical_corridor_angle(heading)
                } else {
                    horizontal_corridor_angle(heading)
                }
            }
            Corridor::Neither => return 0.0,
        };

        let diff = angle_difference(corridor_angle, wrap_angle(heading));
        self.correction_increment * sign(diff)
    }

    fn classify_corridor(&self, (px, py): (i64, i64)) -> Corridor {
        let horizontal =
            self.map.is_walkable(px - 1, py) || self.map.is_walkable(px + 1, py);
        let vertical =
            self.map.is_walkable(px, py - 1) || self.map.is_walkable(px, py + 1);
        match (horizontal, vertical) {
            (true, true) => Corridor::Both,
            (true, false) => Corridor::Horizontal,
            (false, true) => Corridor::Vertical,
            (false, false) => Corridor::Neither,
        }
    }

    /// Non-feedback variant: keep the candidate if walkable, otherwise snap
    /// it to the nearest walkable pixel within the search radius.
    fn nearest_walkable_match(
        &self,
        current: Position,
        candidate: Position,
        to: (i64, i64),
    ) -> MatchOutcome {
        if self.map.is_walkable(to.0, to.1) {
            return MatchOutcome {
                corrected: candidate,
                bias_delta: 0.0,
                collided: false,
            };
        }

        let radius = self.map.calibration().neighbor_search_radius as i64;
        let mut best: Option<((i64, i64), i64)> = None;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let pixel = (to.0 + dx, to.1 + dy);
                if !self.map.is_walkable(pixel.0, pixel.1) {
                    continue;
                }
                let dist_sq = dx * dx + dy * dy;
                if best.map(|(_, d)| dist_sq < d).unwrap_or(true) {
                    best = Some((pixel, dist_sq));
                }
            }
        }

        match best {
            Some((pixel, _)) => {
                let (x, y) = self.map.pixel_to_world(pixel.0, pixel.1);
                MatchOutcome {
                    corrected: Position::new(x, y, candidate.z),
                    bias_delta: 0.0,
                    collided: true,
                }
            }
            // Nothing walkable in range; hold position
            None => MatchOutcome {
                corrected: current,
                bias_delta: 0.0,
                collided: true,
            },
        }
    }
}

/// Corridor angle for a horizontal (pixel-row) corridor, picking the world
/// direction closer to the current heading.
fn horizontal_corridor_angle(heading: f64) -> f64 {
    if heading.cos() >= 0.0 {
        0.0
    } else {
        std::f64::consts::PI
    }
}

/// Corridor angle for a vertical (pixel-column) corridor; pixel columns run
/// along the world y axis.
fn vertical_corridor_angle(heading: f64) -> f64 {
    if heading.sin() >= 0.0 {
        std::f64::consts::FRAC_PI_2
    } else {
        -std::f64::consts::FRAC_PI_2
    }
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Integer line rasterization between two pixels, endpoints included.
///
/// Standard Bresenham, symmetric in both axes so the walk behaves the same
/// for shallow and steep segments.
pub fn rasterize_line(from: (i64, i64), to: (i64, i64)) -> Vec<(i64, i64)> {
    let (mut x, mut y) = from;
    let (x1, y1) = to;

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut pixels = Vec::with_capacity((dx - dy) as usize + 1);
    loop {
        pixels.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    pixels
}
