use std::path::Path;

use image::GrayImage;

use crate::config::MapCalibration;
use crate::error::{Result, TrackerError};

/// Decoded walkable/blocked grid with its world<->pixel calibration.
///
/// World (0, 0) maps to `calibration.origin_pixel`; pixel y grows downward
/// while world y grows upward, so the y axis flips in both transforms. The
/// grid is read-only once built and freely shared across steps.
#[derive(Clone, Debug)]
pub struct OccupancyMap {
    walkable: Vec<bool>,
    width: u32,
    height: u32,
    calibration: MapCalibration,
}

impl OccupancyMap {
    /// Build from an already-decoded walkable grid, row-major, `width *
    /// height` entries. This is the core contract; bitmap decoding is a
    /// convenience on top of it.
    pub fn from_grid(
        walkable: Vec<bool>,
        width: u32,
        height: u32,
        calibration: MapCalibration,
    ) -> Result<Self> {
        calibration.validate()?;
        if walkable.len() != (width as usize) * (height as usize) {
            return Err(TrackerError::InvalidCalibration(format!(
                "grid has {} cells, expected {}x{}",
                walkable.len(),
                width,
                height
            )));
        }
        Ok(OccupancyMap {
            walkable,
            width,
            height,
            calibration,
        })
    }

    /// Threshold a grayscale image into a walkable grid: pixel value above
    /// `calibration.walkable_threshold` means walkable.
    pub fn from_image(img: &GrayImage, calibration: MapCalibration) -> Result<Self> {
        let threshold = calibration.walkable_threshold;
        let walkable = img.pixels().map(|p| p.0[0] > threshold).collect();
        Self::from_grid(walkable, img.width(), img.height(), calibration)
    }

    /// Load and threshold a single-channel bitmap from disk.
    pub fn load<P: AsRef<Path>>(path: P, calibration: MapCalibration) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| TrackerError::MapLoad(format!("{}: {}", path.display(), e)))?
            .into_luma8();
        Self::from_image(&img, calibration)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn calibration(&self) -> &MapCalibration {
        &self.calibration
    }

    /// World meters -> pixel coordinates (nearest pixel). May land outside
    /// the grid; callers check `in_bounds` before indexing.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        let (px0, py0) = self.calibration.origin_pixel;
        let px = (px0 + x / self.calibration.resolution).round() as i64;
        let py = (py0 - y / self.calibration.resolution).round() as i64;
        (px, py)
    }

    /// Pixel coordinates -> world meters (z is never the map's concern).
    pub fn pixel_to_world(&self, px: i64, py: i64) -> (f64, f64) {
        let (px0, py0) = self.calibration.origin_pixel;
        let x = (px as f64 - px0) * self.calibration.resolution;
        let y = (py0 - py as f64) * self.calibration.resolution;
        (x, y)
    }

    pub fn in_bounds(&self, px: i64, py: i64) -> bool {
        px >= 0 && py >= 0 && (px as u32) < self.width && (py as u32) < self.height
    }

    /// Walkability of a pixel; out-of-bounds pixels count as blocked.
    pub fn is_walkable(&self, px: i64, py: i64) -> bool {
        if !self.in_bounds(px, py) {
            return false;
        }
        self.walkable[py as usize * self.width as usize + px as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn open_map(width: u32, height: u32, calibration: MapCalibration) -> OccupancyMap {
        let cells = vec![true; (width * height) as usize];
        OccupancyMap::from_grid(cells, width, height, calibration).unwrap()
    }

    #[test]
    fn test_grid_size_mismatch_is_fatal() {
        let result = OccupancyMap::from_grid(vec![true; 10], 5, 5, MapCalibration::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_origin_maps_to_origin_pixel() {
        let calibration = MapCalibration {
            resolution: 0.5,
            origin_pixel: (20.0, 30.0),
            ..Default::default()
        };
        let map = open_map(100, 100, calibration);
        assert_eq!(map.world_to_pixel(0.0, 0.0), (20, 30));

        let (x, y) = map.pixel_to_world(20, 30);
        assert_relative_eq!(x, 0.0);
        assert_relative_eq!(y, 0.0);
    }

    #[test]
    fn test_y_axis_inverted() {
        let calibration = MapCalibration {
            resolution: 0.5,
            origin_pixel: (20.0, 30.0),
            ..Default::default()
        };
        let map = open_map(100, 100, calibration);

        // Moving up in the world moves toward smaller pixel y
        assert_eq!(map.world_to_pixel(0.0, 2.0), (20, 26));
        // Moving right in the world moves toward larger pixel x
        assert_eq!(map.world_to_pixel(2.0, 0.0), (24, 30));
    }

    #[test]
    fn test_transform_roundtrip() {
        let calibration = MapCalibration {
            resolution: 0.25,
            origin_pixel: (10.0, 40.0),
            ..Default::default()
        };
        let map = open_map(64, 64, calibration);
        let (px, py) = map.world_to_pixel(3.5, -1.25);
        let (x, y) = map.pixel_to_world(px, py);
        assert_relative_eq!(x, 3.5, epsilon = 1e-9);
        assert_relative_eq!(y, -1.25, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_bounds_is_blocked() {
        let map = open_map(8, 8, MapCalibration::default());
        assert!(!map.is_walkable(-1, 0));
        assert!(!map.is_walkable(0, -1));
        assert!(!map.is_walkable(8, 0));
        assert!(!map.is_walkable(0, 8));
        assert!(map.is_walkable(0, 0));
    }

    #[test]
    fn test_threshold_from_image() {
        let img = GrayImage::from_fn(4, 1, |x, _| {
            // 0, 100, 200, 255 across the row
            image::Luma([match x {
                0 => 0u8,
                1 => 100,
                2 => 200,
                _ => 255,
            }])
        });
        let map = OccupancyMap::from_image(&img, MapCalibration::default()).unwrap();
        // Threshold 200 is exclusive: only 255 passes
        assert!(!map.is_walkable(0, 0));
        assert!(!map.is_walkable(1, 0));
        assert!(!map.is_walkable(2, 0));
        assert!(map.is_walkable(3, 0));
    }
}
