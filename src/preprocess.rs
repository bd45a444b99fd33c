use crate::types::SensorSample;

/// Per-window derived motion signals, index-aligned with the cumulative
/// sensor slices they were computed from.
#[derive(Clone, Debug, Default)]
pub struct MotionFrame {
    /// Raw acceleration norm per accel sample
    pub accel_norm: Vec<f64>,
    /// Low-passed acceleration norm (same length/indexing as `accel_norm`)
    pub smoothed_norm: Vec<f64>,
    /// Integrated heading per gyro sample (radians, unwrapped)
    pub heading: Vec<f64>,
    /// Low-passed heading (same length/indexing as `heading`)
    pub smoothed_heading: Vec<f64>,
    /// Accelerometer sampling frequency estimate (Hz)
    pub accel_fs: f64,
    /// Gyroscope sampling frequency estimate (Hz)
    pub gyro_fs: f64,
}

/// Estimate the sampling frequency of a slice as `count / (t_max - t_min)`.
///
/// Returns None when the slice has fewer than 2 samples or the span is
/// degenerate; the caller must skip the whole window in that case rather
/// than proceed with a zero or infinite rate.
pub fn sampling_frequency(samples: &[SensorSample]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let span = samples[samples.len() - 1].timestamp - samples[0].timestamp;
    if span <= 0.0 {
        return None;
    }
    let fs = samples.len() as f64 / span;
    if fs.is_finite() {
        Some(fs)
    } else {
        None
    }
}

/// Acceleration norm per sample
pub fn norms(samples: &[SensorSample]) -> Vec<f64> {
    samples.iter().map(|s| s.norm()).collect()
}

/// Convert a smoothing window from seconds to a sample count at `fs` Hz.
/// Always at least 1 so the average is defined.
pub fn window_samples(seconds: f64, fs: f64) -> usize {
    ((seconds * fs).round() as usize).max(1)
}

/// Trailing moving average over `window` samples, computed via prefix sums.
///
/// Warm-up policy: indices with fewer than `window` preceding samples use a
/// shrinking window (mean of everything seen so far), so the output has the
/// same length and indexing as the input. Downstream peak indices depend on
/// this alignment.
pub fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let window = window.max(1);

    let mut prefix = Vec::with_capacity(signal.len() + 1);
    prefix.push(0.0);
    let mut running = 0.0;
    for &value in signal {
        running += value;
        prefix.push(running);
    }

    let mut out = Vec::with_capacity(signal.len());
    for i in 0..signal.len() {
        let start = (i + 1).saturating_sub(window);
        let count = (i + 1) - start;
        out.push((prefix[i + 1] - prefix[start]) / count as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn samples_at(times: &[f64]) -> Vec<SensorSample> {
        times
            .iter()
            .map(|&t| SensorSample::new(t, 0.0, 0.0, 9.8))
            .collect()
    }

    #[test]
    fn test_fs_undefined_for_short_slices() {
        assert!(sampling_frequency(&[]).is_none());
        assert!(sampling_frequency(&samples_at(&[1.0])).is_none());
    }

    #[test]
    fn test_fs_undefined_for_zero_span() {
        assert!(sampling_frequency(&samples_at(&[2.0, 2.0])).is_none());
    }

    #[test]
    fn test_fs_estimate() {
        // 5 samples over 0.1s span
        let samples = samples_at(&[0.0, 0.025, 0.05, 0.075, 0.1]);
        let fs = sampling_frequency(&samples).unwrap();
        assert_relative_eq!(fs, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_window_samples_rounds() {
        assert_eq!(window_samples(0.5, 60.0), 30);
        assert_eq!(window_samples(0.49, 2.0), 1);
        // Never zero, even for tiny windows
        assert_eq!(window_samples(0.001, 10.0), 1);
    }

    #[test]
    fn test_moving_average_shrinking_warmup() {
        let out = moving_average(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(out.len(), 4);
        assert_relative_eq!(out[0], 2.0);
        assert_relative_eq!(out[1], 3.0); // mean of [2, 4]
        assert_relative_eq!(out[2], 4.0); // mean of [2, 4, 6]
        assert_relative_eq!(out[3], 6.0); // mean of [4, 6, 8]
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let signal = [1.5, -2.0, 7.25];
        assert_eq!(moving_average(&signal, 1), signal.to_vec());
    }

    #[test]
    fn test_moving_average_matches_naive() {
        let signal: Vec<f64> = (0..100).map(|i| ((i as f64) * 0.37).sin()).collect();
        let window = 7;
        let fast = moving_average(&signal, window);
        for i in 0..signal.len() {
            let start = (i + 1).saturating_sub(window);
            let slice = &signal[start..=i];
            let naive: f64 = slice.iter().sum::<f64>() / slice.len() as f64;
            assert_relative_eq!(fast[i], naive, epsilon = 1e-9);
        }
    }
}
