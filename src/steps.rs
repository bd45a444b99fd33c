//! Step detection over the smoothed acceleration norm, plus per-step stride
//! length from the Weinberg model.

/// Indices of step peaks in `signal`, ascending.
///
/// A peak is a sample that is the highest point within `min_distance`
/// samples on both sides and exceeds `baseline + min_height`. A flat-topped
/// plateau of equal maxima counts once, at its first index. An empty result
/// is valid; a quiet window simply has no steps.
pub fn detect_peaks(
    signal: &[f64],
    min_distance: usize,
    min_height: f64,
    baseline: f64,
) -> Vec<usize> {
    let min_distance = min_distance.max(1);
    let mut peaks = Vec::new();

    'candidates: for i in 0..signal.len() {
        if signal[i] - baseline < min_height {
            continue;
        }

        let start = i.saturating_sub(min_distance);
        let end = (i + min_distance).min(signal.len() - 1);
        for j in start..=end {
            // Equal height suppresses only from the left, so a plateau
            // keeps its first index
            let taller = if j < i {
                signal[j] >= signal[i]
            } else {
                j > i && signal[j] > signal[i]
            };
            if taller {
                continue 'candidates;
            }
        }
        peaks.push(i);
    }

    peaks
}

/// Mean of a signal, used as the gravity baseline for peak thresholding.
/// Empty signals get a baseline of 0.
pub fn baseline(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().sum::<f64>() / signal.len() as f64
}

/// Weinberg stride lengths, one per peak.
///
/// For peak `i` the stride is `k * (max - min)^0.25` of the unsmoothed
/// acceleration norm over `[prev_peak, peak_i)` (`[0, peak_0)` for the
/// first). Adjacent peaks leave a degenerate interval with no acceleration
/// range; those reuse the previous stride, or `default_stride` when there is
/// no previous one.
pub fn weinberg_strides(
    raw_norm: &[f64],
    peaks: &[usize],
    k: f64,
    default_stride: f64,
) -> Vec<f64> {
    let mut strides = Vec::with_capacity(peaks.len());
    let mut prev_peak = 0usize;
    let mut last_stride = default_stride;

    for &peak in peaks {
        let interval = &raw_norm[prev_peak.min(raw_norm.len())..peak.min(raw_norm.len())];
        let stride = match interval_range(interval) {
            Some(range) => k * range.powf(0.25),
            None => last_stride,
        };
        strides.push(stride);
        last_stride = stride;
        prev_peak = peak;
    }

    strides
}

/// Acceleration range over a stride interval; None when the interval is too
/// short to define one.
fn interval_range(interval: &[f64]) -> Option<f64> {
    if interval.len() < 2 {
        return None;
    }
    let mut max = interval[0];
    let mut min = interval[0];
    for &value in &interval[1..] {
        if value > max {
            max = value;
        }
        if value < min {
            min = value;
        }
    }
    Some(max - min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Flat signal with impulses of the given height at known indices
    fn impulse_train(len: usize, positions: &[usize], height: f64) -> Vec<f64> {
        let mut signal = vec![0.0; len];
        for &p in positions {
            signal[p] = height;
        }
        signal
    }

    #[test]
    fn test_detects_exact_impulse_positions() {
        let signal = impulse_train(100, &[10, 40, 75], 2.0);
        let peaks = detect_peaks(&signal, 5, 1.0, 0.0);
        assert_eq!(peaks, vec![10, 40, 75]);
    }

    #[test]
    fn test_no_peaks_is_valid() {
        let signal = vec![9.8; 50];
        let peaks = detect_peaks(&signal, 5, 1.0, baseline(&signal));
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_height_threshold_filters_small_peaks() {
        let mut signal = impulse_train(60, &[15], 2.0);
        signal[45] = 0.5; // below threshold
        let peaks = detect_peaks(&signal, 5, 1.0, 0.0);
        assert_eq!(peaks, vec![15]);
    }

    #[test]
    fn test_distance_suppresses_close_peaks() {
        // Two impulses 3 apart with min_distance 5: only the taller survives
        let mut signal = vec![0.0; 40];
        signal[20] = 3.0;
        signal[23] = 2.0;
        let peaks = detect_peaks(&signal, 5, 1.0, 0.0);
        assert_eq!(peaks, vec![20]);
    }

    #[test]
    fn test_flat_plateau_counts_once_at_first_index() {
        let mut signal = vec![0.0; 30];
        for i in 12..=14 {
            signal[i] = 2.0;
        }
        let peaks = detect_peaks(&signal, 5, 1.0, 0.0);
        assert_eq!(peaks, vec![12]);
    }

    #[test]
    fn test_baseline_shifts_threshold() {
        // Signal riding on gravity: peaks at 10.8 over a 9.8 baseline
        let mut signal = vec![9.8; 50];
        signal[25] = 10.8;
        let peaks = detect_peaks(&signal, 5, 0.5, baseline(&signal));
        assert_eq!(peaks, vec![25]);

        // Raising the threshold above the peak excess suppresses it
        let peaks = detect_peaks(&signal, 5, 1.5, baseline(&signal));
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_weinberg_unit_range() {
        // max - min = 1.0 over the interval, K = 0.45 => stride = 0.45
        let raw = vec![9.5, 10.0, 9.0, 9.8, 12.0];
        let strides = weinberg_strides(&raw, &[4], 0.45, 0.4);
        assert_eq!(strides.len(), 1);
        assert_relative_eq!(strides[0], 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_weinberg_quarter_power() {
        // range 16 => 16^0.25 = 2
        let raw = vec![0.0, 16.0, 8.0];
        let strides = weinberg_strides(&raw, &[2], 0.45, 0.4);
        assert_relative_eq!(strides[0], 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_first_interval_uses_default() {
        let raw = vec![9.8, 10.0, 9.6];
        let strides = weinberg_strides(&raw, &[0, 2], 0.45, 0.4);
        // First peak at index 0: interval [0, 0) is empty
        assert_relative_eq!(strides[0], 0.4);
        // Second interval [0, 2) has range 0.2
        assert_relative_eq!(strides[1], 0.45 * 0.2_f64.powf(0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_adjacent_peaks_reuse_previous_stride() {
        let raw = vec![9.0, 10.0, 11.0, 11.5];
        let strides = weinberg_strides(&raw, &[2, 3], 0.45, 0.4);
        // [0, 2) has range 1.0; [2, 3) is degenerate and reuses the stride
        assert_relative_eq!(strides[0], 0.45, epsilon = 1e-12);
        assert_relative_eq!(strides[1], 0.45, epsilon = 1e-12);
    }
}
