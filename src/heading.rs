use crate::config::GyroAxis;
use crate::types::SensorSample;

/// Integrate gyroscope rotation rate into a heading signal.
///
/// `heading[i] = cumsum(rate[0..=i]) / fs`, one value per gyro sample.
/// Callers hand in the cumulative slice from stream start, so the integral
/// is continuous across window boundaries; integrating only the recent slice
/// would restart the heading at zero every window and produce discontinuous
/// tracks. Output is in radians and deliberately unwrapped.
pub fn integrate_heading(samples: &[SensorSample], axis: GyroAxis, fs: f64) -> Vec<f64> {
    let mut heading = Vec::with_capacity(samples.len());
    let mut sum = 0.0;
    for sample in samples {
        let rate = match axis {
            GyroAxis::X => sample.x,
            GyroAxis::Y => sample.y,
            GyroAxis::Z => sample.z,
        };
        sum += rate;
        heading.push(sum / fs);
    }
    heading
}

/// Wrap an angle to [-pi, pi].
///
/// Used only when comparing angles; headings themselves stay unwrapped.
pub fn wrap_angle(angle: f64) -> f64 {
    let mut wrapped = angle;
    while wrapped > std::f64::consts::PI {
        wrapped -= 2.0 * std::f64::consts::PI;
    }
    while wrapped < -std::f64::consts::PI {
        wrapped += 2.0 * std::f64::consts::PI;
    }
    wrapped
}

/// Signed angular difference `a - b`, wrapped to [-pi, pi].
pub fn angle_difference(a: f64, b: f64) -> f64 {
    wrap_angle(a - b)
}
