//! # Kinematic steering
//!
//! Converts a commanded twist (linear and angular velocity) into a steering
//! wheel angle using a bicycle model of the vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Velocities smaller than this are treated as zero.
const VEL_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic steering estimator, holding the vehicle geometry and limits.
#[derive(Debug, Clone, Copy)]
pub struct KinSteering {
    wheel_base_m: f64,
    steer_ratio: f64,
    max_lateral_accel: f64,
    max_steer_angle_rad: f64,

    /// If true the angular velocity is limited by the maximum lateral
    /// acceleration before estimating.
    limit_lat_accel: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinSteering {
    pub fn from_params(params: &Params) -> Self {
        Self {
            wheel_base_m: params.vehicle.wheel_base,
            steer_ratio: params.vehicle.steer_ratio,
            max_lateral_accel: params.vehicle.max_lateral_accel,
            max_steer_angle_rad: params.vehicle.max_steer_angle,
            limit_lat_accel: params.kin_limit_lat_accel
        }
    }

    /// Get the steering wheel angle for the given twist, clamped to the
    /// maximum steering angle of the vehicle.
    pub fn steer(&self, linear_ms: f64, angular_rads: f64) -> f64 {
        let mut angular_rads = angular_rads;

        if self.limit_lat_accel && linear_ms.abs() > VEL_EPSILON {
            let max_yaw_rate_rads = self.max_lateral_accel / linear_ms.abs();
            angular_rads = angular_rads.clamp(-max_yaw_rate_rads, max_yaw_rate_rads);
        }

        estimate(linear_ms, angular_rads, self.wheel_base_m, self.steer_ratio)
            .clamp(-self.max_steer_angle_rad, self.max_steer_angle_rad)
    }
}

/// Steering wheel angle from the bicycle model.
///
/// The turning radius is `r = v / w` and the angle `atan(L / r) * steer_ratio`.
/// A zero angular velocity (straight line, infinite radius) or a zero linear
/// velocity (no usable geometry) gives zero steering. When reversing the sign
/// of the angle flips, as the radius does.
pub fn estimate(linear_ms: f64, angular_rads: f64, wheel_base_m: f64, steer_ratio: f64) -> f64 {
    if !(linear_ms.is_finite() && angular_rads.is_finite()) {
        return 0f64
    }

    if angular_rads.abs() < VEL_EPSILON || linear_ms.abs() < VEL_EPSILON {
        return 0f64
    }

    let radius_m = linear_ms / angular_rads;

    (wheel_base_m / radius_m).atan() * steer_ratio
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    const L: f64 = 2.8498;
    const SR: f64 = 14.8;

    #[test]
    fn test_straight_line() {
        for &v in &[-5.0, 0.1, 1.0, 11.0, 40.0] {
            assert_eq!(estimate(v, 0.0, L, SR), 0.0);
        }
        assert_eq!(estimate(0.0, 0.3, L, SR), 0.0);
        assert_eq!(estimate(f64::NAN, 0.3, L, SR), 0.0);
    }

    #[test]
    fn test_bicycle_model() {
        let expected = (L / 20.0).atan() * SR;
        assert_abs_diff_eq!(estimate(10.0, 0.5, L, SR), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_sign_follows_angular_velocity() {
        for &w in &[0.01, 0.2, 1.0, 3.0] {
            assert!(estimate(5.0, w, L, SR) > 0.0);
            assert!(estimate(5.0, -w, L, SR) < 0.0);
        }
    }

    #[test]
    fn test_steer_clamped() {
        let kin = KinSteering::from_params(&Params::default());

        // Radius of 0.25 m is far beyond the steering lock
        assert_eq!(kin.steer(0.5, 2.0), 8.0);
        assert_eq!(kin.steer(0.5, -2.0), -8.0);
        assert_eq!(kin.steer(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_lateral_accel_limit() {
        let mut params = Params::default();
        let unlimited = KinSteering::from_params(&params);

        params.kin_limit_lat_accel = true;
        let limited = KinSteering::from_params(&params);

        // At 10 m/s the yaw rate is limited to 3 / 10
        assert_abs_diff_eq!(limited.steer(10.0, 1.0), unlimited.steer(10.0, 0.3), epsilon = 1e-12);
        assert_abs_diff_eq!(limited.steer(10.0, -1.0), unlimited.steer(10.0, -0.3), epsilon = 1e-12);

        // Below the limit nothing changes
        assert_eq!(limited.steer(10.0, 0.1), unlimited.steer(10.0, 0.1));
    }
}
