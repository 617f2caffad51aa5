//! # Path following steering
//!
//! Steering from the cross-track error to the current path. The path is
//! transformed into the vehicle's local frame (origin at the vehicle, X along
//! the heading, Y to the left), a curve `y(x)` is fitted through the local
//! waypoints and evaluated at `x = 0`. The cross-track error is `-y(0)`, i.e.
//! positive when the vehicle is to the left of the path.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use thiserror::Error;

// Internal
use super::SteeringPid;
use crate::{loc::Pose, path::Path};
use util::maths::{interp_linear, interp_quadratic, rotate_2d};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Local waypoints closer than this along X are treated as the same sample.
const DUPLICATE_X_TOLERANCE_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path following steering estimator.
#[derive(Debug, Clone)]
pub struct PathSteering {
    pid: SteeringPid,

    /// The reason the cross-track error couldn't be computed last cycle, used
    /// to only report a degraded path once.
    last_fault: Option<CteError>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons the cross-track error can't be computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum CteError {
    #[error("The pose of the vehicle is not known")]
    NoPose,

    #[error("No path has been received")]
    NoPath,

    #[error("The path contains no waypoints")]
    EmptyPath,

    #[error("The path only has {0} distinct waypoint(s) in the local frame, at least 2 are needed")]
    DegenerateFit(usize)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathSteering {
    pub fn new(pid: SteeringPid) -> Self {
        Self {
            pid,
            last_fault: None
        }
    }

    /// Estimate the steering demand from the current pose and path.
    ///
    /// Returns the steering angle and the cross-track error if it could be
    /// computed. When it can't the steering is zero and the controller isn't
    /// stepped.
    pub fn estimate(
        &mut self,
        pose: Option<&Pose>,
        path: Option<&Path>,
        dt_s: f64
    ) -> (f64, Option<f64>) {

        let cte = match (pose, path) {
            (None, _) => Err(CteError::NoPose),
            (_, None) => Err(CteError::NoPath),
            (Some(pose), Some(path)) => calc_cross_track_error(pose, path)
        };

        match cte {
            Ok(cte_m) => {
                if let Some(fault) = self.last_fault.take() {
                    info!("Cross-track error available again (was: {})", fault);
                }

                (self.pid.step(cte_m, dt_s), Some(cte_m))
            },
            Err(e) => {
                if self.last_fault != Some(e) {
                    warn!("Cannot follow the path, steering set to zero: {}", e);
                    self.last_fault = Some(e);
                }

                (0f64, None)
            }
        }
    }

    /// The fault preventing path following in the last cycle, if any.
    pub fn last_fault(&self) -> Option<CteError> {
        self.last_fault
    }

    pub fn reset(&mut self) {
        self.pid.reset();
        self.last_fault = None;
    }
}

/// Calculate the cross-track error of the vehicle to the path.
///
/// With three or more distinct local waypoints a quadratic spline is
/// fitted, with two a straight line. Either is extrapolated if the vehicle is
/// not between the waypoints.
///
/// Units: meters, positive when the vehicle is left of the path.
pub fn calc_cross_track_error(pose: &Pose, path: &Path) -> Result<f64, CteError> {
    if path.is_empty() {
        return Err(CteError::EmptyPath)
    }

    let origin = pose.position2();
    let heading_rad = pose.get_heading();

    // Transform into the local frame, dropping anything non-finite
    let mut local: Vec<(f64, f64)> = path.waypoints
        .iter()
        .map(|wp| {
            let d = wp.position_m - origin;
            rotate_2d(d[0], d[1], -heading_rad)
        })
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    // Sort along X and drop points which share an abscissa, the fit needs
    // strictly increasing X.
    local.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    local.dedup_by(|b, a| (b.0 - a.0).abs() < DUPLICATE_X_TOLERANCE_M);

    let y_at_vehicle = match local.len() {
        0 | 1 => None,
        2 => interp_linear(local[0], local[1], 0f64),
        _ => {
            let (xs, ys): (Vec<f64>, Vec<f64>) = local.iter().cloned().unzip();
            interp_quadratic(&xs, &ys, 0f64)
        }
    };

    match y_at_vehicle {
        Some(y) => Ok(-y),
        None => Err(CteError::DegenerateFit(local.len()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::Waypoint;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector2;
    use std::f64::consts::FRAC_PI_2;

    const DT: f64 = 0.02;

    fn steering() -> PathSteering {
        PathSteering::new(SteeringPid::new(0.3, 0.0, 0.5, 1.7))
    }

    fn x_axis_path() -> Path {
        Path::straight(Vector2::new(-5.0, 0.0), 0.0, 1.0, 30)
    }

    #[test]
    fn test_on_path() {
        let pose = Pose::from_parts(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(calc_cross_track_error(&pose, &x_axis_path()).unwrap(), 0.0, epsilon = 1e-9);

        let mut steer = steering();
        let (angle, cte) = steer.estimate(Some(&pose), Some(&x_axis_path()), DT);
        assert_abs_diff_eq!(angle, 0.0, epsilon = 1e-6);
        assert!(cte.is_some());
    }

    #[test]
    fn test_offset_sign() {
        let path = x_axis_path();

        // Vehicle left of the path
        let left = Pose::from_parts(0.0, 1.0, 0.0);
        assert_abs_diff_eq!(calc_cross_track_error(&left, &path).unwrap(), 1.0, epsilon = 1e-9);
        let (angle, _) = steering().estimate(Some(&left), Some(&path), DT);
        assert!(angle < 0.0);

        // Vehicle right of the path
        let right = Pose::from_parts(0.0, -1.0, 0.0);
        assert_abs_diff_eq!(calc_cross_track_error(&right, &path).unwrap(), -1.0, epsilon = 1e-9);
        let (angle, _) = steering().estimate(Some(&right), Some(&path), DT);
        assert!(angle > 0.0);
    }

    #[test]
    fn test_rotated_frame() {
        // Path heading north along x = 0, vehicle facing north at x = -1 is
        // on the left of the path.
        let path = Path::straight(Vector2::new(0.0, -3.0), FRAC_PI_2, 0.5, 20);
        let pose = Pose::from_parts(-1.0, 0.0, FRAC_PI_2);

        assert_abs_diff_eq!(calc_cross_track_error(&pose, &path).unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_curved_path() {
        // y = 0.1 x^2 + 0.5, the vehicle at the origin is 0.5 m right of it
        let path = Path {
            waypoints: (-4..10)
                .map(|i| {
                    let x = i as f64;
                    Waypoint::new(x, 0.1 * x * x + 0.5, 0.0)
                })
                .collect()
        };
        let pose = Pose::from_parts(0.0, 0.0, 0.0);

        assert_abs_diff_eq!(calc_cross_track_error(&pose, &path).unwrap(), -0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_extrapolates_ahead_of_path() {
        // Path starts 5 m ahead of the vehicle and runs 2 m to its left
        let path = Path::straight(Vector2::new(5.0, 2.0), 0.0, 1.0, 10);
        let pose = Pose::from_parts(0.0, 0.0, 0.0);

        assert_abs_diff_eq!(calc_cross_track_error(&pose, &path).unwrap(), -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_fallback() {
        let path = Path {
            waypoints: vec![Waypoint::new(-1.0, 2.0, 0.0), Waypoint::new(1.0, 4.0, 0.0)]
        };
        let pose = Pose::from_parts(0.0, 0.0, 0.0);

        assert_abs_diff_eq!(calc_cross_track_error(&pose, &path).unwrap(), -3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_paths() {
        let pose = Pose::from_parts(0.0, 0.0, 0.0);

        let single = Path { waypoints: vec![Waypoint::new(3.0, 1.0, 0.0)] };
        assert_eq!(calc_cross_track_error(&pose, &single), Err(CteError::DegenerateFit(1)));

        let stacked = Path { waypoints: vec![Waypoint::new(3.0, 1.0, 0.0); 5] };
        assert_eq!(calc_cross_track_error(&pose, &stacked), Err(CteError::DegenerateFit(1)));

        assert_eq!(calc_cross_track_error(&pose, &Path::new_empty()), Err(CteError::EmptyPath));
    }

    #[test]
    fn test_missing_inputs_give_zero_steering() {
        let pose = Pose::from_parts(0.0, 3.0, 0.0);
        let path = x_axis_path();
        let mut steer = steering();

        assert_eq!(steer.estimate(None, Some(&path), DT), (0.0, None));
        assert_eq!(steer.last_fault(), Some(CteError::NoPose));

        assert_eq!(steer.estimate(Some(&pose), None, DT), (0.0, None));
        assert_eq!(steer.last_fault(), Some(CteError::NoPath));

        assert_eq!(steer.estimate(Some(&pose), Some(&Path::new_empty()), DT), (0.0, None));
        assert_eq!(steer.last_fault(), Some(CteError::EmptyPath));

        // Recovery clears the fault
        let (_, cte) = steer.estimate(Some(&pose), Some(&path), DT);
        assert!(cte.is_some());
        assert_eq!(steer.last_fault(), None);
    }

    #[test]
    fn test_reset() {
        let pose = Pose::from_parts(0.0, 1.0, 0.0);
        let path = x_axis_path();

        let mut fresh = steering();
        let mut used = steering();
        for _ in 0..10 {
            used.estimate(Some(&pose), Some(&path), DT);
        }
        used.estimate(None, Some(&path), DT);
        used.reset();

        assert_eq!(used.last_fault(), None);
        assert_eq!(
            used.estimate(Some(&pose), Some(&path), DT),
            fresh.estimate(Some(&pose), Some(&path), DT)
        );
    }
}
