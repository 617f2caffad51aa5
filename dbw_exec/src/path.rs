//! # Path
//!
//! This module defines the path the vehicle is asked to follow. The path is
//! produced by the planner outside of this software and replaced wholesale
//! each time a new one arrives.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::WaypointMsg;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point on the path.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Waypoint {
    /// Position in the map frame
    pub position_m: Vector2<f64>,

    /// Heading of the path at this point (angle to the +ve map X axis)
    pub heading_rad: f64,
}

/// A path defining the desired trajectory of the vehicle.
///
/// Waypoints are ordered along the route, nearest first. The number of
/// waypoints left is used as a proxy for the distance remaining on the route.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Path {
    pub waypoints: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }
}

impl Path {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        Path {
            waypoints: Vec::new(),
        }
    }

    /// Produces a straight path of `num_points` waypoints starting at `from`
    /// along `heading_rad`, each separated by `point_sep_m`.
    pub fn straight(from: Vector2<f64>, heading_rad: f64, point_sep_m: f64, num_points: usize) -> Self {
        let (s, c) = heading_rad.sin_cos();
        let delta = Vector2::new(c, s) * point_sep_m;

        Path {
            waypoints: (0..num_points)
                .map(|i| Waypoint {
                    position_m: from + delta * i as f64,
                    heading_rad,
                })
                .collect(),
        }
    }

    /// Get the number of waypoints remaining in the path
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

impl From<Vec<WaypointMsg>> for Path {
    fn from(msgs: Vec<WaypointMsg>) -> Self {
        Path {
            waypoints: msgs
                .into_iter()
                .map(|m| Waypoint::new(m.x_m, m.y_m, m.yaw_rad))
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_straight_path() {
        let path = Path::straight(Vector2::new(1.0, 1.0), std::f64::consts::FRAC_PI_2, 0.5, 5);

        assert_eq!(path.len(), 5);
        assert_abs_diff_eq!(path.waypoints[4].position_m[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(path.waypoints[4].position_m[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_msgs() {
        let path = Path::from(vec![
            WaypointMsg { x_m: 0.0, y_m: 0.0, yaw_rad: 0.0 },
            WaypointMsg { x_m: 1.0, y_m: 0.5, yaw_rad: 0.4 },
        ]);

        assert_eq!(path.len(), 2);
        assert_eq!(path.waypoints[1], Waypoint::new(1.0, 0.5, 0.4));
        assert!(Path::new_empty().is_empty());
    }
}
