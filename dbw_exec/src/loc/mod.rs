//! # Localisation module
//!
//! Localisation itself is performed outside of this software, this module
//! only provides the pose type the control loop consumes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::PoseMsg;
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use util::maths::map_pi_to_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and attitude in the map frame) of the vehicle.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Pose {

    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude of the vehicle in the map frame.
    pub attitude_q: UnitQuaternion<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {

    /// Create a planar pose from a position and a heading.
    pub fn from_parts(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(x_m, y_m, 0.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, heading_rad)
        }
    }

    /// Return the heading (angle to the positive map X axis) of the vehicle in radians.
    ///
    /// Heading is given in the range [0, 2*pi), with 0 being in the map X direction.
    pub fn get_heading(&self) -> f64 {
        map_pi_to_2pi(self.attitude_q.euler_angles().2)
    }

    /// Return the 2D position of the vehicle
    pub fn position2(&self) -> Vector2<f64> {
        self.position_m.xy()
    }
}

/// Only the yaw of the message's orientation is kept, roll and pitch don't
/// matter to a vehicle driving on the road plane.
impl From<PoseMsg> for Pose {
    fn from(msg: PoseMsg) -> Self {
        Self {
            position_m: Vector3::new(msg.x_m, msg.y_m, msg.z_m),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, msg.orientation.yaw_rad())
        }
    }
}
