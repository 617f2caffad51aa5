//! # Twist control module
//!
//! Twist control converts the demanded motion of the vehicle (a linear and
//! angular velocity, or a planned path) into throttle, brake and steering
//! demands for the drive-by-wire actuators. It is run once per control cycle.
//!
//! Speed is regulated by a PID controller operating on the difference between
//! the demanded linear velocity and the measured velocity, the latter passed
//! through a low pass filter to suppress sensor noise.
//!
//! Steering is computed by one of two strategies, selected each cycle by the
//! navigation mode:
//!
//! - Path following: the path is transformed into the vehicle's local frame
//!   (X forward, Y to the left), a curve y(x) is fitted through it and
//!   evaluated at the vehicle's own position. This gives the cross-track
//!   error, which a second PID controller drives to zero.
//! - Kinematic: the commanded linear and angular velocities are converted
//!   into a steering angle using a bicycle model of the vehicle.
//!
//! The demands are then passed through a set of safety overrides (traffic
//! lights, commanded stops, route hazards and the end of the route) which may
//! cut the throttle and apply the brakes.
//!
//! Sign conventions: steering is positive to the left (right hand rule about
//! +Z), and the cross-track error is positive when the vehicle is to the left
//! of the path.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod hazard;
pub mod kin_steer;
pub mod lowpass;
pub mod params;
pub mod path_steer;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use hazard::{HazardZone, RouteHazard};
pub use kin_steer::KinSteering;
pub use lowpass::LowPassFilter;
pub use params::{ControllerConfig, Params};
pub use path_steer::{CteError, PathSteering};
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur when building the module.
#[derive(Debug, thiserror::Error)]
pub enum TwistCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}
