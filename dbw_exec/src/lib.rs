//! # Drive-by-wire library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the drive-by-wire crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - the latest inputs and outputs of the control loop
pub mod data_store;

/// Localisation types - the pose of the vehicle
pub mod loc;

/// Path types - the waypoints the vehicle shall follow
pub mod path;

/// Twist control module - computes throttle, brake and steering demands
pub mod twist_ctrl;
