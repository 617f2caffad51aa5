//! # Communications interface crate.
//!
//! Provides the message definitions exchanged between the drive-by-wire
//! control loop and the rest of the vehicle.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Input messages delivered to the control loop (vehicle state, commands and flags)
pub mod msg;

/// Command definitions for equipment (the drive-by-wire actuators)
pub mod eqpt;
