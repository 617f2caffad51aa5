//! # Drive-by-wire Equipment Commands
//!
//! Demands sent to the throttle, brake and steering actuators. Each demand
//! carries its own `enable` flag, actuators ignore demands which are not
//! enabled.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Throttle pedal demand.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ThrottleCmd {
    /// If false the actuator shall ignore this demand
    pub enable: bool,

    /// Interpretation of `pedal_cmd`
    pub pedal_cmd_type: PedalCmdType,

    /// The pedal demand.
    ///
    /// Units: fraction of full travel in [0, 1] for `PedalCmdType::Percent`
    pub pedal_cmd: f64,
}

/// Brake pedal demand.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BrakeCmd {
    /// If false the actuator shall ignore this demand
    pub enable: bool,

    /// Interpretation of `pedal_cmd`
    pub pedal_cmd_type: PedalCmdType,

    /// The pedal demand.
    ///
    /// Units: Newton-meters for `PedalCmdType::Torque`
    pub pedal_cmd: f64,
}

/// Steering wheel demand.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SteeringCmd {
    /// If false the actuator shall ignore this demand
    pub enable: bool,

    /// The steering wheel angle, positive to the left.
    ///
    /// Units: radians
    pub steering_wheel_angle_cmd: f64,
}

/// The full set of demands produced by one control cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DbwDems {
    pub throttle: ThrottleCmd,
    pub brake: BrakeCmd,
    pub steering: SteeringCmd,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How a pedal demand is to be interpreted by the actuator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedalCmdType {
    /// Fraction of the pedal's full travel
    Percent,

    /// Torque at the wheels
    Torque,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl DbwDems {
    /// Build a set of enabled demands.
    pub fn new(throttle: f64, brake_nm: f64, steering_rad: f64) -> Self {
        Self {
            throttle: ThrottleCmd {
                enable: true,
                pedal_cmd_type: PedalCmdType::Percent,
                pedal_cmd: throttle,
            },
            brake: BrakeCmd {
                enable: true,
                pedal_cmd_type: PedalCmdType::Torque,
                pedal_cmd: brake_nm,
            },
            steering: SteeringCmd {
                enable: true,
                steering_wheel_angle_cmd: steering_rad,
            },
        }
    }

    /// Returns true if every demand in the set is enabled.
    pub fn is_enabled(&self) -> bool {
        self.throttle.enable && self.brake.enable && self.steering.enable
    }
}

impl Default for DbwDems {
    /// Zero demands, all disabled.
    fn default() -> Self {
        let mut dems = Self::new(0.0, 0.0, 0.0);
        dems.throttle.enable = false;
        dems.brake.enable = false;
        dems.steering.enable = false;
        dems
    }
}
