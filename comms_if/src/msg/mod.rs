//! # Input message module
//!
//! Messages delivered to the drive-by-wire control loop. Each message updates
//! one piece of the loop's view of the world (the enable flag, the current
//! velocity, the commanded twist, and so on).
//!
//! Messages are serialised as JSON objects of the form
//! `{"type": "<MSG_TYPE>", "payload": <payload>}`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static MSG_TYPES: [&str; 7] = [
    "DBW_ENABLED",
    "CURRENT_VELOCITY",
    "TWIST_CMD",
    "CURRENT_POSE",
    "FINAL_WAYPOINTS",
    "TRAFFIC_LIGHT_AHEAD",
    "NAV_TYPE",
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the vehicle in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseMsg {
    pub x_m: f64,
    pub y_m: f64,

    #[serde(default)]
    pub z_m: f64,

    pub orientation: OrientationMsg,
}

/// A single waypoint of the planned path, in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointMsg {
    pub x_m: f64,
    pub y_m: f64,

    /// Heading of the path at this waypoint (angle to the map +X axis)
    #[serde(default)]
    pub yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An input message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputMsg {
    /// Whether the drive-by-wire system is in control of the vehicle
    DbwEnabled(bool),

    /// Measured longitudinal velocity of the vehicle
    CurrentVelocity {
        linear_ms: f64,
    },

    /// The commanded motion
    TwistCmd {
        linear_ms: f64,
        angular_rads: f64,
    },

    /// Measured pose of the vehicle
    CurrentPose(PoseMsg),

    /// The remaining waypoints of the planned path, nearest first
    FinalWaypoints(Vec<WaypointMsg>),

    /// True when the vehicle is approaching a traffic light it must stop at
    TrafficLightAhead(bool),

    /// The steering strategy requested by the planner
    NavType(NavType),
}

/// Orientation of a pose, either as a full quaternion or as a yaw angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrientationMsg {
    Quaternion { x: f64, y: f64, z: f64, w: f64 },
    Yaw { yaw_rad: f64 },
}

/// Steering strategy requested by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavType {
    /// Steer onto the planned path using the cross-track error
    PathFollow,

    /// Steer from the commanded linear and angular velocities
    Kinematic,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum MsgParseError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Message has an invalid type ({0})")]
    InvalidType(String),

    #[error("Message of type {0} is expected to have a payload but it doesn't")]
    MissingPayload(String),

    #[error("Message of type {0} has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputMsg {

    /// Parse a new message from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, MsgParseError> {
        // Parse the JSON string into a value
        let val: Value = serde_json::from_str(json_str)
            .map_err(MsgParseError::InvalidJson)?;

        // Get the type of the message
        let msg_type = match val["type"].as_str() {
            Some(s) => s.to_string(),
            None => return Err(MsgParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        if !MSG_TYPES.contains(&msg_type.as_str()) {
            return Err(MsgParseError::InvalidType(
                format!("{} is not a recognised message type", msg_type)
            ))
        }

        // Every message carries a payload
        if val["payload"].is_null() {
            return Err(MsgParseError::MissingPayload(msg_type))
        }

        serde_json::from_value(val)
            .map_err(|e| MsgParseError::InvalidPayload(msg_type, e))
    }

    /// Serialise the message into a JSON packet
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl OrientationMsg {
    /// Get the yaw (rotation about +Z) described by this orientation.
    ///
    /// Quaternions don't need to be normalised.
    pub fn yaw_rad(&self) -> f64 {
        match *self {
            OrientationMsg::Yaw { yaw_rad } => yaw_rad,
            OrientationMsg::Quaternion { x, y, z, w } => {
                let norm_sq = x * x + y * y + z * z + w * w;
                let siny_cosp = 2.0 * (w * z + x * y);
                let cosy_cosp = norm_sq - 2.0 * (y * y + z * z);
                siny_cosp.atan2(cosy_cosp)
            }
        }
    }
}
