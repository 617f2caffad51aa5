//! # Route hazards
//!
//! Route hazards are environment specific slowdowns applied on top of the
//! general control law, for instance a section of the route where the
//! vehicle shall not accelerate hard. A hazard can only cap the throttle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::fmt::Debug;

// Internal
use super::TwistCtrlError;
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A policy limiting the throttle depending on where the vehicle is.
pub trait RouteHazard: Debug + Send {
    /// The maximum throttle allowed at the given pose, or `None` if this
    /// hazard doesn't apply there.
    fn throttle_limit(&self, pose: &Pose) -> Option<f64>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An axis aligned rectangle of the map in which the throttle is capped.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HazardZone {
    /// Name of the zone, used in logs
    pub name: String,

    pub min_x_m: f64,
    pub max_x_m: f64,
    pub min_y_m: f64,
    pub max_y_m: f64,

    /// Throttle cap inside the zone
    pub max_throttle: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HazardZone {
    /// Check the zone is a valid rectangle with a throttle cap in [0, 1].
    pub fn validate(&self) -> Result<(), TwistCtrlError> {
        let bounds = [self.min_x_m, self.max_x_m, self.min_y_m, self.max_y_m];

        if bounds.iter().any(|b| b.is_nan())
            || self.min_x_m > self.max_x_m
            || self.min_y_m > self.max_y_m
        {
            return Err(TwistCtrlError::InvalidParams(format!(
                "Hazard zone \"{}\" has invalid bounds x [{}, {}], y [{}, {}]",
                self.name, self.min_x_m, self.max_x_m, self.min_y_m, self.max_y_m
            )))
        }

        if !(0.0..=1.0).contains(&self.max_throttle) {
            return Err(TwistCtrlError::InvalidParams(format!(
                "Hazard zone \"{}\" throttle cap must be in [0, 1], found {}",
                self.name, self.max_throttle
            )))
        }

        Ok(())
    }

    /// True if the given map position lies in the zone, edges included.
    pub fn contains(&self, x_m: f64, y_m: f64) -> bool {
        (self.min_x_m..=self.max_x_m).contains(&x_m)
            && (self.min_y_m..=self.max_y_m).contains(&y_m)
    }
}

impl RouteHazard for HazardZone {
    fn throttle_limit(&self, pose: &Pose) -> Option<f64> {
        if self.contains(pose.position_m[0], pose.position_m[1]) {
            Some(self.max_throttle)
        }
        else {
            None
        }
    }
}
