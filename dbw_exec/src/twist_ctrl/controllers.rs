//! # Twist controllers module
//!
//! This module provides the PID controllers used by twist control: a generic
//! clamped PID used for the throttle, and the steering controller which
//! drives the cross-track error to zero.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller with a clamped output.
///
/// While the output is saturated the integral is not accumulated, which stops
/// the integral winding up while the actuator can't follow the demand.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Minimum output
    min: f64,

    /// Maximum output
    max: f64,

    /// Previous error
    last_error: f64,

    /// The integral accumulation
    integral: f64
}

/// The steering controller.
///
/// Converts the cross-track error (meters, positive when the vehicle is to
/// the left of the path) into a steering wheel angle (radians, positive to
/// the left) that brings the vehicle back onto the path.
#[derive(Debug, Serialize, Clone)]
pub struct SteeringPid {
    pid: PidController
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains and output limits.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, min: f64, max: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            min, max,
            last_error: 0f64,
            integral: 0f64
        }
    }

    /// Get the value of the controller for the given error and the time
    /// elapsed since the previous step.
    ///
    /// If `dt_s` is not positive (first cycle, clock jumping backwards) the
    /// integral isn't accumulated and the derivative is taken as zero.
    ///
    /// A non-finite error is ignored: the state is left untouched and the
    /// output holds the clamped integral term.
    pub fn step(&mut self, error: f64, dt_s: f64) -> f64 {
        if !error.is_finite() {
            warn!("Non-finite PID error ({}), step ignored", error);
            return (self.k_i * self.integral).clamp(self.min, self.max)
        }

        let valid_dt = dt_s.is_finite() && dt_s > 0f64;

        // Accumulate the integral term into a candidate, which is only kept if
        // the output isn't saturated.
        let integral = if valid_dt {
            self.integral + error * dt_s
        }
        else {
            self.integral
        };

        let deriv = if valid_dt {
            (error - self.last_error) / dt_s
        }
        else {
            0f64
        };

        let raw =
            self.k_p * error
            + self.k_i * integral
            + self.k_d * deriv;

        let out = raw.clamp(self.min, self.max);

        // Anti-windup: only keep the new integral if the output wasn't
        // saturated.
        if out == raw {
            self.integral = integral;
        }

        self.last_error = error;

        trace!(
            "PID e: {:.4}, dt: {:.4}, I: {:.4}, D: {:.4}, raw: {:.4}, out: {:.4}",
            error, dt_s, self.integral, deriv, raw, out
        );

        out
    }

    /// Clear the integral and previous error.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.last_error = 0f64;
    }

    /// The integral accumulation
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// The output limits as `(min, max)`
    pub fn limits(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl SteeringPid {

    /// Create a new steering controller with the output limited to
    /// `[-limit_rad, limit_rad]`.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, limit_rad: f64) -> Self {
        Self {
            pid: PidController::new(k_p, k_i, k_d, -limit_rad, limit_rad)
        }
    }

    /// Get the steering demand for the given cross-track error.
    ///
    /// The setpoint is zero cross-track error, so the controller's error is
    /// the negated cross-track error.
    pub fn step(&mut self, cte_m: f64, dt_s: f64) -> f64 {
        self.pid.step(-cte_m, dt_s)
    }

    pub fn reset(&mut self) {
        self.pid.reset();
    }

    /// The underlying PID controller
    pub fn pid(&self) -> &PidController {
        &self.pid
    }
}
