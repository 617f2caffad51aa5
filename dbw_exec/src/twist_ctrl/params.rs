//! Twist control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::path::Path;

// Internal
use super::{HazardZone, NavMode, TwistCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical constants of the vehicle, fixed for the controller's lifetime.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Mass of the loaded vehicle
    ///
    /// Units: kilograms
    pub vehicle_mass: f64,

    /// Distance between the front and rear axles
    ///
    /// Units: meters
    pub wheel_base: f64,

    /// Ratio of steering wheel angle to road wheel angle
    pub steer_ratio: f64,

    /// Maximum deceleration the brakes shall be asked for (negative)
    ///
    /// Units: meters/second^2
    pub decel_limit: f64,

    /// Radius of the wheels
    ///
    /// Units: meters
    pub wheel_radius: f64,

    /// Maximum lateral acceleration allowed when steering from a twist
    ///
    /// Units: meters/second^2
    pub max_lateral_accel: f64,

    /// Maximum steering wheel angle
    ///
    /// Units: radians
    pub max_steer_angle: f64,
}

/// Parameters for twist control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Vehicle constants
    pub vehicle: ControllerConfig,

    // ---- THROTTLE CONTROLLER ----

    /// Throttle controller proportional gain
    pub throttle_k_p: f64,

    /// Throttle controller integral gain
    pub throttle_k_i: f64,

    /// Throttle controller derivative gain
    pub throttle_k_d: f64,

    /// Throttle demand minimum limit
    pub min_throttle: f64,

    /// Throttle demand maximum limit, at most 1
    pub max_throttle: f64,

    // ---- STEERING CONTROLLER ----

    /// Steering controller proportional gain
    pub steer_k_p: f64,

    /// Steering controller integral gain
    pub steer_k_i: f64,

    /// Steering controller derivative gain
    pub steer_k_d: f64,

    /// Steering controller output limit, applied symmetrically.
    ///
    /// Units: radians
    pub steer_pid_limit_rad: f64,

    // ---- VELOCITY FILTER ----

    /// Time constant of the velocity low pass filter
    ///
    /// Units: seconds
    pub vel_lpf_tau_s: f64,

    /// Nominal sample period of the velocity low pass filter
    ///
    /// Units: seconds
    pub vel_lpf_ts_s: f64,

    // ---- OVERRIDES ----

    /// Throttle cap when approaching a traffic light
    pub tl_creep_throttle: f64,

    /// Speed above which the vehicle is braked hard before a traffic light
    ///
    /// Units: meters/second
    pub tl_fast_speed_ms: f64,

    /// Brake torque applied when approaching a traffic light too fast
    ///
    /// Units: Newton-meters
    pub tl_brake_torque_nm: f64,

    /// Brake torque for a commanded stop and for the end of the route
    ///
    /// Units: Newton-meters
    pub max_brake_torque_nm: f64,

    /// Brake torque applied when the vehicle is faster than demanded
    ///
    /// Units: Newton-meters
    pub coast_brake_torque_nm: f64,

    /// Stop the vehicle when fewer waypoints than this remain while path
    /// following
    pub path_follow_stop_waypoints: usize,

    /// Stop the vehicle when fewer waypoints than this remain while steering
    /// kinematically
    pub kinematic_stop_waypoints: usize,

    // ---- KINEMATIC STEERING ----

    /// If true the demanded angular velocity is limited so that the lateral
    /// acceleration stays below `vehicle.max_lateral_accel`
    #[serde(default)]
    pub kin_limit_lat_accel: bool,

    // ---- HAZARDS ----

    /// Zones of the route in which the throttle is capped
    #[serde(default)]
    pub hazard_zones: Vec<HazardZone>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ControllerConfig {
    /// Constants of the reference vehicle.
    fn default() -> Self {
        Self {
            vehicle_mass: 1736.35,
            wheel_base: 2.8498,
            steer_ratio: 14.8,
            decel_limit: -5.0,
            wheel_radius: 0.2413,
            max_lateral_accel: 3.0,
            max_steer_angle: 8.0,
        }
    }
}

impl ControllerConfig {
    /// The brake torque which decelerates the vehicle at `decel_limit`.
    ///
    /// Units: Newton-meters
    pub fn decel_limit_torque_nm(&self) -> f64 {
        self.decel_limit.abs() * self.vehicle_mass * self.wheel_radius
    }

    fn validate(&self) -> Result<(), TwistCtrlError> {
        let positive = [
            ("vehicle_mass", self.vehicle_mass),
            ("wheel_base", self.wheel_base),
            ("steer_ratio", self.steer_ratio),
            ("wheel_radius", self.wheel_radius),
            ("max_lateral_accel", self.max_lateral_accel),
            ("max_steer_angle", self.max_steer_angle),
        ];

        for (name, val) in positive.iter() {
            if !(val.is_finite() && *val > 0.0) {
                return Err(TwistCtrlError::InvalidParams(
                    format!("vehicle.{} must be positive, found {}", name, val)
                ))
            }
        }

        if !self.decel_limit.is_finite() {
            return Err(TwistCtrlError::InvalidParams(
                format!("vehicle.decel_limit must be finite, found {}", self.decel_limit)
            ))
        }

        Ok(())
    }
}

impl Default for Params {
    /// Tuning for the reference vehicle.
    fn default() -> Self {
        Self::with_vehicle(ControllerConfig::default())
    }
}

impl Params {

    /// Default tuning for the given vehicle.
    pub fn with_vehicle(vehicle: ControllerConfig) -> Self {
        Self {
            vehicle,
            throttle_k_p: 0.3,
            throttle_k_i: 0.1,
            throttle_k_d: 0.0,
            min_throttle: 0.0,
            max_throttle: 0.42,
            steer_k_p: 0.3,
            steer_k_i: 0.0,
            steer_k_d: 0.5,
            steer_pid_limit_rad: 1.7,
            vel_lpf_tau_s: 0.5,
            vel_lpf_ts_s: 0.02,
            tl_creep_throttle: 0.1,
            tl_fast_speed_ms: 4.47,
            tl_brake_torque_nm: 200.0,
            max_brake_torque_nm: 1500.0,
            coast_brake_torque_nm: 50.0,
            path_follow_stop_waypoints: 20,
            kinematic_stop_waypoints: 4,
            kin_limit_lat_accel: false,
            hazard_zones: Vec::new(),
        }
    }

    /// Load the parameters from a file relative to the parameters directory.
    pub fn load(param_file_path: &str) -> Result<Self, TwistCtrlError> {
        let params: Self = util::params::load(param_file_path)
            .map_err(TwistCtrlError::ParamLoadError)?;

        params.validate()?;

        Ok(params)
    }

    /// Load the parameters from an explicit file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, TwistCtrlError> {
        let params: Self = util::params::load_from(path)
            .map_err(TwistCtrlError::ParamLoadError)?;

        params.validate()?;

        Ok(params)
    }

    /// The number of waypoints below which the vehicle is brought to a stop
    /// in the given mode.
    pub fn stop_waypoints(&self, mode: NavMode) -> usize {
        match mode {
            NavMode::PathFollow => self.path_follow_stop_waypoints,
            NavMode::Kinematic => self.kinematic_stop_waypoints,
        }
    }

    /// Check that the parameters describe a usable controller.
    pub fn validate(&self) -> Result<(), TwistCtrlError> {
        self.vehicle.validate()?;

        let finite = [
            ("throttle_k_p", self.throttle_k_p),
            ("throttle_k_i", self.throttle_k_i),
            ("throttle_k_d", self.throttle_k_d),
            ("steer_k_p", self.steer_k_p),
            ("steer_k_i", self.steer_k_i),
            ("steer_k_d", self.steer_k_d),
        ];
        for (name, val) in finite.iter() {
            if !val.is_finite() {
                return Err(TwistCtrlError::InvalidParams(
                    format!("{} must be finite, found {}", name, val)
                ))
            }
        }

        if !(0.0 <= self.min_throttle
            && self.min_throttle <= self.max_throttle
            && self.max_throttle <= 1.0)
        {
            return Err(TwistCtrlError::InvalidParams(format!(
                "Throttle limits must satisfy 0 <= min <= max <= 1, found [{}, {}]",
                self.min_throttle, self.max_throttle
            )))
        }

        if !(self.steer_pid_limit_rad.is_finite() && self.steer_pid_limit_rad >= 0.0) {
            return Err(TwistCtrlError::InvalidParams(format!(
                "steer_pid_limit_rad must be non-negative, found {}",
                self.steer_pid_limit_rad
            )))
        }

        if !(self.vel_lpf_tau_s.is_finite() && self.vel_lpf_tau_s > 0.0
            && self.vel_lpf_ts_s.is_finite() && self.vel_lpf_ts_s > 0.0)
        {
            return Err(TwistCtrlError::InvalidParams(format!(
                "Filter time constant and sample period must be positive, found {} and {}",
                self.vel_lpf_tau_s, self.vel_lpf_ts_s
            )))
        }

        if !(0.0..=1.0).contains(&self.tl_creep_throttle) {
            return Err(TwistCtrlError::InvalidParams(format!(
                "tl_creep_throttle must be in [0, 1], found {}",
                self.tl_creep_throttle
            )))
        }

        let torques = [
            ("tl_brake_torque_nm", self.tl_brake_torque_nm),
            ("max_brake_torque_nm", self.max_brake_torque_nm),
            ("coast_brake_torque_nm", self.coast_brake_torque_nm),
            ("tl_fast_speed_ms", self.tl_fast_speed_ms),
        ];
        for (name, val) in torques.iter() {
            if !(val.is_finite() && *val >= 0.0) {
                return Err(TwistCtrlError::InvalidParams(
                    format!("{} must be non-negative, found {}", name, val)
                ))
            }
        }

        for zone in self.hazard_zones.iter() {
            zone.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_stop_waypoints_per_mode() {
        let params = Params::default();
        assert_eq!(params.stop_waypoints(NavMode::PathFollow), 20);
        assert_eq!(params.stop_waypoints(NavMode::Kinematic), 4);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.max_throttle = 1.5;
        assert!(matches!(params.validate(), Err(TwistCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.vel_lpf_tau_s = 0.0;
        assert!(matches!(params.validate(), Err(TwistCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.vehicle.wheel_base = -1.0;
        assert!(matches!(params.validate(), Err(TwistCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.steer_k_d = f64::NAN;
        assert!(matches!(params.validate(), Err(TwistCtrlError::InvalidParams(_))));
    }

    #[test]
    fn test_parse_from_toml() {
        let params: Params = util::params::from_str(r#"
            throttle_k_p = 0.3
            throttle_k_i = 0.1
            throttle_k_d = 0.0
            min_throttle = 0.0
            max_throttle = 0.42
            steer_k_p = 0.3
            steer_k_i = 0.0
            steer_k_d = 0.5
            steer_pid_limit_rad = 1.7
            vel_lpf_tau_s = 0.5
            vel_lpf_ts_s = 0.02
            tl_creep_throttle = 0.1
            tl_fast_speed_ms = 4.47
            tl_brake_torque_nm = 200.0
            max_brake_torque_nm = 1500.0
            coast_brake_torque_nm = 50.0
            path_follow_stop_waypoints = 20
            kinematic_stop_waypoints = 4

            [vehicle]
            vehicle_mass = 1736.35
            wheel_base = 2.8498
            steer_ratio = 14.8
            decel_limit = -5.0
            wheel_radius = 0.2413
            max_lateral_accel = 3.0
            max_steer_angle = 8.0

            [[hazard_zones]]
            name = "bridge"
            min_x_m = 1000.0
            max_x_m = 1400.0
            min_y_m = 2920.0
            max_y_m = 2980.0
            max_throttle = 0.15
        "#).unwrap();

        assert!(params.validate().is_ok());
        assert_eq!(params.vehicle, ControllerConfig::default());
        assert_eq!(params.hazard_zones.len(), 1);
        assert!(!params.kin_limit_lat_accel);
    }

    #[test]
    fn test_load_shipped_params() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../params/twist_ctrl.toml");
        let params = Params::load_from(path).unwrap();

        assert_eq!(params.vehicle, ControllerConfig::default());
        assert_eq!(params.hazard_zones.len(), 2);
        assert!(params.kin_limit_lat_accel);

        assert!(matches!(
            Params::load_from("no/such/params.toml"),
            Err(TwistCtrlError::ParamLoadError(_))
        ));
    }
}
