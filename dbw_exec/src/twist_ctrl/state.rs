//! Twist control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::convert::Infallible;

// Internal
use super::*;
use crate::{loc::Pose, path::Path};
use comms_if::{eqpt::dbw::DbwDems, msg::NavType};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The twist controller.
///
/// Owns the state which persists between cycles: the PID accumulators, the
/// velocity filter memory and the time of the previous enabled cycle.
#[derive(Debug)]
pub struct Controller {
    params: Params,

    throttle_pid: PidController,
    path_steer: PathSteering,
    kin_steer: KinSteering,
    vel_lpf: LowPassFilter,

    /// Policies which may cap the throttle depending on the pose
    hazards: Vec<Box<dyn RouteHazard>>,

    /// Caller time of the previous enabled cycle
    prev_time_s: Option<f64>,
}

/// Input data to twist control, a snapshot of the latest external state.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Time of this cycle on the caller's clock
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Measured linear velocity
    ///
    /// Units: meters/second
    pub current_vel_ms: f64,

    /// If false a human is driving, all demands are zero.
    pub dbw_enabled: bool,

    /// Demanded linear velocity
    ///
    /// Units: meters/second
    pub target_linear_ms: f64,

    /// Demanded angular velocity, positive to the left
    ///
    /// Units: radians/second
    pub target_angular_rads: f64,

    /// The remaining path, if one has been received
    pub path: Option<Path>,

    /// The pose of the vehicle, if known
    pub pose: Option<Pose>,

    /// True if a traffic light is close ahead
    pub traffic_light_ahead: bool,

    /// How the steering shall be computed this cycle
    pub nav_mode: NavMode,
}

/// Demands produced by twist control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputData {
    /// Throttle pedal demand in [0, 1]
    pub throttle: f64,

    /// Brake torque demand, never negative
    ///
    /// Units: Newton-meters
    pub brake_nm: f64,

    /// Steering wheel angle demand, positive to the left
    ///
    /// Units: radians
    pub steering_rad: f64,
}

/// Monitoring quantities and the overrides which fired during one cycle.
///
/// Kept flat so it can be archived as a CSV row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// Time since the previous enabled cycle, zero on the first one
    pub dt_s: f64,

    pub filtered_vel_ms: f64,

    /// Demanded minus filtered velocity
    pub vel_error_ms: f64,

    /// Cross-track error, if it was computed this cycle
    pub cte_m: Option<f64>,

    /// Where the steering demand came from
    pub steer_source: SteerSource,

    /// Throttle capped while approaching a traffic light
    pub tl_creep: bool,

    /// Braking hard as the traffic light was approached too fast
    pub tl_hard_stop: bool,

    /// Commanded stop (zero target velocity)
    pub full_stop: bool,

    /// Light braking as the vehicle is faster than demanded
    pub coast_brake: bool,

    /// Throttle capped by a route hazard
    pub hazard_limited: bool,

    /// Stopping as the end of the route is near
    pub route_end_stop: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The steering strategy to use in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavMode {
    PathFollow,
    Kinematic,
}

/// Source of the steering demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SteerSource {
    /// Drive-by-wire disabled
    Disabled,

    /// From the cross-track error to the path
    PathFollow,

    /// Path following was requested but the cross-track error couldn't be
    /// computed, steering is zero.
    PathUnavailable,

    /// From the commanded twist
    Kinematic,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for NavMode {
    fn default() -> Self {
        NavMode::PathFollow
    }
}

impl From<NavType> for NavMode {
    fn from(nav_type: NavType) -> Self {
        match nav_type {
            NavType::PathFollow => NavMode::PathFollow,
            NavType::Kinematic => NavMode::Kinematic,
        }
    }
}

impl Default for SteerSource {
    fn default() -> Self {
        SteerSource::Disabled
    }
}

impl OutputData {
    /// Convert into enabled actuator demands.
    pub fn to_dems(&self) -> DbwDems {
        DbwDems::new(self.throttle, self.brake_nm, self.steering_rad)
    }
}

impl util::module::State for Controller {
    type InitData = Params;
    type InitError = TwistCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    fn init(params: Params) -> Result<Self, TwistCtrlError> {
        Controller::new(params)
    }

    fn proc(
        &mut self,
        input_data: &InputData
    ) -> Result<(OutputData, StatusReport), Infallible> {
        Ok(self.control(input_data))
    }

    fn reset(&mut self) {
        Controller::reset(self)
    }
}

impl Controller {

    /// Build a controller from the given parameters, which are validated
    /// first.
    pub fn new(params: Params) -> Result<Self, TwistCtrlError> {
        params.validate()?;

        let throttle_pid = PidController::new(
            params.throttle_k_p,
            params.throttle_k_i,
            params.throttle_k_d,
            params.min_throttle,
            params.max_throttle
        );

        let path_steer = PathSteering::new(SteeringPid::new(
            params.steer_k_p,
            params.steer_k_i,
            params.steer_k_d,
            params.steer_pid_limit_rad
        ));

        let hazards: Vec<Box<dyn RouteHazard>> = params.hazard_zones
            .iter()
            .cloned()
            .map(|z| Box::new(z) as Box<dyn RouteHazard>)
            .collect();

        Ok(Self {
            throttle_pid,
            path_steer,
            kin_steer: KinSteering::from_params(&params),
            vel_lpf: LowPassFilter::new(params.vel_lpf_tau_s, params.vel_lpf_ts_s),
            hazards,
            prev_time_s: None,
            params
        })
    }

    /// Build a controller for the given vehicle with the default tuning.
    pub fn from_config(config: ControllerConfig) -> Result<Self, TwistCtrlError> {
        Self::new(Params::with_vehicle(config))
    }

    /// Add a route hazard policy.
    pub fn add_hazard(&mut self, hazard: Box<dyn RouteHazard>) {
        self.hazards.push(hazard);
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Return the controller to its freshly constructed state.
    pub fn reset(&mut self) {
        self.throttle_pid.reset();
        self.path_steer.reset();
        self.vel_lpf.reset();
        self.prev_time_s = None;
    }

    /// Run one control cycle.
    ///
    /// Processing involves:
    ///  1. Resetting and returning zero demands if drive-by-wire is disabled
    ///  1. Computing the steering for the current navigation mode
    ///  1. Computing the throttle from the filtered velocity error
    ///  1. Applying the safety overrides, later ones winning
    pub fn control(&mut self, input: &InputData) -> (OutputData, StatusReport) {

        let mut report = StatusReport::default();

        if !input.dbw_enabled {
            self.reset();
            return (OutputData::default(), report)
        }

        // ---- SAMPLE TIME ----

        let dt_s = match self.prev_time_s {
            Some(prev) => {
                let dt_s = input.time_s - prev;
                if !(dt_s > 0f64) {
                    warn!(
                        "Non-positive sample time of {} s, integral and derivative terms skipped",
                        dt_s
                    );
                }
                dt_s
            },
            None => 0f64
        };
        self.prev_time_s = Some(input.time_s);
        report.dt_s = dt_s;

        // ---- STEERING ----

        let steering_rad = match input.nav_mode {
            NavMode::PathFollow => {
                let (steering_rad, cte_m) = self.path_steer.estimate(
                    input.pose.as_ref(),
                    input.path.as_ref(),
                    dt_s
                );

                report.cte_m = cte_m;
                report.steer_source = match cte_m {
                    Some(_) => SteerSource::PathFollow,
                    None => SteerSource::PathUnavailable
                };

                steering_rad
            },
            NavMode::Kinematic => {
                report.steer_source = SteerSource::Kinematic;
                self.kin_steer.steer(input.target_linear_ms, input.target_angular_rads)
            }
        };

        // ---- THROTTLE ----

        let filtered_vel_ms = if input.current_vel_ms.is_finite() {
            self.vel_lpf.filt(input.current_vel_ms)
        }
        else {
            warn!("Non-finite current velocity, holding the last filtered value");
            self.vel_lpf.get().unwrap_or(0f64)
        };
        let target_valid = input.target_linear_ms.is_finite();
        if !target_valid {
            warn!(
                "Non-finite target velocity ({}), commanding a stop",
                input.target_linear_ms
            );
        }
        let vel_error_ms = input.target_linear_ms - filtered_vel_ms;

        report.filtered_vel_ms = filtered_vel_ms;
        report.vel_error_ms = vel_error_ms;

        let mut throttle = self.throttle_pid.step(vel_error_ms, dt_s);
        let mut brake_nm = 0f64;

        // ---- OVERRIDES ----

        // Traffic light ahead, creep towards it, or brake if too fast
        if input.traffic_light_ahead {
            throttle = throttle.min(self.params.tl_creep_throttle);
            report.tl_creep = true;

            if filtered_vel_ms > self.params.tl_fast_speed_ms {
                throttle = 0f64;
                brake_nm = self.params.tl_brake_torque_nm;
                report.tl_hard_stop = true;
            }
        }

        // The traffic light hard stop isn't softened by the velocity based
        // braking.
        if !report.tl_hard_stop {
            if !target_valid || input.target_linear_ms == 0f64 {
                throttle = 0f64;
                brake_nm = self.params.max_brake_torque_nm;
                report.full_stop = true;
            }
            else if vel_error_ms < 0f64 {
                throttle = 0f64;
                brake_nm = self.params.coast_brake_torque_nm
                    .min(self.params.vehicle.decel_limit_torque_nm());
                report.coast_brake = true;
            }
        }

        // Route hazards can only lower the throttle
        if let Some(pose) = input.pose.as_ref() {
            let limit = self.hazards
                .iter()
                .filter_map(|h| h.throttle_limit(pose))
                .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.min(l))));

            if let Some(limit) = limit {
                if throttle > limit {
                    throttle = limit;
                    report.hazard_limited = true;
                }
            }
        }

        // End of the route, an absent path has no waypoints left
        let num_waypoints = input.path.as_ref().map_or(0, |p| p.len());
        let stop_waypoints = self.params.stop_waypoints(input.nav_mode);
        if num_waypoints < stop_waypoints {
            throttle = 0f64;
            brake_nm = self.params.max_brake_torque_nm;
            report.route_end_stop = true;
        }

        if report.tl_hard_stop || report.full_stop || report.route_end_stop {
            debug!(
                "Stopping: traffic light {}, commanded {}, route end {} ({} < {} waypoints)",
                report.tl_hard_stop,
                report.full_stop,
                report.route_end_stop,
                num_waypoints,
                stop_waypoints
            );
        }

        let output = OutputData {
            throttle,
            brake_nm,
            steering_rad
        };

        trace!("TwistCtrl output: {:?}, report: {:?}", output, report);

        (output, report)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector2;
    use util::module::State;

    const DT: f64 = 0.02;

    /// Input cruising along the X axis with a long path ahead.
    fn cruise(time_s: f64, current_vel_ms: f64, target_linear_ms: f64) -> InputData {
        InputData {
            time_s,
            current_vel_ms,
            dbw_enabled: true,
            target_linear_ms,
            target_angular_rads: 0.0,
            path: Some(Path::straight(Vector2::new(-2.0, 0.0), 0.0, 1.0, 50)),
            pose: Some(Pose::from_parts(0.0, 0.3, 0.0)),
            traffic_light_ahead: false,
            nav_mode: NavMode::PathFollow
        }
    }

    fn controller() -> Controller {
        Controller::new(Params::default()).unwrap()
    }

    #[test]
    fn test_accelerates_towards_target() {
        let mut ctrl = controller();

        let (out, report) = ctrl.control(&cruise(0.0, 2.0, 10.0));
        assert!(out.throttle > 0.0 && out.throttle <= 0.42);
        assert_eq!(out.brake_nm, 0.0);
        assert_eq!(report.dt_s, 0.0);
        assert_eq!(report.steer_source, SteerSource::PathFollow);

        // Left of the path, so steering right
        assert!(report.cte_m.unwrap() > 0.0);
        assert!(out.steering_rad < 0.0);

        let (_, report) = ctrl.control(&cruise(DT, 2.0, 10.0));
        assert_abs_diff_eq!(report.dt_s, DT, epsilon = 1e-12);
    }

    #[test]
    fn test_disabled_returns_zero() {
        let mut ctrl = controller();
        let mut input = cruise(0.0, 3.0, 10.0);
        input.dbw_enabled = false;

        for i in 0..5 {
            input.time_s = i as f64 * DT;
            let (out, report) = ctrl.control(&input);
            assert_eq!(out, OutputData::default());
            assert_eq!(report.steer_source, SteerSource::Disabled);
        }
    }

    #[test]
    fn test_disable_resets_to_fresh_state() {
        let mut fresh = controller();
        let mut used = controller();

        // Build up integral, filter and steering history
        for i in 0..100 {
            used.control(&cruise(i as f64 * DT, 1.0 + 0.05 * i as f64, 12.0));
        }

        let mut off = cruise(2.0, 8.0, 12.0);
        off.dbw_enabled = false;
        assert_eq!(used.control(&off).0, OutputData::default());

        // The next enabled cycle is identical to a fresh controller's first
        let input = cruise(2.02, 7.5, 11.0);
        assert_eq!(used.control(&input), fresh.control(&input));

        let input = cruise(2.04, 7.6, 11.0);
        assert_eq!(used.control(&input), fresh.control(&input));
    }

    #[test]
    fn test_commanded_stop() {
        let mut ctrl = controller();

        for (i, &vel) in [0.5, 3.0, 15.0].iter().enumerate() {
            let (out, report) = ctrl.control(&cruise(i as f64 * DT, vel, 0.0));
            assert_eq!(out.throttle, 0.0);
            assert_eq!(out.brake_nm, 1500.0);
            assert!(report.full_stop);
        }
    }

    #[test]
    fn test_non_finite_target_stops() {
        let mut ctrl = controller();
        let mut twin = controller();

        for (i, &target) in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY].iter().enumerate() {
            let (out, report) = ctrl.control(&cruise(i as f64 * DT, 3.0, target));
            assert_eq!(out.throttle, 0.0);
            assert_eq!(out.brake_nm, 1500.0);
            assert!(out.steering_rad.is_finite());
            assert!(report.full_stop);
        }

        // A finite target afterwards gives a finite throttle
        let (out, report) = ctrl.control(&cruise(3.0 * DT, 3.0, 5.0));
        assert!(out.throttle.is_finite());
        assert!(out.throttle > 0.0 && out.throttle <= 0.42);
        assert!(!report.full_stop);

        // Also while creeping up to a traffic light
        let mut input = cruise(0.0, 1.0, f64::NAN);
        input.traffic_light_ahead = true;
        let (out, report) = twin.control(&input);
        assert_eq!(out.throttle, 0.0);
        assert_eq!(out.brake_nm, 1500.0);
        assert!(report.tl_creep && report.full_stop);
    }

    #[test]
    fn test_traffic_light_hard_stop() {
        for &target in &[0.0, 3.0, 5.0, 20.0] {
            let mut ctrl = controller();
            let mut input = cruise(0.0, 5.0, target);
            input.traffic_light_ahead = true;

            // First sample passes the filter unchanged
            let (out, report) = ctrl.control(&input);
            assert_eq!(out.throttle, 0.0);
            assert_eq!(out.brake_nm, 200.0);
            assert!(report.tl_hard_stop);
            assert!(!report.full_stop && !report.coast_brake);
        }
    }

    #[test]
    fn test_traffic_light_creep() {
        let mut ctrl = controller();
        let mut input = cruise(0.0, 1.0, 10.0);
        input.traffic_light_ahead = true;

        let (out, report) = ctrl.control(&input);
        assert!(report.tl_creep && !report.tl_hard_stop);
        assert!(out.throttle > 0.0 && out.throttle <= 0.1);
        assert_eq!(out.brake_nm, 0.0);
    }

    #[test]
    fn test_coast_brake() {
        let mut ctrl = controller();
        let (out, report) = ctrl.control(&cruise(0.0, 8.0, 6.0));
        assert_eq!(out.throttle, 0.0);
        assert_eq!(out.brake_nm, 50.0);
        assert!(report.coast_brake);

        // Bounded by the deceleration limit
        let mut config = ControllerConfig::default();
        config.vehicle_mass = 10.0;
        let mut light = Controller::from_config(config).unwrap();
        let (out, _) = light.control(&cruise(0.0, 8.0, 6.0));
        assert_abs_diff_eq!(out.brake_nm, 5.0 * 10.0 * 0.2413, epsilon = 1e-12);
    }

    #[test]
    fn test_route_end_stop() {
        let mut ctrl = controller();
        let mut input = cruise(0.0, 2.0, 10.0);

        // 19 waypoints is below the path following threshold
        input.path = Some(Path::straight(Vector2::new(-2.0, 0.0), 0.0, 1.0, 19));
        let (out, report) = ctrl.control(&input);
        assert_eq!(out.throttle, 0.0);
        assert_eq!(out.brake_nm, 1500.0);
        assert!(report.route_end_stop);

        // But not the kinematic one
        input.nav_mode = NavMode::Kinematic;
        let (out, report) = ctrl.control(&input);
        assert!(!report.route_end_stop);
        assert!(out.throttle > 0.0);

        // Which still stops with 3
        input.path = Some(Path::straight(Vector2::new(-2.0, 0.0), 0.0, 1.0, 3));
        let (out, _) = ctrl.control(&input);
        assert_eq!(out.brake_nm, 1500.0);

        // Overrides the traffic light too
        let mut ctrl = controller();
        input.traffic_light_ahead = true;
        input.current_vel_ms = 10.0;
        let (out, report) = ctrl.control(&input);
        assert!(report.tl_hard_stop && report.route_end_stop);
        assert_eq!(out.brake_nm, 1500.0);
    }

    #[test]
    fn test_missing_path_stops() {
        let mut ctrl = controller();
        let mut input = cruise(0.0, 2.0, 10.0);
        input.path = None;

        let (out, report) = ctrl.control(&input);
        assert_eq!(out, OutputData { throttle: 0.0, brake_nm: 1500.0, steering_rad: 0.0 });
        assert_eq!(report.steer_source, SteerSource::PathUnavailable);
        assert_eq!(report.cte_m, None);
    }

    #[test]
    fn test_kinematic_steering() {
        let mut ctrl = controller();
        let mut input = cruise(0.0, 10.0, 10.0);
        input.nav_mode = NavMode::Kinematic;
        input.target_angular_rads = 0.5;

        let (out, report) = ctrl.control(&input);
        assert_eq!(report.steer_source, SteerSource::Kinematic);
        assert_eq!(report.cte_m, None);
        assert_abs_diff_eq!(out.steering_rad, (2.8498f64 / 20.0).atan() * 14.8, epsilon = 1e-12);

        input.target_angular_rads = 0.0;
        let (out, _) = ctrl.control(&input);
        assert_eq!(out.steering_rad, 0.0);
    }

    #[test]
    fn test_hazard_caps_throttle() {
        let mut params = Params::default();
        params.max_throttle = 1.0;
        params.hazard_zones.push(HazardZone {
            name: String::from("roadworks"),
            min_x_m: -10.0,
            max_x_m: 10.0,
            min_y_m: -10.0,
            max_y_m: 10.0,
            max_throttle: 0.15
        });
        let mut ctrl = Controller::new(params).unwrap();

        let (out, report) = ctrl.control(&cruise(0.0, 0.0, 20.0));
        assert_eq!(out.throttle, 0.15);
        assert!(report.hazard_limited);

        // Outside of the zone the throttle is free
        let mut input = cruise(DT, 0.0, 20.0);
        input.pose = Some(Pose::from_parts(50.0, 0.0, 0.0));
        let (out, report) = ctrl.control(&input);
        assert!(out.throttle > 0.15);
        assert!(!report.hazard_limited);
    }

    #[test]
    fn test_added_hazard_never_raises_throttle() {
        #[derive(Debug)]
        struct Everywhere(f64);
        impl RouteHazard for Everywhere {
            fn throttle_limit(&self, _pose: &Pose) -> Option<f64> {
                Some(self.0)
            }
        }

        let mut ctrl = controller();
        ctrl.add_hazard(Box::new(Everywhere(0.3)));
        ctrl.add_hazard(Box::new(Everywhere(0.9)));

        let (out, report) = ctrl.control(&cruise(0.0, 0.0, 20.0));
        assert_eq!(out.throttle, 0.3);
        assert!(report.hazard_limited);

        // Stopped, the cap doesn't release the brake
        let (out, report) = ctrl.control(&cruise(DT, 5.0, 0.0));
        assert_eq!(out.throttle, 0.0);
        assert_eq!(out.brake_nm, 1500.0);
        assert!(!report.hazard_limited);
    }

    #[test]
    fn test_non_positive_dt() {
        let mut ctrl = controller();
        ctrl.control(&cruise(1.0, 2.0, 5.0));

        // Clock going backwards is tolerated
        let (out, report) = ctrl.control(&cruise(0.5, 2.0, 5.0));
        assert_eq!(report.dt_s, -0.5);
        assert!(out.throttle >= 0.0 && out.throttle <= 0.42);

        let (_, report) = ctrl.control(&cruise(0.52, 2.0, 5.0));
        assert_abs_diff_eq!(report.dt_s, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_outputs_within_limits() {
        let mut ctrl = controller();
        for i in 0..500 {
            let t = i as f64 * DT;
            let mut input = cruise(t, 10.0 * (t * 0.7).sin().abs(), 8.0 * (t * 0.3).cos().abs());
            input.pose = Some(Pose::from_parts(0.0, 2.0 * (t * 1.3).sin(), 0.1 * t.cos()));
            input.traffic_light_ahead = i % 70 > 50;

            let (out, _) = ctrl.control(&input);
            assert!(out.throttle >= 0.0 && out.throttle <= 0.42);
            assert!(out.brake_nm >= 0.0);
            assert!(out.steering_rad.abs() <= 1.7);
        }
    }

    #[test]
    fn test_deterministic() {
        let mut a = controller();
        let mut b = controller();

        for i in 0..200 {
            let t = i as f64 * DT;
            let mut input = cruise(t, 5.0 + (t * 2.0).sin(), 6.0);
            input.pose = Some(Pose::from_parts(t, 0.5 * t.sin(), 0.05));
            input.nav_mode = if i % 40 < 20 { NavMode::PathFollow } else { NavMode::Kinematic };
            input.target_angular_rads = 0.1 * t.cos();

            assert_eq!(a.control(&input), b.control(&input));
        }
    }

    #[test]
    fn test_state_trait() {
        let mut ctrl = <Controller as State>::init(Params::default()).unwrap();
        let (out, _) = ctrl.proc(&cruise(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(out.brake_nm, 1500.0);

        let mut bad = Params::default();
        bad.min_throttle = 0.5;
        bad.max_throttle = 0.2;
        assert!(Controller::new(bad).is_err());
    }

    #[test]
    fn test_to_dems() {
        let dems = OutputData { throttle: 0.2, brake_nm: 0.0, steering_rad: -0.4 }.to_dems();
        assert!(dems.is_enabled());
        assert_eq!(dems.throttle.pedal_cmd, 0.2);
        assert_eq!(dems.steering.steering_wheel_angle_cmd, -0.4);
        assert_eq!(NavMode::from(NavType::Kinematic), NavMode::Kinematic);
    }
}
