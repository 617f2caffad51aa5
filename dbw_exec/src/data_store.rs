//! # Data Store
//!
//! The input latch, which holds the latest value of every input message, and
//! the per-cycle data store of the executable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
use comms_if::{eqpt::dbw::DbwDems, msg::InputMsg};
use crate::{
    loc::Pose,
    path::Path,
    twist_ctrl::{self, NavMode},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The latest value of each input to the control loop.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub dbw_enabled: bool,

    /// Measured linear velocity, `None` until first received
    pub current_vel_ms: Option<f64>,

    /// Commanded `(linear_ms, angular_rads)`, `None` until first received
    pub twist: Option<(f64, f64)>,

    pub pose: Option<Pose>,
    pub path: Option<Path>,
    pub traffic_light_ahead: bool,
    pub nav_mode: NavMode,
}

/// Shared handle to the latest inputs.
///
/// Producers on any thread `apply` messages as they arrive, only the most
/// recent value of each input is kept. The control loop takes a `snapshot`
/// once per cycle.
#[derive(Debug, Clone, Default)]
pub struct InputLatch {
    inner: Arc<Mutex<InputSnapshot>>
}

/// Global data store for the executable.
#[derive(Debug, Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Time of this cycle since the start of the loop
    pub cycle_time_s: f64,

    // TwistCtrl
    /// Input to twist control, `None` while inputs are still missing
    pub twist_ctrl_input: Option<twist_ctrl::InputData>,
    pub twist_ctrl_output: twist_ctrl::OutputData,
    pub twist_ctrl_status_rpt: twist_ctrl::StatusReport,

    /// Demands to publish this cycle, only set while enabled
    pub dbw_dems: Option<DbwDems>,

    /// Enable flag of the previous cycle, used to report transitions
    pub dbw_was_enabled: bool,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the latched inputs with a new message.
    pub fn apply(&self, msg: InputMsg) {
        let mut snap = self.lock();

        match msg {
            InputMsg::DbwEnabled(e) => snap.dbw_enabled = e,
            InputMsg::CurrentVelocity { linear_ms } =>
                snap.current_vel_ms = Some(linear_ms),
            InputMsg::TwistCmd { linear_ms, angular_rads } =>
                snap.twist = Some((linear_ms, angular_rads)),
            InputMsg::CurrentPose(p) => snap.pose = Some(Pose::from(p)),
            InputMsg::FinalWaypoints(w) => snap.path = Some(Path::from(w)),
            InputMsg::TrafficLightAhead(t) => snap.traffic_light_ahead = t,
            InputMsg::NavType(n) => snap.nav_mode = NavMode::from(n),
        }
    }

    /// Get the twist control input for a cycle at `time_s`.
    ///
    /// Returns `None` until both the current velocity and the twist command
    /// have been received.
    pub fn snapshot(&self, time_s: f64) -> Option<twist_ctrl::InputData> {
        let snap = self.lock();

        let current_vel_ms = snap.current_vel_ms?;
        let (target_linear_ms, target_angular_rads) = snap.twist?;

        Some(twist_ctrl::InputData {
            time_s,
            current_vel_ms,
            dbw_enabled: snap.dbw_enabled,
            target_linear_ms,
            target_angular_rads,
            path: snap.path.clone(),
            pose: snap.pose,
            traffic_light_ahead: snap.traffic_light_ahead,
            nav_mode: snap.nav_mode,
        })
    }

    /// A copy of the raw latched values.
    pub fn raw(&self) -> InputSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<InputSnapshot> {
        // Writers only assign whole fields, so the data is still consistent
        // if one of them panicked while holding the lock.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner()
        }
    }
}

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64, cycle_time_s: f64) {
        let cycles_per_s = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.cycle_time_s = cycle_time_s;

        self.twist_ctrl_input = None;
        self.twist_ctrl_output = twist_ctrl::OutputData::default();
        self.twist_ctrl_status_rpt = twist_ctrl::StatusReport::default();
        self.dbw_dems = None;
    }

    /// Set the demands to publish, if drive-by-wire is enabled, and report
    /// changes to the enable state.
    pub fn set_dems(&mut self, dbw_enabled: bool) {
        if dbw_enabled != self.dbw_was_enabled {
            if dbw_enabled {
                info!("Drive-by-wire enabled");
            }
            else {
                info!("Drive-by-wire disabled, demands no longer published");
            }
            self.dbw_was_enabled = dbw_enabled;
        }

        if dbw_enabled {
            self.dbw_dems = Some(self.twist_ctrl_output.to_dems());
            debug!("DbwDems: {:?}", self.dbw_dems);
        }
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }
}
