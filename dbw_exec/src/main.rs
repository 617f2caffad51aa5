//! Main drive-by-wire executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logger and twist control
//!     - Main loop, at the cycle frequency:
//!         - Input acquisition: messages due from the input script are
//!           latched, the latest value of each input is kept
//!         - Twist control processing on a snapshot of the inputs
//!         - Publication of the demands while drive-by-wire is enabled
//!         - Archiving
//!
//! The loop runs on a nominal clock, cycle `n` happening at `n / f` seconds,
//! so that replaying the same script always gives the same demands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use dbw_lib::{
    data_store::{DataStore, InputLatch},
    twist_ctrl::{Controller, Params, SteerSource},
};
use util::{
    archive::Archiver,
    logger::{logger_init, parse_level},
    module::State,
    script_interpreter::{Pending, ScriptInterpreter},
    session::Session,
    time::period_from_frequency,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(name = "dbw_exec", about = "Drive-by-wire twist control loop")]
struct Opt {
    /// Input script to replay
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Twist control parameter file to use instead of
    /// `$DBW_SW_ROOT/params/twist_ctrl.toml`
    #[structopt(short, long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Minimum log level, one of `info`, `debug` or `trace`
    #[structopt(short, long, default_value = "info")]
    log_level: String,
}

/// Parameters of the executable itself
#[derive(Debug, Deserialize)]
struct ExecParams {
    /// Frequency of the control loop
    ///
    /// Units: Hertz
    cycle_frequency_hz: f64,

    /// If true every cycle is written to `arch/twist_ctrl.csv`
    archive_enabled: bool,
}

/// One archived cycle.
#[derive(Debug, Serialize)]
struct CycleRecord {
    time_s: f64,
    dbw_enabled: bool,
    current_vel_ms: f64,
    target_linear_ms: f64,
    target_angular_rads: f64,
    throttle: f64,
    brake_nm: f64,
    steering_rad: f64,
    published: bool,
    dt_s: f64,
    filtered_vel_ms: f64,
    vel_error_ms: f64,
    cte_m: Option<f64>,
    steer_source: SteerSource,
    tl_creep: bool,
    tl_hard_stop: bool,
    full_stop: bool,
    coast_brake: bool,
    hazard_limited: bool,
    route_end_stop: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let log_level = parse_level(&opt.log_level)
        .ok_or_else(|| eyre!("Unknown log level \"{}\"", opt.log_level))?;

    // Initialise session
    let session = Session::new(
        "dbw_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Drive-by-wire Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load("dbw_exec.toml")
        .wrap_err("Could not load exec params")?;

    let cycle_period_s = period_from_frequency(exec_params.cycle_frequency_hz)
        .ok_or_else(|| eyre!(
            "Invalid cycle frequency of {} Hz", exec_params.cycle_frequency_hz
        ))?;

    let twist_ctrl_params = match opt.params {
        Some(ref path) => {
            info!("Loading TwistCtrl parameters from {:?}", path);
            Params::load_from(path)
        },
        None => Params::load("twist_ctrl.toml")
    }.wrap_err("Could not load TwistCtrl params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE INPUT SCRIPT ----

    info!("Loading script from {:?}", opt.script);

    let mut si = ScriptInterpreter::new(&opt.script)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} messages\n",
        si.get_duration(),
        si.get_num_msgs()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();
    let latch = InputLatch::new();

    let mut twist_ctrl = Controller::init(twist_ctrl_params)
        .wrap_err("Failed to initialise TwistCtrl")?;
    info!("TwistCtrl init complete");

    let mut archiver = if exec_params.archive_enabled {
        let a = Archiver::from_path(&session, "twist_ctrl.csv")
            .wrap_err("Failed to create the TwistCtrl archive")?;
        info!("Archiving to {:?}", session.arch_root.join("twist_ctrl.csv"));
        Some(a)
    }
    else {
        None
    };

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Beginning main loop at {} Hz\n", exec_params.cycle_frequency_hz);

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let time_s = ds.num_cycles as f64 * cycle_period_s;

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(exec_params.cycle_frequency_hz, time_s);

        // ---- DATA INPUT ----

        match si.get_pending(time_s) {
            Pending::None => (),
            Pending::Some(msgs) => {
                for msg in msgs {
                    debug!("Input: {:?}", msg);
                    latch.apply(msg);
                }
            },
            // Exit if end of script reached
            Pending::EndOfScript => {
                info!("End of input script reached, stopping");
                break
            }
        }

        let snapshot = latch.snapshot(time_s);

        // ---- CONTROL ALGORITHM PROCESSING ----

        match snapshot {
            Some(ref input) => {
                let (output, report) = match twist_ctrl.proc(input) {
                    Ok(r) => r,
                    Err(e) => match e {}
                };
                ds.twist_ctrl_output = output;
                ds.twist_ctrl_status_rpt = report;

                ds.set_dems(input.dbw_enabled);
            },
            None => {
                if ds.is_1_hz_cycle {
                    info!("Waiting for the current velocity and twist command");
                }
            }
        }

        ds.twist_ctrl_input = snapshot;

        // ---- PUBLISH DEMANDS ----

        if let Some(ref dems) = ds.dbw_dems {
            debug!("Publishing {:?}", dems);

            if ds.is_1_hz_cycle {
                info!(
                    "t = {:.2} s: throttle {:.3}, brake {:.1} Nm, steering {:.3} rad",
                    time_s,
                    dems.throttle.pedal_cmd,
                    dems.brake.pedal_cmd,
                    dems.steering.steering_wheel_angle_cmd
                );
            }
        }

        // ---- WRITE ARCHIVES ----

        if let (Some(arch), Some(input)) = (archiver.as_mut(), ds.twist_ctrl_input.as_ref()) {
            let o = &ds.twist_ctrl_output;
            let r = &ds.twist_ctrl_status_rpt;

            let record = CycleRecord {
                time_s,
                dbw_enabled: input.dbw_enabled,
                current_vel_ms: input.current_vel_ms,
                target_linear_ms: input.target_linear_ms,
                target_angular_rads: input.target_angular_rads,
                throttle: o.throttle,
                brake_nm: o.brake_nm,
                steering_rad: o.steering_rad,
                published: ds.dbw_dems.is_some(),
                dt_s: r.dt_s,
                filtered_vel_ms: r.filtered_vel_ms,
                vel_error_ms: r.vel_error_ms,
                cte_m: r.cte_m,
                steer_source: r.steer_source,
                tl_creep: r.tl_creep,
                tl_hard_stop: r.tl_hard_stop,
                full_stop: r.full_stop,
                coast_brake: r.coast_brake,
                hazard_limited: r.hazard_limited,
                route_end_stop: r.route_end_stop,
            };

            if let Err(e) = arch.serialise(record) {
                warn!("Could not archive the cycle: {}", e);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(cycle_period_s)
            .checked_sub(cycle_dur)
        {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    info!("End of execution after {} cycles", ds.num_cycles);

    Ok(())
}
