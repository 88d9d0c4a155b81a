//! Main controller executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Load the reference trajectory and controller
//!     - Start the state client (background thread feeding the state buffer) and control server
//!     - Announce the controller with a single enable message
//!     - Main loop, at a fixed rate until Ctrl-C:
//!         - Snapshot the state buffer
//!         - Trajectory oracle and controller processing
//!         - Publish the command, target path and predicted path
//!         - Archive the tick
//!     - Save the run summary and shut down

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

// Internal
use comms_if::net::{zmq, NetParams};
use mpc_lib::{
    control_loop::{self, ControlLoop},
    ctrl::KinematicTracker,
    ctrl_server::CtrlServer,
    params,
    state_buffer::StateBuffer,
    state_client::StateClient,
    traj::RefTrajectory,
};
use util::{archive::Archiver, logger::logger_init, session::Session};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time allowed for subscribers to connect before the enable message is sent.
const ENABLE_SETTLE_DURATION: Duration = Duration::from_millis(500);

/// Path of the tick archive within the session's archive root.
const TICK_ARCHIVE_PATH: &str = "mpc_exec/ticks.csv";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("mpc_exec", "sessions").wrap_err("Failed to create the session")?;

    let exec_params =
        params::load("mpc_exec.toml").wrap_err("Could not load the mpc_exec parameters")?;

    logger_init(exec_params.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("MPC Path Follower Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");
    info!("    Waypoint file: {:?}", exec_params.waypoint_file);
    info!(
        "    Tracking by {}",
        if exec_params.loop_config.track_using_time {
            "time"
        }
        else {
            "speed"
        }
    );
    info!(
        "    Target speed: {:.2} m/s",
        exec_params.loop_config.target_speed_ms
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let oracle = RefTrajectory::load(&exec_params.waypoint_file, exec_params.oracle.clone())
        .wrap_err("Failed to load the reference trajectory")?;
    info!(
        "RefTrajectory loaded: {} waypoints, {:.1} m over {:.1} s",
        oracle.len(),
        oracle.path_length_m(),
        oracle.duration_s()
    );

    let controller = KinematicTracker::from_file(
        &exec_params.ctrl_params_file,
        1.0 / exec_params.loop_config.tick_rate_hz,
        exec_params.oracle.horizon_step_s,
    )
    .wrap_err("Failed to initialise the controller")?;
    info!("KinematicTracker init complete");

    let mut ctrl_loop = ControlLoop::new(exec_params.loop_config.clone(), oracle, controller);

    let mut archiver = match exec_params.record {
        true => Some(
            Archiver::from_path(&session, TICK_ARCHIVE_PATH)
                .wrap_err("Failed to create the tick archive")?,
        ),
        false => None,
    };

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();
    let state_buffer = Arc::new(StateBuffer::new());

    let state_client = StateClient::new(&zmq_ctx, &net_params, state_buffer.clone())
        .wrap_err("Failed to initialise the StateClient")?;
    info!("StateClient initialised");

    let mut ctrl_server =
        CtrlServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the CtrlServer")?;
    info!("CtrlServer initialised");

    thread::sleep(ENABLE_SETTLE_DURATION);

    if !ctrl_server.connected() {
        warn!("No subscriber connected to the CtrlServer, sending enable anyway");
    }

    match ctrl_server.send_enable() {
        Ok(()) => info!("Enable message sent"),
        Err(e) => warn!("Could not send the enable message: {}", e),
    }

    info!("Network initialisation complete");

    // ---- SHUTDOWN HANDLER ----

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .wrap_err("Failed to set the Ctrl-C handler")?;
    }

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let summary = control_loop::run(
        &mut ctrl_loop,
        &state_buffer,
        &mut ctrl_server,
        &shutdown,
        archiver.as_mut(),
    )
    .wrap_err("Control loop terminated with an error")?;

    // ---- SHUTDOWN ----

    info!(
        "Ran {} ticks ({} running, {} stopping), {} overruns, {} dropped states",
        summary.num_ticks,
        summary.num_running_ticks,
        summary.num_stopping_ticks,
        summary.num_overruns,
        summary.num_dropped_states
    );

    session.save("run_summary.json", summary);

    drop(state_client);
    session.exit();

    info!("End of execution");

    Ok(())
}
