//! # Vehicle Simulator Executable
//!
//! Stands in for the vehicle during development. A dynamic bicycle model is advanced at a fixed
//! rate, publishing a state estimate after every update and applying the most recent command
//! received from the controller.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameters for the simulator executable.
mod params;

/// Simulator server abstraction.
mod sim_server;

/// Dynamic bicycle model.
mod vehicle_model;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use chrono::Utc;
use color_eyre::{eyre::WrapErr, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// Internal
use comms_if::net::{zmq, NetParams};
use params::SimExecParams;
use sim_server::SimServer;
use util::{
    archive::Archiver,
    logger::{logger_init, parse_level},
    session::{self, Session},
    time::{CycleEnd, Rate},
};
use vehicle_model::VehicleModel;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Path of the state archive within the session's archive root.
const STATE_ARCHIVE_PATH: &str = "sim_exec/states.csv";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One row of the state archive.
#[derive(Serialize)]
struct StateRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    psi_rad: f64,
    vx_ms: f64,
    vy_ms: f64,
    wz_rads: f64,
    acc_mps2: f64,
    df_rad: f64,
    acc_des_mps2: f64,
    df_des_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("sim_exec", "sessions").wrap_err("Failed to create the session")?;

    let params: SimExecParams =
        util::params::load("sim_exec.toml").wrap_err("Could not load the sim_exec parameters")?;
    params.validate().wrap_err("Invalid sim_exec parameters")?;

    let level = parse_level(&params.log_level).wrap_err("Invalid log level")?;
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Vehicle Simulator Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Parameters loaded");
    info!(
        "    Initial pose: ({:.1}, {:.1}) m, {:.3} rad",
        params.x0_m, params.y0_m, params.psi0_rad
    );
    info!(
        "    Model period: {} s in {} substeps",
        params.model_period_s, params.num_substeps
    );

    // ---- INITIALISATION ----

    let mut model = VehicleModel::new(
        params.vehicle.clone(),
        params.x0_m,
        params.y0_m,
        params.psi0_rad,
    );

    let mut archiver = match params.record {
        true => Some(
            Archiver::from_path(&session, STATE_ARCHIVE_PATH)
                .wrap_err("Failed to create the state archive")?,
        ),
        false => None,
    };

    let zmq_ctx = zmq::Context::new();
    let mut server =
        SimServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the SimServer")?;
    info!("SimServer initialised");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .wrap_err("Failed to set the Ctrl-C handler")?;
    }

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop\n");

    let mut rate = Rate::new(1.0 / params.model_period_s);
    let mut demands = (0.0, 0.0);
    let mut num_updates: u64 = 0;
    let mut num_overruns: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        match server.poll_cmds() {
            Ok(Some(cmd)) => {
                demands = (cmd.accel_cmd_mps2, cmd.steer_angle_cmd_rad);
                model.set_demands(demands.0, demands.1);
            }
            Ok(None) => (),
            Err(e) => {
                warn!("Stopping simulation: {}", e);
                break;
            }
        }

        model.step(params.model_period_s, params.num_substeps);
        num_updates += 1;

        if let Err(e) = server.send_state(&model.state_est(Utc::now())) {
            warn!("{}", e);
        }

        if let Some(ref mut arch) = archiver {
            let s = model.state();
            let record = StateRecord {
                time_s: session::get_elapsed_seconds(),
                x_m: s.x_m,
                y_m: s.y_m,
                psi_rad: s.psi_rad,
                vx_ms: s.vx_ms,
                vy_ms: s.vy_ms,
                wz_rads: s.wz_rads,
                acc_mps2: s.acc_mps2,
                df_rad: s.df_rad,
                acc_des_mps2: demands.0,
                df_des_rad: demands.1,
            };

            if let Err(e) = arch.serialise(record) {
                warn!("Could not archive the simulated state: {}", e);
            }
        }

        if let CycleEnd::Overrun(d) = rate.sleep() {
            num_overruns += 1;
            debug!("Model update overran by {:?}", d);
        }
    }

    // ---- SHUTDOWN ----

    let s = model.state();
    info!(
        "Simulated {} updates ({} overruns), final pose ({:.2}, {:.2}) m, {:.3} rad at {:.2} m/s",
        num_updates, num_overruns, s.x_m, s.y_m, s.psi_rad, s.vx_ms
    );

    if !server.enabled() {
        warn!("No enable message was received from the controller");
    }

    session.exit();

    info!("End of execution");

    Ok(())
}
