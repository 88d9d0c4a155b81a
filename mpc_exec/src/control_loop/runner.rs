//! # Control loop runner
//!
//! Drives a [`ControlLoop`] at its configured tick rate: snapshot the state buffer, process the
//! tick, dispatch the outputs and record the tick, then sleep to the next boundary.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, trace, warn};
use serde::Serialize;
use std::{
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
};

use super::*;
use crate::{ctrl::Controller, state_buffer::StateBuffer, traj::TrajOracle};
use util::{
    archive::Archiver,
    module::State,
    session,
    time::{CycleEnd, Rate},
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Destination for the loop's outputs.
///
/// Failures are reported back to the runner, which logs them and carries on.
pub trait OutputSink {
    type Error: Display;

    fn send_cmd(&mut self, cmd: &ControlCmd) -> Result<(), Self::Error>;

    fn send_target_path(&mut self, path: &Trajectory) -> Result<(), Self::Error>;

    fn send_mpc_path(&mut self, path: &Trajectory) -> Result<(), Self::Error>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Statistics over a whole run, saved at shutdown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub num_ticks: u64,
    pub num_awaiting_ticks: u64,
    pub num_running_ticks: u64,
    pub num_stopping_ticks: u64,

    /// Ticks whose body took longer than the period
    pub num_overruns: u64,

    /// Solves which did not return `Optimal`
    pub num_non_optimal: u64,

    /// Outputs the sink failed to send
    pub num_send_errors: u64,

    /// State estimates dropped because a read was in progress
    pub num_dropped_states: u64,

    /// Tick on which the oracle requested a stop
    pub stop_tick: Option<u64>,
}

/// A row of the tick archive.
#[derive(Debug, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub elapsed_s: f64,
    pub mode: LoopMode,
    pub x_m: Option<f64>,
    pub y_m: Option<f64>,
    pub psi_rad: Option<f64>,
    pub v_ms: Option<f64>,
    pub accel_cmd_mps2: Option<f64>,
    pub steer_cmd_rad: Option<f64>,
    pub solver_status: Option<SolverStatus>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RunSummary {
    fn update(&mut self, report: &StatusReport) {
        self.num_ticks += 1;

        match report.mode {
            LoopMode::AwaitingFirstState => self.num_awaiting_ticks += 1,
            LoopMode::Running => self.num_running_ticks += 1,
            LoopMode::Stopping => self.num_stopping_ticks += 1,
        }

        match report.solver_status {
            Some(SolverStatus::Optimal) | None => (),
            Some(_) => self.num_non_optimal += 1,
        }

        if report.stop_requested {
            self.stop_tick = Some(report.tick);
        }
    }
}

impl TickRecord {
    pub fn new(report: &StatusReport, output: &TickOutput) -> Self {
        Self {
            tick: report.tick,
            elapsed_s: session::get_elapsed_seconds(),
            mode: report.mode,
            x_m: report.state.map(|s| s.x_m),
            y_m: report.state.map(|s| s.y_m),
            psi_rad: report.state.map(|s| s.psi_rad),
            v_ms: report.state.map(|s| s.v_ms),
            accel_cmd_mps2: output.cmd.map(|c| c.accel_mps2),
            steer_cmd_rad: output.cmd.map(|c| c.steer_rad),
            solver_status: report.solver_status,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the loop at its configured rate until `shutdown` is set.
///
/// Errors from the oracle or controller end the run, transport errors do not.
pub fn run<O, C, S>(
    ctrl_loop: &mut ControlLoop<O, C>,
    buffer: &StateBuffer,
    sink: &mut S,
    shutdown: &AtomicBool,
    mut archiver: Option<&mut Archiver>,
) -> Result<RunSummary, ControlLoopError>
where
    O: TrajOracle,
    C: Controller,
    S: OutputSink,
{
    let mut summary = RunSummary::default();
    let mut rate = Rate::new(ctrl_loop.config().tick_rate_hz);

    info!(
        "Control loop running at {:.1} Hz ({:?} per tick)",
        ctrl_loop.config().tick_rate_hz,
        rate.period()
    );

    while !shutdown.load(Ordering::Relaxed) {
        step(ctrl_loop, buffer, sink, archiver.as_deref_mut(), &mut summary)?;

        if let CycleEnd::Overrun(by) = rate.sleep() {
            warn!(
                "Tick {} overran by {:.06} s",
                ctrl_loop.num_ticks(),
                by.as_secs_f64()
            );
            summary.num_overruns += 1;
        }
    }

    summary.num_dropped_states = buffer.num_dropped();

    info!("Shutdown requested after {} ticks", summary.num_ticks);

    Ok(summary)
}

/// Process and dispatch a single tick.
pub fn step<O, C, S>(
    ctrl_loop: &mut ControlLoop<O, C>,
    buffer: &StateBuffer,
    sink: &mut S,
    archiver: Option<&mut Archiver>,
    summary: &mut RunSummary,
) -> Result<(), ControlLoopError>
where
    O: TrajOracle,
    C: Controller,
    S: OutputSink,
{
    // The read guard is released before any processing
    let snapshot = buffer.read_snapshot();

    let (mut output, report) = ctrl_loop.proc(&snapshot)?;

    dispatch(sink, &output, summary);

    // The rollout runs once the command is on its way
    output.mpc_path = ctrl_loop.predict();
    if let Some(ref path) = output.mpc_path {
        if let Err(e) = sink.send_mpc_path(path) {
            warn!("Could not send MPC path: {}", e);
            summary.num_send_errors += 1;
        }
    }
    summary.update(&report);

    if let Some(arch) = archiver {
        if let Err(e) = arch.serialise(TickRecord::new(&report, &output)) {
            warn!("Could not archive tick {}: {}", report.tick, e);
        }
    }

    Ok(())
}

/// Send the command and target path of a tick, command first.
fn dispatch<S: OutputSink>(sink: &mut S, output: &TickOutput, summary: &mut RunSummary) {
    if let Some(ref cmd) = output.cmd {
        trace!(
            "Command: accel = {:.3} m/s^2, steer = {:.3} rad",
            cmd.accel_mps2,
            cmd.steer_rad
        );

        if let Err(e) = sink.send_cmd(cmd) {
            warn!("Could not send command: {}", e);
            summary.num_send_errors += 1;
        }
    }

    if let Some(ref path) = output.target_path {
        if let Err(e) = sink.send_target_path(path) {
            warn!("Could not send target path: {}", e);
            summary.num_send_errors += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::control_loop::fakes::*;
    use std::sync::Arc;

    fn new_loop(oracle: FakeOracle) -> ControlLoop<FakeOracle, FakeController> {
        ControlLoop::new(LoopConfig::default(), oracle, FakeController::new())
    }

    #[test]
    fn test_single_tick() {
        let buffer = StateBuffer::new();
        buffer.write(VehicleState::default());

        let mut cl = new_loop(FakeOracle::new());
        let mut sink = FakeSink::default();
        let mut summary = RunSummary::default();

        step(&mut cl, &buffer, &mut sink, None, &mut summary).unwrap();

        assert_eq!(
            sink.cmds,
            vec![ControlCmd {
                accel_mps2: 0.5,
                steer_rad: 0.1
            }]
        );
        assert_eq!(sink.target_paths, vec![horizon_path()]);
        assert_eq!(sink.mpc_paths, vec![predicted_path()]);
        assert_eq!(sink.order, vec!["cmd", "target_path", "mpc_path"]);
        assert_eq!(summary.num_running_ticks, 1);
    }

    #[test]
    fn test_stop_on_tick_five() {
        let buffer = StateBuffer::new();
        buffer.write(VehicleState::new(1.0, 1.0, 0.0, 2.0));

        let mut cl = new_loop(FakeOracle::stopping_on(5));
        let mut sink = FakeSink::default();
        let mut summary = RunSummary::default();

        let solver_cmd = ControlCmd {
            accel_mps2: 0.5,
            steer_rad: 0.1,
        };
        let safety_cmd = ControlCmd {
            accel_mps2: -3.0,
            steer_rad: 0.0,
        };

        for tick in 1..=10 {
            let num_paths = sink.target_paths.len();
            let num_solves = cl.controller().num_solves();

            step(&mut cl, &buffer, &mut sink, None, &mut summary).unwrap();

            assert_eq!(sink.cmds.len(), tick);
            if tick < 5 {
                assert_eq!(sink.cmds[tick - 1], solver_cmd);
                assert_eq!(sink.target_paths.len(), num_paths + 1);
                assert_eq!(sink.mpc_paths.len(), num_paths + 1);
            }
            else {
                assert_eq!(sink.cmds[tick - 1], safety_cmd);
                assert_eq!(sink.target_paths.len(), num_paths);
                assert_eq!(sink.mpc_paths.len(), num_paths);
                assert_eq!(cl.controller().num_solves(), num_solves);
            }
        }

        assert_eq!(cl.oracle().num_calls(), 5);
        assert_eq!(summary.stop_tick, Some(5));
        assert_eq!(summary.num_running_ticks, 4);
        assert_eq!(summary.num_stopping_ticks, 6);
    }

    #[test]
    fn test_send_errors_do_not_stop_the_loop() {
        let buffer = StateBuffer::new();
        buffer.write(VehicleState::default());

        let mut cl = new_loop(FakeOracle::new());
        let mut sink = FakeSink {
            fail: true,
            ..Default::default()
        };
        let mut summary = RunSummary::default();

        for _ in 0..3 {
            step(&mut cl, &buffer, &mut sink, None, &mut summary).unwrap();
        }

        // Every output was still attempted
        assert_eq!(sink.order.len(), 9);
        assert_eq!(summary.num_send_errors, 9);
        assert_eq!(cl.mode(), LoopMode::Running);
    }

    #[test]
    fn test_run_until_shutdown() {
        let buffer = StateBuffer::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut cl = ControlLoop::new(
            LoopConfig {
                tick_rate_hz: 200.0,
                ..Default::default()
            },
            FakeOracle::new(),
            FakeController::new(),
        );
        let mut sink = FakeSink {
            shutdown_after: Some((3, shutdown.clone())),
            ..Default::default()
        };

        // A pre-set flag means no ticks at all
        let stopped = AtomicBool::new(true);
        let summary = run(&mut cl, &buffer, &mut sink, &stopped, None).unwrap();
        assert_eq!(summary.num_ticks, 0);

        buffer.write(VehicleState::default());

        let path = std::env::temp_dir().join("mpc_runner_test").join("ticks.csv");
        let mut archiver = Archiver::create(&path).unwrap();

        let summary = run(&mut cl, &buffer, &mut sink, &shutdown, Some(&mut archiver)).unwrap();
        assert_eq!(summary.num_ticks, 3);
        assert_eq!(summary.num_running_ticks, 3);
        assert_eq!(sink.cmds.len(), 3);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("tick,elapsed_s,mode,x_m"));
        assert!(lines[1].starts_with("1,"));
        assert!(lines[1].contains(",Running,"));
        assert!(lines[1].ends_with(",0.5,0.1,Optimal"));

        std::fs::remove_file(&path).ok();
    }
}
