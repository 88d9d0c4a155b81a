//! Control loop state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use super::*;
use crate::{ctrl::Controller, traj::TrajOracle};
use util::module::State;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The control loop, generic over the oracle and controller chosen at startup.
pub struct ControlLoop<O, C> {
    config: LoopConfig,

    oracle: O,

    controller: C,

    mode: LoopMode,

    num_ticks: u64,

    /// Command of the current tick, waiting to be fed back for the rollout
    pending_input: Option<ControlCmd>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<O, C> ControlLoop<O, C>
where
    O: TrajOracle,
    C: Controller,
{
    pub fn new(config: LoopConfig, oracle: O, controller: C) -> Self {
        Self {
            config,
            oracle,
            controller,
            mode: LoopMode::AwaitingFirstState,
            num_ticks: 0,
            pending_input: None,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// The command published every tick while stopping.
    pub fn safety_cmd(&self) -> ControlCmd {
        ControlCmd {
            accel_mps2: -self.config.max_decel_mps2,
            steer_rad: 0.0,
        }
    }

    /// Feed this tick's command back to the controller and return its predicted trajectory.
    ///
    /// Called once the command and target path of a running tick have been published. Returns
    /// `None` if the last tick did not run the controller, or if the rollout was already taken.
    pub fn predict(&mut self) -> Option<Trajectory> {
        let cmd = self.pending_input.take()?;

        self.controller
            .update_current_input(cmd.steer_rad, cmd.accel_mps2);

        Some(self.controller.predicted_trajectory())
    }

    fn set_mode(&mut self, mode: LoopMode) {
        if mode != self.mode {
            info!(
                "ControlLoop mode change on tick {}: {:?} -> {:?}",
                self.num_ticks, self.mode, mode
            );
            self.mode = mode;
        }
    }

    fn report(&self, state: Option<VehicleState>) -> StatusReport {
        StatusReport {
            tick: self.num_ticks,
            mode: self.mode,
            state,
            solver_status: None,
            stop_requested: false,
        }
    }

    /// Process a running tick with the given state.
    fn proc_running(
        &mut self,
        state: VehicleState,
    ) -> Result<(TickOutput, StatusReport), ControlLoopError> {
        let desired_speed_ms = self.config.desired_speed_ms();

        let horizon = if self.config.track_using_time {
            self.oracle.waypoints_by_time(&state)?
        }
        else {
            self.oracle.waypoints_by_speed(&state, desired_speed_ms)?
        };

        if horizon.stop {
            self.set_mode(LoopMode::Stopping);

            let mut report = self.report(Some(state));
            report.stop_requested = true;

            return Ok((TickOutput::stop(self.safety_cmd()), report));
        }

        self.controller
            .update_initial_condition(state.x_m, state.y_m, state.psi_rad, state.v_ms);
        self.controller.update_reference(
            &horizon.path.xs_m,
            &horizon.path.ys_m,
            &horizon.path.psis_rad,
            desired_speed_ms,
        );

        let action = self.controller.solve()?;

        if action.status != SolverStatus::Optimal {
            warn!(
                "Controller returned {:?} on tick {} (accel = {:.3}, steer = {:.3})",
                action.status, self.num_ticks, action.accel_mps2, action.steer_rad
            );
        }

        let cmd = ControlCmd {
            accel_mps2: action.accel_mps2,
            steer_rad: action.steer_rad,
        };
        self.pending_input = Some(cmd);

        let mut report = self.report(Some(state));
        report.solver_status = Some(action.status);

        Ok((
            TickOutput {
                cmd: Some(cmd),
                target_path: Some(horizon.path),
                mpc_path: None,
            },
            report,
        ))
    }
}

impl<O, C> State for ControlLoop<O, C>
where
    O: TrajOracle,
    C: Controller,
{
    type InputData = Option<VehicleState>;
    type OutputData = TickOutput;
    type StatusReport = StatusReport;
    type ProcError = ControlLoopError;

    /// Process one tick given the latest state snapshot.
    fn proc(
        &mut self,
        snapshot: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.num_ticks += 1;
        self.pending_input = None;

        match self.mode {
            LoopMode::AwaitingFirstState => match snapshot {
                Some(_) => self.set_mode(LoopMode::Running),
                None => return Ok((TickOutput::default(), self.report(None))),
            },
            LoopMode::Stopping => {
                return Ok((TickOutput::stop(self.safety_cmd()), self.report(*snapshot)))
            }
            LoopMode::Running => (),
        }

        match *snapshot {
            Some(state) => self.proc_running(state),
            None => {
                // The buffer never empties once written, so this means a broken input
                warn!("No state snapshot on running tick {}, skipping", self.num_ticks);
                Ok((TickOutput::default(), self.report(None)))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::control_loop::fakes::*;

    fn config(target_speed_ms: f64) -> LoopConfig {
        LoopConfig {
            target_speed_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_awaiting_first_state() {
        let mut cl = ControlLoop::new(config(0.0), FakeOracle::new(), FakeController::new());

        for _ in 0..3 {
            let (out, report) = cl.proc(&None).unwrap();
            assert_eq!(out, TickOutput::default());
            assert_eq!(report.mode, LoopMode::AwaitingFirstState);
        }

        assert_eq!(cl.oracle().num_calls(), 0);
        assert!(cl.controller().calls().is_empty());

        // The first tick with a state is a running tick
        let (out, report) = cl.proc(&Some(VehicleState::default())).unwrap();
        assert_eq!(report.mode, LoopMode::Running);
        assert_eq!(report.tick, 4);
        assert!(out.cmd.is_some());
        assert_eq!(cl.oracle().num_calls(), 1);
    }

    #[test]
    fn test_controller_call_order() {
        let mut cl = ControlLoop::new(config(0.0), FakeOracle::new(), FakeController::new());
        let state = VehicleState::new(1.0, 2.0, 0.5, 3.0);

        let (out, _) = cl.proc(&Some(state)).unwrap();

        // The command is ready before the controller rolls out its prediction
        assert!(out.cmd.is_some() && out.mpc_path.is_none());
        assert_eq!(
            cl.controller().calls(),
            vec!["update_initial_condition", "update_reference", "solve"]
        );

        assert_eq!(cl.predict(), Some(predicted_path()));
        assert_eq!(cl.predict(), None);

        let ctrl = cl.controller();
        assert_eq!(
            ctrl.calls(),
            vec![
                "update_initial_condition",
                "update_reference",
                "solve",
                "update_current_input",
                "predicted_trajectory"
            ]
        );
        assert_eq!(ctrl.initial, Some((1.0, 2.0, 0.5, 3.0)));
        assert_eq!(ctrl.inputs, vec![(0.1, 0.5)]);
    }

    #[test]
    fn test_no_prediction_without_solve() {
        let mut cl = ControlLoop::new(
            config(0.0),
            FakeOracle::stopping_on(2),
            FakeController::new(),
        );

        assert_eq!(cl.predict(), None);

        cl.proc(&Some(VehicleState::default())).unwrap();
        cl.proc(&Some(VehicleState::default())).unwrap();

        // The running tick's rollout is discarded once the next tick starts
        assert_eq!(cl.predict(), None);
        assert!(cl.controller().inputs.is_empty());
    }

    #[test]
    fn test_desired_speed_passed_through() {
        for &(target, expected) in [(0.0, 0.0), (2.5, 2.5), (-1.0, 0.0)].iter() {
            let mut cl =
                ControlLoop::new(config(target), FakeOracle::new(), FakeController::new());

            for _ in 0..4 {
                cl.proc(&Some(VehicleState::default())).unwrap();
            }

            assert_eq!(cl.oracle().speeds, vec![expected; 4]);
            assert_eq!(cl.controller().desired_speed_ms, Some(expected));
        }
    }

    #[test]
    fn test_track_using_time() {
        let cfg = LoopConfig {
            track_using_time: true,
            target_speed_ms: 2.5,
            ..Default::default()
        };
        let mut cl = ControlLoop::new(cfg, FakeOracle::new(), FakeController::new());

        cl.proc(&Some(VehicleState::default())).unwrap();
        cl.proc(&Some(VehicleState::default())).unwrap();

        assert_eq!(cl.oracle().time_calls, 2);
        assert!(cl.oracle().speeds.is_empty());
    }

    #[test]
    fn test_stop_is_sticky() {
        let mut cl = ControlLoop::new(
            config(0.0),
            FakeOracle::stopping_on(2),
            FakeController::new(),
        );
        let state = Some(VehicleState::default());

        let (out, report) = cl.proc(&state).unwrap();
        assert_eq!(report.mode, LoopMode::Running);
        assert!(out.target_path.is_some());

        let (out, report) = cl.proc(&state).unwrap();
        assert!(report.stop_requested);
        assert_eq!(report.mode, LoopMode::Stopping);
        assert_eq!(out, TickOutput::stop(cl.safety_cmd()));
        assert_eq!(cl.controller().num_solves(), 1);

        for _ in 0..5 {
            let (out, report) = cl.proc(&state).unwrap();
            assert!(!report.stop_requested);
            assert_eq!(
                out.cmd,
                Some(ControlCmd {
                    accel_mps2: -3.0,
                    steer_rad: 0.0
                })
            );
            assert!(out.target_path.is_none() && out.mpc_path.is_none());
        }

        // The oracle was called on the stopping tick and never again
        assert_eq!(cl.oracle().num_calls(), 2);
        assert_eq!(cl.controller().num_solves(), 1);
    }

    #[test]
    fn test_non_optimal_keeps_running() {
        let mut ctrl = FakeController::new();
        ctrl.action.status = SolverStatus::Infeasible;
        let mut cl = ControlLoop::new(config(0.0), FakeOracle::new(), ctrl);

        for _ in 0..3 {
            let (out, report) = cl.proc(&Some(VehicleState::default())).unwrap();
            assert_eq!(report.solver_status, Some(SolverStatus::Infeasible));
            assert_eq!(report.mode, LoopMode::Running);
            assert!(out.cmd.is_some());
        }
    }

    #[test]
    fn test_collaborator_errors_propagate() {
        let mut oracle = FakeOracle::new();
        oracle.fail = true;
        let mut cl = ControlLoop::new(config(0.0), oracle, FakeController::new());
        assert!(matches!(
            cl.proc(&Some(VehicleState::default())),
            Err(ControlLoopError::TrajError(_))
        ));

        let mut ctrl = FakeController::new();
        ctrl.fail = true;
        let mut cl = ControlLoop::new(config(0.0), FakeOracle::new(), ctrl);
        assert!(matches!(
            cl.proc(&Some(VehicleState::default())),
            Err(ControlLoopError::CtrlError(_))
        ));
    }

    #[test]
    fn test_missing_snapshot_while_running() {
        let mut cl = ControlLoop::new(config(0.0), FakeOracle::new(), FakeController::new());
        cl.proc(&Some(VehicleState::default())).unwrap();

        let (out, report) = cl.proc(&None).unwrap();
        assert_eq!(out, TickOutput::default());
        assert_eq!(report.mode, LoopMode::Running);
        assert_eq!(cl.oracle().num_calls(), 1);
    }
}
