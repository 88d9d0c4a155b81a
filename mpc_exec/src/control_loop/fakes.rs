//! Test doubles for the control loop's collaborators.

use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use super::{ControlCmd, OutputSink};
use crate::{
    ctrl::{ControlAction, Controller, CtrlError, SolverStatus},
    traj::{Horizon, TrajError, TrajOracle, Trajectory},
    vehicle::VehicleState,
};

/// Three point horizon along the x axis.
pub fn horizon_path() -> Trajectory {
    Trajectory {
        xs_m: vec![1.0, 2.0, 3.0],
        ys_m: vec![0.0, 0.0, 0.0],
        psis_rad: vec![0.0, 0.0, 0.0],
    }
}

/// The path predicted by the fake controller.
pub fn predicted_path() -> Trajectory {
    Trajectory {
        xs_m: vec![0.5, 1.5, 2.5],
        ys_m: vec![0.1, 0.2, 0.3],
        psis_rad: vec![0.05, 0.1, 0.15],
    }
}

pub struct FakeOracle {
    /// Raise the stop flag from this call onwards (1 based)
    pub stop_on: Option<usize>,
    pub fail: bool,
    pub speeds: Vec<f64>,
    pub time_calls: usize,
}

pub struct FakeController {
    pub action: ControlAction,
    pub fail: bool,
    calls: RefCell<Vec<&'static str>>,
    pub initial: Option<(f64, f64, f64, f64)>,
    pub reference: Option<Trajectory>,
    pub desired_speed_ms: Option<f64>,
    pub inputs: Vec<(f64, f64)>,
}

#[derive(Default)]
pub struct FakeSink {
    pub cmds: Vec<ControlCmd>,
    pub target_paths: Vec<Trajectory>,
    pub mpc_paths: Vec<Trajectory>,
    pub order: Vec<&'static str>,
    pub fail: bool,

    /// Set the flag once this many commands have been sent
    pub shutdown_after: Option<(usize, Arc<AtomicBool>)>,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self {
            stop_on: None,
            fail: false,
            speeds: Vec::new(),
            time_calls: 0,
        }
    }

    pub fn stopping_on(call: usize) -> Self {
        Self {
            stop_on: Some(call),
            ..Self::new()
        }
    }

    pub fn num_calls(&self) -> usize {
        self.speeds.len() + self.time_calls
    }

    fn horizon(&self) -> Result<Horizon, TrajError> {
        if self.fail {
            return Err(TrajError::NoWaypoints);
        }

        Ok(Horizon {
            path: horizon_path(),
            stop: self.stop_on.map_or(false, |n| self.num_calls() >= n),
        })
    }
}

impl TrajOracle for FakeOracle {
    fn waypoints_by_time(&mut self, _state: &VehicleState) -> Result<Horizon, TrajError> {
        self.time_calls += 1;
        self.horizon()
    }

    fn waypoints_by_speed(
        &mut self,
        _state: &VehicleState,
        desired_speed_ms: f64,
    ) -> Result<Horizon, TrajError> {
        self.speeds.push(desired_speed_ms);
        self.horizon()
    }
}

impl FakeController {
    pub fn new() -> Self {
        Self {
            action: ControlAction {
                accel_mps2: 0.5,
                steer_rad: 0.1,
                status: SolverStatus::Optimal,
            },
            fail: false,
            calls: RefCell::new(Vec::new()),
            initial: None,
            reference: None,
            desired_speed_ms: None,
            inputs: Vec::new(),
        }
    }

    /// Names of the trait methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn num_solves(&self) -> usize {
        self.calls.borrow().iter().filter(|&&c| c == "solve").count()
    }
}

impl Controller for FakeController {
    fn update_initial_condition(&mut self, x_m: f64, y_m: f64, psi_rad: f64, v_ms: f64) {
        self.calls.borrow_mut().push("update_initial_condition");
        self.initial = Some((x_m, y_m, psi_rad, v_ms));
    }

    fn update_reference(
        &mut self,
        xs_m: &[f64],
        ys_m: &[f64],
        psis_rad: &[f64],
        desired_speed_ms: f64,
    ) {
        self.calls.borrow_mut().push("update_reference");
        self.reference = Some(Trajectory {
            xs_m: xs_m.to_vec(),
            ys_m: ys_m.to_vec(),
            psis_rad: psis_rad.to_vec(),
        });
        self.desired_speed_ms = Some(desired_speed_ms);
    }

    fn solve(&mut self) -> Result<ControlAction, CtrlError> {
        self.calls.borrow_mut().push("solve");

        if self.fail {
            Err(CtrlError::NoInitialCondition)
        }
        else {
            Ok(self.action)
        }
    }

    fn update_current_input(&mut self, steer_rad: f64, accel_mps2: f64) {
        self.calls.borrow_mut().push("update_current_input");
        self.inputs.push((steer_rad, accel_mps2));
    }

    fn predicted_trajectory(&self) -> Trajectory {
        self.calls.borrow_mut().push("predicted_trajectory");
        predicted_path()
    }
}

#[derive(Debug)]
pub struct FakeSinkError;

impl std::fmt::Display for FakeSinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fake transport failure")
    }
}

impl OutputSink for FakeSink {
    type Error = FakeSinkError;

    fn send_cmd(&mut self, cmd: &ControlCmd) -> Result<(), Self::Error> {
        self.order.push("cmd");
        self.cmds.push(*cmd);

        if let Some((n, ref flag)) = self.shutdown_after {
            if self.cmds.len() >= n {
                flag.store(true, Ordering::Relaxed);
            }
        }

        if self.fail {
            Err(FakeSinkError)
        }
        else {
            Ok(())
        }
    }

    fn send_target_path(&mut self, path: &Trajectory) -> Result<(), Self::Error> {
        self.order.push("target_path");
        self.target_paths.push(path.clone());

        if self.fail {
            Err(FakeSinkError)
        }
        else {
            Ok(())
        }
    }

    fn send_mpc_path(&mut self, path: &Trajectory) -> Result<(), Self::Error> {
        self.order.push("mpc_path");
        self.mpc_paths.push(path.clone());

        if self.fail {
            Err(FakeSinkError)
        }
        else {
            Ok(())
        }
    }
}
