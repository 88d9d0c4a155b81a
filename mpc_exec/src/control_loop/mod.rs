//! # Control loop
//!
//! The fixed-rate cycle at the heart of the follower. Each tick the loop takes a snapshot of the
//! latest vehicle state, asks the trajectory oracle for a reference horizon, runs the controller
//! on it and hands the command and diagnostic paths to an [`OutputSink`].
//!
//! The loop moves through three modes:
//!
//! - `AwaitingFirstState`: nothing is called or published until a state has been received. The
//!   tick on which the first state arrives is processed as a running tick.
//! - `Running`: oracle, controller, and all three outputs every tick.
//! - `Stopping`: entered when the oracle raises its stop flag. Only the safety command
//!   `{ -max_decel, 0 }` is published and neither oracle nor controller is called again. There is
//!   no way out of this mode.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod runner;
mod state;

#[cfg(test)]
mod fakes;

pub use params::LoopConfig;
pub use runner::{run, step, OutputSink, RunSummary, TickRecord};
pub use state::ControlLoop;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    ctrl::{CtrlError, SolverStatus},
    traj::{TrajError, Trajectory},
    vehicle::VehicleState,
};
use comms_if::msg::MpcCmd;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command sent to the vehicle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ControlCmd {
    pub accel_mps2: f64,
    pub steer_rad: f64,
}

/// Everything published for a tick, in publication order.
///
/// `mpc_path` is left empty by the loop and filled from [`ControlLoop::predict`] after the
/// command and target path have been sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub cmd: Option<ControlCmd>,
    pub target_path: Option<Trajectory>,
    pub mpc_path: Option<Trajectory>,
}

/// Status of a single tick.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Tick number, starting from 1
    pub tick: u64,

    /// Mode at the end of the tick
    pub mode: LoopMode,

    /// The state snapshot used by this tick
    pub state: Option<VehicleState>,

    /// Status of the controller, if it was run
    pub solver_status: Option<SolverStatus>,

    /// True on the tick where the oracle requested a stop
    pub stop_requested: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum LoopMode {
    AwaitingFirstState,
    Running,
    Stopping,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlLoopError {
    #[error("Trajectory oracle error: {0}")]
    TrajError(#[from] TrajError),

    #[error("Controller error: {0}")]
    CtrlError(#[from] CtrlError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ControlCmd {
    pub fn to_msg(&self) -> MpcCmd {
        MpcCmd {
            accel_cmd_mps2: self.accel_mps2,
            steer_angle_cmd_rad: self.steer_rad,
        }
    }
}

impl TickOutput {
    /// Output of a stopping tick, the command only.
    pub fn stop(cmd: ControlCmd) -> Self {
        Self {
            cmd: Some(cmd),
            ..Default::default()
        }
    }
}
