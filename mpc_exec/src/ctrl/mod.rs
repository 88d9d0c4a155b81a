//! # Controller module
//!
//! A controller takes the vehicle's initial condition and a reference horizon and produces an
//! acceleration and steering command, along with the trajectory it predicts the vehicle will
//! follow. The control loop only depends on the [`Controller`] trait, so an optimisation based
//! solver can be swapped in for the [`KinematicTracker`] provided here.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod kin_tracker;
mod params;
mod pid;

pub use kin_tracker::KinematicTracker;
pub use params::Params;
pub use pid::PidController;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::traj::Trajectory;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The call contract of a path tracking controller.
///
/// Each tick the loop calls, in order, `update_initial_condition`, `update_reference`, `solve`,
/// `update_current_input` and `predicted_trajectory`. No timeout is placed on `solve`.
pub trait Controller {
    fn update_initial_condition(&mut self, x_m: f64, y_m: f64, psi_rad: f64, v_ms: f64);

    fn update_reference(
        &mut self,
        xs_m: &[f64],
        ys_m: &[f64],
        psis_rad: &[f64],
        desired_speed_ms: f64,
    );

    /// Compute the command for the current initial condition and reference.
    ///
    /// Failing to find a good solution is reported through [`ControlAction::status`], errors are
    /// reserved for misuse of the controller.
    fn solve(&mut self) -> Result<ControlAction, CtrlError>;

    /// Record the input actually applied to the vehicle.
    fn update_current_input(&mut self, steer_rad: f64, accel_mps2: f64);

    /// The trajectory predicted under the current input.
    fn predicted_trajectory(&self) -> Trajectory;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Output of a single solve.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ControlAction {
    pub accel_mps2: f64,
    pub steer_rad: f64,
    pub status: SolverStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SolverStatus {
    Optimal,

    /// A solution was found but had to be limited
    Suboptimal,

    /// No solution exists for the given reference
    Infeasible,

    /// The solver failed numerically
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid controller parameters: {0}")]
    InvalidParams(String),

    #[error("Solve called before an initial condition was set")]
    NoInitialCondition,
}
