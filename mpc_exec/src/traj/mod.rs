//! # Trajectory module
//!
//! The trajectory oracle maps the current vehicle state onto a short horizon of reference points
//! for the controller to track, and decides when the vehicle should stop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod ref_traj;

pub use params::Params;
pub use ref_traj::RefTrajectory;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::path::PathBuf;

use crate::vehicle::VehicleState;
use comms_if::msg::PathMsg;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of reference horizons.
///
/// Which of the two methods is used is decided once at startup and never changes.
pub trait TrajOracle {
    /// Horizon from the oracle's own time cursor, advancing it.
    fn waypoints_by_time(&mut self, state: &VehicleState) -> Result<Horizon, TrajError>;

    /// Horizon from the vehicle's position along the path at the desired speed.
    ///
    /// A desired speed of zero means the spacing implied by the path's own timing is used.
    fn waypoints_by_speed(
        &mut self,
        state: &VehicleState,
        desired_speed_ms: f64,
    ) -> Result<Horizon, TrajError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A sequence of poses as parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    pub xs_m: Vec<f64>,
    pub ys_m: Vec<f64>,
    pub psis_rad: Vec<f64>,
}

/// The reference horizon for a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Horizon {
    /// Reference points, the first one step ahead of the vehicle
    pub path: Trajectory,

    /// If true the vehicle shall stop, either the path is finished or the vehicle has left it
    pub stop: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajError {
    #[error("Could not read the waypoint file {0:?}: {1}")]
    WaypointLoadError(PathBuf, csv::Error),

    #[error("The waypoint file contains no waypoints")]
    NoWaypoints,

    #[error("Waypoint arrays have different lengths")]
    LengthMismatch,

    #[error("Waypoint times must be strictly increasing, found {next} s after {prev} s")]
    NonIncreasingTime { prev: f64, next: f64 },

    #[error("Waypoint {0} contains a non-finite value")]
    NonFiniteWaypoint(usize),

    #[error("Invalid oracle parameters: {0}")]
    InvalidParams(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Trajectory {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            xs_m: Vec::with_capacity(n),
            ys_m: Vec::with_capacity(n),
            psis_rad: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, x_m: f64, y_m: f64, psi_rad: f64) {
        self.xs_m.push(x_m);
        self.ys_m.push(y_m);
        self.psis_rad.push(psi_rad);
    }

    /// Number of poses, zero if the arrays disagree in length.
    pub fn len(&self) -> usize {
        if self.xs_m.len() == self.ys_m.len() && self.ys_m.len() == self.psis_rad.len() {
            self.xs_m.len()
        }
        else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into the wire representation.
    pub fn to_msg(&self) -> PathMsg {
        PathMsg {
            xs_m: self.xs_m.clone(),
            ys_m: self.ys_m.clone(),
            psis_rad: self.psis_rad.clone(),
        }
    }
}
