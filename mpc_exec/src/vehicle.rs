//! Vehicle state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::msg::StateEst;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The state of the vehicle as seen by the control loop.
///
/// One value is captured per received state estimate and never modified afterwards.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Global x position
    pub x_m: f64,

    /// Global y position
    pub y_m: f64,

    /// Heading
    pub psi_rad: f64,

    /// Longitudinal speed
    pub v_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleState {
    pub fn new(x_m: f64, y_m: f64, psi_rad: f64, v_ms: f64) -> Self {
        Self {
            x_m,
            y_m,
            psi_rad,
            v_ms,
        }
    }
}

impl From<&StateEst> for VehicleState {
    fn from(est: &StateEst) -> Self {
        Self {
            x_m: est.x_m,
            y_m: est.y_m,
            psi_rad: est.psi_rad,
            v_ms: est.v_ms,
        }
    }
}
