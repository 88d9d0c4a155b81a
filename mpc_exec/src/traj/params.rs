//! Trajectory oracle parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use super::TrajError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the reference trajectory oracle, the `[oracle]` table of `mpc_exec.toml`.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {
    /// Number of points in each horizon
    pub horizon_len: usize,

    /// Time between consecutive horizon points
    pub horizon_step_s: f64,

    /// If the vehicle is further than this from the closest waypoint the oracle requests a stop
    pub max_offpath_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            horizon_len: 8,
            horizon_step_s: 0.2,
            max_offpath_m: 10.0,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), TrajError> {
        if self.horizon_len == 0 {
            return Err(TrajError::InvalidParams("horizon_len must be at least 1".into()));
        }
        if !(self.horizon_step_s.is_finite() && self.horizon_step_s > 0.0) {
            return Err(TrajError::InvalidParams(format!(
                "horizon_step_s must be positive, got {}",
                self.horizon_step_s
            )));
        }
        if !(self.max_offpath_m > 0.0) {
            return Err(TrajError::InvalidParams(format!(
                "max_offpath_m must be positive, got {}",
                self.max_offpath_m
            )));
        }

        Ok(())
    }
}
