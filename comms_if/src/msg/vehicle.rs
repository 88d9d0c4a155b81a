//! Vehicle messages
//!
//! State estimates flow from the vehicle to the controller, everything else flows from the
//! controller to the vehicle and to any diagnostic subscribers.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Estimated state of the vehicle, published on `state_est`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEst {
    /// Time at which the estimate was made
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Global x position
    pub x_m: f64,

    /// Global y position
    pub y_m: f64,

    /// Heading, wrapped into [-pi, pi)
    pub psi_rad: f64,

    /// Longitudinal speed
    pub v_ms: f64,

    /// Longitudinal acceleration currently applied
    #[serde(default)]
    pub a_mps2: f64,

    /// Front steering angle currently applied
    #[serde(default)]
    pub df_rad: f64,
}

/// Acceleration and steering command, published on `mpc_cmd`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpcCmd {
    pub accel_cmd_mps2: f64,
    pub steer_angle_cmd_rad: f64,
}

/// A path as parallel coordinate arrays, published on `target_path` and `mpc_path`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathMsg {
    pub xs_m: Vec<f64>,
    pub ys_m: Vec<f64>,
    pub psis_rad: Vec<f64>,
}

/// Published once on `enable` when the controller has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enable {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathMsg {
    /// Number of points in the path, zero if the arrays disagree in length.
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
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::msg::{decode, encode, Topic};
    use chrono::TimeZone;

    #[test]
    fn test_state_est_wire_format() {
        let frame = "state_est {\"timestamp\":1600000000123,\"x_m\":1.0,\"y_m\":-2.0,\
                     \"psi_rad\":0.5,\"v_ms\":3.0}";

        let est: StateEst = decode(frame, Topic::StateEst).unwrap();
        assert_eq!(est.timestamp, Utc.timestamp_millis(1600000000123));
        assert_eq!(est.x_m, 1.0);
        assert_eq!(est.y_m, -2.0);
        assert_eq!(est.v_ms, 3.0);

        // Applied inputs are optional on the wire
        assert_eq!(est.a_mps2, 0.0);
        assert_eq!(est.df_rad, 0.0);
    }

    #[test]
    fn test_path_len() {
        let path = PathMsg {
            xs_m: vec![0.0, 1.0],
            ys_m: vec![0.0, 0.0],
            psis_rad: vec![0.0, 0.0],
        };
        assert_eq!(path.len(), 2);

        let frame = encode(Topic::TargetPath, &path).unwrap();
        let decoded: PathMsg = decode(&frame, Topic::TargetPath).unwrap();
        assert_eq!(decoded, path);

        let ragged = PathMsg {
            xs_m: vec![0.0],
            ..Default::default()
        };
        assert!(ragged.is_empty());
    }
}
