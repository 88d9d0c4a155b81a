//! # Tracking error analysis
//!
//! Offline comparison of a recorded run against its reference path. Each recorded pose is matched
//! to the closest reference waypoint, giving a distance error and a heading error.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::traj::{Params, RefTrajectory, TrajError, Trajectory};
use util::maths::{closest_point, wrap_to_pi};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A pose taken from a tick archive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RecordedPose {
    pub tick: u64,
    pub x_m: f64,
    pub y_m: f64,
    pub psi_rad: f64,
}

/// Error of a single pose against the reference.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct PoseError {
    pub tick: u64,
    pub closest_index: usize,
    pub dist_error_m: f64,
    pub heading_error_rad: f64,
}

/// Statistics over a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub num_samples: usize,
    pub mean_error_m: f64,
    pub max_error_m: f64,
    pub rms_error_m: f64,
    pub mean_abs_heading_error_rad: f64,
    pub path_length_m: f64,
}

/// Columns of the tick archive used here, rows from before the first state have no pose.
#[derive(Debug, Deserialize)]
struct TickRow {
    tick: u64,
    x_m: Option<f64>,
    y_m: Option<f64>,
    psi_rad: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Could not read the tick archive {0:?}: {1}")]
    ReadError(PathBuf, csv::Error),

    #[error("Could not load the reference path: {0}")]
    ReferenceError(TrajError),

    #[error("The tick archive contains no poses")]
    NoPoses,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load the reference path from a waypoint file, returning its waypoints and length.
pub fn load_reference<P: AsRef<Path>>(path: P) -> Result<(Trajectory, f64), AnalysisError> {
    let traj = RefTrajectory::load(path, Params::default()).map_err(AnalysisError::ReferenceError)?;

    Ok((traj.waypoints(), traj.path_length_m()))
}

/// Load the poses from a tick archive written by the control loop.
pub fn load_recorded_poses<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedPose>, AnalysisError> {
    let path = path.as_ref();

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AnalysisError::ReadError(path.to_path_buf(), e))?;

    let mut poses = Vec::new();

    for row in reader.deserialize() {
        let row: TickRow = row.map_err(|e| AnalysisError::ReadError(path.to_path_buf(), e))?;

        if let (Some(x_m), Some(y_m), Some(psi_rad)) = (row.x_m, row.y_m, row.psi_rad) {
            poses.push(RecordedPose {
                tick: row.tick,
                x_m,
                y_m,
                psi_rad,
            });
        }
    }

    if poses.is_empty() {
        return Err(AnalysisError::NoPoses);
    }

    Ok(poses)
}

/// Compute the error of each pose against the reference.
pub fn tracking_errors(reference: &Trajectory, poses: &[RecordedPose]) -> Vec<PoseError> {
    poses
        .iter()
        .filter_map(|p| {
            let (i, dist) = closest_point(&reference.xs_m, &reference.ys_m, p.x_m, p.y_m)?;

            Some(PoseError {
                tick: p.tick,
                closest_index: i,
                dist_error_m: dist,
                heading_error_rad: wrap_to_pi(p.psi_rad - reference.psis_rad[i]),
            })
        })
        .collect()
}

/// Summarise the errors of a run, `None` if there are none.
pub fn error_stats(errors: &[PoseError], path_length_m: f64) -> Option<ErrorStats> {
    if errors.is_empty() {
        return None;
    }

    let n = errors.len() as f64;
    let sum: f64 = errors.iter().map(|e| e.dist_error_m).sum();
    let sum_sq: f64 = errors.iter().map(|e| e.dist_error_m.powi(2)).sum();
    let max = errors.iter().map(|e| e.dist_error_m).fold(0f64, f64::max);
    let sum_head: f64 = errors.iter().map(|e| e.heading_error_rad.abs()).sum();

    Some(ErrorStats {
        num_samples: errors.len(),
        mean_error_m: sum / n,
        max_error_m: max,
        rms_error_m: (sum_sq / n).sqrt(),
        mean_abs_heading_error_rad: sum_head / n,
        path_length_m,
    })
}
