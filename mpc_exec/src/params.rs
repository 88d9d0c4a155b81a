//! # Executable parameters
//!
//! `mpc_exec.toml` is deserialised with every field optional, then validated into
//! [`MpcExecParams`] so that a missing required value is reported by name rather than as a
//! TOML error.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::path::PathBuf;

use crate::{control_loop::LoopConfig, traj};
use util::logger::{self, LevelFilter, LoggerInitError};
use util::params::LoadError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const DEFAULT_TICK_RATE_HZ: f64 = 10.0;

const DEFAULT_MAX_DECEL_MPS2: f64 = 3.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters as they appear in the file.
#[derive(Debug, Default, Deserialize)]
pub struct RawMpcExecParams {
    pub waypoint_file: Option<String>,
    pub track_using_time: Option<bool>,
    pub ctrl_params_file: Option<String>,
    pub target_speed_ms: Option<f64>,
    pub tick_rate_hz: Option<f64>,
    pub max_decel_mps2: Option<f64>,
    pub log_level: Option<String>,
    pub record: Option<bool>,

    #[serde(default)]
    pub oracle: traj::Params,
}

/// Validated executable parameters.
#[derive(Debug, Clone)]
pub struct MpcExecParams {
    /// Waypoint file, resolved against the parameters directory
    pub waypoint_file: PathBuf,

    /// Controller parameter file, relative to the parameters directory
    pub ctrl_params_file: String,

    pub loop_config: LoopConfig,

    pub oracle: traj::Params,

    pub log_level: LevelFilter,

    /// Write the per-tick archive
    pub record: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not load parameters: {0}")]
    LoadError(LoadError),

    #[error("Required parameter `{0}` is missing")]
    Missing(&'static str),

    #[error("Parameter `{key}` is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Parameter `log_level` is invalid: {0}")]
    LogLevel(LoggerInitError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RawMpcExecParams {
    /// Check the parameters and fill in defaults.
    pub fn validate(self) -> Result<MpcExecParams, ConfigError> {
        let waypoint_file = self
            .waypoint_file
            .ok_or(ConfigError::Missing("waypoint_file"))?;
        let track_using_time = self
            .track_using_time
            .ok_or(ConfigError::Missing("track_using_time"))?;
        let ctrl_params_file = self
            .ctrl_params_file
            .ok_or(ConfigError::Missing("ctrl_params_file"))?;

        let target_speed_ms = self.target_speed_ms.unwrap_or(0.0);
        if !(target_speed_ms.is_finite() && target_speed_ms >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "target_speed_ms",
                reason: format!("must be zero or positive, got {}", target_speed_ms),
            });
        }

        let tick_rate_hz = self.tick_rate_hz.unwrap_or(DEFAULT_TICK_RATE_HZ);
        if !(tick_rate_hz.is_finite() && tick_rate_hz > 0.0) {
            return Err(ConfigError::Invalid {
                key: "tick_rate_hz",
                reason: format!("must be positive, got {}", tick_rate_hz),
            });
        }

        let max_decel_mps2 = self.max_decel_mps2.unwrap_or(DEFAULT_MAX_DECEL_MPS2);
        if !(max_decel_mps2.is_finite() && max_decel_mps2 > 0.0) {
            return Err(ConfigError::Invalid {
                key: "max_decel_mps2",
                reason: format!("must be positive, got {}", max_decel_mps2),
            });
        }

        self.oracle.validate().map_err(|e| ConfigError::Invalid {
            key: "oracle",
            reason: e.to_string(),
        })?;

        let log_level = match self.log_level {
            Some(ref l) => logger::parse_level(l).map_err(ConfigError::LogLevel)?,
            None => LevelFilter::Info,
        };

        let waypoint_file =
            util::params::resolve(&waypoint_file).map_err(ConfigError::LoadError)?;

        Ok(MpcExecParams {
            waypoint_file,
            ctrl_params_file,
            loop_config: LoopConfig {
                track_using_time,
                target_speed_ms,
                tick_rate_hz,
                max_decel_mps2,
            },
            oracle: self.oracle,
            log_level,
            record: self.record.unwrap_or(true),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load and validate the executable parameters from a file in the parameters directory.
pub fn load(param_file: &str) -> Result<MpcExecParams, ConfigError> {
    let raw: RawMpcExecParams = util::params::load(param_file).map_err(ConfigError::LoadError)?;

    raw.validate()
}
