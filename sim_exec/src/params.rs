//! # Simulator Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::vehicle_model::VehicleParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct SimExecParams {
    /// Initial global x position
    #[serde(default = "default_x0_m")]
    pub x0_m: f64,

    /// Initial global y position
    #[serde(default = "default_y0_m")]
    pub y0_m: f64,

    /// Initial heading
    #[serde(default = "default_psi0_rad")]
    pub psi0_rad: f64,

    /// Period of the model update, a state estimate is published after each update
    #[serde(default = "default_model_period_s")]
    pub model_period_s: f64,

    /// Number of integration steps per model update
    #[serde(default = "default_num_substeps")]
    pub num_substeps: usize,

    /// Log level string, at least as verbose as "info"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Archive every simulated state
    #[serde(default)]
    pub record: bool,

    #[serde(default)]
    pub vehicle: VehicleParams,
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("model_period_s must be finite and positive, got {0}")]
    InvalidPeriod(f64),

    #[error("num_substeps must be at least 1")]
    NoSubsteps,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimExecParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.model_period_s.is_finite() && self.model_period_s > 0.0) {
            return Err(ParamsError::InvalidPeriod(self.model_period_s));
        }
        if self.num_substeps == 0 {
            return Err(ParamsError::NoSubsteps);
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_x0_m() -> f64 {
    -300.0
}

fn default_y0_m() -> f64 {
    -450.0
}

fn default_psi0_rad() -> f64 {
    1.0
}

fn default_model_period_s() -> f64 {
    0.01
}

fn default_num_substeps() -> usize {
    10
}

fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let params: SimExecParams = toml::from_str(
            r#"
            x0_m = 10.0
            num_substeps = 4

            [vehicle]
            mass_kg = 1500.0
            "#,
        )
        .unwrap();

        assert_eq!(params.x0_m, 10.0);
        assert_eq!(params.y0_m, -450.0);
        assert_eq!(params.model_period_s, 0.01);
        assert_eq!(params.num_substeps, 4);
        assert_eq!(params.vehicle.mass_kg, 1500.0);
        assert_eq!(params.vehicle.lf_m, 1.152);
        assert!(!params.record);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid() {
        let params: SimExecParams = toml::from_str("model_period_s = 0.0").unwrap();
        assert!(matches!(params.validate(), Err(ParamsError::InvalidPeriod(_))));

        let params: SimExecParams = toml::from_str("num_substeps = 0").unwrap();
        assert!(matches!(params.validate(), Err(ParamsError::NoSubsteps)));
    }
}
