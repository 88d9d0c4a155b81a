//! Kinematic tracker parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use super::CtrlError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the kinematic tracker, loaded from `kin_tracker.toml`.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Lateral controller proportional gain
    pub lat_k_p: f64,

    /// Lateral controller integral gain
    pub lat_k_i: f64,

    /// Lateral controller derivative gain
    pub lat_k_d: f64,

    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Speed controller proportional gain
    pub speed_k_p: f64,

    /// Index of the reference point used to compute the lateral and heading errors
    pub lookahead_index: usize,

    /// Minimum acceleration demand, negative for braking
    pub min_accel_mps2: f64,

    /// Maximum acceleration demand
    pub max_accel_mps2: f64,

    /// Steering angle limit, applied symmetrically
    pub max_steer_rad: f64,

    /// Steering rate limit
    pub max_steer_rate_rads: f64,

    /// Distance from the centre of gravity to the front axle
    #[serde(default = "default_lf_m")]
    pub lf_m: f64,

    /// Distance from the centre of gravity to the rear axle
    #[serde(default = "default_lr_m")]
    pub lr_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), CtrlError> {
        // Limits feed f64::clamp, which panics on a NaN bound
        if !(self.min_accel_mps2.is_finite()
            && self.max_accel_mps2.is_finite()
            && self.min_accel_mps2 <= 0.0
            && self.max_accel_mps2 >= 0.0)
        {
            return Err(CtrlError::InvalidParams(format!(
                "acceleration limits [{}, {}] must be finite and contain zero",
                self.min_accel_mps2, self.max_accel_mps2
            )));
        }
        if !(self.max_steer_rad.is_finite()
            && self.max_steer_rate_rads.is_finite()
            && self.max_steer_rad > 0.0
            && self.max_steer_rate_rads > 0.0)
        {
            return Err(CtrlError::InvalidParams(
                "steering limits must be finite and positive".into(),
            ));
        }
        if !(self.lf_m.is_finite() && self.lr_m.is_finite() && self.lf_m > 0.0 && self.lr_m > 0.0) {
            return Err(CtrlError::InvalidParams(
                "axle distances must be positive".into(),
            ));
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_lf_m() -> f64 {
    1.5213
}

fn default_lr_m() -> f64 {
    1.4987
}

#[cfg(test)]
mod test {
    use super::*;

    const BASE: &str = r#"
        lat_k_p = 0.15
        lat_k_i = 0.0
        lat_k_d = 0.02
        head_k_p = 1.0
        head_k_i = 0.0
        head_k_d = 0.05
        speed_k_p = 1.0
        lookahead_index = 2
        max_steer_rate_rads = 0.5
    "#;

    fn parse(limits: &str) -> Params {
        toml::from_str(&format!("{}{}", BASE, limits)).unwrap()
    }

    #[test]
    fn test_valid_limits() {
        let params = parse("min_accel_mps2 = -3.0\nmax_accel_mps2 = 2.0\nmax_steer_rad = 0.5");
        assert!(params.validate().is_ok());
        assert_eq!(params.lf_m, 1.5213);
    }

    #[test]
    fn test_nan_limits_rejected() {
        for limits in [
            "min_accel_mps2 = nan\nmax_accel_mps2 = 2.0\nmax_steer_rad = 0.5",
            "min_accel_mps2 = -3.0\nmax_accel_mps2 = nan\nmax_steer_rad = 0.5",
            "min_accel_mps2 = -3.0\nmax_accel_mps2 = 2.0\nmax_steer_rad = nan",
            "min_accel_mps2 = -inf\nmax_accel_mps2 = 2.0\nmax_steer_rad = 0.5",
            "min_accel_mps2 = 1.0\nmax_accel_mps2 = 2.0\nmax_steer_rad = 0.5",
        ]
        .iter()
        {
            assert!(
                matches!(parse(limits).validate(), Err(CtrlError::InvalidParams(_))),
                "accepted {:?}",
                limits
            );
        }
    }
}
