//! # Vehicle model
//!
//! Dynamic bicycle model with a linear tyre model. Longitudinal speed is never allowed to go
//! negative, and the actual acceleration and steering angle follow the demanded values through a
//! first order lag.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comms_if::msg::StateEst;
use util::maths::wrap_to_pi;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Below this longitudinal speed the vehicle is treated as stationary.
const MIN_SPEED_MS: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Physical parameters of the simulated vehicle, the `[vehicle]` table of `sim_exec.toml`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct VehicleParams {
    /// Centre of gravity to front axle
    pub lf_m: f64,

    /// Centre of gravity to rear axle
    pub lr_m: f64,

    pub mass_kg: f64,

    /// Yaw moment of inertia
    pub iz_kgm2: f64,

    /// Front tyre cornering stiffness
    pub cf_n: f64,

    /// Rear tyre cornering stiffness
    pub cr_n: f64,

    /// Gain of the first order lag between demanded and actual inputs
    pub actuator_gain: f64,
}

/// Full simulated state.
#[derive(Serialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct SimState {
    pub x_m: f64,
    pub y_m: f64,
    pub psi_rad: f64,

    /// Longitudinal speed in the body frame
    pub vx_ms: f64,

    /// Lateral speed in the body frame
    pub vy_ms: f64,

    /// Yaw rate
    pub wz_rads: f64,

    /// Actual acceleration
    pub acc_mps2: f64,

    /// Actual front steering angle
    pub df_rad: f64,
}

pub struct VehicleModel {
    params: VehicleParams,
    state: SimState,
    acc_des_mps2: f64,
    df_des_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            lf_m: 1.152,
            lr_m: 1.693,
            mass_kg: 1840.0,
            iz_kgm2: 3477.0,
            cf_n: 4.0703e4,
            cr_n: 6.4495e4,
            actuator_gain: 5.0,
        }
    }
}

impl VehicleModel {
    /// Create a stationary vehicle at the given pose.
    pub fn new(params: VehicleParams, x_m: f64, y_m: f64, psi_rad: f64) -> Self {
        Self {
            params,
            state: SimState {
                x_m,
                y_m,
                psi_rad: wrap_to_pi(psi_rad),
                ..Default::default()
            },
            acc_des_mps2: 0.0,
            df_des_rad: 0.0,
        }
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Set the demanded acceleration and steering angle.
    pub fn set_demands(&mut self, acc_des_mps2: f64, df_des_rad: f64) {
        self.acc_des_mps2 = acc_des_mps2;
        self.df_des_rad = df_des_rad;
    }

    /// Advance the model by `dt_s`, integrating in `num_substeps` equal steps.
    pub fn step(&mut self, dt_s: f64, num_substeps: usize) {
        let n = num_substeps.max(1);
        let h = dt_s / n as f64;

        for _ in 0..n {
            self.integrate(h);
            self.update_actuators(h);
        }
    }

    /// The state estimate published for this state.
    pub fn state_est(&self, timestamp: DateTime<Utc>) -> StateEst {
        StateEst {
            timestamp,
            x_m: self.state.x_m,
            y_m: self.state.y_m,
            psi_rad: self.state.psi_rad,
            v_ms: self.state.vx_ms,
            a_mps2: self.state.acc_mps2,
            df_rad: self.state.df_rad,
        }
    }

    fn integrate(&mut self, h: f64) {
        let p = &self.params;
        let s = self.state;

        // Tyre slip angles, zero when stationary
        let (alpha_f, alpha_r) = if s.vx_ms.abs() > MIN_SPEED_MS {
            (
                s.df_rad - (s.vy_ms + p.lf_m * s.wz_rads).atan2(s.vx_ms),
                -(s.vy_ms - p.lr_m * s.wz_rads).atan2(s.vx_ms),
            )
        }
        else {
            (0.0, 0.0)
        };

        let fyf = p.cf_n * alpha_f;
        let fyr = p.cr_n * alpha_r;

        let vx_n = (s.vx_ms
            + h * (s.acc_mps2 - fyf * s.df_rad.sin() / p.mass_kg + s.wz_rads * s.vy_ms))
            .max(0.0);

        let (vy_n, wz_n) = if vx_n > MIN_SPEED_MS {
            (
                s.vy_ms + h * ((fyf * s.df_rad.cos() + fyr) / p.mass_kg - s.wz_rads * s.vx_ms),
                s.wz_rads + h * ((p.lf_m * fyf * s.df_rad.cos() - p.lr_m * fyr) / p.iz_kgm2),
            )
        }
        else {
            (0.0, 0.0)
        };

        self.state.x_m = s.x_m + h * (s.vx_ms * s.psi_rad.cos() - s.vy_ms * s.psi_rad.sin());
        self.state.y_m = s.y_m + h * (s.vx_ms * s.psi_rad.sin() + s.vy_ms * s.psi_rad.cos());
        self.state.psi_rad = wrap_to_pi(s.psi_rad + h * s.wz_rads);
        self.state.vx_ms = vx_n;
        self.state.vy_ms = vy_n;
        self.state.wz_rads = wz_n;
    }

    fn update_actuators(&mut self, h: f64) {
        let k = self.params.actuator_gain;

        self.state.acc_mps2 += k * (self.acc_des_mps2 - self.state.acc_mps2) * h;
        self.state.df_rad += k * (self.df_des_rad - self.state.df_rad) * h;
    }
}
