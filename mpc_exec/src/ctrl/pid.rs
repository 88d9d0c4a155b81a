//! PID controller

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PID controller updated at a fixed period.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            prev_error: None,
            integral: 0f64,
        }
    }

    /// Get the value of the controller for the given error, `dt_s` after the previous call.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        let valid_dt = dt_s.is_finite() && dt_s > 0.0;

        if valid_dt {
            self.integral += error * dt_s;
        }

        // No derivative on the first call, a step from zero would spike the output
        let deriv = match self.prev_error {
            Some(e) if valid_dt => (error - e) / dt_s,
            _ => 0f64,
        };

        self.prev_error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }
}
