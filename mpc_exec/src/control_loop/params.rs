//! Control loop configuration

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Configuration of the control loop, fixed at startup.
#[derive(Debug, Clone, Serialize)]
pub struct LoopConfig {
    /// Track the reference by time rather than by speed
    pub track_using_time: bool,

    /// Desired speed, zero to follow the speed implied by the reference
    pub target_speed_ms: f64,

    /// Tick rate of the loop
    pub tick_rate_hz: f64,

    /// Deceleration commanded while stopping, positive
    pub max_decel_mps2: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            track_using_time: false,
            target_speed_ms: 0.0,
            tick_rate_hz: 10.0,
            max_decel_mps2: 3.0,
        }
    }
}

impl LoopConfig {
    /// The speed passed to the oracle and controller.
    pub fn desired_speed_ms(&self) -> f64 {
        if self.target_speed_ms > 0.0 {
            self.target_speed_ms
        }
        else {
            0.0
        }
    }
}
