//! # MPC follower library.
//!
//! This library allows the executables in this crate (and other crates in the workspace) to access
//! the control loop and its collaborators.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Vehicle state buffer - the latest state estimate, shared between the receiver and the loop
pub mod state_buffer;

/// Vehicle state type and conversions from the wire message
pub mod vehicle;

/// Trajectory module - provides the reference horizon for the controller
pub mod traj;

/// Controller module - turns a reference horizon into acceleration and steering commands
pub mod ctrl;

/// Control loop - the fixed-rate cycle tying everything together
pub mod control_loop;

/// State client - receives state estimates from the vehicle
pub mod state_client;

/// Control server - publishes commands and diagnostic paths
pub mod ctrl_server;

/// Executable parameters
pub mod params;

/// Path tracking error analysis
pub mod analysis;
