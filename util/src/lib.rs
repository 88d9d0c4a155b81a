//! Utility library for the MPC path follower software.
//!
//! Provides the plumbing shared by all executables: session directories, logging, parameter
//! loading, CSV archiving and cycle timing.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
