//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the messages exchanged
//! between the controller and the vehicle, and the networking layer that carries them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for the vehicle state, commands and diagnostic paths
pub mod msg;

/// Network module
pub mod net;
