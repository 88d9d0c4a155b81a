//! # Messages
//!
//! Every message travels as a single zmq frame of the form `"<topic> <json>"`. The topic prefix
//! lets subscribers filter with `set_subscribe`, and the JSON body is the serde representation
//! of the matching message struct in [`vehicle`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod vehicle;

pub use vehicle::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Topics published on the network.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Vehicle state estimate, published by the vehicle (or simulator)
    StateEst,

    /// Acceleration and steering command, published by the controller
    MpcCmd,

    /// The reference horizon tracked on this tick, published by the controller
    TargetPath,

    /// The controller's predicted trajectory, published by the controller
    MpcPath,

    /// One-shot notification that the controller is live
    Enable,
}

#[derive(Debug, thiserror::Error)]
pub enum MsgError {
    #[error("Message has no topic separator: {0:?}")]
    NoTopic(String),

    #[error("Unknown topic \"{0}\"")]
    UnknownTopic(String),

    #[error("Expected a message on topic {expected}, got one on {found}")]
    UnexpectedTopic { expected: Topic, found: Topic },

    #[error("Could not serialize the message: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the message body: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Topic {
    /// The topic string used as the frame prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::StateEst => "state_est",
            Topic::MpcCmd => "mpc_cmd",
            Topic::TargetPath => "target_path",
            Topic::MpcPath => "mpc_path",
            Topic::Enable => "enable",
        }
    }

    /// Parse a topic string.
    pub fn parse(s: &str) -> Result<Self, MsgError> {
        match s {
            "state_est" => Ok(Topic::StateEst),
            "mpc_cmd" => Ok(Topic::MpcCmd),
            "target_path" => Ok(Topic::TargetPath),
            "mpc_path" => Ok(Topic::MpcPath),
            "enable" => Ok(Topic::Enable),
            t => Err(MsgError::UnknownTopic(t.to_string())),
        }
    }

    /// The prefix to pass to `set_subscribe` to receive only this topic.
    ///
    /// Includes the separator so that one topic is never a prefix match for another.
    pub fn subscription(&self) -> String {
        format!("{} ", self.as_str())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a message into a frame on the given topic.
pub fn encode<T: Serialize>(topic: Topic, msg: &T) -> Result<String, MsgError> {
    let body = serde_json::to_string(msg).map_err(MsgError::SerializationError)?;

    Ok(format!("{} {}", topic.as_str(), body))
}

/// Split a frame into its topic and JSON body.
pub fn split(frame: &str) -> Result<(Topic, &str), MsgError> {
    let mut parts = frame.splitn(2, ' ');

    let topic = parts.next().unwrap_or("");
    let body = match parts.next() {
        Some(b) => b,
        None => return Err(MsgError::NoTopic(frame.to_string())),
    };

    Ok((Topic::parse(topic)?, body))
}

/// Decode a frame which is expected to be on the given topic.
pub fn decode<T: DeserializeOwned>(frame: &str, expected: Topic) -> Result<T, MsgError> {
    let (found, body) = split(frame)?;

    if found != expected {
        return Err(MsgError::UnexpectedTopic { expected, found });
    }

    serde_json::from_str(body).map_err(MsgError::DeserializeError)
}
