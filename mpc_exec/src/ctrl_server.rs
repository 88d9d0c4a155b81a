//! # Control Server
//!
//! Publishes the control loop's outputs: commands on `mpc_cmd`, the reference horizon on
//! `target_path`, the predicted trajectory on `mpc_path`, and a single message on `enable` once
//! the controller is live.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;

use crate::{
    control_loop::{ControlCmd, OutputSink},
    traj::Trajectory,
};
use comms_if::{
    msg::{Enable, Topic},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Control output server
pub struct CtrlServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CtrlServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not publish on {0}: {1}")]
    SendError(Topic, NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CtrlServer {
    /// Create a new instance of the control server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, CtrlServerError> {
        let socket_options = SocketOptions {
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.ctrl_endpoint)
            .map_err(CtrlServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Announce that the controller is live.
    pub fn send_enable(&mut self) -> Result<(), CtrlServerError> {
        let enable = Enable {
            timestamp: Utc::now(),
        };

        self.publish(Topic::Enable, &enable)
    }

    /// Whether any subscriber is connected.
    pub fn connected(&self) -> bool {
        self.socket.connected()
    }

    fn publish<T: serde::Serialize>(&self, topic: Topic, data: &T) -> Result<(), CtrlServerError> {
        self.socket
            .send_topic(topic, data)
            .map_err(|e| CtrlServerError::SendError(topic, e))
    }
}

impl OutputSink for CtrlServer {
    type Error = CtrlServerError;

    fn send_cmd(&mut self, cmd: &ControlCmd) -> Result<(), Self::Error> {
        self.publish(Topic::MpcCmd, &cmd.to_msg())
    }

    fn send_target_path(&mut self, path: &Trajectory) -> Result<(), Self::Error> {
        self.publish(Topic::TargetPath, &path.to_msg())
    }

    fn send_mpc_path(&mut self, path: &Trajectory) -> Result<(), Self::Error> {
        self.publish(Topic::MpcPath, &path.to_msg())
    }
}
