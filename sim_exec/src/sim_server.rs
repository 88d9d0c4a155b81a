//! # Simulator Server
//!
//! Publishes simulated state estimates on `state_est` and receives the controller's `mpc_cmd`
//! and `enable` messages.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use comms_if::{
    msg::{self, Enable, MpcCmd, StateEst, Topic},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimServer {
    state_socket: MonitoredSocket,
    ctrl_socket: MonitoredSocket,
    enabled: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to {0}: {1}")]
    SubscribeError(Topic, zmq::Error),

    #[error("Could not publish the state estimate: {0}")]
    SendError(NetError),

    #[error("Could not receive from the controller: {0}")]
    RecvError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServer {
    /// Bind the state publisher and connect to the controller's output.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SimServerError> {
        let state_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            SocketOptions {
                bind: true,
                linger: 1,
                send_timeout: 10,
                ..Default::default()
            },
            &params.state_endpoint,
        )
        .map_err(SimServerError::SocketError)?;

        // Receives never block, commands are drained once per model update
        let ctrl_socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            SocketOptions {
                linger: 1,
                recv_timeout: 0,
                ..Default::default()
            },
            &params.ctrl_endpoint,
        )
        .map_err(SimServerError::SocketError)?;

        for topic in [Topic::MpcCmd, Topic::Enable].iter() {
            ctrl_socket
                .set_subscribe(topic.subscription().as_bytes())
                .map_err(|e| SimServerError::SubscribeError(*topic, e))?;
        }

        Ok(Self {
            state_socket,
            ctrl_socket,
            enabled: false,
        })
    }

    /// Whether an enable message has been received from the controller.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Drain all pending controller messages, returning the latest command if any arrived.
    pub fn poll_cmds(&mut self) -> Result<Option<MpcCmd>, SimServerError> {
        let mut latest = None;

        loop {
            let frame = match self.ctrl_socket.recv_frame() {
                Ok(Some(f)) => f,
                Ok(None) => break,
                Err(NetError::RecvError(e)) => return Err(SimServerError::RecvError(e)),
                Err(e) => {
                    warn!("Discarding controller message: {}", e);
                    continue;
                }
            };

            match msg::split(&frame) {
                Ok((Topic::MpcCmd, _)) => match msg::decode::<MpcCmd>(&frame, Topic::MpcCmd) {
                    Ok(cmd) => latest = Some(cmd),
                    Err(e) => warn!("Discarding malformed command: {}", e),
                },
                Ok((Topic::Enable, _)) => match msg::decode::<Enable>(&frame, Topic::Enable) {
                    Ok(enable) => {
                        info!("Controller enabled at {}", enable.timestamp);
                        self.enabled = true;
                    }
                    Err(e) => warn!("Discarding malformed enable message: {}", e),
                },
                Ok((topic, _)) => warn!("Unexpected message on {}", topic),
                Err(e) => warn!("Discarding controller message: {}", e),
            }
        }

        Ok(latest)
    }

    /// Publish a state estimate.
    pub fn send_state(&self, est: &StateEst) -> Result<(), SimServerError> {
        self.state_socket
            .send_topic(Topic::StateEst, est)
            .map_err(SimServerError::SendError)
    }
}
