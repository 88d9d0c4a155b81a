//! # State Client
//!
//! Subscribes to the vehicle's `state_est` topic and writes every estimate into the
//! [`StateBuffer`] from a background thread. The control loop never talks to the socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crate::{
    state_buffer::{StateBuffer, WriteOutcome},
    vehicle::VehicleState,
};
use comms_if::{
    msg::{StateEst, Topic},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct StateClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StateClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the state topic: {0}")]
    SubscribeError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StateClient {
    /// Connect to the state endpoint and start receiving into `buffer`.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        buffer: Arc<StateBuffer>,
    ) -> Result<Self, StateClientError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.state_endpoint)
            .map_err(StateClientError::SocketError)?;

        socket
            .set_subscribe(Topic::StateEst.subscription().as_bytes())
            .map_err(StateClientError::SubscribeError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || bg_thread(socket, bg_run_clone, buffer)));

        Ok(Self { bg_jh, bg_run })
    }
}

impl Drop for StateClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("StateClient background thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, writes each received state estimate into the buffer.
fn bg_thread(socket: MonitoredSocket, run: Arc<AtomicBool>, buffer: Arc<StateBuffer>) {
    let mut was_connected = false;

    while run.load(Ordering::Relaxed) {
        if socket.connected() != was_connected {
            was_connected = socket.connected();
            debug!("StateClient connected: {}", was_connected);
        }

        let est: StateEst = match socket.recv_topic(Topic::StateEst) {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            Err(NetError::RecvError(e)) => {
                error!("Error receiving state estimate: {}", e);
                break;
            }
            Err(e) => {
                warn!("Discarding state estimate: {}", e);
                continue;
            }
        };

        if let WriteOutcome::Dropped = buffer.write(VehicleState::from(&est)) {
            debug!("State estimate dropped, control loop was reading");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_state_reaches_buffer() {
        let ctx = zmq::Context::new();
        let params = NetParams {
            state_endpoint: "inproc://state_client_test".into(),
            ctrl_endpoint: "inproc://state_client_test_ctrl".into(),
        };

        let publisher = MonitoredSocket::new(
            &ctx,
            zmq::PUB,
            SocketOptions {
                bind: true,
                ..Default::default()
            },
            &params.state_endpoint,
        )
        .unwrap();

        let buffer = Arc::new(StateBuffer::new());
        let client = StateClient::new(&ctx, &params, buffer.clone()).unwrap();

        let est = StateEst {
            timestamp: Utc::now(),
            x_m: 1.0,
            y_m: 2.0,
            psi_rad: 0.3,
            v_ms: 4.0,
            a_mps2: 0.1,
            df_rad: 0.0,
        };

        // Subscriptions propagate asynchronously, so keep publishing until one lands
        for _ in 0..100 {
            publisher.send_topic(Topic::StateEst, &est).unwrap();
            if buffer.has_received() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(
            buffer.read_snapshot(),
            Some(VehicleState::new(1.0, 2.0, 0.3, 4.0))
        );

        drop(client);
    }
}
