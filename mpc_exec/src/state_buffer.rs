//! # State Buffer
//!
//! The state buffer holds the most recent [`VehicleState`] and mediates access between the
//! receiver thread, which writes every state estimate it gets, and the control loop, which takes
//! one snapshot per tick.
//!
//! Writes never wait. If the loop is part way through a read when a state arrives the write is
//! dropped (not queued) and the loop sees the next one instead. Reads always see a whole state,
//! never a mix of fields from two messages.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex, MutexGuard, TryLockError,
};

use crate::vehicle::VehicleState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Latest vehicle state, shared by `Arc` between the state receiver and the control loop.
#[derive(Debug, Default)]
pub struct StateBuffer {
    state: Mutex<Option<VehicleState>>,

    /// Set on the first successful write, never cleared
    received: AtomicBool,

    num_dropped: AtomicU64,
}

/// An in-progress read of the buffer. Writes attempted while this is alive are dropped.
pub struct ReadGuard<'a> {
    guard: MutexGuard<'a, Option<VehicleState>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of a write to the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The state is now the current state
    Written,

    /// A read was in progress so the state was discarded
    Dropped,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a new state into the buffer, unless a read is in progress.
    pub fn write(&self, state: VehicleState) -> WriteOutcome {
        let mut guard = match self.state.try_lock() {
            Ok(g) => g,
            Err(TryLockError::WouldBlock) => {
                self.num_dropped.fetch_add(1, Ordering::Relaxed);
                return WriteOutcome::Dropped;
            }
            // A panicking reader can't have left a partial state behind, values are Copy
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
        };

        *guard = Some(state);
        self.received.store(true, Ordering::Release);

        WriteOutcome::Written
    }

    /// Begin a read of the buffer, holding off writers until the returned guard is dropped.
    pub fn begin_read(&self) -> ReadGuard<'_> {
        let guard = match self.state.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };

        ReadGuard { guard }
    }

    /// Take a snapshot of the latest state, or `None` if no state has ever been written.
    pub fn read_snapshot(&self) -> Option<VehicleState> {
        self.begin_read().snapshot()
    }

    /// Whether at least one state has been written.
    pub fn has_received(&self) -> bool {
        self.received.load(Ordering::Acquire)
    }

    /// Number of writes dropped because a read was in progress.
    pub fn num_dropped(&self) -> u64 {
        self.num_dropped.load(Ordering::Relaxed)
    }
}

impl<'a> ReadGuard<'a> {
    pub fn snapshot(&self) -> Option<VehicleState> {
        *self.guard
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn test_empty_until_written() {
        let buf = StateBuffer::new();

        assert!(!buf.has_received());
        assert_eq!(buf.read_snapshot(), None);

        let s = VehicleState::new(1.0, 2.0, 0.3, 4.0);
        assert_eq!(buf.write(s), WriteOutcome::Written);

        assert!(buf.has_received());
        assert_eq!(buf.read_snapshot(), Some(s));

        // Later writes supersede earlier ones
        let s2 = VehicleState::new(5.0, 6.0, 0.7, 8.0);
        buf.write(s2);
        assert_eq!(buf.read_snapshot(), Some(s2));
    }

    #[test]
    fn test_write_dropped_during_read() {
        let buf = StateBuffer::new();
        let first = VehicleState::new(1.0, 1.0, 1.0, 1.0);
        buf.write(first);

        {
            let read = buf.begin_read();
            let outcome = buf.write(VehicleState::new(2.0, 2.0, 2.0, 2.0));

            assert_eq!(outcome, WriteOutcome::Dropped);
            assert_eq!(read.snapshot(), Some(first));
        }

        // The dropped state was not queued
        assert_eq!(buf.read_snapshot(), Some(first));
        assert_eq!(buf.num_dropped(), 1);

        assert_eq!(
            buf.write(VehicleState::new(3.0, 3.0, 3.0, 3.0)),
            WriteOutcome::Written
        );
        assert_eq!(buf.num_dropped(), 1);
    }

    #[test]
    fn test_no_torn_reads() {
        let buf = Arc::new(StateBuffer::new());
        let writer_buf = buf.clone();

        // Every written state has all fields equal, so any mix of two writes is detectable
        let writer = thread::spawn(move || {
            for i in 0..20_000 {
                let v = i as f64;
                writer_buf.write(VehicleState::new(v, v, v, v));
            }
        });

        let mut num_reads = 0;
        while num_reads < 20_000 {
            if let Some(s) = buf.read_snapshot() {
                assert_eq!(s.x_m, s.y_m);
                assert_eq!(s.x_m, s.psi_rad);
                assert_eq!(s.x_m, s.v_ms);
            }
            num_reads += 1;
        }

        writer.join().unwrap();
        assert!(buf.has_received());
    }
}
