//! Typed event plumbing between monitor threads, the pool, and its consumer.
//!
//! Each pool owns its own channel pair; there is no global dispatch. Monitor
//! threads report through an [`Outbox`] and never touch pool state. Consumers
//! optionally hand the pool a [`Notice`] sender to observe messages, kills,
//! idle transitions, and shutdown.

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::uid::WorkerUid;
use crate::worker::ExitKind;

/// Outcome signal from a worker's monitor thread to its pool.
///
/// Every variant carries the reporting worker's full identity (uid and pid)
/// so the pool can verify it before routing.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// The worker process wrote one payload line.
    Message {
        /// Logical identity of the reporting worker.
        uid: WorkerUid,
        /// OS pid of the reporting process.
        pid: u32,
        /// The payload line, newline stripped.
        payload: String,
    },
    /// The worker process ended; terminal, exactly one per process.
    Exited {
        /// Logical identity of the reporting worker.
        uid: WorkerUid,
        /// OS pid of the reporting process.
        pid: u32,
        /// Analyzed wait status.
        kind: ExitKind,
    },
    /// The data channel to the process faulted; terminal.
    Faulted {
        /// Logical identity of the reporting worker.
        uid: WorkerUid,
        /// OS pid of the reporting process.
        pid: u32,
        /// Description of the fault.
        error: String,
    },
}

/// Per-worker event sender installed by `Worker::bind`.
///
/// Sends are best-effort: a pool that has already been dropped simply stops
/// receiving, and the monitor thread winds down on its own.
#[derive(Debug, Clone)]
pub struct Outbox {
    uid: WorkerUid,
    events: Sender<PoolEvent>,
}

impl Outbox {
    /// Build an outbox for one worker.
    pub fn new(uid: WorkerUid, events: Sender<PoolEvent>) -> Self {
        Self { uid, events }
    }

    /// The worker identity stamped on every event.
    pub fn uid(&self) -> WorkerUid {
        self.uid
    }

    /// Report a message line.
    pub fn message(&self, pid: u32, payload: String) {
        let _ = self.events.send(PoolEvent::Message {
            uid: self.uid,
            pid,
            payload,
        });
    }

    /// Report the terminal exit status.
    pub fn exited(&self, pid: u32, kind: ExitKind) {
        let _ = self.events.send(PoolEvent::Exited {
            uid: self.uid,
            pid,
            kind,
        });
    }

    /// Report a terminal channel fault.
    pub fn faulted(&self, pid: u32, error: String) {
        let _ = self.events.send(PoolEvent::Faulted {
            uid: self.uid,
            pid,
            error,
        });
    }
}

/// Notification from the pool to its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// A worker process wrote one payload line.
    Message {
        /// Reporting worker.
        uid: WorkerUid,
        /// The payload line.
        payload: String,
    },
    /// A worker was killed; emitted exactly once per worker.
    Terminated {
        /// The killed worker.
        uid: WorkerUid,
    },
    /// An outcome signal matched no tracked active worker.
    LostWorker {
        /// Identity the stray signal reported.
        uid: WorkerUid,
        /// Pid the stray signal reported.
        pid: u32,
    },
    /// Queue and active set both reached empty.
    Idle,
    /// Terminal shutdown: 0 for clean idle, non-zero for die.
    Shutdown {
        /// Host exit status.
        status: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_stamps_identity() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let outbox = Outbox::new(WorkerUid(9), tx);
        outbox.message(1234, "hi".into());

        match rx.recv().unwrap() {
            PoolEvent::Message { uid, pid, payload } => {
                assert_eq!(uid, WorkerUid(9));
                assert_eq!(pid, 1234);
                assert_eq!(payload, "hi");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_outbox_send_after_pool_drop_is_silent() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let outbox = Outbox::new(WorkerUid(1), tx);
        drop(rx);
        // Must not panic or error.
        outbox.exited(1, ExitKind::Exited(0));
        outbox.faulted(1, "late".into());
    }

    #[test]
    fn test_notice_roundtrips_as_json() {
        let notice = Notice::Shutdown { status: 1 };
        let json = serde_json::to_string(&notice).unwrap();
        let back: Notice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, notice);
    }
}
