//! Error types for forkpool.

use thiserror::Error;

/// Main error type for forkpool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Malformed construction arguments. Raised synchronously at
    /// construction/submit time; the worker is never created or enqueued.
    #[error("invalid worker spec: {0}")]
    Validation(String),

    /// `start()` was invoked on a worker with no bound pool.
    #[error("worker {0} is not bound to a pool")]
    Unbound(u64),

    /// The external process could not be launched.
    #[error("failed to spawn '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A pipe to a live worker process broke or could not be written.
    #[error("worker ipc failed: {0}")]
    Ipc(String),

    /// The worker is in a state that does not permit the operation.
    #[error("worker {uid} is {state}: {op} not permitted")]
    InvalidState {
        uid: u64,
        state: &'static str,
        op: &'static str,
    },

    /// The uid does not name a pending or active worker in this pool.
    #[error("no pending or active worker with uid {0}")]
    UnknownWorker(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for forkpool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
