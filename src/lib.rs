//! forkpool - bounded-concurrency process pool with identity-checked routing.
//!
//! A [`Pool`] admits submitted [`Worker`]s from a strict FIFO queue into a
//! bounded active set. Each worker wraps one external OS process with a
//! line-oriented stdin/stdout channel; exits and faults are reported back to
//! the pool as events, routed under a pid + uid double check, and recorded
//! as compact outcome records.
//!
//! ```no_run
//! use forkpool::{Pool, PoolConfig, WorkerSpec};
//!
//! fn main() -> forkpool::Result<()> {
//!     let mut pool = Pool::new(PoolConfig::new().with_max_procs(2))?;
//!     pool.submit(WorkerSpec::new("/bin/sh").arg("-c").arg("echo ready"))?;
//!     let status = pool.run();
//!     assert_eq!(status, 0);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod pool;
pub mod uid;
pub mod worker;

pub use error::{PoolError, Result};
pub use pool::events::{Notice, PoolEvent};
pub use pool::{
    CompletedRecord, ErrorRecord, Outcomes, Pool, PoolConfig, STATUS_CLEAN, STATUS_DIED,
};
pub use uid::{UidAllocator, WorkerUid};
pub use worker::{
    describe_exit_code, ExitFailure, ExitKind, SpawnOptions, Worker, WorkerSpec, WorkerState,
};
