//! Bounded-concurrency admission control for worker processes.
//!
//! The pool owns a FIFO queue of pending workers and a bounded active set of
//! live ones. Admission is edge-triggered: it runs after every submit and
//! after every removal, never on a timer.
//!
//! ```text
//!   submit()        admission (FIFO,          outcome events
//!      │            |active| < max_procs)     (message/exit/fault)
//!      ▼                                            │
//!   ┌───────┐       ┌──────────────┐                │
//!   │ queue │ ────▶ │  active set  │ ◀──────────────┘
//!   └───────┘       └──────────────┘   identity-checked routing
//!                          │
//!                          ▼
//!                   outcome caches (compact records, no live workers)
//! ```
//!
//! Pool state is single-threaded: monitor threads only send events into the
//! pool's channel, and each event handler runs to completion before the next
//! one is dispatched.

pub mod events;

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::{PoolError, Result};
use crate::uid::{UidAllocator, WorkerUid};
use crate::worker::{ExitFailure, ExitKind, Worker, WorkerSpec};
use events::{Notice, Outbox, PoolEvent};

/// Host status for a clean idle shutdown.
pub const STATUS_CLEAN: i32 = 0;
/// Host status for a die-triggered shutdown.
pub const STATUS_DIED: i32 = 1;

/// Configuration for a [`Pool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Concurrency limit. Defaults to hardware concurrency; larger supplied
    /// values are clamped to it.
    pub max_procs: Option<usize>,
    /// Enter the die state on any error outcome (default: true).
    pub die_on_error: bool,
    /// Shut down cleanly once queue and active set are both empty
    /// (default: true).
    pub die_on_empty: bool,
    /// Record compact outcome records (default: true).
    pub caching_enabled: bool,
    /// Consumer-owned channel for [`Notice`]s; delivery is best-effort.
    pub notices: Option<Sender<Notice>>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_procs: None,
            die_on_error: true,
            die_on_empty: true,
            caching_enabled: true,
            notices: None,
        }
    }
}

impl PoolConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit (clamped to hardware concurrency).
    pub fn with_max_procs(mut self, max_procs: usize) -> Self {
        self.max_procs = Some(max_procs);
        self
    }

    /// Set the die-on-error policy.
    pub fn with_die_on_error(mut self, enabled: bool) -> Self {
        self.die_on_error = enabled;
        self
    }

    /// Set the die-on-empty policy.
    pub fn with_die_on_empty(mut self, enabled: bool) -> Self {
        self.die_on_empty = enabled;
        self
    }

    /// Enable or disable outcome caching.
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }

    /// Attach a consumer-owned notice channel.
    pub fn with_notices(mut self, notices: Sender<Notice>) -> Self {
        self.notices = Some(notices);
        self
    }
}

/// Compact record of a worker that completed with exit code 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRecord {
    /// Logical identity.
    pub uid: WorkerUid,
    /// OS pid the worker ran as.
    pub pid: u32,
    /// Program path.
    pub path: String,
    /// Exit code (always 0 for completed records).
    pub code: i32,
}

/// Compact record of a worker that failed, faulted, or never started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Logical identity.
    pub uid: WorkerUid,
    /// OS pid, if the worker ever spawned.
    pub pid: Option<u32>,
    /// Program path.
    pub path: String,
    /// Failure description from the exit taxonomy or fault text.
    pub error: String,
}

/// Snapshot of the outcome caches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcomes {
    /// Workers that exited with code 0.
    pub completed: Vec<CompletedRecord>,
    /// Workers that failed, faulted, were killed, or never started.
    pub errors: Vec<ErrorRecord>,
}

/// Bounded-concurrency admission controller and outcome router.
pub struct Pool {
    max_procs: usize,
    die_on_error: bool,
    die_on_empty: bool,
    caching_enabled: bool,

    /// Pending workers, strict FIFO.
    queue: VecDeque<Worker>,
    /// Live workers by uid; `active.len() <= max_procs` always.
    active: HashMap<WorkerUid, Worker>,

    completed: Vec<CompletedRecord>,
    errors: Vec<ErrorRecord>,

    /// One-shot admission barrier; auto-clears when active empties.
    drain: bool,
    /// Terminal once set.
    die: bool,
    /// Host status, once terminal shutdown has been signaled.
    shutdown: Option<i32>,
    /// Guards repeat Idle notices while nothing changes.
    idle_notified: bool,

    uids: UidAllocator,
    events_tx: Sender<PoolEvent>,
    events_rx: Receiver<PoolEvent>,
    notices: Option<Sender<Notice>>,
}

impl Pool {
    /// Create a pool from `config`.
    ///
    /// `max_procs` of 0 is rejected; a value above hardware concurrency is
    /// clamped to it.
    pub fn new(config: PoolConfig) -> Result<Self> {
        let hardware = num_cpus::get().max(1);
        let max_procs = match config.max_procs {
            None => hardware,
            Some(0) => {
                return Err(PoolError::Validation("max_procs must be at least 1".into()));
            }
            Some(n) => n.min(hardware),
        };

        let (events_tx, events_rx) = unbounded();
        info!(
            max_procs,
            die_on_error = config.die_on_error,
            die_on_empty = config.die_on_empty,
            caching = config.caching_enabled,
            "pool created"
        );

        Ok(Self {
            max_procs,
            die_on_error: config.die_on_error,
            die_on_empty: config.die_on_empty,
            caching_enabled: config.caching_enabled,
            queue: VecDeque::new(),
            active: HashMap::new(),
            completed: Vec::new(),
            errors: Vec::new(),
            drain: false,
            die: false,
            shutdown: None,
            idle_notified: false,
            uids: UidAllocator::new(),
            events_tx,
            events_rx,
            notices: config.notices,
        })
    }

    /// The uid allocator shared with workers built for this pool.
    pub fn uid_allocator(&self) -> UidAllocator {
        self.uids.clone()
    }

    /// Construct (but do not submit) a worker with a uid from this pool.
    pub fn build_worker(&self, spec: WorkerSpec) -> Result<Worker> {
        Worker::new(spec, self.uids.next_uid())
    }

    /// Validate and submit a worker spec.
    ///
    /// Validation failures surface here synchronously; nothing is enqueued.
    /// Returns the uid handle for direct interaction via [`Pool::send_to`]
    /// and [`Pool::kill_worker`]. Once the pool is in the die state the
    /// worker is discarded instead of enqueued; the returned uid names
    /// nothing the pool tracks.
    pub fn submit(&mut self, spec: WorkerSpec) -> Result<WorkerUid> {
        let worker = self.build_worker(spec)?;
        Ok(self.submit_worker(worker))
    }

    /// Submit a pre-built worker.
    ///
    /// Binds it to this pool, appends it to the queue, and attempts
    /// admission. In the die state nothing submitted can ever run, so the
    /// worker is killed and dropped rather than left to grow a queue that
    /// will never drain.
    pub fn submit_worker(&mut self, mut worker: Worker) -> WorkerUid {
        let uid = worker.uid();
        if self.die {
            warn!(uid = %uid, "submission after die discarded");
            let _ = worker.kill();
            return uid;
        }
        worker.bind(Outbox::new(uid, self.events_tx.clone()));
        self.idle_notified = false;
        self.queue.push_back(worker);
        trace!(uid = %uid, queued = self.queue.len(), "worker submitted");
        self.admit();
        self.settle();
        uid
    }

    /// Suppress admissions until the active set empties, then resume.
    ///
    /// Idempotent. A drain requested while nothing is active clears
    /// immediately: the barrier has nothing to wait for.
    pub fn drain(&mut self) {
        if self.drain {
            return;
        }
        if self.active.is_empty() {
            debug!("drain requested with no active workers, barrier clears immediately");
            return;
        }
        self.drain = true;
        debug!(active = self.active.len(), "draining: admissions suppressed");
    }

    /// Enter the die state: terminal, kills all active workers, halts
    /// admissions permanently.
    pub fn die(&mut self) {
        self.enter_die();
        self.settle();
    }

    /// Send a payload to a pending or active worker.
    pub fn send_to(&mut self, uid: WorkerUid, data: &str) -> Result<()> {
        if let Some(worker) = self.active.get_mut(&uid) {
            return worker.send(data);
        }
        if let Some(worker) = self.queue.iter_mut().find(|w| w.uid() == uid) {
            return worker.send(data);
        }
        Err(PoolError::UnknownWorker(uid.0))
    }

    /// Kill a worker with the default signal. See [`Pool::kill_worker_with_signal`].
    pub fn kill_worker(&mut self, uid: WorkerUid) -> Result<()> {
        self.kill_worker_with_signal(uid, Worker::DEFAULT_KILL_SIGNAL)
    }

    /// Kill a pending or active worker.
    ///
    /// Idempotent: a worker that is already terminal, or already gone from
    /// the pool, is a no-op. An active worker stays in the active set until
    /// its exit event arrives; a queued worker never spawned, so it is
    /// released immediately.
    pub fn kill_worker_with_signal(&mut self, uid: WorkerUid, sig: Signal) -> Result<()> {
        if let Some(worker) = self.active.get_mut(&uid) {
            let newly = worker.kill_with_signal(sig)?;
            if newly {
                self.notify(Notice::Terminated { uid });
            }
            return Ok(());
        }
        if let Some(idx) = self.queue.iter().position(|w| w.uid() == uid) {
            if let Some(mut worker) = self.queue.remove(idx) {
                let newly = worker.kill_with_signal(sig)?;
                if newly {
                    self.notify(Notice::Terminated { uid });
                }
            }
            self.settle();
            return Ok(());
        }
        trace!(uid = %uid, "kill for a worker no longer tracked, ignoring");
        Ok(())
    }

    /// Snapshot of the outcome caches.
    pub fn outcomes(&self) -> Outcomes {
        Outcomes {
            completed: self.completed.clone(),
            errors: self.errors.clone(),
        }
    }

    /// Number of live workers.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether the pending queue is empty.
    pub fn is_queue_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether every slot is occupied.
    pub fn is_pool_full(&self) -> bool {
        self.active.len() >= self.max_procs
    }

    /// The concurrency limit in effect (after clamping).
    pub fn max_procs(&self) -> usize {
        self.max_procs
    }

    /// Whether the drain barrier is currently set.
    pub fn is_draining(&self) -> bool {
        self.drain
    }

    /// Whether the pool has entered the terminal die state.
    pub fn is_dying(&self) -> bool {
        self.die
    }

    /// Host status, once terminal shutdown has been signaled.
    pub fn shutdown_status(&self) -> Option<i32> {
        self.shutdown
    }

    /// Look up a pending or active worker.
    pub fn worker(&self, uid: WorkerUid) -> Option<&Worker> {
        self.active
            .get(&uid)
            .or_else(|| self.queue.iter().find(|w| w.uid() == uid))
    }

    /// Dispatch all events already queued, without blocking.
    ///
    /// Returns the number of events processed.
    pub fn tick(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
            processed += 1;
        }
        processed
    }

    /// Block up to `timeout` for one event and dispatch it.
    ///
    /// Returns false if no event arrived in time.
    pub fn pump(&mut self, timeout: Duration) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.dispatch(event);
                true
            }
            Err(_) => false,
        }
    }

    /// Run the event loop until terminal shutdown, returning the host status:
    /// 0 for clean idle shutdown, non-zero for die.
    ///
    /// With both `die_on_empty` and `die_on_error` disabled no shutdown is
    /// ever signaled and this blocks indefinitely; such pools should be
    /// pumped with [`Pool::tick`] or [`Pool::pump`] instead.
    pub fn run(&mut self) -> i32 {
        self.settle();
        loop {
            if let Some(status) = self.shutdown {
                return status;
            }
            match self.events_rx.recv() {
                Ok(event) => self.dispatch(event),
                // Unreachable while the pool holds its own sender; bail
                // rather than spin if that invariant ever breaks.
                Err(_) => return self.shutdown.unwrap_or(STATUS_CLEAN),
            }
        }
    }

    /// Admission: move queue heads into the active set and start them, while
    /// a vacancy exists and neither drain nor die holds. Strict FIFO.
    fn admit(&mut self) {
        while !self.die && !self.drain && self.active.len() < self.max_procs {
            let Some(mut worker) = self.queue.pop_front() else {
                break;
            };
            if worker.is_killed() {
                trace!(uid = %worker.uid(), "discarding killed worker at queue head");
                continue;
            }
            match worker.start() {
                Ok(()) => {
                    debug!(
                        uid = %worker.uid(),
                        pid = ?worker.pid(),
                        active = self.active.len() + 1,
                        "worker admitted"
                    );
                    self.active.insert(worker.uid(), worker);
                }
                Err(e) => {
                    warn!(uid = %worker.uid(), error = %e, "worker failed to start");
                    worker.resolve_failed();
                    if self.caching_enabled {
                        self.errors.push(ErrorRecord {
                            uid: worker.uid(),
                            pid: None,
                            path: worker.path().to_string(),
                            error: e.to_string(),
                        });
                    }
                    if self.die_on_error {
                        self.enter_die();
                    }
                }
            }
        }
    }

    /// Route one event; runs to completion before the next is dispatched.
    fn dispatch(&mut self, event: PoolEvent) {
        match event {
            PoolEvent::Message { uid, pid, payload } => self.route_message(uid, pid, payload),
            PoolEvent::Exited { uid, pid, kind } => self.route_exit(uid, pid, kind),
            PoolEvent::Faulted { uid, pid, error } => self.route_fault(uid, pid, error),
        }
    }

    fn route_message(&mut self, uid: WorkerUid, pid: u32, payload: String) {
        match self.active.get(&uid) {
            Some(worker) if worker.verify_identity(pid, uid) => {
                trace!(uid = %uid, pid, len = payload.len(), "worker message");
                self.notify(Notice::Message { uid, payload });
            }
            _ => {
                // Non-terminal signal from an untracked process; nothing to
                // route and no reason to escalate.
                debug!(uid = %uid, pid, "message from untracked worker dropped");
            }
        }
    }

    fn route_exit(&mut self, uid: WorkerUid, pid: u32, kind: ExitKind) {
        let Some(mut worker) = self.take_active(uid, pid) else {
            self.lost_worker(uid, pid);
            return;
        };
        let was_killed = worker.is_killed();
        worker.resolve_exit(kind);

        if kind.is_success() && !was_killed {
            info!(uid = %uid, pid, path = %worker.path(), "worker completed");
            if self.caching_enabled {
                self.completed.push(CompletedRecord {
                    uid,
                    pid,
                    path: worker.path().to_string(),
                    code: 0,
                });
            }
        } else {
            let error = if was_killed {
                format!("killed: {}", kind)
            } else {
                ExitFailure::new(kind, worker.path()).to_string()
            };
            warn!(uid = %uid, pid, error = %error, "worker failed");
            if self.caching_enabled {
                self.errors.push(ErrorRecord {
                    uid,
                    pid: Some(pid),
                    path: worker.path().to_string(),
                    error,
                });
            }
            if !was_killed && self.die_on_error {
                self.enter_die();
            }
        }

        drop(worker);
        self.admit();
        self.settle();
    }

    fn route_fault(&mut self, uid: WorkerUid, pid: u32, error: String) {
        let Some(mut worker) = self.take_active(uid, pid) else {
            self.lost_worker(uid, pid);
            return;
        };
        let was_killed = worker.is_killed();
        worker.resolve_failed();
        warn!(uid = %uid, pid, error = %error, "worker faulted");

        if self.caching_enabled {
            self.errors.push(ErrorRecord {
                uid,
                pid: Some(pid),
                path: worker.path().to_string(),
                error,
            });
        }
        if !was_killed && self.die_on_error {
            self.enter_die();
        }

        drop(worker);
        self.admit();
        self.settle();
    }

    /// Remove and return the active worker matching the reported identity.
    fn take_active(&mut self, uid: WorkerUid, pid: u32) -> Option<Worker> {
        match self.active.get(&uid) {
            Some(worker) if worker.verify_identity(pid, uid) => self.active.remove(&uid),
            _ => None,
        }
    }

    /// Fail-safe for an outcome signal that matches no tracked worker: force
    /// drain and best-effort kill the reported pid. Never caches, never
    /// touches other workers' state.
    fn lost_worker(&mut self, uid: WorkerUid, pid: u32) {
        warn!(uid = %uid, pid, "outcome signal for untracked worker, forcing drain");
        self.notify(Notice::LostWorker { uid, pid });
        self.drain();
        best_effort_kill(pid);
    }

    /// Terminal escalation: halt admissions forever and put down every
    /// active worker. Shutdown is signaled once the active set empties.
    fn enter_die(&mut self) {
        if self.die {
            return;
        }
        self.die = true;
        // Die supersedes the one-shot drain barrier.
        self.drain = false;
        warn!(
            active = self.active.len(),
            queued = self.queue.len(),
            "entering die state: admissions halted"
        );

        let uids: Vec<WorkerUid> = self.active.keys().copied().collect();
        for uid in uids {
            let newly = match self.active.get_mut(&uid) {
                Some(worker) => worker.kill_with_signal(Signal::SIGKILL).unwrap_or(false),
                None => false,
            };
            if newly {
                self.notify(Notice::Terminated { uid });
            }
        }

        if self.active.is_empty() {
            self.signal_shutdown(STATUS_DIED);
        }
    }

    /// Re-evaluate drain auto-clear, die completion, and the empty policy.
    /// Called after every mutation batch.
    fn settle(&mut self) {
        if self.drain && self.active.is_empty() {
            self.drain = false;
            debug!(queued = self.queue.len(), "drain complete, admissions resume");
            self.admit();
        }

        if self.die {
            if self.active.is_empty() {
                self.signal_shutdown(STATUS_DIED);
            }
            return;
        }

        if self.active.is_empty() && self.queue.is_empty() && !self.idle_notified {
            self.idle_notified = true;
            info!("pool idle: queue and active set empty");
            self.notify(Notice::Idle);
            if self.die_on_empty {
                self.signal_shutdown(STATUS_CLEAN);
            }
        }
    }

    fn signal_shutdown(&mut self, status: i32) {
        if self.shutdown.is_some() {
            return;
        }
        self.shutdown = Some(status);
        info!(status, "pool shutdown signaled");
        self.notify(Notice::Shutdown { status });
    }

    fn notify(&self, notice: Notice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        for worker in self.active.values_mut() {
            let _ = worker.kill_with_signal(Signal::SIGKILL);
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("max_procs", &self.max_procs)
            .field("queued", &self.queue.len())
            .field("active", &self.active.len())
            .field("drain", &self.drain)
            .field("die", &self.die)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

/// Probe the reported pid and put it down if it still exists.
fn best_effort_kill(pid: u32) {
    if pid == 0 {
        return;
    }
    let target = Pid::from_raw(pid as i32);
    if signal::kill(target, None).is_ok() {
        let _ = signal::kill(target, Signal::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PoolConfig::default();
        assert!(config.max_procs.is_none());
        assert!(config.die_on_error);
        assert!(config.die_on_empty);
        assert!(config.caching_enabled);
        assert!(config.notices.is_none());
    }

    #[test]
    fn test_max_procs_zero_rejected() {
        let err = Pool::new(PoolConfig::new().with_max_procs(0)).unwrap_err();
        assert!(matches!(err, PoolError::Validation(_)));
    }

    #[test]
    fn test_max_procs_clamped_to_hardware() {
        let pool = Pool::new(PoolConfig::new().with_max_procs(usize::MAX)).unwrap();
        assert!(pool.max_procs() <= num_cpus::get());
        assert!(pool.max_procs() >= 1);
    }

    #[test]
    fn test_max_procs_defaults_to_hardware() {
        let pool = Pool::new(PoolConfig::default()).unwrap();
        assert_eq!(pool.max_procs(), num_cpus::get().max(1));
    }

    #[test]
    fn test_fresh_pool_queries() {
        let pool = Pool::new(PoolConfig::new().with_max_procs(2)).unwrap();
        assert_eq!(pool.active_count(), 0);
        assert!(pool.is_queue_empty());
        assert!(!pool.is_pool_full());
        assert!(!pool.is_draining());
        assert!(!pool.is_dying());
        assert!(pool.shutdown_status().is_none());
        assert_eq!(pool.outcomes(), Outcomes::default());
    }

    #[test]
    fn test_submit_rejects_invalid_spec() {
        let mut pool = Pool::new(PoolConfig::new().with_max_procs(1)).unwrap();
        assert!(pool.submit(WorkerSpec::new("")).is_err());
        assert!(pool.is_queue_empty());
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_drain_with_no_active_clears_immediately() {
        let mut pool = Pool::new(PoolConfig::new().with_max_procs(1)).unwrap();
        pool.drain();
        assert!(!pool.is_draining());
    }

    #[test]
    fn test_die_is_terminal_and_signals_nonzero() {
        let mut pool = Pool::new(PoolConfig::new().with_max_procs(1)).unwrap();
        pool.die();
        assert!(pool.is_dying());
        assert_eq!(pool.shutdown_status(), Some(STATUS_DIED));
        // Still dying after another settle round.
        pool.die();
        assert!(pool.is_dying());
    }

    #[test]
    fn test_kill_unknown_worker_is_noop() {
        let mut pool = Pool::new(PoolConfig::new().with_max_procs(1)).unwrap();
        assert!(pool.kill_worker(WorkerUid(999)).is_ok());
    }

    #[test]
    fn test_send_to_unknown_worker_errors() {
        let mut pool = Pool::new(PoolConfig::new().with_max_procs(1)).unwrap();
        assert!(matches!(
            pool.send_to(WorkerUid(999), "x"),
            Err(PoolError::UnknownWorker(999))
        ));
    }

    #[test]
    fn test_stale_exit_signal_forces_drain_and_spares_active() {
        // An exit event whose pid does not match the recorded one must take
        // the fail-safe path, not be attributed to the live worker.
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pool = Pool::new(
            PoolConfig::new()
                .with_max_procs(1)
                .with_die_on_empty(false)
                .with_notices(tx),
        )
        .unwrap();
        let uid = pool
            .submit(WorkerSpec::new("/bin/sh").args(["-c", "sleep 30"]))
            .unwrap();
        assert_eq!(pool.active_count(), 1);

        pool.events_tx
            .send(PoolEvent::Exited {
                uid,
                pid: 0,
                kind: ExitKind::Exited(0),
            })
            .unwrap();
        assert_eq!(pool.tick(), 1);

        assert!(pool.is_draining());
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.outcomes(), Outcomes::default());
        let worker = pool.worker(uid).unwrap();
        assert_eq!(worker.state(), crate::worker::WorkerState::Running);
        assert!(rx
            .try_iter()
            .any(|n| matches!(n, Notice::LostWorker { pid: 0, .. })));
    }

    #[test]
    fn test_submit_after_die_is_discarded() {
        let mut pool = Pool::new(PoolConfig::new().with_max_procs(1)).unwrap();
        pool.die();
        let uid = pool.submit(WorkerSpec::new("/bin/true")).unwrap();

        assert!(pool.is_queue_empty());
        assert_eq!(pool.active_count(), 0);
        // The handle names nothing the pool tracks.
        assert!(matches!(
            pool.send_to(uid, "x"),
            Err(PoolError::UnknownWorker(_))
        ));
        assert!(pool.kill_worker(uid).is_ok());
    }

    #[test]
    fn test_lost_worker_forces_drain_only_with_active() {
        // With no active workers the forced drain barrier clears instantly;
        // the lost-worker path must still be harmless.
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pool = Pool::new(
            PoolConfig::new()
                .with_max_procs(1)
                .with_die_on_empty(false)
                .with_notices(tx),
        )
        .unwrap();
        pool.lost_worker(WorkerUid(42), 0);
        assert!(!pool.is_draining());
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::LostWorker {
                uid: WorkerUid(42),
                pid: 0
            }
        );
    }
}
