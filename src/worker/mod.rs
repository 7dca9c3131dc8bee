//! Workers: logical units of work bound to one external process each.
//!
//! A [`Worker`] travels through exactly one container at a time: the caller
//! (before submit), the pool's queue, the pool's active set, and finally a
//! compact outcome record. Its process lifecycle is:
//!
//! ```text
//!              start()                exit 0
//!   Created ──────────────▶ Running ──────────▶ Succeeded
//!      │                       │
//!      │ kill()                │ nonzero exit / process fault
//!      │                       ▼
//!      └────────▶ Killed    Failed
//! ```
//!
//! Killed is reachable from Created or Running; no transition leaves a
//! terminal state. Identity is the pair (uid, pid): the uid is monotonic and
//! never reused, the pid is OS-recycled, and both must match for an outcome
//! signal to be attributed to this worker.

pub(crate) mod exit;
pub(crate) mod ipc;
pub(crate) mod proc;
pub(crate) mod spawn;

use std::path::PathBuf;

use nix::sys::signal::Signal;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{PoolError, Result};
use crate::pool::events::Outbox;
use crate::uid::WorkerUid;

pub use exit::{describe_exit_code, ExitFailure, ExitKind};

/// Process launch options beyond path and args.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnOptions {
    /// Working directory for the child (parent's cwd if unset).
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
}

/// Construction parameters for a [`Worker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Path to the program to run. Must be non-empty.
    pub path: String,
    /// Program arguments.
    pub args: Vec<String>,
    /// Payload transmitted immediately after spawn.
    pub data: Option<String>,
    /// Launch options.
    pub options: SpawnOptions,
}

impl WorkerSpec {
    /// Start building a spec for the given program path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            data: None,
            options: SpawnOptions::default(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the initial payload.
    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.push((key.into(), value.into()));
        self
    }

    /// Validate the spec; violations surface before any Worker exists.
    fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(PoolError::Validation("path is empty".into()));
        }
        if self.path.contains('\0') {
            return Err(PoolError::Validation("path contains a NUL byte".into()));
        }
        if let Some(arg) = self.args.iter().find(|a| a.contains('\0')) {
            return Err(PoolError::Validation(format!(
                "argument contains a NUL byte: {:?}",
                arg
            )));
        }
        if let Some((key, _)) = self
            .options
            .env
            .iter()
            .find(|(k, v)| k.is_empty() || k.contains('\0') || v.contains('\0'))
        {
            return Err(PoolError::Validation(format!(
                "malformed environment entry: {:?}",
                key
            )));
        }
        Ok(())
    }
}

/// Lifecycle state of a worker. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    /// Constructed, not yet spawned.
    Created,
    /// Process is live.
    Running,
    /// Process exited with code 0.
    Succeeded,
    /// Process exited nonzero or reported a fault.
    Failed,
    /// Explicitly killed from Created or Running.
    Killed,
}

impl WorkerState {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Killed)
    }

    /// Lowercase name for logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Killed => "killed",
        }
    }
}

/// A unit of work bound to one external process instance.
pub struct Worker {
    uid: WorkerUid,
    spec: WorkerSpec,
    /// Payload sent right after spawn; replaceable while not live.
    initial_data: Option<String>,
    state: WorkerState,
    /// Set exactly once, at spawn.
    pid: Option<u32>,
    channel: Option<proc::ChildChannel>,
    /// Event sender into the owning pool; required before `start`.
    outbox: Option<Outbox>,
    /// Guards the terminated notification: emitted at most once.
    terminated_notified: bool,
}

impl Worker {
    /// Default signal delivered by [`Worker::kill`].
    pub const DEFAULT_KILL_SIGNAL: Signal = Signal::SIGTERM;

    /// Construct a worker from a validated spec and an allocated uid.
    pub fn new(spec: WorkerSpec, uid: WorkerUid) -> Result<Self> {
        spec.validate()?;
        let initial_data = spec.data.clone();
        Ok(Self {
            uid,
            spec,
            initial_data,
            state: WorkerState::Created,
            pid: None,
            channel: None,
            outbox: None,
            terminated_notified: false,
        })
    }

    /// Logical identity.
    pub fn uid(&self) -> WorkerUid {
        self.uid
    }

    /// OS pid, once spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Program path from the spec.
    pub fn path(&self) -> &str {
        &self.spec.path
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Pending initial payload, if any.
    pub fn data(&self) -> Option<&str> {
        self.initial_data.as_deref()
    }

    /// Record the owning pool's event sender. Required before [`Worker::start`].
    pub fn bind(&mut self, outbox: Outbox) {
        self.outbox = Some(outbox);
    }

    /// Whether the worker is bound to a pool.
    pub fn is_bound(&self) -> bool {
        self.outbox.is_some()
    }

    /// Spawn the external process and transition Created -> Running.
    ///
    /// Transmits the initial payload right after spawn, records the pid, and
    /// hands the stdout side to a monitor thread that reports message and
    /// terminal events to the bound pool.
    pub fn start(&mut self) -> Result<()> {
        let outbox = self
            .outbox
            .clone()
            .ok_or(PoolError::Unbound(self.uid.0))?;
        if self.state != WorkerState::Created {
            return Err(PoolError::InvalidState {
                uid: self.uid.0,
                state: self.state.as_str(),
                op: "start",
            });
        }

        let (mut channel, reader) = spawn::spawn_child(&self.spec)?;
        let pid = channel.pid();

        if let Some(data) = self.initial_data.take() {
            if let Err(e) = channel.send(&data) {
                // The process is live but unreachable; put it down and reap
                // it here since no monitor exists yet.
                let _ = channel.signal(Signal::SIGKILL);
                let _ = waitpid(Pid::from_raw(pid as i32), None);
                return Err(e);
            }
        }

        self.pid = Some(pid);
        self.channel = Some(channel);
        self.state = WorkerState::Running;
        spawn::spawn_monitor(outbox, pid, reader);

        debug!(uid = %self.uid, pid, path = %self.spec.path, "worker started");
        Ok(())
    }

    /// Send a payload to the worker.
    ///
    /// Delivered immediately if the process is live; otherwise buffered as
    /// the new initial payload for a future start.
    pub fn send(&mut self, data: &str) -> Result<()> {
        if self.state == WorkerState::Running {
            if let Some(channel) = self.channel.as_mut() {
                if channel.is_connected() {
                    return channel.send(data);
                }
            }
        }
        trace!(uid = %self.uid, "worker not live, buffering payload");
        self.initial_data = Some(data.to_string());
        Ok(())
    }

    /// Kill the worker with the default signal. See [`Worker::kill_with_signal`].
    pub fn kill(&mut self) -> Result<bool> {
        self.kill_with_signal(Self::DEFAULT_KILL_SIGNAL)
    }

    /// Kill the worker: idempotent, terminal.
    ///
    /// On an already-terminal worker this is a no-op returning `false` (no
    /// error, no second terminated notification). Otherwise the data channel
    /// is closed first (graceful disconnect: the child sees EOF on stdin),
    /// then the signal is delivered, the state becomes Killed, and `true` is
    /// returned for the caller to emit the single terminated notification.
    pub fn kill_with_signal(&mut self, signal: Signal) -> Result<bool> {
        if self.state.is_terminal() {
            return Ok(false);
        }

        if let Some(channel) = self.channel.as_mut() {
            if channel.is_connected() {
                channel.disconnect();
            }
            channel.signal(signal)?;
        }

        self.state = WorkerState::Killed;
        let first = !self.terminated_notified;
        self.terminated_notified = true;
        debug!(uid = %self.uid, pid = ?self.pid, signal = signal.as_str(), "worker killed");
        Ok(first)
    }

    /// Check a reported identity against this worker's recorded identity.
    ///
    /// Both the OS pid and the logical uid must match; a recycled pid alone
    /// must never attribute a stale signal to this worker.
    pub fn verify_identity(&self, reported_pid: u32, reported_uid: WorkerUid) -> bool {
        self.pid == Some(reported_pid) && self.uid == reported_uid
    }

    /// Whether the worker was explicitly killed.
    pub fn is_killed(&self) -> bool {
        self.state == WorkerState::Killed
    }

    /// Whether the worker's process exited on its own (success or failure).
    pub fn is_exited(&self) -> bool {
        matches!(self.state, WorkerState::Succeeded | WorkerState::Failed)
    }

    /// Settle the terminal state from a reaped exit status.
    ///
    /// A worker already Killed stays Killed; otherwise exit 0 resolves to
    /// Succeeded and anything else to Failed.
    pub(crate) fn resolve_exit(&mut self, kind: ExitKind) {
        if self.state.is_terminal() {
            return;
        }
        self.state = if kind.is_success() {
            WorkerState::Succeeded
        } else {
            WorkerState::Failed
        };
    }

    /// Settle the terminal state for a process-level fault or spawn failure.
    pub(crate) fn resolve_failed(&mut self) {
        if !self.state.is_terminal() {
            self.state = WorkerState::Failed;
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("uid", &self.uid)
            .field("pid", &self.pid)
            .field("path", &self.spec.path)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::events::PoolEvent;

    fn bound_worker(spec: WorkerSpec) -> (Worker, crossbeam_channel::Receiver<PoolEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let uid = WorkerUid(1);
        let mut worker = Worker::new(spec, uid).unwrap();
        worker.bind(Outbox::new(uid, tx));
        (worker, rx)
    }

    #[test]
    fn test_validation_rejects_empty_path() {
        let err = Worker::new(WorkerSpec::new(""), WorkerUid(1)).unwrap_err();
        assert!(matches!(err, PoolError::Validation(_)));
    }

    #[test]
    fn test_validation_rejects_nul_in_args() {
        let spec = WorkerSpec::new("/bin/true").arg("bad\0arg");
        assert!(Worker::new(spec, WorkerUid(1)).is_err());
    }

    #[test]
    fn test_start_unbound_fails() {
        let mut worker = Worker::new(WorkerSpec::new("/bin/true"), WorkerUid(1)).unwrap();
        assert!(matches!(worker.start(), Err(PoolError::Unbound(1))));
        assert_eq!(worker.state(), WorkerState::Created);
    }

    #[test]
    fn test_start_records_pid_and_runs() {
        let (mut worker, rx) = bound_worker(WorkerSpec::new("/bin/sh").args(["-c", "exit 0"]));
        worker.start().unwrap();
        assert_eq!(worker.state(), WorkerState::Running);
        let pid = worker.pid().expect("pid recorded at spawn");
        assert!(worker.verify_identity(pid, WorkerUid(1)));
        assert!(!worker.verify_identity(pid, WorkerUid(2)));
        assert!(!worker.verify_identity(pid.wrapping_add(1), WorkerUid(1)));

        // Terminal event arrives with the recorded identity.
        loop {
            match rx.recv().unwrap() {
                PoolEvent::Exited { pid: rpid, kind, .. } => {
                    assert_eq!(rpid, pid);
                    assert!(kind.is_success());
                    break;
                }
                _ => continue,
            }
        }
    }

    #[test]
    fn test_send_buffers_when_not_live() {
        let (mut worker, _rx) = bound_worker(WorkerSpec::new("/bin/cat"));
        worker.send("payload").unwrap();
        assert_eq!(worker.data(), Some("payload"));
        // A second send before start replaces the buffered payload.
        worker.send("newer").unwrap();
        assert_eq!(worker.data(), Some("newer"));
    }

    #[test]
    fn test_kill_from_created_is_terminal() {
        let (mut worker, _rx) = bound_worker(WorkerSpec::new("/bin/cat"));
        assert!(worker.kill().unwrap());
        assert!(worker.is_killed());
        assert!(!worker.is_exited());
    }

    #[test]
    fn test_kill_is_idempotent() {
        let (mut worker, _rx) = bound_worker(WorkerSpec::new("/bin/cat"));
        worker.start().unwrap();
        assert!(worker.kill().unwrap());
        // Second kill: no error, no second notification.
        assert!(!worker.kill().unwrap());
        assert!(worker.is_killed());
    }

    #[test]
    fn test_resolve_exit_keeps_killed() {
        let (mut worker, _rx) = bound_worker(WorkerSpec::new("/bin/cat"));
        worker.start().unwrap();
        worker.kill().unwrap();
        worker.resolve_exit(ExitKind::Exited(0));
        assert_eq!(worker.state(), WorkerState::Killed);
    }

    #[test]
    fn test_start_twice_rejected() {
        let (mut worker, _rx) = bound_worker(WorkerSpec::new("/bin/sh").args(["-c", "sleep 5"]));
        worker.start().unwrap();
        assert!(matches!(
            worker.start(),
            Err(PoolError::InvalidState { op: "start", .. })
        ));
        worker.kill().unwrap();
    }
}
