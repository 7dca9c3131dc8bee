//! Worker process launch and outcome monitoring.
//!
//! Spawning uses `std::process::Command` with piped stdin/stdout; stderr is
//! inherited so worker diagnostics land in the parent's stderr. Each spawned
//! child gets one monitor thread that owns the stdout reader, forwards
//! message lines as typed events, and reaps the child with `waitpid` to
//! report exactly one terminal event.

use std::os::fd::OwnedFd;
use std::process::{Command, Stdio};
use std::thread;

use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use tracing::trace;

use super::exit::{analyze_wait_status, ExitKind};
use super::ipc::{LineReader, LineWriter, PipeFd};
use super::proc::ChildChannel;
use super::WorkerSpec;
use crate::error::{PoolError, Result};
use crate::pool::events::Outbox;

/// Launch the external process described by `spec`.
///
/// Returns the parent-side channel and the stdout reader destined for the
/// monitor thread. The `std::process::Child` itself is not kept: the monitor
/// thread reaps the pid directly.
pub(crate) fn spawn_child(spec: &WorkerSpec) -> Result<(ChildChannel, LineReader)> {
    let mut cmd = Command::new(&spec.path);
    cmd.args(&spec.args);
    if let Some(cwd) = &spec.options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &spec.options.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::inherit());

    let mut child = cmd.spawn().map_err(|e| PoolError::Spawn {
        path: spec.path.clone(),
        source: e,
    })?;
    let pid = child.id();

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| PoolError::Ipc("child stdin not captured".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PoolError::Ipc("child stdout not captured".into()))?;

    let writer = LineWriter::new(PipeFd::new(OwnedFd::from(stdin)));
    let reader = LineReader::new(PipeFd::new(OwnedFd::from(stdout)));

    trace!(pid, path = %spec.path, "spawned worker process");
    Ok((ChildChannel::new(pid, writer), reader))
}

/// Start the monitor thread for a spawned child.
///
/// The monitor forwards each stdout line as a message event; on EOF it reaps
/// the child and reports the analyzed terminal status. A read fault is
/// reported as the terminal event instead, and the child is still reaped so
/// it cannot linger as a zombie.
pub(crate) fn spawn_monitor(outbox: Outbox, pid: u32, mut reader: LineReader) {
    let name = format!("forkpool-monitor-{}", outbox.uid());
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            loop {
                match reader.read_line() {
                    Ok(Some(line)) => outbox.message(pid, line),
                    Ok(None) => break,
                    Err(e) => {
                        outbox.faulted(pid, format!("data channel read failed: {}", e));
                        reap(pid);
                        return;
                    }
                }
            }
            let kind = match waitpid(Pid::from_raw(pid as i32), None) {
                Ok(status) => analyze_wait_status(status),
                Err(e) => {
                    trace!(pid, error = %e, "waitpid failed for monitored worker");
                    ExitKind::Unknown
                }
            };
            outbox.exited(pid, kind);
        })
        .expect("Failed to spawn worker monitor thread");
}

/// Reap a child whose terminal event was already reported.
fn reap(pid: u32) {
    let _ = waitpid(Pid::from_raw(pid as i32), None);
}
