//! Handle to a live worker process.
//!
//! A [`ChildChannel`] holds the parent-side half of the duplex channel: the
//! OS pid (recorded once at spawn) and the stdin writer. The stdout reader is
//! owned by the worker's monitor thread, which is also the only place the
//! child is reaped; the channel itself never calls `waitpid`.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use super::ipc::LineWriter;
use crate::error::{PoolError, Result};

/// Parent-side handle to one spawned worker process.
pub struct ChildChannel {
    /// OS-assigned pid, set at spawn and never changed.
    pid: u32,
    /// Writer for the child's stdin; `None` once disconnected.
    stdin: Option<LineWriter>,
}

impl ChildChannel {
    /// Wrap a spawned child's pid and stdin writer.
    pub fn new(pid: u32, stdin: LineWriter) -> Self {
        Self {
            pid,
            stdin: Some(stdin),
        }
    }

    /// The OS pid of the child.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the stdin side of the channel is still open.
    pub fn is_connected(&self) -> bool {
        self.stdin.is_some()
    }

    /// Send one payload line to the child.
    pub fn send(&mut self, data: &str) -> Result<()> {
        match self.stdin.as_mut() {
            Some(writer) => writer
                .write_line(data)
                .map_err(|e| PoolError::Ipc(format!("write to pid {} failed: {}", self.pid, e))),
            None => Err(PoolError::Ipc(format!(
                "channel to pid {} is disconnected",
                self.pid
            ))),
        }
    }

    /// Close the stdin side of the channel.
    ///
    /// The child observes EOF on its stdin, which is the graceful-disconnect
    /// request preceding forcible termination.
    pub fn disconnect(&mut self) {
        self.stdin = None;
    }

    /// Deliver a signal to the child.
    ///
    /// A child that already exited (ESRCH) is not an error: the pending exit
    /// event will settle its state.
    pub fn signal(&self, sig: Signal) -> Result<()> {
        match signal::kill(Pid::from_raw(self.pid as i32), sig) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(PoolError::Ipc(format!(
                "failed to signal pid {} with {}: {}",
                self.pid,
                sig.as_str(),
                e
            ))),
        }
    }
}

impl std::fmt::Debug for ChildChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildChannel")
            .field("pid", &self.pid)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ipc::{LineReader, PipeFd};
    use std::os::unix::io::IntoRawFd;

    fn channel_over_pipe() -> (ChildChannel, LineReader) {
        let (read_fd, write_fd) = nix::unistd::pipe().expect("pipe");
        let (read_fd, write_fd) = unsafe {
            (
                PipeFd::from_raw(read_fd.into_raw_fd()),
                PipeFd::from_raw(write_fd.into_raw_fd()),
            )
        };
        (
            ChildChannel::new(std::process::id(), LineWriter::new(write_fd)),
            LineReader::new(read_fd),
        )
    }

    #[test]
    fn test_send_and_disconnect() {
        let (mut channel, mut reader) = channel_over_pipe();
        assert!(channel.is_connected());

        channel.send("ping").unwrap();
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("ping"));

        channel.disconnect();
        assert!(!channel.is_connected());
        assert!(channel.send("pong").is_err());
        // Reader sees EOF once the writer is gone
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn test_signal_gone_process_is_ok() {
        // A pid that cannot exist; ESRCH is swallowed.
        let (read_fd, write_fd) = nix::unistd::pipe().expect("pipe");
        let write_fd = unsafe { PipeFd::from_raw(write_fd.into_raw_fd()) };
        drop(read_fd);
        let channel = ChildChannel::new(u32::MAX / 2, LineWriter::new(write_fd));
        assert!(channel.signal(Signal::SIGTERM).is_ok());
    }
}
