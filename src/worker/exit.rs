//! Terminal-status analysis for worker processes.
//!
//! Maps the raw `waitpid` status into the fixed failure taxonomy attached to
//! error outcomes, with the originating path for diagnostics.

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Normal exit with a status code.
    Exited(i32),
    /// Killed by a signal.
    Signaled(Signal),
    /// The status could not be determined.
    Unknown,
}

impl ExitKind {
    /// Check if this is a successful (code 0) exit.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            _ => None,
        }
    }

}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {}", code),
            Self::Signaled(sig) => write!(f, "killed by {}", sig.as_str()),
            Self::Unknown => write!(f, "ended for an unknown reason"),
        }
    }
}

/// Analyze a `WaitStatus` reported by `waitpid`.
pub fn analyze_wait_status(status: WaitStatus) -> ExitKind {
    match status {
        WaitStatus::Exited(_, code) => ExitKind::Exited(code),
        WaitStatus::Signaled(_, signal, _) => ExitKind::Signaled(signal),
        _ => ExitKind::Unknown,
    }
}

/// Describe a nonzero exit code through the fixed failure taxonomy.
///
/// Codes above 128 conventionally encode death by signal (128 + signo).
pub fn describe_exit_code(code: i32) -> &'static str {
    match code {
        1 => "fatal exception",
        3 => "internal parse error",
        4 => "internal evaluation failure",
        5 => "fatal error",
        6 => "misconfigured exception handler",
        7 => "exception handler run-time failure",
        8 => "uncaught exception",
        9 => "invalid argument",
        10 => "internal run-time failure",
        12 => "invalid debug argument",
        c if c > 128 => "fatal signal",
        _ => "unknown error",
    }
}

/// A non-successful terminal status, attached with the worker's path.
#[derive(Debug, Clone)]
pub struct ExitFailure {
    /// How the process ended.
    pub kind: ExitKind,
    /// Path of the program the worker was running.
    pub path: String,
}

impl ExitFailure {
    /// Build a failure record for a terminal status.
    pub fn new(kind: ExitKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl std::fmt::Display for ExitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ExitKind::Exited(code) => {
                write!(f, "{} (code {}): {}", describe_exit_code(code), code, self.path)
            }
            ExitKind::Signaled(sig) => write!(f, "fatal signal {}: {}", sig.as_str(), self.path),
            ExitKind::Unknown => write!(f, "unknown error: {}", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::Pid;

    #[test]
    fn test_exit_kind_success() {
        assert!(ExitKind::Exited(0).is_success());
        assert!(!ExitKind::Exited(1).is_success());
        assert!(!ExitKind::Signaled(Signal::SIGTERM).is_success());
        assert!(!ExitKind::Unknown.is_success());
    }

    #[test]
    fn test_analyze_wait_status() {
        let status = WaitStatus::Exited(Pid::from_raw(1), 0);
        assert_eq!(analyze_wait_status(status), ExitKind::Exited(0));

        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGKILL, false);
        assert_eq!(
            analyze_wait_status(status),
            ExitKind::Signaled(Signal::SIGKILL)
        );

        assert_eq!(analyze_wait_status(WaitStatus::StillAlive), ExitKind::Unknown);
    }

    #[test]
    fn test_taxonomy_mapping() {
        assert_eq!(describe_exit_code(1), "fatal exception");
        assert_eq!(describe_exit_code(3), "internal parse error");
        assert_eq!(describe_exit_code(4), "internal evaluation failure");
        assert_eq!(describe_exit_code(5), "fatal error");
        assert_eq!(describe_exit_code(6), "misconfigured exception handler");
        assert_eq!(describe_exit_code(7), "exception handler run-time failure");
        assert_eq!(describe_exit_code(8), "uncaught exception");
        assert_eq!(describe_exit_code(9), "invalid argument");
        assert_eq!(describe_exit_code(10), "internal run-time failure");
        assert_eq!(describe_exit_code(12), "invalid debug argument");
        assert_eq!(describe_exit_code(137), "fatal signal");
        assert_eq!(describe_exit_code(2), "unknown error");
        assert_eq!(describe_exit_code(42), "unknown error");
    }

    #[test]
    fn test_failure_display_carries_path() {
        let failure = ExitFailure::new(ExitKind::Exited(9), "/usr/bin/job");
        let text = failure.to_string();
        assert!(text.contains("invalid argument"));
        assert!(text.contains("code 9"));
        assert!(text.contains("/usr/bin/job"));

        let failure = ExitFailure::new(ExitKind::Signaled(Signal::SIGKILL), "/usr/bin/job");
        assert!(failure.to_string().contains("SIGKILL"));
    }
}
