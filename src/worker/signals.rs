//! Termination analysis for worker processes.

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use serde::{Serialize, Serializer};

/// Worker finished its scan and published the result.
pub const EXIT_OK: i32 = 0;
/// Worker could not write through its result channel.
pub const EXIT_TRANSPORT_FAILED: i32 = 1;
/// Worker body panicked.
pub const EXIT_PANICKED: i32 = 2;
/// Worker was assigned an empty partition and has nothing to publish.
pub const EXIT_EMPTY_PARTITION: i32 = 3;

/// Reason why a worker process terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by signal.
    Signaled(Signal),
    /// Unknown termination reason.
    Unknown,
}

impl TerminationReason {
    /// Clean exit with [`EXIT_OK`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(EXIT_OK))
    }

    /// Exited by itself, with any status.
    pub fn exited_normally(&self) -> bool {
        matches!(self, Self::Exited(_))
    }

    /// Terminated by SIGKILL.
    pub fn was_killed(&self) -> bool {
        matches!(self, Self::Signaled(Signal::SIGKILL))
    }

    /// Get a human-readable description.
    pub fn description(&self) -> String {
        match self {
            Self::Exited(EXIT_EMPTY_PARTITION) => {
                format!("exited with status {} (empty partition)", EXIT_EMPTY_PARTITION)
            }
            Self::Exited(EXIT_TRANSPORT_FAILED) => format!(
                "exited with status {} (result transport failed)",
                EXIT_TRANSPORT_FAILED
            ),
            Self::Exited(EXIT_PANICKED) => {
                format!("exited with status {} (worker panicked)", EXIT_PANICKED)
            }
            Self::Exited(code) => format!("exited normally with status {}", code),
            Self::Signaled(sig) => format!("terminated by signal {}", sig.as_str()),
            Self::Unknown => "unknown reason".to_string(),
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl Serialize for TerminationReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.description())
    }
}

/// Analyze a `WaitStatus` to determine the termination reason.
pub fn analyze_wait_status(status: WaitStatus) -> TerminationReason {
    match status {
        WaitStatus::Exited(_, code) => TerminationReason::Exited(code),
        WaitStatus::Signaled(_, signal, _) => TerminationReason::Signaled(signal),
        _ => TerminationReason::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::Pid;

    #[test]
    fn test_termination_reason_success() {
        assert!(TerminationReason::Exited(0).is_success());
        assert!(!TerminationReason::Exited(1).is_success());
        assert!(!TerminationReason::Signaled(Signal::SIGKILL).is_success());
    }

    #[test]
    fn test_exited_normally_covers_nonzero() {
        assert!(TerminationReason::Exited(EXIT_EMPTY_PARTITION).exited_normally());
        assert!(!TerminationReason::Signaled(Signal::SIGTERM).exited_normally());
    }

    #[test]
    fn test_was_killed() {
        assert!(TerminationReason::Signaled(Signal::SIGKILL).was_killed());
        assert!(!TerminationReason::Signaled(Signal::SIGSEGV).was_killed());
        assert!(!TerminationReason::Exited(0).was_killed());
    }

    #[test]
    fn test_analyze_wait_status() {
        let status = WaitStatus::Exited(Pid::from_raw(1), 0);
        assert_eq!(analyze_wait_status(status), TerminationReason::Exited(0));

        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGKILL, false);
        assert_eq!(
            analyze_wait_status(status),
            TerminationReason::Signaled(Signal::SIGKILL)
        );

        // Callers handle StillAlive before asking for a reason.
        let status = WaitStatus::StillAlive;
        assert_eq!(analyze_wait_status(status), TerminationReason::Unknown);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            TerminationReason::Exited(0).to_string(),
            "exited normally with status 0"
        );
        assert!(
            TerminationReason::Signaled(Signal::SIGKILL)
                .to_string()
                .contains("SIGKILL")
        );
        assert!(
            TerminationReason::Exited(EXIT_EMPTY_PARTITION)
                .to_string()
                .contains("empty partition")
        );
    }
}
