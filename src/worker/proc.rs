//! Process handle for forked workers.

use super::signals::{TerminationReason, analyze_wait_status};
use crate::error::{PminmaxError, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// Handle to one worker process.
///
/// Waits are always per-pid, so reaping never steals an exit status that
/// belongs to some other child of the host process.
#[derive(Debug)]
pub struct Proc {
    pid: Pid,
    /// Set once the process has been reaped.
    termination: Option<TerminationReason>,
}

impl Proc {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            termination: None,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn is_reaped(&self) -> bool {
        self.termination.is_some()
    }

    /// How the process ended, once reaped.
    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    /// Try to reap the process (non-blocking).
    ///
    /// Returns `None` while the process is still running.
    pub fn try_wait(&mut self) -> Result<Option<TerminationReason>> {
        if let Some(reason) = &self.termination {
            return Ok(Some(reason.clone()));
        }
        loop {
            match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => return Ok(None),
                Ok(status) => return Ok(Some(self.record(status))),
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    self.termination = Some(TerminationReason::Unknown);
                    return Err(PminmaxError::Worker(format!(
                        "waitpid({}) failed: {}",
                        self.pid, e
                    )));
                }
            }
        }
    }

    /// Wait for the process to exit (blocking).
    pub fn wait(&mut self) -> Result<TerminationReason> {
        if let Some(reason) = &self.termination {
            return Ok(reason.clone());
        }
        loop {
            match waitpid(self.pid, None) {
                Ok(status) => return Ok(self.record(status)),
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    self.termination = Some(TerminationReason::Unknown);
                    return Err(PminmaxError::Worker(format!(
                        "waitpid({}) failed: {}",
                        self.pid, e
                    )));
                }
            }
        }
    }

    /// Send SIGKILL and reap the process.
    ///
    /// A process that exited on its own between the check and the signal
    /// is reaped with its real status.
    pub fn kill(&mut self) -> Result<TerminationReason> {
        if let Some(reason) = &self.termination {
            return Ok(reason.clone());
        }
        match signal::kill(self.pid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => {
                return Err(PminmaxError::Worker(format!(
                    "Failed to send SIGKILL to {}: {}",
                    self.pid, e
                )));
            }
        }
        self.wait()
    }

    fn record(&mut self, status: WaitStatus) -> TerminationReason {
        let reason = analyze_wait_status(status);
        self.termination = Some(reason.clone());
        reason
    }
}

impl Drop for Proc {
    fn drop(&mut self) {
        if self.termination.is_none() {
            let _ = signal::kill(self.pid, Signal::SIGKILL);
            let _ = waitpid(self.pid, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::{Duration, Instant};

    fn spawn(program: &str, args: &[&str]) -> Proc {
        let child = Command::new(program)
            .args(args)
            .spawn()
            .expect("Failed to spawn test process");
        Proc::new(Pid::from_raw(child.id() as i32))
    }

    fn wait_until_reaped(proc: &mut Proc) -> TerminationReason {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if let Some(reason) = proc.try_wait().unwrap() {
                return reason;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("process did not exit in time");
    }

    #[test]
    fn test_try_wait_reports_exit_code() {
        let mut proc = spawn("sh", &["-c", "exit 3"]);
        assert_eq!(wait_until_reaped(&mut proc), TerminationReason::Exited(3));
        assert!(proc.is_reaped());
        assert_eq!(proc.termination(), Some(&TerminationReason::Exited(3)));
    }

    #[test]
    fn test_try_wait_still_running() {
        let mut proc = spawn("sleep", &["60"]);
        assert_eq!(proc.try_wait().unwrap(), None);
        assert!(!proc.is_reaped());
        proc.kill().unwrap();
    }

    #[test]
    fn test_kill_reaps_with_sigkill() {
        let mut proc = spawn("sleep", &["60"]);
        let reason = proc.kill().unwrap();
        assert!(reason.was_killed());
        assert!(proc.is_reaped());
        // Second kill is a no-op on a reaped process.
        assert!(proc.kill().unwrap().was_killed());
    }

    #[test]
    fn test_wait_blocking() {
        let mut proc = spawn("true", &[]);
        assert!(proc.wait().unwrap().is_success());
    }

    #[test]
    fn test_drop_kills_unreaped() {
        let proc = spawn("sleep", &["60"]);
        let pid = proc.pid();
        drop(proc);
        // Reaped by Drop: a further waitpid finds no such child.
        assert_eq!(waitpid(pid, Some(WaitPidFlag::WNOHANG)), Err(Errno::ECHILD));
    }
}
