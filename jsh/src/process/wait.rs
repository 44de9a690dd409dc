use jsh_types::JshError;
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, error};

use super::state::ChildStatus;

/// Wait target meaning "any child of this process".
pub const ANY_CHILD: Pid = Pid::from_raw(-1);

/// Collects one pending status change for `pid` without blocking.
///
/// `Ok(None)` means nothing is pending (still running, or no children left).
pub fn wait_pid_nohang(pid: Pid) -> Result<Option<ChildStatus>, JshError> {
    let options = WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG;

    let status = match waitpid(pid, Some(options)) {
        Ok(WaitStatus::Exited(pid, code)) => {
            debug!("WAIT_PID_EXITED: {} exited with status {}", pid, code);
            ChildStatus::Exited { pid, code }
        }
        Ok(WaitStatus::Signaled(pid, signal, core_dumped)) => {
            debug!(
                "WAIT_PID_SIGNALED: {} killed by {:?}, core_dumped: {}",
                pid, signal, core_dumped
            );
            ChildStatus::Signaled { pid, signal }
        }
        Ok(WaitStatus::Stopped(pid, signal)) => {
            debug!("WAIT_PID_STOPPED: {} stopped by {:?}", pid, signal);
            ChildStatus::Stopped { pid, signal }
        }
        Ok(WaitStatus::StillAlive) => return Ok(None),
        Err(Errno::ECHILD) => {
            debug!("WAIT_PID_ECHILD: no children to wait for ({})", pid);
            return Ok(None);
        }
        Ok(status) => {
            error!("WAIT_PID_UNEXPECTED: {:?} for {}", status, pid);
            return Ok(None);
        }
        Err(err) => return Err(JshError::system("waitpid", err)),
    };
    Ok(Some(status))
}

/// Collects every pending status change for `target` until none remain.
///
/// Never blocks on a running child, so calling it with nothing pending is a no-op.
pub fn reap_pending(target: Pid) -> Result<Vec<ChildStatus>, JshError> {
    let mut statuses = Vec::new();
    loop {
        match wait_pid_nohang(target) {
            Ok(Some(status)) => statuses.push(status),
            Ok(None) => break,
            Err(JshError::System {
                source: Errno::EINTR,
                ..
            }) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(statuses)
}
