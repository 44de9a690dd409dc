use nix::sys::signal::Signal;
use nix::unistd::Pid;

/// A status change collected from `waitpid` for one child.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChildStatus {
    Exited { pid: Pid, code: i32 },
    Signaled { pid: Pid, signal: Signal },
    Stopped { pid: Pid, signal: Signal },
}

impl ChildStatus {
    pub fn pid(&self) -> Pid {
        match *self {
            ChildStatus::Exited { pid, .. }
            | ChildStatus::Signaled { pid, .. }
            | ChildStatus::Stopped { pid, .. } => pid,
        }
    }

    pub fn is_terminated(&self) -> bool {
        !matches!(self, ChildStatus::Stopped { .. })
    }
}

impl std::fmt::Display for ChildStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChildStatus::Exited { code, .. } => write!(formatter, "exited({code})"),
            ChildStatus::Signaled { signal, .. } => {
                if signal == &Signal::SIGKILL {
                    formatter.write_str("killed")
                } else {
                    write!(formatter, "terminated({})", *signal as i32)
                }
            }
            ChildStatus::Stopped { signal, .. } => write!(formatter, "stopped({})", *signal as i32),
        }
    }
}
