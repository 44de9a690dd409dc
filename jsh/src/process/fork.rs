use anyhow::{Context as _, Result};
use jsh_types::JshError;
use libc::STDOUT_FILENO;
use nix::errno::Errno;
use nix::sys::signal::{SigSet, SigmaskHow, Signal, pthread_sigmask};
use nix::unistd::{ForkResult, Pid, execvp, fork, setpgid, write};
use std::ffi::CString;
use tracing::{debug, error};

use super::signal::reset_child_signals;

/// Exit code of a child whose program could not be executed.
pub const COMMAND_NOT_FOUND: i32 = 127;

/// Blocks `SIGCHLD` for the calling thread until dropped.
///
/// Held across fork + registration so no child status is observed before the
/// job row exists.
pub struct SigmaskGuard {
    old: SigSet,
}

impl SigmaskGuard {
    pub fn block_child() -> Result<Self, JshError> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        let mut old = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), Some(&mut old))
            .map_err(|e| JshError::system("sigprocmask", e))?;
        Ok(SigmaskGuard { old })
    }

    /// Restores the previous mask, reporting failure instead of swallowing it.
    pub fn release(self) -> Result<(), JshError> {
        let res = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.old), None)
            .map_err(|e| JshError::system("sigprocmask", e));
        std::mem::forget(self);
        res
    }
}

impl Drop for SigmaskGuard {
    fn drop(&mut self) {
        if let Err(err) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.old), None) {
            error!("failed to restore signal mask: {}", err);
        }
    }
}

/// Everything the child needs, allocated before `fork` so the child only
/// performs async-signal-safe work.
struct ExecImage {
    program: CString,
    argv: Vec<CString>,
    not_found: Vec<u8>,
}

impl ExecImage {
    fn new(argv: &[String]) -> Result<Self> {
        let name = argv.first().context("empty argument vector")?;
        let argv = argv
            .iter()
            .map(|a| CString::new(a.as_str()).context("argument contains a NUL byte"))
            .collect::<Result<Vec<_>>>()?;
        Ok(ExecImage {
            program: argv[0].clone(),
            argv,
            not_found: format!("{name}: command not found\n").into_bytes(),
        })
    }
}

/// Forks and execs `argv` in a new process group whose id is the child's pid.
///
/// Returns the child pid. Exec failures are reported by the child itself,
/// which exits with [`COMMAND_NOT_FOUND`]; the caller is not affected.
pub fn fork_process(argv: &[String]) -> Result<Pid> {
    let image = ExecImage::new(argv)?;

    debug!("🍴 FORK: about to fork {:?}", argv);
    let pid = unsafe { fork().map_err(|e| JshError::system("fork", e))? };

    match pid {
        ForkResult::Parent { child } => {
            // Also set from the parent so the group exists before anyone signals it.
            match setpgid(child, child) {
                Ok(_) | Err(Errno::EACCES) | Err(Errno::ESRCH) => {}
                Err(e) => return Err(JshError::system("setpgid", e).into()),
            }
            debug!("🍴 FORK: parent continuing with child pid {}", child);
            Ok(child)
        }
        ForkResult::Child => exec_child(&image),
    }
}

fn exec_child(image: &ExecImage) -> ! {
    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
    reset_child_signals();
    let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);

    let _ = execvp(&image.program, &image.argv);

    let _ = write(STDOUT_FILENO, &image.not_found);
    unsafe { libc::_exit(COMMAND_NOT_FOUND) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::wait::wait_pid_nohang;
    use crate::process::ChildStatus;
    use nix::sys::signal::kill;
    use nix::unistd::getpgid;
    use std::time::{Duration, Instant};

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn wait_for(pid: Pid) -> ChildStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(status) = wait_pid_nohang(pid).unwrap() {
                return status;
            }
            assert!(Instant::now() < deadline, "child {pid} never changed state");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn child_leads_its_own_process_group() {
        init();
        let pid = fork_process(&argv(&["sleep", "5"])).unwrap();
        assert_eq!(getpgid(Some(pid)).unwrap(), pid);
        assert_ne!(getpgid(None).unwrap(), pid);

        kill(pid, Signal::SIGKILL).unwrap();
        assert!(wait_for(pid).is_terminated());
    }

    #[test]
    fn runs_program_from_path() {
        init();
        let pid = fork_process(&argv(&["sh", "-c", "exit 7"])).unwrap();
        assert_eq!(wait_for(pid), ChildStatus::Exited { pid, code: 7 });
    }

    #[test]
    fn missing_program_only_ends_the_child() {
        init();
        let pid = fork_process(&argv(&["jsh-test-no-such-program"])).unwrap();
        assert_eq!(
            wait_for(pid),
            ChildStatus::Exited {
                pid,
                code: COMMAND_NOT_FOUND
            }
        );
    }

    #[test]
    fn child_gets_default_sigpipe() {
        init();
        // the test harness itself runs with SIGPIPE ignored
        let pid = fork_process(&argv(&["sh", "-c", "kill -PIPE $$; exit 0"])).unwrap();
        assert_eq!(
            wait_for(pid),
            ChildStatus::Signaled {
                pid,
                signal: Signal::SIGPIPE
            }
        );
    }

    #[test]
    fn empty_argv_is_rejected_before_fork() {
        assert!(fork_process(&[]).is_err());
    }

    #[test]
    fn sigmask_guard_blocks_and_restores() {
        let guard = SigmaskGuard::block_child().unwrap();
        let mut current = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current)).unwrap();
        assert!(current.contains(Signal::SIGCHLD));
        guard.release().unwrap();

        let mut current = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current)).unwrap();
        assert!(!current.contains(Signal::SIGCHLD));
    }
}
