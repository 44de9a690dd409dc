//! External program launch and job registration.

use crate::parser::ParsedCommand;
use crate::process::{SigmaskGuard, fork_process};
use crate::shell::Shell;
use crate::shell::job::JobState;
use anyhow::{Context as _, Result};
use jsh_types::{Context, ExitStatus, JshError};
use tracing::debug;

/// Launches `cmd` and registers it in the job table.
///
/// Fork and registration happen with child-status delivery deferred and with
/// no suspension point in between, so the reaper can never see a pid the
/// table does not know yet. A full table refuses the launch before forking.
pub fn launch(shell: &mut Shell, ctx: &Context, cmd: &ParsedCommand) -> Result<ExitStatus> {
    if shell.jobs.is_full() {
        debug!("launch refused, job table full: {}", cmd.text);
        return Err(JshError::TooManyJobs.into());
    }

    let state = if cmd.background {
        JobState::Background
    } else {
        JobState::Foreground
    };

    let guard = SigmaskGuard::block_child()?;
    let pid = fork_process(&cmd.argv)?;
    let job_id = shell
        .jobs
        .add(pid, state, &cmd.text)
        .with_context(|| format!("failed to register job for pid {pid}"))?;
    guard.release()?;

    if ctx.verbose {
        ctx.write_stdout(&format!("Added job [{}] {} {}", job_id, pid, cmd.text))?;
    }

    if cmd.background {
        if let Some(job) = shell.jobs.find_by_pid(pid) {
            ctx.write_stdout(&job.echo_line())?;
        }
        Ok(ExitStatus::ExitedWith(0))
    } else {
        Ok(ExitStatus::Running(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use crate::process::wait::wait_pid_nohang;
    use crate::shell::job::MAX_JOBS;
    use crate::shell::tests::TestShell;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;
    use std::time::{Duration, Instant};

    fn cmd(line: &str) -> ParsedCommand {
        parse_line(line).unwrap().unwrap()
    }

    fn wait_exit(pid: Pid) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while wait_pid_nohang(pid).unwrap().is_none() {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[tokio::test]
    async fn background_launch_registers_and_echoes() {
        let mut t = TestShell::new();
        let status = launch(&mut t.shell, &t.ctx, &cmd("sleep 30 &")).unwrap();
        assert_eq!(status, ExitStatus::ExitedWith(0));

        let job = t.shell.jobs.list().next().cloned().unwrap();
        assert_eq!(job.job_id, 1);
        assert_eq!(job.state, JobState::Background);
        assert_eq!(t.output(), format!("[1] ({}) sleep 30 &\n", job.pid));

        killpg(job.pgid(), Signal::SIGKILL).unwrap();
        wait_exit(job.pid);
    }

    #[tokio::test]
    async fn foreground_launch_asks_for_a_wait() {
        let mut t = TestShell::new();
        let status = launch(&mut t.shell, &t.ctx, &cmd("true")).unwrap();
        let ExitStatus::Running(pid) = status else {
            panic!("expected a foreground job, got {status:?}");
        };
        assert!(t.shell.jobs.is_foreground(pid));
        assert_eq!(t.output(), "");
        wait_exit(pid);
    }

    #[tokio::test]
    async fn verbose_reports_registration() {
        let mut t = TestShell::new();
        t.ctx.verbose = true;
        let ExitStatus::Running(pid) = launch(&mut t.shell, &t.ctx, &cmd("true")).unwrap() else {
            panic!("expected a foreground job");
        };
        assert_eq!(t.output(), format!("Added job [1] {pid} true\n"));
        wait_exit(pid);
    }

    #[tokio::test]
    async fn full_table_refuses_without_spawning() {
        let mut t = TestShell::new();
        for i in 0..MAX_JOBS {
            t.shell
                .jobs
                .add(Pid::from_raw(100_000 + i as i32), JobState::Background, "x &")
                .unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spawned");
        let line = format!("touch {} &", marker.display());

        let err = launch(&mut t.shell, &t.ctx, &cmd(&line)).unwrap_err();
        let err = err.downcast_ref::<JshError>().unwrap();
        assert!(matches!(err, JshError::TooManyJobs));
        assert_eq!(err.to_string(), "Tried to create too many jobs");

        assert_eq!(t.shell.jobs.len(), MAX_JOBS);
        assert!(t.shell.jobs.list().all(|job| job.cmd == "x &"));
        std::thread::sleep(Duration::from_millis(200));
        assert!(!marker.exists(), "a child was spawned for a full table");
    }
}
