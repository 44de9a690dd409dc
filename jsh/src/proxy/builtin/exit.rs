//! Quit command handler.

use crate::shell::Shell;
use anyhow::Result;
use jsh_types::{Context, ExitStatus, JshError};
use tracing::debug;

/// Execute the `quit` builtin command.
///
/// Refuses while any job is stopped; running background jobs are left alone.
pub fn execute(shell: &mut Shell, _ctx: &Context, _argv: Vec<String>) -> Result<ExitStatus> {
    if shell.jobs.has_stopped() {
        debug!("quit refused: stopped jobs present");
        return Err(JshError::StoppedJobs.into());
    }
    shell.exit();
    Ok(ExitStatus::ExitedWith(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::job::JobState;
    use crate::shell::tests::TestShell;
    use nix::unistd::Pid;

    #[tokio::test]
    async fn quit_with_stopped_job_is_refused() {
        let mut t = TestShell::new();
        t.shell
            .jobs
            .add(Pid::from_raw(4242), JobState::Stopped, "sleep 30")
            .unwrap();

        let err = execute(&mut t.shell, &t.ctx, vec!["quit".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "There are stopped jobs");
        assert_eq!(t.shell.exited, None);
        assert_eq!(t.shell.jobs.len(), 1);
    }

    #[tokio::test]
    async fn quit_with_running_jobs_exits() {
        let mut t = TestShell::new();
        t.shell
            .jobs
            .add(Pid::from_raw(4242), JobState::Background, "sleep 30 &")
            .unwrap();

        execute(&mut t.shell, &t.ctx, vec!["quit".to_string()]).unwrap();
        assert_eq!(t.shell.exited, Some(ExitStatus::ExitedWith(0)));
    }
}
