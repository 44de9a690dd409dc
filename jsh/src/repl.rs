use crate::errors::report_user_error;
use crate::shell::event::ShellEvent;
use crate::shell::{PROMPT, Shell};
use anyhow::{Context as _, Result};
use jsh_types::{Context, ExitStatus};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

enum Input {
    Line(Option<String>),
    Event(ShellEvent),
}

/// The read-eval loop. Child status changes and control keys are applied
/// while waiting for input, so reports show up without a new command.
pub struct Repl<'a> {
    pub shell: &'a mut Shell,
    ctx: Context,
}

impl<'a> Repl<'a> {
    pub fn new(shell: &'a mut Shell, ctx: Context) -> Self {
        Repl { shell, ctx }
    }

    /// Runs until `quit`, end of input, SIGQUIT, or a fatal error.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<ExitStatus> {
        let mut lines = reader.lines();

        loop {
            if let Some(status) = self.shell.exited {
                debug!("repl: shell exited with {:?}", status);
                return Ok(status);
            }
            if self.ctx.emit_prompt {
                self.ctx.write_prompt(PROMPT)?;
            }

            let line = loop {
                let input = tokio::select! {
                    biased;
                    event = self.shell.next_event() => Input::Event(event?),
                    line = lines.next_line() => {
                        Input::Line(line.context("failed to read command line")?)
                    }
                };
                match input {
                    Input::Event(event) => {
                        self.shell.handle_event(&self.ctx, event)?;
                        if self.shell.exited.is_some() {
                            break None;
                        }
                    }
                    Input::Line(line) => break Some(line),
                }
            };

            match line {
                // exit requested by an event
                None => continue,
                // end of input
                Some(None) => {
                    debug!("repl: end of input");
                    self.shell.exit();
                }
                Some(Some(line)) => {
                    if let Err(err) = self.shell.eval_line(&self.ctx, &line).await
                        && !report_user_error(&self.ctx, &err)
                    {
                        return Err(err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ChildStatus;
    use crate::shell::job::JobState;
    use crate::shell::tests::TestShell;
    use nix::unistd::Pid;

    #[tokio::test]
    async fn quit_ends_the_loop() {
        let mut t = TestShell::new();
        let ctx = t.ctx.clone();
        let status = Repl::new(&mut t.shell, ctx)
            .run(&b"\njobs\nquit\njobs\n"[..])
            .await
            .unwrap();
        assert_eq!(status, ExitStatus::ExitedWith(0));
    }

    #[tokio::test]
    async fn end_of_input_exits_cleanly() {
        let mut t = TestShell::new();
        let mut ctx = t.ctx.clone();
        ctx.emit_prompt = true;
        let status = Repl::new(&mut t.shell, ctx).run(&b""[..]).await.unwrap();
        assert_eq!(status, ExitStatus::ExitedWith(0));
        assert_eq!(t.output(), PROMPT);
    }

    #[tokio::test]
    async fn user_errors_do_not_stop_the_loop() {
        let mut t = TestShell::new();
        t.shell
            .jobs
            .add(Pid::from_raw(4242), JobState::Stopped, "sleep 30")
            .unwrap();
        let ctx = t.ctx.clone();
        let status = Repl::new(&mut t.shell, ctx)
            .run(&b"fg %99\nbg\nquit\n"[..])
            .await
            .unwrap();
        // quit was refused, so input simply ran out
        assert_eq!(status, ExitStatus::ExitedWith(0));
        assert_eq!(
            t.output(),
            "%99 : No such job\nbg command requires PID or %jobid argument\nThere are stopped jobs\n"
        );
        assert_eq!(t.shell.jobs.len(), 1);
    }

    #[tokio::test]
    async fn pending_events_are_applied_before_input() {
        let mut t = TestShell::new();
        let pid = Pid::from_raw(4242);
        t.shell
            .jobs
            .add(pid, JobState::Background, "sleep 30 &")
            .unwrap();
        t.tx.send(ShellEvent::Child(ChildStatus::Exited { pid, code: 0 }))
            .await
            .unwrap();

        let ctx = t.ctx.clone();
        Repl::new(&mut t.shell, ctx)
            .run(&b"jobs\n"[..])
            .await
            .unwrap();
        assert!(t.shell.jobs.is_empty());
        assert_eq!(t.output(), "");
    }

    #[tokio::test]
    async fn sigquit_exits_with_failure() {
        let mut t = TestShell::new();
        t.tx.send(ShellEvent::Quit).await.unwrap();
        let ctx = t.ctx.clone();
        let status = Repl::new(&mut t.shell, ctx)
            .run(&b"jobs\n"[..])
            .await
            .unwrap();
        assert_eq!(status, ExitStatus::ExitedWith(1));
    }
}
