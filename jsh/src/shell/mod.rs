pub mod eval;
pub mod event;
pub mod job;

use crate::process::send_signal_to_group;
use anyhow::{Context as _, Result};
use event::{EventReceiver, ShellEvent};
use job::{JobTable, Reaped};
use jsh_types::{Context, ExitStatus};
use nix::sys::signal::Signal;
use nix::unistd::{Pid, getpid};
use tracing::debug;

pub const APP_NAME: &str = "jsh";
pub const PROMPT: &str = "jsh> ";

/// Process-wide shell state. Owned by the command loop, which is the only
/// place the job table is mutated.
pub struct Shell {
    pub exited: Option<ExitStatus>,
    pub pid: Pid,
    pub(crate) jobs: JobTable,
    events: EventReceiver,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("pid", &self.pid)
            .field("jobs", &self.jobs)
            .field("exited", &self.exited)
            .finish()
    }
}

impl Shell {
    pub fn new(events: EventReceiver) -> Self {
        Shell {
            exited: None,
            pid: getpid(),
            jobs: JobTable::new(),
            events,
        }
    }

    pub fn exit(&mut self) {
        self.exit_with(0);
    }

    pub fn exit_with(&mut self, code: i32) {
        self.exited = Some(ExitStatus::ExitedWith(code));
    }

    pub async fn eval_line(&mut self, ctx: &Context, line: &str) -> Result<()> {
        eval::eval_line(self, ctx, line).await
    }

    /// Receives the next event from the signal producers.
    pub async fn next_event(&mut self) -> Result<ShellEvent> {
        self.events
            .recv()
            .await
            .context("signal event channel closed")
    }

    /// Applies one event: reaped child statuses update the table, control keys
    /// are relayed to the foreground job.
    pub fn handle_event(&mut self, ctx: &Context, event: ShellEvent) -> Result<()> {
        debug!("EVENT: {:?}", event);
        match event {
            ShellEvent::Child(status) => {
                let reaped = self.jobs.apply_child_status(&status);
                if let Reaped::Untracked(pid) = reaped {
                    debug!("EVENT: ignoring status of untracked child {}", pid);
                }
                if let Some(report) = reaped.report() {
                    ctx.write_stdout(&report)?;
                }
            }
            ShellEvent::Interrupt => {
                self.relay_to_foreground(Signal::SIGINT)?;
            }
            ShellEvent::Suspend => {
                self.relay_to_foreground(Signal::SIGTSTP)?;
            }
            ShellEvent::Quit => {
                ctx.write_stdout("Terminating after receipt of SIGQUIT signal")?;
                self.exit_with(1);
            }
        }
        Ok(())
    }

    /// Forwards `signal` to the foreground job's whole process group.
    ///
    /// Returns false when there is no foreground job. The table is left alone;
    /// the resulting stop or exit arrives later as a child status.
    pub fn relay_to_foreground(&self, signal: Signal) -> Result<bool> {
        let Some(pid) = self.jobs.foreground_pid() else {
            debug!("RELAY: no foreground job for {:?}", signal);
            return Ok(false);
        };
        let delivered = send_signal_to_group(pid, signal)?;
        Ok(delivered)
    }

    /// Blocks the command loop until `pid` is no longer the foreground job.
    ///
    /// Events are applied while waiting, so the wait ends as soon as the
    /// reaper removes or stops the job. There is no timeout.
    pub async fn wait_foreground(&mut self, ctx: &Context, pid: Pid) -> Result<()> {
        debug!("WAIT_FG: waiting on {}", pid);
        while self.jobs.is_foreground(pid) && self.exited.is_none() {
            let event = self.next_event().await?;
            self.handle_event(ctx, event)?;
        }
        debug!(
            "WAIT_FG: {} left the foreground ({:?})",
            pid,
            self.jobs.find_by_pid(pid).map(|job| job.state)
        );
        Ok(())
    }
}
