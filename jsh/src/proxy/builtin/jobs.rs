//! Job control command handlers (jobs, fg, bg).

use crate::process::send_signal_to_group;
use crate::shell::Shell;
use crate::shell::job::{Job, JobState};
use anyhow::{Context as _, Result};
use jsh_types::{Context, ExitStatus, JshError};
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::debug;

/// Marker that introduces a job id reference (`%3`).
pub const JOB_ID_MARKER: char = '%';

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JobRef {
    JobId(usize),
    Pid(Pid),
}

/// Parses a `bg`/`fg` argument: `%<digits>` for a job id, `<digits>` for a pid.
pub fn parse_job_ref(cmd: &str, arg: Option<&str>) -> Result<JobRef, JshError> {
    let Some(arg) = arg else {
        return Err(JshError::MissingJobArgument {
            cmd: cmd.to_string(),
        });
    };

    let (digits, is_job_id) = match arg.strip_prefix(JOB_ID_MARKER) {
        Some(digits) => (digits, true),
        None => (arg, false),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(JshError::InvalidJobArgument {
            cmd: cmd.to_string(),
        });
    }

    // All digits but out of range can never name a live job.
    let not_found = || {
        if is_job_id {
            JshError::NoSuchJob {
                spec: arg.to_string(),
            }
        } else {
            JshError::NoSuchProcess {
                spec: arg.to_string(),
            }
        }
    };

    if is_job_id {
        let job_id = digits.parse::<usize>().map_err(|_| not_found())?;
        Ok(JobRef::JobId(job_id))
    } else {
        let pid = digits.parse::<i32>().map_err(|_| not_found())?;
        Ok(JobRef::Pid(Pid::from_raw(pid)))
    }
}

/// Validates the argument and looks the job up; no side effects on failure.
pub fn resolve_job(shell: &Shell, cmd: &str, arg: Option<&str>) -> Result<Job, JshError> {
    let job = match parse_job_ref(cmd, arg)? {
        JobRef::JobId(job_id) => shell.jobs.find_by_jid(job_id).ok_or(JshError::NoSuchJob {
            spec: arg.unwrap_or_default().to_string(),
        })?,
        JobRef::Pid(pid) => shell.jobs.find_by_pid(pid).ok_or(JshError::NoSuchProcess {
            spec: arg.unwrap_or_default().to_string(),
        })?,
    };
    Ok(job.clone())
}

/// Execute the `jobs` builtin command.
///
/// Lists every live job in table order.
pub fn execute_jobs(shell: &mut Shell, ctx: &Context, _argv: Vec<String>) -> Result<ExitStatus> {
    for job in shell.jobs.list() {
        ctx.write_stdout(&job.to_string())?;
    }
    Ok(ExitStatus::ExitedWith(0))
}

/// Continues the job's process group and restates it.
fn continue_job(shell: &mut Shell, job: &Job, state: JobState) -> Result<()> {
    debug!(
        "CONT: [{}] ({}) {:?} -> {:?}",
        job.job_id, job.pid, job.state, state
    );
    send_signal_to_group(job.pgid(), Signal::SIGCONT)?;
    shell
        .jobs
        .set_state(job.pid, state)
        .with_context(|| format!("failed to move job {} to {:?}", job.job_id, state))?;
    Ok(())
}

/// Execute the `bg` builtin command.
///
/// Resumes a job in the background without waiting for it.
pub fn execute_bg(shell: &mut Shell, ctx: &Context, argv: Vec<String>) -> Result<ExitStatus> {
    let cmd = argv.first().map(String::as_str).unwrap_or("bg");
    let job = resolve_job(shell, cmd, argv.get(1).map(String::as_str))?;

    continue_job(shell, &job, JobState::Background)?;
    ctx.write_stdout(&job.echo_line())?;
    Ok(ExitStatus::ExitedWith(0))
}

/// Execute the `fg` builtin command.
///
/// Resumes a job in the foreground; the dispatcher then waits on it.
pub fn execute_fg(shell: &mut Shell, _ctx: &Context, argv: Vec<String>) -> Result<ExitStatus> {
    let cmd = argv.first().map(String::as_str).unwrap_or("fg");
    let job = resolve_job(shell, cmd, argv.get(1).map(String::as_str))?;

    continue_job(shell, &job, JobState::Foreground)?;
    Ok(ExitStatus::Running(job.pid))
}
