//! The job table: fixed-capacity bookkeeping of tracked children.

use crate::process::ChildStatus;
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of jobs tracked at any point in time.
pub const MAX_JOBS: usize = 16;
/// Job ids wrap back to 1 once they pass this ceiling.
pub const MAX_JID: usize = 1 << 16;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            JobState::Foreground => formatter.write_str("Foreground"),
            JobState::Background => formatter.write_str("Running"),
            JobState::Stopped => formatter.write_str("Stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub job_id: usize,
    pub state: JobState,
    pub cmd: String,
}

impl Job {
    /// Pid of the job's process group; jobs lead their own group.
    pub fn pgid(&self) -> Pid {
        self.pid
    }

    /// The `[jid] (pid) text` line echoed on launch and by `bg`.
    pub fn echo_line(&self) -> String {
        format!("[{}] ({}) {}", self.job_id, self.pid, self.cmd)
    }
}

/// `jobs` listing line.
impl std::fmt::Display for Job {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "[{}] ({}) {} {}",
            self.job_id, self.pid, self.state, self.cmd
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobTableError {
    #[error("job table is full ({capacity} jobs)")]
    Full { capacity: usize },

    #[error("invalid pid {0}")]
    InvalidPid(Pid),

    #[error("job {0} already owns the foreground")]
    ForegroundTaken(usize),
}

/// What the reaper did with one collected child status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaped {
    /// Removed after a normal exit; nothing to report.
    Exited(Job),
    /// Removed after being killed by a signal.
    Terminated(Job, i32),
    /// Kept in the table as Stopped.
    Stopped(Job, i32),
    /// The pid is not (or no longer) tracked.
    Untracked(Pid),
}

impl Reaped {
    pub fn report(&self) -> Option<String> {
        match self {
            Reaped::Terminated(job, signal) => Some(format!(
                "Job [{}] ({}) terminated by signal {}",
                job.job_id, job.pid, signal
            )),
            Reaped::Stopped(job, signal) => Some(format!(
                "Job [{}] ({}) stopped by signal {}",
                job.job_id, job.pid, signal
            )),
            Reaped::Exited(_) | Reaped::Untracked(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct JobTable {
    slots: Vec<Option<Job>>,
    next_job_id: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            slots: vec![None; MAX_JOBS],
            next_job_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Registers a job in the first free slot and returns its job id.
    ///
    /// Never evicts an existing entry.
    pub fn add(&mut self, pid: Pid, state: JobState, cmd: &str) -> Result<usize, JobTableError> {
        if pid.as_raw() < 1 {
            return Err(JobTableError::InvalidPid(pid));
        }
        if state == JobState::Foreground
            && let Some(job) = self.foreground_job()
        {
            return Err(JobTableError::ForegroundTaken(job.job_id));
        }
        let capacity = self.capacity();
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(JobTableError::Full { capacity })?;

        let job_id = self.allocate_job_id();
        self.slots[index] = Some(Job {
            pid,
            job_id,
            state,
            cmd: cmd.to_string(),
        });
        debug!("JOB_ADD: [{}] ({}) {:?} '{}'", job_id, pid, state, cmd);
        Ok(job_id)
    }

    fn allocate_job_id(&mut self) -> usize {
        let mut job_id = self.next_job_id;
        if job_id > MAX_JID {
            job_id = 1;
        }
        while self.find_by_jid(job_id).is_some() {
            job_id = if job_id >= MAX_JID { 1 } else { job_id + 1 };
        }
        self.next_job_id = if job_id >= MAX_JID { 1 } else { job_id + 1 };
        job_id
    }

    /// Clears the slot holding `pid`. Removing an absent pid returns false.
    pub fn remove(&mut self, pid: Pid) -> bool {
        if pid.as_raw() < 1 {
            return false;
        }
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|job| job.pid == pid))
        else {
            return false;
        };
        let job = slot.take();
        self.next_job_id = self.max_job_id() + 1;
        debug!("JOB_REMOVE: {:?}, next job id {}", job, self.next_job_id);
        true
    }

    fn max_job_id(&self) -> usize {
        self.list().map(|job| job.job_id).max().unwrap_or(0)
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        if pid.as_raw() < 1 {
            return None;
        }
        self.list().find(|job| job.pid == pid)
    }

    pub fn find_by_jid(&self, job_id: usize) -> Option<&Job> {
        if job_id < 1 {
            return None;
        }
        self.list().find(|job| job.job_id == job_id)
    }

    fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|job| job.pid == pid)
    }

    pub fn foreground_job(&self) -> Option<&Job> {
        self.list().find(|job| job.state == JobState::Foreground)
    }

    pub fn foreground_pid(&self) -> Option<Pid> {
        self.foreground_job().map(|job| job.pid)
    }

    pub fn is_foreground(&self, pid: Pid) -> bool {
        self.find_by_pid(pid)
            .is_some_and(|job| job.state == JobState::Foreground)
    }

    pub fn has_stopped(&self) -> bool {
        self.list().any(|job| job.state == JobState::Stopped)
    }

    /// Live jobs in slot order.
    pub fn list(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    /// Restates a tracked job. Returns `Ok(false)` when `pid` is not tracked.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> Result<bool, JobTableError> {
        if state == JobState::Foreground
            && let Some(job) = self.foreground_job()
            && job.pid != pid
        {
            return Err(JobTableError::ForegroundTaken(job.job_id));
        }
        match self.find_by_pid_mut(pid) {
            Some(job) => {
                debug!("JOB_STATE: [{}] {:?} -> {:?}", job.job_id, job.state, state);
                job.state = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Applies one collected child status: removal on exit or signal death,
    /// restate to Stopped on a stop.
    pub fn apply_child_status(&mut self, status: &ChildStatus) -> Reaped {
        let pid = status.pid();
        let Some(job) = self.find_by_pid(pid).cloned() else {
            warn!("REAP_UNTRACKED: status {} for untracked pid {}", status, pid);
            return Reaped::Untracked(pid);
        };

        if status.is_terminated() {
            self.remove(pid);
        }
        match *status {
            ChildStatus::Exited { .. } => Reaped::Exited(job),
            ChildStatus::Signaled { signal, .. } => Reaped::Terminated(job, signal as i32),
            ChildStatus::Stopped { signal, .. } => {
                if let Some(tracked) = self.find_by_pid_mut(pid) {
                    tracked.state = JobState::Stopped;
                }
                let job = Job {
                    state: JobState::Stopped,
                    ..job
                };
                Reaped::Stopped(job, signal as i32)
            }
        }
    }
}
