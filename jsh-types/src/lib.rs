use anyhow::Result;
use libc::STDOUT_FILENO;
use nix::errno::Errno;
use nix::unistd::Pid;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::mem;
use std::os::unix::io::FromRawFd;
use std::os::unix::io::RawFd;
use thiserror::Error;

/// Job shell specific error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JshError {
    #[error("{cmd} command requires PID or %jobid argument")]
    MissingJobArgument { cmd: String },

    #[error("{cmd}: argument must be a PID or %jobid")]
    InvalidJobArgument { cmd: String },

    #[error("{spec} : No such job")]
    NoSuchJob { spec: String },

    #[error("({spec}) : No such process")]
    NoSuchProcess { spec: String },

    #[error("Tried to create too many jobs")]
    TooManyJobs,

    #[error("There are stopped jobs")]
    StoppedJobs,

    #[error("jsh: {0}")]
    Parse(String),

    #[error("{operation} error: {source}")]
    System {
        operation: &'static str,
        source: Errno,
    },
}

impl JshError {
    pub fn system(operation: &'static str, source: Errno) -> Self {
        JshError::System { operation, source }
    }

    /// Fatal errors mean the job-control bookkeeping can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, JshError::System { .. })
    }
}

/// Run flags and the descriptor all shell output goes to.
#[derive(Clone)]
pub struct Context {
    pub verbose: bool,
    pub emit_prompt: bool,
    pub outfile: RawFd,
}

impl Context {
    pub fn new(verbose: bool, emit_prompt: bool) -> Self {
        Context {
            verbose,
            emit_prompt,
            outfile: STDOUT_FILENO,
        }
    }

    pub fn with_outfile(mut self, outfile: RawFd) -> Self {
        self.outfile = outfile;
        self
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("Context")
            .field("verbose", &self.verbose)
            .field("emit_prompt", &self.emit_prompt)
            .field("outfile", &self.outfile)
            .finish()
    }
}

impl Context {
    pub fn write_stdout(&self, msg: &str) -> Result<()> {
        let mut file = unsafe { File::from_raw_fd(self.outfile) };
        let res = writeln!(&mut file, "{msg}");
        mem::forget(file);
        Ok(res?)
    }

    /// Writes without a trailing newline, used for the prompt.
    pub fn write_prompt(&self, prompt: &str) -> Result<()> {
        let mut file = unsafe { File::from_raw_fd(self.outfile) };
        let res = write!(&mut file, "{prompt}").and_then(|_| file.flush());
        mem::forget(file);
        Ok(res?)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExitStatus {
    ExitedWith(i32),
    /// A job was placed in the foreground and the caller must wait on it.
    Running(Pid),
}
