use crate::shell::APP_NAME;
use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;

const LOG_FILE_NAME: &str = "jsh.log";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print additional diagnostic information
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not emit a command prompt
    #[arg(short = 'p', long = "no-prompt")]
    pub no_prompt: bool,

    /// Write the debug log here instead of the XDG state directory
    #[arg(long, env = "JSH_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Run settings resolved from the command line and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub verbose: bool,
    pub emit_prompt: bool,
    pub log_file: Option<PathBuf>,
}

impl From<Cli> for ShellConfig {
    fn from(cli: Cli) -> Self {
        ShellConfig {
            verbose: cli.verbose,
            emit_prompt: !cli.no_prompt,
            log_file: cli.log_file,
        }
    }
}

impl ShellConfig {
    /// Default filter directive when `JSH_LOG` is unset.
    pub fn default_log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Resolves where the log goes, creating the XDG state directory if needed.
    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_file {
            return Ok(path.clone());
        }
        let xdg_dir =
            xdg::BaseDirectories::with_prefix(APP_NAME).context("failed get xdg directory")?;
        xdg_dir
            .place_state_file(LOG_FILE_NAME)
            .context("failed get log path")
    }
}
