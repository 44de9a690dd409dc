use anyhow::{Context as _, Result};
use clap::Parser;
use jsh::config::{Cli, ShellConfig};
use jsh::process::spawn_signal_producers;
use jsh::repl::Repl;
use jsh::shell::{Shell, event};
use jsh_types::{Context, ExitStatus};
use std::path::Path;
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = ShellConfig::from(Cli::parse());

    let log_path = config.log_path().ok();
    if let Some(path) = log_path.as_deref()
        && let Err(err) = init_tracing(&config, path)
    {
        // keep going without a subscriber
        eprintln!("jsh: logging disabled: {err:#}");
    }

    setup_panic_handler(log_path.clone());

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("jsh: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    let code = rt.block_on(run_shell(config));
    // a pending stdin read must not hold up exit
    rt.shutdown_background();
    code
}

async fn run_shell(config: ShellConfig) -> ExitCode {
    debug!("start shell: {:?}", config);
    let ctx = Context::new(config.verbose, config.emit_prompt);

    let (tx, rx) = event::channel();
    if let Err(err) = spawn_signal_producers(tx) {
        eprintln!("jsh: {err:#}");
        return ExitCode::FAILURE;
    }

    let mut shell = Shell::new(rx);
    debug!("shell pid {} with {:?}", shell.pid, ctx);
    let mut repl = Repl::new(&mut shell, ctx);
    let stdin = BufReader::new(tokio::io::stdin());

    match repl.run(stdin).await {
        Ok(ExitStatus::ExitedWith(code)) => {
            debug!("shell exit: {}", code);
            ExitCode::from(code.clamp(0, 255) as u8)
        }
        Ok(ExitStatus::Running(pid)) => {
            debug!("shell exit with foreground job {}", pid);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("jsh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &ShellConfig, path: &Path) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("JSH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_level()));

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::sync::Arc::new(log_file))
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

/// Chains onto the default hook, which already prints to stderr, and adds a
/// timestamped record to the log.
fn setup_panic_handler(log_path: Option<std::path::PathBuf>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("{}", panic_info);

        // without a subscriber the record would be lost
        if !tracing::dispatcher::has_been_set()
            && let Some(path) = log_path.as_deref()
            && let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
        {
            use std::io::Write;
            let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC");
            let _ = writeln!(file, "{timestamp} {panic_info}");
        }

        default_hook(panic_info);
    }));
}
