use anyhow::{Context as _, Result};
use jsh_types::JshError;
use nix::errno::Errno;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, killpg, sigaction};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::wait::{ANY_CHILD, reap_pending};
use crate::shell::event::{EventSender, ShellEvent};

/// Signals whose disposition the shell changes; children get the default back.
/// SIGPIPE is ignored by the Rust runtime before `main` and would otherwise
/// stay ignored across exec.
const SHELL_SIGNALS: [Signal; 7] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
    Signal::SIGCHLD,
    Signal::SIGPIPE,
];

/// Restores default dispositions. Runs in the forked child before exec.
pub(crate) fn reset_child_signals() {
    // Accept job-control-related signals (refer https://www.gnu.org/software/libc/manual/html_node/Launching-Jobs.html)
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in SHELL_SIGNALS {
        unsafe {
            let _ = sigaction(sig, &action);
        }
    }
}

/// Sends `signal` to every process in the group led by `pgid`.
///
/// Returns `Ok(false)` when the group no longer exists.
pub fn send_signal_to_group(pgid: Pid, signal: Signal) -> Result<bool, JshError> {
    debug!("📡 SIGNAL: sending {:?} to process group {}", signal, pgid);
    match killpg(pgid, signal) {
        Ok(_) => Ok(true),
        Err(Errno::ESRCH) => {
            debug!("📡 SIGNAL: process group {} is already gone", pgid);
            Ok(false)
        }
        Err(e) => {
            error!("📡 SIGNAL: failed to send {:?} to {}: {}", signal, pgid, e);
            Err(JshError::system("kill", e))
        }
    }
}

/// Installs the shell's signal streams and spawns one producer task each.
///
/// Must be called from inside a tokio runtime. Producers never touch the job
/// table; they only push [`ShellEvent`]s.
pub fn spawn_signal_producers(tx: EventSender) -> Result<Vec<JoinHandle<()>>> {
    info!("🔧 SIGNAL: installing shell signal producers");
    let mut handles = Vec::with_capacity(4);
    handles.push(spawn_reaper(tx.clone())?);
    handles.push(spawn_relay(
        tx.clone(),
        SignalKind::interrupt(),
        ShellEvent::Interrupt,
    )?);
    handles.push(spawn_relay(
        tx.clone(),
        SignalKind::from_raw(libc::SIGTSTP),
        ShellEvent::Suspend,
    )?);
    handles.push(spawn_relay(tx, SignalKind::quit(), ShellEvent::Quit)?);
    Ok(handles)
}

/// The collecting half of the reaper: drains every pending child status on
/// each `SIGCHLD` and forwards them in the order they were collected.
fn spawn_reaper(tx: EventSender) -> Result<JoinHandle<()>> {
    let mut stream = signal(SignalKind::child()).context("failed to install SIGCHLD handler")?;
    Ok(tokio::spawn(async move {
        while stream.recv().await.is_some() {
            let statuses = match reap_pending(ANY_CHILD) {
                Ok(statuses) => statuses,
                Err(err) => {
                    error!("reaper: {}", err);
                    continue;
                }
            };
            debug!("reaper: collected {} status change(s)", statuses.len());
            for status in statuses {
                if tx.send(ShellEvent::Child(status)).await.is_err() {
                    return;
                }
            }
        }
    }))
}

fn spawn_relay(tx: EventSender, kind: SignalKind, event: ShellEvent) -> Result<JoinHandle<()>> {
    let mut stream = signal(kind).with_context(|| format!("failed to install {event:?} handler"))?;
    Ok(tokio::spawn(async move {
        while stream.recv().await.is_some() {
            debug!("relay: received {:?}", event);
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }))
}
