//! Events produced by the asynchronous signal handlers and consumed by the
//! command loop.

use crate::process::ChildStatus;
use tokio::sync::mpsc;

/// Capacity of the event channel between signal producers and the command loop.
pub const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShellEvent {
    /// A child changed state (collected by the reaper).
    Child(ChildStatus),
    /// The interrupt key was pressed (SIGINT to the shell).
    Interrupt,
    /// The suspend key was pressed (SIGTSTP to the shell).
    Suspend,
    /// SIGQUIT to the shell.
    Quit,
}

pub type EventSender = mpsc::Sender<ShellEvent>;
pub type EventReceiver = mpsc::Receiver<ShellEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CAPACITY)
}
