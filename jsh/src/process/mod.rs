pub mod fork;
pub mod signal;
pub mod state;
pub mod wait;

pub use fork::{SigmaskGuard, fork_process};
pub use signal::{send_signal_to_group, spawn_signal_producers};
pub use state::ChildStatus;
pub use wait::reap_pending;
