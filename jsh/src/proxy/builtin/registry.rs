//! Builtin command registry.
//!
//! Provides a centralized registry for all builtin shell commands,
//! making it easy to add new commands without modifying the dispatch function.

use crate::shell::Shell;
use anyhow::Result;
use jsh_types::{Context, ExitStatus};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::{exit, jobs};

/// Type alias for builtin command handler functions.
///
/// Returning [`ExitStatus::Running`] asks the dispatcher to wait on that job
/// in the foreground.
pub type CommandHandler = fn(&mut Shell, &Context, Vec<String>) -> Result<ExitStatus>;

/// Global builtin command registry.
pub static BUILTIN_REGISTRY: Lazy<BuiltinRegistry> = Lazy::new(BuiltinRegistry::new);

/// Registry of builtin shell commands.
pub struct BuiltinRegistry {
    commands: HashMap<&'static str, CommandHandler>,
}

impl BuiltinRegistry {
    /// Create a new registry with all builtin commands registered.
    pub fn new() -> Self {
        let mut commands: HashMap<&'static str, CommandHandler> = HashMap::new();

        commands.insert("quit", exit::execute);

        // Job control
        commands.insert("jobs", jobs::execute_jobs);
        commands.insert("fg", jobs::execute_fg);
        commands.insert("bg", jobs::execute_bg);

        Self { commands }
    }

    /// Get a command handler by name.
    pub fn get(&self, name: &str) -> Option<&CommandHandler> {
        self.commands.get(name)
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}
