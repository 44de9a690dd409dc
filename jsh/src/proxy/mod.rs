//! Command dispatch: routes a parsed command to its builtin handler or
//! launches it as a job.

pub mod builtin;
mod external;

use crate::parser::ParsedCommand;
use crate::shell::Shell;
use anyhow::Result;
use jsh_types::{Context, ExitStatus};
use tracing::debug;

impl Shell {
    pub fn dispatch(&mut self, ctx: &Context, cmd: ParsedCommand) -> Result<ExitStatus> {
        use builtin::registry::BUILTIN_REGISTRY;

        if let Some(handler) = BUILTIN_REGISTRY.get(cmd.name()) {
            debug!("dispatch builtin {:?}", cmd.argv);
            handler(self, ctx, cmd.argv)
        } else {
            external::launch(self, ctx, &cmd)
        }
    }
}
