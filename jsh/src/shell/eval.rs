use crate::parser;
use crate::shell::Shell;
use anyhow::Result;
use jsh_types::{Context, ExitStatus};
use tracing::debug;

/// Evaluates one command line: builtins run immediately, anything else is
/// launched as a job. Foreground work is waited on before returning.
pub async fn eval_line(shell: &mut Shell, ctx: &Context, line: &str) -> Result<()> {
    let Some(cmd) = parser::parse_line(line)? else {
        return Ok(());
    };
    debug!("eval: {:?}", cmd);

    match shell.dispatch(ctx, cmd)? {
        ExitStatus::Running(pid) => shell.wait_foreground(ctx, pid).await,
        ExitStatus::ExitedWith(_) => Ok(()),
    }
}
