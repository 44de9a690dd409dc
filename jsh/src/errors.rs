use jsh_types::{Context, JshError};
use tracing::{debug, error};

/// Prints a user-input error to the shell's output and reports whether the
/// command loop may continue.
///
/// Anything that is not a non-fatal [`JshError`] means job-control state can no
/// longer be trusted; it is left for the caller to terminate on.
pub fn report_user_error(ctx: &Context, err: &anyhow::Error) -> bool {
    match err.downcast_ref::<JshError>() {
        Some(user) if !user.is_fatal() => {
            debug!("user error: {}", user);
            if let Err(write_err) = ctx.write_stdout(&user.to_string()) {
                error!("failed to report user error: {}", write_err);
            }
            true
        }
        _ => {
            error!("fatal: {:?}", err);
            false
        }
    }
}
