use crate::context::ExecutionContext;
use crate::output::{heading, warn};
use anyhow::{bail, Result};

pub fn run(ctx: &ExecutionContext, session_id: &str, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "{}",
            warn(&format!("this permanently deletes every event of session {session_id}; pass --yes to confirm"))
        );
    }

    let client = ctx.client()?;
    let removed = client.forget_session(session_id)?;
    println!("{}", heading(&format!("removed {removed} event(s) from session {session_id}")));
    Ok(())
}
