//! Filter policy commands.

use anyhow::{Context, Result};
use typex_extract::FilterPolicy;

/// Print the builtin filter policy, ready to be edited and passed back with
/// `--policy`.
pub fn handle_policy_command() -> Result<()> {
    let json = serde_json::to_string_pretty(&FilterPolicy::default())
        .context("Failed to serialize filter policy")?;
    println!("{}", json);
    Ok(())
}
