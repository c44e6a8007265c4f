//! Purge command - remove every provider

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use dialoguer::Confirm;
use pr_monitor::error::{Error, Result};
use pr_monitor::store::ProviderStore;

/// Run `purge`, asking first unless `force` is set
pub fn run_purge(ctx: &CommandContext, force: bool) -> Result<()> {
    if !force
        && !Confirm::new()
            .with_prompt("Remove all configured providers?")
            .default(false)
            .interact()
            .map_err(|e| Error::Prompt(format!("failed to read confirmation: {e}")))?
    {
        println!("{}", "Aborted".muted());
        return Ok(());
    }

    ctx.store.purge()?;
    println!("{} Removed all providers", check());
    Ok(())
}
