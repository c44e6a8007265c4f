//! Remove command - forget a provider

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use pr_monitor::error::Result;
use pr_monitor::store::ProviderStore;

/// Run `remove provider`
///
/// Removing a provider that is not stored succeeds.
pub fn run_remove_provider(ctx: &CommandContext, name: &str) -> Result<()> {
    ctx.store.delete(name)?;
    println!("{} Removed provider {}", check(), name.emphasis());
    Ok(())
}
