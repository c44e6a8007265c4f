//! Refresh command - re-resolve cached identity and repositories

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, spinner_style};
use anstream::println;
use indicatif::ProgressBar;
use pr_monitor::aggregate::refresh_providers;
use pr_monitor::error::{Error, Result, format_errors};
use pr_monitor::platform::create_services;
use pr_monitor::output::NO_PROVIDERS;
use pr_monitor::store::{ProviderFilter, ProviderStore};
use std::time::Duration;

/// Run `refresh providers`
///
/// Providers that refresh cleanly are saved even when others fail; the
/// failures are reported afterwards.
pub async fn run_refresh_providers(ctx: &CommandContext, filter: &ProviderFilter) -> Result<()> {
    let providers = ctx.providers(filter)?;
    if providers.is_empty() {
        println!("{NO_PROVIDERS}");
        return Ok(());
    }

    let services = create_services(&providers);
    let mut errors = services.errors;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!(
        "Refreshing {} providers...",
        services.items.len().accent()
    ));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let refreshed = refresh_providers(&ctx.scope, services.items).await;
    spinner.finish_and_clear();
    errors.extend(refreshed.errors);

    if !refreshed.items.is_empty() {
        ctx.store.update_bulk(&refreshed.items)?;
    }
    for provider in &refreshed.items {
        println!("{} Refreshed {}", check(), provider.name.emphasis());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Aggregate(format_errors(&errors)))
    }
}
