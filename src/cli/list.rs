//! List command - show PRs or providers

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, spinner_style};
use anstream::{print, println};
use indicatif::ProgressBar;
use pr_monitor::aggregate::collect_pull_requests;
use pr_monitor::error::{Error, Result, format_errors};
use pr_monitor::output::{
    NO_PROVIDERS, OutputFormat, printable_transform, render_providers, render_pull_requests,
};
use pr_monitor::platform::create_services;
use pr_monitor::store::ProviderFilter;
use pr_monitor::types::StateFilter;
use std::time::Duration;

/// Run `list prs`
///
/// Whatever was collected is printed first; any errors follow as one
/// combined report and make the command fail.
pub async fn run_list_prs(
    ctx: &CommandContext,
    filter: &ProviderFilter,
    state: StateFilter,
    format: OutputFormat,
) -> Result<()> {
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
        "Fetching {} PRs from {} providers...",
        state.emphasis(),
        services.items.len().accent()
    ));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let collected =
        collect_pull_requests(&ctx.scope, services.items, state, printable_transform()).await;
    spinner.finish_and_clear();
    errors.extend(collected.errors);

    print!("{}", render_pull_requests(&collected.items, format)?);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Aggregate(format_errors(&errors)))
    }
}

/// Run `list providers`
pub fn run_list_providers(ctx: &CommandContext, filter: &ProviderFilter) -> Result<()> {
    let providers = ctx.providers(filter)?;
    print!("{}", render_providers(&providers));
    Ok(())
}
