//! Add command - register a new provider

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, spinner_style};
use anstream::println;
use dialoguer::Password;
use indicatif::ProgressBar;
use pr_monitor::aggregate::refresh_providers;
use pr_monitor::error::{Error, Result};
use pr_monitor::platform::{create_service, normalize_host};
use pr_monitor::store::{ProviderFilter, ProviderStore};
use pr_monitor::types::{Identity, Provider, ProviderType};
use std::time::Duration;
use tracing::debug;

/// Run `add provider`
///
/// The identity (and, for Harness, the repository list) is resolved before
/// anything is stored, so a bad token never lands in the directory.
pub async fn run_add_provider(
    ctx: &CommandContext,
    name: &str,
    provider_type: ProviderType,
    host: &str,
    pat: Option<String>,
) -> Result<()> {
    if !ctx.providers(&ProviderFilter::named(name))?.is_empty() {
        return Err(Error::ProviderExists(name.to_string()));
    }

    let host = normalize_host(host)?;
    let pat = match pat {
        Some(pat) => pat,
        None => prompt_for_token()?,
    };
    if pat.trim().is_empty() {
        return Err(Error::InvalidToken("token is empty".to_string()));
    }

    let mut provider = Provider::new(provider_type, name, host);
    provider.user = Some(Identity::from_token(pat.trim()));
    debug!(name, %provider_type, host = %provider.host, "adding provider");

    let service = create_service(&provider)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!("Verifying {}...", name.emphasis()));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let mut refreshed = refresh_providers(&ctx.scope, vec![service]).await;
    spinner.finish_and_clear();

    if let Some(err) = refreshed.errors.pop() {
        return Err(err);
    }
    let resolved = refreshed
        .items
        .pop()
        .ok_or_else(|| Error::Task(format!("no result for provider {name}")))?;

    let stored = ctx.store.create(resolved)?;
    println!(
        "{} Added {} provider {}",
        check(),
        stored.provider_type,
        stored.name.emphasis()
    );
    if stored.provider_type == ProviderType::Harness {
        println!(
            "  {}",
            format!("{} repositories cached", stored.repos.len()).muted()
        );
    }
    Ok(())
}

fn prompt_for_token() -> Result<String> {
    Password::new()
        .with_prompt("Enter the PAT (Personal Access Token)")
        .interact()
        .map_err(|e| Error::Prompt(format!("failed to read token: {e}")))
}
