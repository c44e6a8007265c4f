//! Provider-level fan-out
//!
//! Collects pull requests or refreshed provider records from every
//! configured provider at once, attributing each error to its provider.

use crate::collect::{Collected, Scope, fan_out};
use crate::error::Error;
use crate::platform::{ScmService, Transform};
use crate::types::{Provider, PullRequestResponse, StateFilter, sort_responses};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Deadline for one whole invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Collect PRs in `state` from every service
///
/// Providers, repositories and PRs are all fetched concurrently. One
/// provider failing never hides another's results. Responses come back in
/// display order. Each failing provider contributes exactly one error naming
/// it, however many of its repositories or PRs failed.
pub async fn collect_pull_requests(
    scope: &Scope,
    services: Vec<Arc<dyn ScmService>>,
    state: StateFilter,
    transform: Transform,
) -> Collected<PullRequestResponse> {
    debug!(providers = services.len(), %state, "collecting pull requests");

    let nested = fan_out(scope, services, move |scope, service| {
        let transform = Arc::clone(&transform);
        async move {
            let name = service.provider().name.clone();
            let collected = scope
                .run(service.fetch_pull_requests(&scope, state, transform))
                .await
                .map_err(|e| e.for_provider(&name))?;
            Ok::<_, Error>(collected.fold_errors().map_errors(|e| e.for_provider(&name)))
        }
    })
    .await;

    let mut collected = nested.flatten();
    sort_responses(&mut collected.items);

    for err in &collected.errors {
        warn!(error = %err, "pull request collection error");
    }
    debug!(
        prs = collected.items.len(),
        errors = collected.errors.len(),
        "pull request collection complete"
    );
    collected
}

/// Re-resolve identity and repositories for every service
///
/// Returns the updated provider records for every provider that refreshed
/// cleanly; a provider whose identity or repository discovery fails
/// contributes one error and no record.
pub async fn refresh_providers(
    scope: &Scope,
    services: Vec<Arc<dyn ScmService>>,
) -> Collected<Provider> {
    debug!(providers = services.len(), "refreshing providers");

    let collected = fan_out(scope, services, |scope, service| async move {
        let name = service.provider().name.clone();
        scope
            .run(refresh_one(&scope, &*service))
            .await
            .map_err(|e| e.for_provider(&name))
    })
    .await;

    for err in &collected.errors {
        warn!(error = %err, "provider refresh error");
    }
    collected
}

async fn refresh_one(scope: &Scope, service: &dyn ScmService) -> crate::error::Result<Provider> {
    let identity = service.resolve_identity().await?;
    let repos = service.list_repositories(scope).await?;

    let mut provider = service.provider().clone();
    debug!(provider = %provider.name, repos = repos.len(), "refreshed provider");
    provider.user = Some(identity);
    provider.repos = repos;
    Ok(provider)
}
