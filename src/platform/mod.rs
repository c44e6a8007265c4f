//! Provider services for GitHub and Harness
//!
//! Provides a unified interface for identity resolution, repository
//! discovery and pull request collection across provider kinds.

mod factory;
mod github;
mod harness;

pub use factory::{create_service, create_services, normalize_host};
pub use github::{
    GitHubApi, GitHubService, OctocrabApi, PullDetail, Review, SearchHit, search_query,
};
pub use harness::{
    Activity, ActivityAuthor, ActivityPayload, HarnessApi, HarnessHttpApi, HarnessService, PrData,
    account_identifier, pull_request_url,
};

use crate::collect::{Collected, Scope};
use crate::error::Result;
use crate::types::{
    Identity, PrintablePullRequest, Provider, PullRequest, PullRequestResponse, Repo, StateFilter,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Caller-supplied projection from a raw PR to its printable form
///
/// Services apply it to every PR they build and never construct
/// presentation output themselves.
pub type Transform = Arc<dyn Fn(&PullRequest) -> PrintablePullRequest + Send + Sync>;

/// Provider service trait
///
/// One implementation per provider kind, selected by the stored provider's
/// type tag in [`create_service`].
#[async_trait]
pub trait ScmService: Send + Sync {
    /// The stored provider this service acts for
    fn provider(&self) -> &Provider;

    /// Resolve the acting user's identity from the stored token
    async fn resolve_identity(&self) -> Result<Identity>;

    /// Discover repositories the user can see
    ///
    /// Only providers that cannot search across repositories need this; the
    /// default returns no repositories.
    async fn list_repositories(&self, _scope: &Scope) -> Result<Vec<Repo>> {
        Ok(Vec::new())
    }

    /// Collect the user's pull requests in `state`, annotated with reviewer decisions
    ///
    /// An `Err` means nothing could be listed at all. Failures of individual
    /// repositories or PRs are returned inside the [`Collected`] alongside
    /// everything that succeeded.
    async fn fetch_pull_requests(
        &self,
        scope: &Scope,
        state: StateFilter,
        transform: Transform,
    ) -> Result<Collected<PullRequestResponse>>;
}

/// Build the response unit for one PR
pub(crate) fn respond(pr: PullRequest, transform: &Transform) -> PullRequestResponse {
    let printable = transform(&pr);
    PullRequestResponse { pr, printable }
}
