//! GitHub provider service
//!
//! PRs are found with one author-scoped search, then each hit is enriched
//! with its detail and reviews concurrently.

use crate::collect::{Collected, Scope, fan_out};
use crate::error::{Error, Result};
use crate::platform::{ScmService, Transform, respond};
use crate::types::{
    Identity, Mergeable, Provider, PullRequest, PullRequestResponse, ReviewDecision, ReviewerSets,
    StateFilter,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use std::sync::Arc;
use tracing::debug;

/// Search page size; results beyond the first page are not fetched
const SEARCH_PAGE_SIZE: u8 = 100;

/// One PR returned by the author search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// PR number
    pub number: u64,
    /// Web URL, `https://<host>/<owner>/<repo>/pull/<number>`
    pub html_url: String,
}

/// Canonical PR detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullDetail {
    /// Title
    pub title: String,
    /// `open` or `closed`
    pub state: String,
    /// Whether the PR was merged
    pub merged: bool,
    /// Mergeability, `None` while GitHub is still computing it
    pub mergeable: Option<bool>,
}

/// One review on a PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    /// Reviewer login
    pub author: String,
    /// GitHub review state, e.g. `APPROVED`
    pub state: String,
}

impl Review {
    fn decision(&self) -> Option<ReviewDecision> {
        match self.state.as_str() {
            "APPROVED" => Some(ReviewDecision::Approved),
            "COMMENTED" => Some(ReviewDecision::Commented),
            "CHANGES_REQUESTED" => Some(ReviewDecision::ChangesRequested),
            _ => None,
        }
    }
}

/// GitHub REST calls the service depends on
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Login of the token's owner
    async fn current_login(&self) -> Result<String>;

    /// Run an issue search, first page only
    async fn search_pull_requests(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Fetch one PR
    async fn pull_detail(&self, owner: &str, repo: &str, number: u64) -> Result<PullDetail>;

    /// Fetch reviews on one PR
    async fn reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>>;
}

/// [`GitHubApi`] backed by octocrab
pub struct OctocrabApi {
    client: Octocrab,
}

impl OctocrabApi {
    /// Create a client for `host`
    ///
    /// `github.com` uses the public API; any other host is treated as
    /// GitHub Enterprise at `<host>/api/v3`.
    pub fn new(token: &str, host: &str) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if !is_public_github(host) {
            let base_url = format!("{}/api/v3", host.trim_end_matches('/'));
            builder = builder
                .base_uri(base_url.as_str())
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
        }

        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        Ok(Self { client })
    }
}

fn is_public_github(host: &str) -> bool {
    if host.is_empty() {
        return true;
    }
    url::Url::parse(host)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .is_some_and(|h| h == "github.com" || h == "www.github.com" || h == "api.github.com")
}

#[async_trait]
impl GitHubApi for OctocrabApi {
    async fn current_login(&self) -> Result<String> {
        let user = self
            .client
            .current()
            .user()
            .await
            .map_err(|e| Error::from(e).context("error fetching authenticated user"))?;
        Ok(user.login)
    }

    async fn search_pull_requests(&self, query: &str) -> Result<Vec<SearchHit>> {
        debug!(query, "searching PRs");
        let page = self
            .client
            .search()
            .issues_and_pull_requests(query)
            .per_page(SEARCH_PAGE_SIZE)
            .send()
            .await?;

        let hits: Vec<SearchHit> = page
            .items
            .into_iter()
            .filter(|issue| issue.pull_request.is_some())
            .map(|issue| SearchHit {
                number: issue.number,
                html_url: issue.html_url.to_string(),
            })
            .collect();
        debug!(count = hits.len(), "search complete");
        Ok(hits)
    }

    async fn pull_detail(&self, owner: &str, repo: &str, number: u64) -> Result<PullDetail> {
        let pr = self.client.pulls(owner, repo).get(number).await?;

        let state = match pr.state {
            Some(octocrab::models::IssueState::Open) => "open",
            // IssueState is non-exhaustive
            Some(_) | None => "closed",
        };

        Ok(PullDetail {
            title: pr.title.unwrap_or_default(),
            state: state.to_string(),
            merged: pr.merged.unwrap_or(false) || pr.merged_at.is_some(),
            mergeable: pr.mergeable,
        })
    }

    async fn reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>> {
        use octocrab::models::pulls::ReviewState;

        let reviews = self
            .client
            .pulls(owner, repo)
            .list_reviews(number)
            .send()
            .await?;

        Ok(reviews
            .items
            .into_iter()
            .filter_map(|r| {
                let author = r.user?.login;
                let state = match r.state? {
                    ReviewState::Approved => "APPROVED",
                    ReviewState::Commented => "COMMENTED",
                    ReviewState::ChangesRequested => "CHANGES_REQUESTED",
                    // ReviewState is non-exhaustive
                    _ => "OTHER",
                };
                Some(Review {
                    author,
                    state: state.to_string(),
                })
            })
            .collect())
    }
}

/// Search query for PRs authored by `login` in `state`
pub fn search_query(state: StateFilter, login: &str) -> String {
    let qualifier = match state {
        StateFilter::Open => "state:open",
        StateFilter::Closed => "state:closed is:unmerged",
        StateFilter::Merged => "state:closed is:merged",
        StateFilter::All => "",
    };
    format!("{qualifier} author:{login} type:pr")
        .trim()
        .to_string()
}

/// Extract `(owner, repo)` from a PR web URL
fn parse_owner_repo(html_url: &str) -> Result<(String, String)> {
    let parsed = url::Url::parse(html_url)
        .map_err(|e| Error::GitHubApi(format!("error parsing github URL {html_url}: {e}")))?;

    let mut segments = parsed
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) => Ok((owner.to_string(), repo.to_string())),
        _ => Err(Error::GitHubApi(format!("invalid GitHub URL {html_url}"))),
    }
}

/// Assemble a PR record from its search hit, detail and reviews
///
/// A merged PR is shown as `merged` with mergeable `-`, whatever GitHub
/// reports for mergeability.
pub(crate) fn build_pull_request(
    provider_name: &str,
    hit: &SearchHit,
    detail: PullDetail,
    reviews: &[Review],
) -> PullRequest {
    let sets = ReviewerSets::fold(
        reviews
            .iter()
            .filter_map(|r| r.decision().map(|d| (r.author.clone(), d))),
    );

    let (state, mergeable) = if detail.merged {
        ("merged".to_string(), Mergeable::NotApplicable)
    } else {
        (detail.state, Mergeable::from(detail.mergeable.unwrap_or(false)))
    };

    PullRequest {
        number: hit.number,
        title: detail.title,
        provider_type: crate::types::ProviderType::GitHub,
        provider_name: provider_name.to_string(),
        url: hit.html_url.clone(),
        state,
        mergeable,
        approved: sets.approved,
        commented: sets.commented,
        requested_changes: sets.requested_changes,
    }
}

/// GitHub service
pub struct GitHubService {
    provider: Provider,
    api: Arc<dyn GitHubApi>,
}

impl GitHubService {
    /// Create a service for `provider` over `api`
    pub fn new(provider: Provider, api: Arc<dyn GitHubApi>) -> Self {
        Self { provider, api }
    }

    fn login(&self) -> Result<String> {
        self.provider
            .identity()?
            .name
            .clone()
            .ok_or_else(|| Error::MissingIdentity(self.provider.name.clone()))
    }
}

async fn fetch_one(
    api: Arc<dyn GitHubApi>,
    provider_name: String,
    hit: SearchHit,
    transform: Transform,
) -> Result<PullRequestResponse> {
    let (owner, repo) = parse_owner_repo(&hit.html_url)?;
    debug!(owner, repo, number = hit.number, "fetching PR details");

    let detail = api.pull_detail(&owner, &repo, hit.number);
    let reviews = api.reviews(&owner, &repo, hit.number);
    let (detail, reviews) = tokio::try_join!(
        async {
            detail
                .await
                .map_err(|e| e.context(format!("error fetching PR details for {}", hit.html_url)))
        },
        async {
            reviews
                .await
                .map_err(|e| e.context(format!("error fetching PR reviews for {}", hit.html_url)))
        },
    )?;

    let pr = build_pull_request(&provider_name, &hit, detail, &reviews);
    Ok(respond(pr, &transform))
}

#[async_trait]
impl ScmService for GitHubService {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn resolve_identity(&self) -> Result<Identity> {
        let pat = self.provider.identity()?.pat.clone();
        let login = self.api.current_login().await?;
        debug!(provider = %self.provider.name, login, "resolved GitHub identity");
        Ok(Identity {
            name: Some(login),
            ..Identity::from_token(pat)
        })
    }

    async fn fetch_pull_requests(
        &self,
        scope: &Scope,
        state: StateFilter,
        transform: Transform,
    ) -> Result<Collected<PullRequestResponse>> {
        let login = self.login()?;
        let query = search_query(state, &login);

        let hits = self
            .api
            .search_pull_requests(&query)
            .await
            .map_err(|e| e.context(format!("error fetching github PRs for user {login}")))?;
        debug!(provider = %self.provider.name, count = hits.len(), "fanning out over PRs");

        let api = Arc::clone(&self.api);
        let provider_name = self.provider.name.clone();
        let collected = fan_out(scope, hits, move |_, hit| {
            fetch_one(
                Arc::clone(&api),
                provider_name.clone(),
                hit,
                Arc::clone(&transform),
            )
        })
        .await;

        Ok(collected)
    }
}
