//! Harness Code provider service
//!
//! Harness has no cross-repository search, so PRs are listed per cached
//! repository and each PR's activities are fetched separately. Repository
//! discovery walks orgs, then projects, then repos.

use crate::collect::{Collected, Scope, fan_out};
use crate::error::{Error, Result};
use crate::platform::{ScmService, Transform, respond};
use crate::types::{
    Identity, Mergeable, Provider, ProviderType, PullRequest, PullRequestResponse, Repo,
    ReviewDecision, ReviewerSets, StateFilter,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size for org and project listings
const LISTING_LIMIT: u32 = 200;

/// Page size for PR listings
const PULL_REQUEST_LIMIT: u32 = 500;

/// One PR as returned by the repository PR listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PrData {
    /// PR number within its repository
    pub number: u64,
    /// Title
    #[serde(default)]
    pub title: String,
    /// `open`, `closed` or `merged`
    #[serde(default)]
    pub state: String,
    /// `mergeable` when the PR can be merged cleanly
    #[serde(default)]
    pub merge_check_status: String,
}

/// One PR activity entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Activity {
    /// `comment`, `code-comment`, `review-submit`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Who acted
    #[serde(default)]
    pub author: ActivityAuthor,
    /// Review payload, present for review submissions
    #[serde(default)]
    pub payload: Option<ActivityPayload>,
}

/// Activity author
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActivityAuthor {
    /// Name shown in the UI
    #[serde(default)]
    pub display_name: String,
}

/// Activity payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActivityPayload {
    /// `approved` or `changereq` on review submissions
    #[serde(default)]
    pub decision: Option<String>,
}

impl Activity {
    fn decision(&self) -> Option<ReviewDecision> {
        match self.kind.as_str() {
            "comment" | "code-comment" => Some(ReviewDecision::Commented),
            "review-submit" => match self.payload.as_ref()?.decision.as_deref()? {
                "approved" => Some(ReviewDecision::Approved),
                "changereq" => Some(ReviewDecision::ChangesRequested),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CurrentUser {
    #[serde(default)]
    data: CurrentUserData,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentUserData {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Default, Deserialize)]
struct Principal {
    id: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Identifier {
    #[serde(default)]
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
struct OrgEntry {
    #[serde(default)]
    org: Identifier,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectEntry {
    #[serde(default)]
    project: Identifier,
}

/// Harness REST calls the service depends on
#[async_trait]
pub trait HarnessApi: Send + Sync {
    /// Account the token belongs to
    fn account_identifier(&self) -> &str;

    /// Email of the token's owner
    async fn current_user_email(&self) -> Result<String>;

    /// Code principal id for `email`
    async fn principal_id(&self, email: &str) -> Result<i64>;

    /// Identifiers of every org in the account
    async fn list_orgs(&self) -> Result<Vec<String>>;

    /// Identifiers of the org's projects with the code module enabled
    async fn list_projects(&self, org: &str) -> Result<Vec<String>>;

    /// Identifiers of the project's repositories
    async fn list_repos(&self, org: &str, project: &str) -> Result<Vec<String>>;

    /// PRs in `repo` created by `principal`
    async fn list_pull_requests(
        &self,
        repo: &Repo,
        state: StateFilter,
        principal: i64,
    ) -> Result<Vec<PrData>>;

    /// Comment and review activities on one PR
    async fn list_activities(&self, repo: &Repo, number: u64) -> Result<Vec<Activity>>;
}

/// Account identifier embedded in a Harness PAT
///
/// Tokens look like `pat.<account>.<id>.<secret>`.
pub fn account_identifier(pat: &str) -> Result<String> {
    match pat.split('.').nth(1) {
        Some(account) if !account.is_empty() => Ok(account.to_string()),
        _ => Err(Error::InvalidToken(
            "Harness PAT has no account identifier segment".to_string(),
        )),
    }
}

/// Web URL of a PR
pub fn pull_request_url(host: &str, repo: &Repo, number: u64) -> String {
    format!(
        "{host}/ng/account/{}/module/code/orgs/{}/projects/{}/repos/{}/pulls/{number}",
        repo.account_identifier, repo.org_identifier, repo.project_identifier, repo.repo_identifier
    )
}

/// [`HarnessApi`] over reqwest
pub struct HarnessHttpApi {
    client: Client,
    host: String,
    pat: String,
    account: String,
}

impl HarnessHttpApi {
    /// Create a client for `host` authenticating with `pat`
    pub fn new(pat: &str, host: &str) -> Result<Self> {
        let account = account_identifier(pat)?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::HarnessApi(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            pat: pat.to_string(),
            account,
        })
    }

    fn scope_query(&self, repo: &Repo) -> String {
        format!(
            "accountIdentifier={}&orgIdentifier={}&projectIdentifier={}",
            urlencoding::encode(&repo.account_identifier),
            urlencoding::encode(&repo.org_identifier),
            urlencoding::encode(&repo.project_identifier),
        )
    }

    /// GET `path` and decode the JSON body
    ///
    /// 404 and empty bodies decode as `T::default()`.
    async fn get<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.host);
        debug!(path, "harness request");

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.pat)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(path, "not found, treating as empty");
            return Ok(T::default());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HarnessApi(format!(
                "GET {path} returned {status}: {body}"
            )));
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&body)
            .map_err(|e| Error::HarnessApi(format!("error parsing response from {path}: {e}")))
    }
}

#[async_trait]
impl HarnessApi for HarnessHttpApi {
    fn account_identifier(&self) -> &str {
        &self.account
    }

    async fn current_user_email(&self) -> Result<String> {
        let user: CurrentUser = self
            .get(&format!(
                "/ng/api/user/currentUser?accountIdentifier={}",
                urlencoding::encode(&self.account)
            ))
            .await?;
        Ok(user.data.email)
    }

    async fn principal_id(&self, email: &str) -> Result<i64> {
        let principals: Vec<Principal> = self
            .get(&format!(
                "/gateway/code/api/v1/principals?query={}&type=user&accountIdentifier={}",
                urlencoding::encode(email),
                urlencoding::encode(&self.account)
            ))
            .await?;

        principals
            .first()
            .map(|p| p.id)
            .ok_or_else(|| Error::HarnessApi(format!("no principal found for {email}")))
    }

    async fn list_orgs(&self) -> Result<Vec<String>> {
        let orgs: Vec<OrgEntry> = self
            .get(&format!(
                "/v1/orgs?page=0&limit={LISTING_LIMIT}&sort=name&order=ASC"
            ))
            .await?;
        Ok(orgs.into_iter().map(|o| o.org.identifier).collect())
    }

    async fn list_projects(&self, org: &str) -> Result<Vec<String>> {
        let projects: Vec<ProjectEntry> = self
            .get(&format!(
                "/v1/orgs/{}/projects?has_module=true&module_type=CODE&page=0&limit={LISTING_LIMIT}&sort=name&order=ASC",
                urlencoding::encode(org)
            ))
            .await?;
        Ok(projects.into_iter().map(|p| p.project.identifier).collect())
    }

    async fn list_repos(&self, org: &str, project: &str) -> Result<Vec<String>> {
        let repos: Vec<Identifier> = self
            .get(&format!(
                "/code/api/v1/repos?accountIdentifier={}&orgIdentifier={}&projectIdentifier={}&page=1&limit={LISTING_LIMIT}",
                urlencoding::encode(&self.account),
                urlencoding::encode(org),
                urlencoding::encode(project)
            ))
            .await?;
        Ok(repos.into_iter().map(|r| r.identifier).collect())
    }

    async fn list_pull_requests(
        &self,
        repo: &Repo,
        state: StateFilter,
        principal: i64,
    ) -> Result<Vec<PrData>> {
        let state_param = match state {
            StateFilter::All => String::new(),
            other => format!("&state={other}"),
        };
        self.get(&format!(
            "/code/api/v1/repos/{}/pullreq?{}{state_param}&page=0&limit={PULL_REQUEST_LIMIT}&created_by={principal}&order=asc",
            urlencoding::encode(&repo.repo_identifier),
            self.scope_query(repo),
        ))
        .await
    }

    async fn list_activities(&self, repo: &Repo, number: u64) -> Result<Vec<Activity>> {
        self.get(&format!(
            "/code/api/v1/repos/{}/pullreq/{number}/activities?{}&type=code-comment&type=comment&type=review-submit",
            urlencoding::encode(&repo.repo_identifier),
            self.scope_query(repo),
        ))
        .await
    }
}

/// Assemble a PR record from its listing entry and activities
pub(crate) fn build_pull_request(
    provider_name: &str,
    host: &str,
    repo: &Repo,
    data: PrData,
    activities: &[Activity],
) -> PullRequest {
    let sets = ReviewerSets::fold(
        activities
            .iter()
            .filter_map(|a| a.decision().map(|d| (a.author.display_name.clone(), d))),
    );

    let mergeable = if data.state == "merged" {
        Mergeable::NotApplicable
    } else {
        Mergeable::from(data.merge_check_status == "mergeable")
    };

    PullRequest {
        url: pull_request_url(host, repo, data.number),
        number: data.number,
        title: data.title,
        provider_type: ProviderType::Harness,
        provider_name: provider_name.to_string(),
        state: data.state,
        mergeable,
        approved: sets.approved,
        commented: sets.commented,
        requested_changes: sets.requested_changes,
    }
}

/// Harness service
pub struct HarnessService {
    provider: Provider,
    api: Arc<dyn HarnessApi>,
}

impl HarnessService {
    /// Create a service for `provider` over `api`
    pub fn new(provider: Provider, api: Arc<dyn HarnessApi>) -> Self {
        Self { provider, api }
    }
}

/// Shared inputs for every unit of one PR collection
#[derive(Clone)]
struct FetchContext {
    api: Arc<dyn HarnessApi>,
    provider_name: String,
    host: String,
    state: StateFilter,
    principal: i64,
    transform: Transform,
}

async fn fetch_repo(
    scope: Scope,
    ctx: FetchContext,
    repo: Repo,
) -> Result<Collected<PullRequestResponse>> {
    let prs = ctx
        .api
        .list_pull_requests(&repo, ctx.state, ctx.principal)
        .await
        .map_err(|e| e.context(format!("error listing PRs for repo {}", repo.repo_identifier)))?;
    debug!(repo = %repo.repo_identifier, count = prs.len(), "listed harness PRs");

    let repo = Arc::new(repo);
    let collected = fan_out(&scope, prs, move |_, data| {
        fetch_one(ctx.clone(), Arc::clone(&repo), data)
    })
    .await;
    Ok(collected.fold_errors())
}

async fn fetch_one(
    ctx: FetchContext,
    repo: Arc<Repo>,
    data: PrData,
) -> Result<PullRequestResponse> {
    let activities = ctx
        .api
        .list_activities(&repo, data.number)
        .await
        .map_err(|e| {
            e.context(format!(
                "error fetching activities for {} PR {}",
                repo.repo_identifier, data.number
            ))
        })?;

    let pr = build_pull_request(&ctx.provider_name, &ctx.host, &repo, data, &activities);
    Ok(respond(pr, &ctx.transform))
}

async fn discover_project(api: Arc<dyn HarnessApi>, org: String, project: String) -> Result<Vec<Repo>> {
    let account = api.account_identifier().to_string();
    let repos = api.list_repos(&org, &project).await?;
    Ok(repos
        .into_iter()
        .map(|repo_identifier| Repo {
            account_identifier: account.clone(),
            org_identifier: org.clone(),
            project_identifier: project.clone(),
            repo_identifier,
        })
        .collect())
}

async fn discover_org(scope: Scope, api: Arc<dyn HarnessApi>, org: String) -> Result<Vec<Repo>> {
    let projects = api.list_projects(&org).await?;
    debug!(org, count = projects.len(), "listed harness projects");

    let org_for_units = org.clone();
    let collected = fan_out(&scope, projects, move |_, project| {
        discover_project(Arc::clone(&api), org_for_units.clone(), project)
    })
    .await;

    first_error(collected).map(|nested| nested.into_iter().flatten().collect())
}

/// Discovery is all-or-nothing: any failed unit fails the whole walk
fn first_error<T>(collected: Collected<T>) -> Result<Vec<T>> {
    match collected.errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(collected.items),
    }
}

#[async_trait]
impl ScmService for HarnessService {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn resolve_identity(&self) -> Result<Identity> {
        let pat = self.provider.identity()?.pat.clone();

        let email = self.api.current_user_email().await?;
        if email.is_empty() {
            return Err(Error::HarnessApi(
                "current user has no email address".to_string(),
            ));
        }
        let principal_id = self.api.principal_id(&email).await?;
        debug!(provider = %self.provider.name, email, principal_id, "resolved Harness identity");

        Ok(Identity {
            principal_id: Some(principal_id),
            email: Some(email),
            ..Identity::from_token(pat)
        })
    }

    async fn list_repositories(&self, scope: &Scope) -> Result<Vec<Repo>> {
        let orgs = self.api.list_orgs().await?;
        debug!(provider = %self.provider.name, count = orgs.len(), "listed harness orgs");

        let api = Arc::clone(&self.api);
        let collected = fan_out(scope, orgs, move |scope, org| {
            discover_org(scope, Arc::clone(&api), org)
        })
        .await;

        let mut repos: Vec<Repo> = first_error(collected)?.into_iter().flatten().collect();
        repos.sort_by(|a, b| {
            (&a.org_identifier, &a.project_identifier, &a.repo_identifier).cmp(&(
                &b.org_identifier,
                &b.project_identifier,
                &b.repo_identifier,
            ))
        });
        Ok(repos)
    }

    async fn fetch_pull_requests(
        &self,
        scope: &Scope,
        state: StateFilter,
        transform: Transform,
    ) -> Result<Collected<PullRequestResponse>> {
        let principal = self
            .provider
            .identity()?
            .principal_id
            .ok_or_else(|| Error::MissingIdentity(self.provider.name.clone()))?;

        let ctx = FetchContext {
            api: Arc::clone(&self.api),
            provider_name: self.provider.name.clone(),
            host: self.provider.host.trim_end_matches('/').to_string(),
            state,
            principal,
            transform,
        };
        debug!(
            provider = %self.provider.name,
            repos = self.provider.repos.len(),
            "fanning out over repositories"
        );

        let collected = fan_out(scope, self.provider.repos.clone(), move |scope, repo| {
            fetch_repo(scope, ctx.clone(), repo)
        })
        .await;

        Ok(collected.flatten())
    }
}
