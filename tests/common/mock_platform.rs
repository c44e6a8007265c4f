//! Mock provider services and APIs for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use pr_monitor::collect::{Collected, Scope};
use pr_monitor::error::{Error, Result};
use pr_monitor::platform::{
    Activity, ActivityAuthor, ActivityPayload, GitHubApi, HarnessApi, PrData, PullDetail, Review,
    ScmService, SearchHit, Transform,
};
use pr_monitor::types::{
    Identity, Mergeable, Provider, ProviderType, PullRequest, PullRequestResponse, Repo,
    StateFilter,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Simple mock provider service
///
/// This manually implements `ScmService` rather than using mockall,
/// because mockall has issues with methods returning references.
///
/// Features:
/// - Canned PRs built from numbers
/// - Per-PR and whole-provider error injection
/// - Optional delay before responding
/// - Call counting
pub struct MockScmService {
    provider: Provider,
    pr_numbers: Vec<u64>,
    failing_prs: HashSet<u64>,
    fail_fetch: Option<String>,
    fail_identity: Option<String>,
    identity_login: String,
    repos: Vec<Repo>,
    delay: Option<Duration>,
    fetch_calls: AtomicUsize,
    identity_calls: AtomicUsize,
}

impl MockScmService {
    /// Mock for a provider named `name` of `provider_type`
    pub fn new(provider_type: ProviderType, name: &str) -> Self {
        let mut provider = Provider::new(provider_type, name, "https://example.com");
        provider.user = Some(Identity::from_token("token"));
        Self {
            provider,
            pr_numbers: Vec::new(),
            failing_prs: HashSet::new(),
            fail_fetch: None,
            fail_identity: None,
            identity_login: format!("{name}-user"),
            repos: Vec::new(),
            delay: None,
            fetch_calls: AtomicUsize::new(0),
            identity_calls: AtomicUsize::new(0),
        }
    }

    /// Return PRs with these numbers
    #[must_use]
    pub fn with_prs(mut self, numbers: &[u64]) -> Self {
        self.pr_numbers = numbers.to_vec();
        self
    }

    /// Fail the unit for this PR number
    #[must_use]
    pub fn fail_pr(mut self, number: u64) -> Self {
        self.failing_prs.insert(number);
        self
    }

    /// Fail the whole fetch
    #[must_use]
    pub fn fail_fetch(mut self, msg: &str) -> Self {
        self.fail_fetch = Some(msg.to_string());
        self
    }

    /// Fail identity resolution
    #[must_use]
    pub fn fail_identity(mut self, msg: &str) -> Self {
        self.fail_identity = Some(msg.to_string());
        self
    }

    /// Repositories returned by discovery
    #[must_use]
    pub fn with_repos(mut self, repos: Vec<Repo>) -> Self {
        self.repos = repos;
        self
    }

    /// Sleep before answering
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `fetch_pull_requests` calls
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `resolve_identity` calls
    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ScmService for MockScmService {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn resolve_identity(&self) -> Result<Identity> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(msg) = &self.fail_identity {
            return Err(Error::HarnessApi(msg.clone()));
        }
        Ok(Identity {
            name: Some(self.identity_login.clone()),
            ..Identity::from_token("token")
        })
    }

    async fn list_repositories(&self, _scope: &Scope) -> Result<Vec<Repo>> {
        Ok(self.repos.clone())
    }

    async fn fetch_pull_requests(
        &self,
        _scope: &Scope,
        state: StateFilter,
        transform: Transform,
    ) -> Result<Collected<PullRequestResponse>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(msg) = &self.fail_fetch {
            return Err(Error::GitHubApi(msg.clone()));
        }

        let mut collected = Collected::new();
        for &number in &self.pr_numbers {
            if self.failing_prs.contains(&number) {
                collected
                    .errors
                    .push(Error::GitHubApi(format!("PR {number} failed")));
                continue;
            }
            let pr = make_pr(&self.provider, number, state);
            let printable = transform(&pr);
            collected.items.push(PullRequestResponse { pr, printable });
        }
        Ok(collected)
    }
}

/// Build a PR for `provider`
pub fn make_pr(provider: &Provider, number: u64, state: StateFilter) -> PullRequest {
    let state = match state {
        StateFilter::All => "open".to_string(),
        other => other.to_string(),
    };
    let mergeable = if state == "merged" {
        Mergeable::NotApplicable
    } else {
        Mergeable::Yes
    };
    PullRequest {
        number,
        title: format!("{} change {number}", provider.name),
        provider_type: provider.provider_type,
        provider_name: provider.name.clone(),
        url: format!("{}/{}/pulls/{number}", provider.host, provider.name),
        state,
        mergeable,
        approved: BTreeSet::new(),
        commented: BTreeSet::new(),
        requested_changes: BTreeSet::new(),
    }
}

/// Mock GitHub REST API
#[derive(Default)]
pub struct MockGitHubApi {
    pub login: String,
    pub hits: Vec<SearchHit>,
    pub details: HashMap<u64, PullDetail>,
    pub reviews: HashMap<u64, Vec<Review>>,
    pub failing_details: HashSet<u64>,
    pub failing_reviews: HashSet<u64>,
    pub fail_search: bool,
    pub queries: Mutex<Vec<String>>,
}

impl MockGitHubApi {
    /// API for `login` with no PRs
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            ..Self::default()
        }
    }

    /// Add an open PR in `acme/widgets`
    #[must_use]
    pub fn with_pr(mut self, number: u64, detail: PullDetail, reviews: Vec<Review>) -> Self {
        self.hits.push(SearchHit {
            number,
            html_url: format!("https://github.com/acme/widgets/pull/{number}"),
        });
        self.details.insert(number, detail);
        self.reviews.insert(number, reviews);
        self
    }
}

#[async_trait]
impl GitHubApi for MockGitHubApi {
    async fn current_login(&self) -> Result<String> {
        Ok(self.login.clone())
    }

    async fn search_pull_requests(&self, query: &str) -> Result<Vec<SearchHit>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if self.fail_search {
            return Err(Error::GitHubApi("search unavailable".to_string()));
        }
        Ok(self.hits.clone())
    }

    async fn pull_detail(&self, _owner: &str, _repo: &str, number: u64) -> Result<PullDetail> {
        if self.failing_details.contains(&number) {
            return Err(Error::GitHubApi(format!("detail {number} unavailable")));
        }
        self.details
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::GitHubApi(format!("no PR {number}")))
    }

    async fn reviews(&self, _owner: &str, _repo: &str, number: u64) -> Result<Vec<Review>> {
        if self.failing_reviews.contains(&number) {
            return Err(Error::GitHubApi(format!("reviews {number} unavailable")));
        }
        Ok(self.reviews.get(&number).cloned().unwrap_or_default())
    }
}

/// Open PR detail
pub fn open_detail(title: &str) -> PullDetail {
    PullDetail {
        title: title.to_string(),
        state: "open".to_string(),
        merged: false,
        mergeable: Some(true),
    }
}

/// Merged PR detail
pub fn merged_detail(title: &str) -> PullDetail {
    PullDetail {
        title: title.to_string(),
        state: "closed".to_string(),
        merged: true,
        mergeable: Some(true),
    }
}

/// GitHub review
pub fn review(author: &str, state: &str) -> Review {
    Review {
        author: author.to_string(),
        state: state.to_string(),
    }
}

/// Mock Harness REST API
///
/// The account is `acct`; projects map `org -> [project]` and repos map
/// `(org, project) -> [repo]`.
#[derive(Default)]
pub struct MockHarnessApi {
    pub email: String,
    pub principal: i64,
    pub projects: HashMap<String, Vec<String>>,
    pub repos: HashMap<(String, String), Vec<String>>,
    pub prs: HashMap<String, Vec<PrData>>,
    pub activities: HashMap<(String, u64), Vec<Activity>>,
    pub failing_repos: HashSet<String>,
    pub failing_projects: HashSet<String>,
    pub failing_activities: HashSet<u64>,
}

impl MockHarnessApi {
    /// API with one user and no orgs
    pub fn new() -> Self {
        Self {
            email: "dev@example.com".to_string(),
            principal: 7,
            ..Self::default()
        }
    }

    /// Add `org/project/repo`
    #[must_use]
    pub fn with_repo(mut self, org: &str, project: &str, repo: &str) -> Self {
        self.projects
            .entry(org.to_string())
            .or_default()
            .push(project.to_string());
        if let Some(projects) = self.projects.get_mut(org) {
            projects.sort();
            projects.dedup();
        }
        self.repos
            .entry((org.to_string(), project.to_string()))
            .or_default()
            .push(repo.to_string());
        self
    }

    /// Add a PR to `repo`
    #[must_use]
    pub fn with_pr(mut self, repo: &str, data: PrData, activities: Vec<Activity>) -> Self {
        self.activities
            .insert((repo.to_string(), data.number), activities);
        self.prs.entry(repo.to_string()).or_default().push(data);
        self
    }
}

#[async_trait]
impl HarnessApi for MockHarnessApi {
    fn account_identifier(&self) -> &str {
        "acct"
    }

    async fn current_user_email(&self) -> Result<String> {
        Ok(self.email.clone())
    }

    async fn principal_id(&self, _email: &str) -> Result<i64> {
        Ok(self.principal)
    }

    async fn list_orgs(&self) -> Result<Vec<String>> {
        let mut orgs: Vec<String> = self.projects.keys().cloned().collect();
        orgs.sort();
        Ok(orgs)
    }

    async fn list_projects(&self, org: &str) -> Result<Vec<String>> {
        Ok(self.projects.get(org).cloned().unwrap_or_default())
    }

    async fn list_repos(&self, org: &str, project: &str) -> Result<Vec<String>> {
        if self.failing_projects.contains(project) {
            return Err(Error::HarnessApi(format!("project {project} unavailable")));
        }
        Ok(self
            .repos
            .get(&(org.to_string(), project.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_pull_requests(
        &self,
        repo: &Repo,
        _state: StateFilter,
        _principal: i64,
    ) -> Result<Vec<PrData>> {
        if self.failing_repos.contains(&repo.repo_identifier) {
            return Err(Error::HarnessApi(format!(
                "repo {} unavailable",
                repo.repo_identifier
            )));
        }
        Ok(self
            .prs
            .get(&repo.repo_identifier)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_activities(&self, repo: &Repo, number: u64) -> Result<Vec<Activity>> {
        if self.failing_activities.contains(&number) {
            return Err(Error::HarnessApi(format!("activities {number} unavailable")));
        }
        Ok(self
            .activities
            .get(&(repo.repo_identifier.clone(), number))
            .cloned()
            .unwrap_or_default())
    }
}

/// Harness PR listing entry
pub fn pr_data(number: u64, state: &str, merge_check_status: &str) -> PrData {
    PrData {
        number,
        title: format!("Harness change {number}"),
        state: state.to_string(),
        merge_check_status: merge_check_status.to_string(),
    }
}

/// Harness activity
pub fn activity(kind: &str, author: &str, decision: Option<&str>) -> Activity {
    Activity {
        kind: kind.to_string(),
        author: ActivityAuthor {
            display_name: author.to_string(),
        },
        payload: decision.map(|d| ActivityPayload {
            decision: Some(d.to_string()),
        }),
    }
}

/// Harness repository handle under account `acct`
pub fn repo(org: &str, project: &str, repo: &str) -> Repo {
    Repo {
        account_identifier: "acct".to_string(),
        org_identifier: org.to_string(),
        project_identifier: project.to_string(),
        repo_identifier: repo.to_string(),
    }
}
