//! Core types for pr-monitor

use crate::error::Error;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Kind of source-control provider
///
/// Declaration order is the display order of the aggregated list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// GitHub or GitHub Enterprise (flat, search-based)
    #[value(name = "github")]
    GitHub,
    /// Harness Code (hierarchical, enumerated per repository)
    Harness,
}

impl ProviderType {
    /// Lowercase tag as stored and displayed
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Harness => "harness",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::GitHub),
            "harness" => Ok(Self::Harness),
            other => Err(Error::UnknownProviderType(other.to_string())),
        }
    }
}

/// Acting user for one provider
///
/// GitHub needs only the login; Harness needs the principal id and email
/// resolved through a secondary lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login name (GitHub)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Personal access token
    pub pat: String,
    /// Principal id (Harness)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<i64>,
    /// Account email (Harness)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Identity carrying only a token, before resolution
    pub fn from_token(pat: impl Into<String>) -> Self {
        Self {
            pat: pat.into(),
            ..Self::default()
        }
    }
}

/// Hierarchical address of one Harness repository
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Repo {
    /// Account identifier
    pub account_identifier: String,
    /// Organization identifier
    pub org_identifier: String,
    /// Project identifier
    pub project_identifier: String,
    /// Repository identifier
    pub repo_identifier: String,
}

/// A configured source-control account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider kind
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Unique name
    pub name: String,
    /// Host URL, normalized without a trailing slash
    pub host: String,
    /// Creation time, epoch milliseconds
    #[serde(default)]
    pub created: i64,
    /// Last update time, epoch milliseconds
    #[serde(default)]
    pub updated: i64,
    /// Cached identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    /// Cached repositories (Harness only)
    #[serde(default)]
    pub repos: Vec<Repo>,
}

impl Provider {
    /// New provider with no cached identity or repositories
    pub fn new(provider_type: ProviderType, name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            provider_type,
            name: name.into(),
            host: host.into(),
            created: 0,
            updated: 0,
            user: None,
            repos: Vec::new(),
        }
    }

    /// Cached identity, or an error pointing at `refresh`
    pub fn identity(&self) -> Result<&Identity, Error> {
        self.user
            .as_ref()
            .ok_or_else(|| Error::MissingIdentity(self.name.clone()))
    }
}

/// Logical PR state filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StateFilter {
    /// Open PRs
    #[default]
    Open,
    /// Closed without merging
    Closed,
    /// Merged PRs
    Merged,
    /// No state filter
    All,
}

impl StateFilter {
    /// Lowercase name as accepted on the command line
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "merged" => Ok(Self::Merged),
            "all" => Ok(Self::All),
            other => Err(Error::InvalidState(other.to_string())),
        }
    }
}

/// Whether a PR can be merged
///
/// Mergeability is meaningless once a PR is merged, so that case has its
/// own value rather than `true` or `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mergeable {
    /// No conflicts
    Yes,
    /// Conflicts, or not yet computed by the provider
    No,
    /// PR already merged
    NotApplicable,
}

impl Mergeable {
    /// Display string: `true`, `false`, or `-`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "true",
            Self::No => "false",
            Self::NotApplicable => "-",
        }
    }
}

impl From<bool> for Mergeable {
    fn from(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }
}

impl std::fmt::Display for Mergeable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Mergeable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A pull request annotated with reviewer decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// PR number, unique within its repository
    pub number: u64,
    /// Title
    pub title: String,
    /// Kind of provider it came from
    pub provider_type: ProviderType,
    /// Name of the configured provider it came from
    pub provider_name: String,
    /// Web URL
    pub url: String,
    /// Display state (`open`, `closed`, `merged`)
    pub state: String,
    /// Mergeability
    pub mergeable: Mergeable,
    /// Reviewers who approved
    pub approved: BTreeSet<String>,
    /// Reviewers who commented
    pub commented: BTreeSet<String>,
    /// Reviewers who requested changes
    pub requested_changes: BTreeSet<String>,
}

impl PullRequest {
    fn order_key(&self) -> (ProviderType, &str, Reverse<u64>, &str) {
        (
            self.provider_type,
            &self.provider_name,
            Reverse(self.number),
            &self.url,
        )
    }
}

/// Display order: provider type, provider name, PR number descending
///
/// The URL breaks ties between equal numbers from different repositories
/// of the same provider.
pub fn compare_pull_requests(a: &PullRequest, b: &PullRequest) -> Ordering {
    a.order_key().cmp(&b.order_key())
}

/// Column-wrapped projection of a [`PullRequest`] for table output
///
/// Each field is split into fixed-width line chunks. The sort keys are kept
/// unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrintablePullRequest {
    /// Unwrapped PR number
    pub number_raw: u64,
    /// Unwrapped provider type
    pub provider_type_raw: Option<ProviderType>,
    /// Unwrapped provider name
    pub provider_name_raw: String,
    /// Unwrapped URL
    pub url_raw: String,
    /// Wrapped PR number
    pub number: Vec<String>,
    /// Wrapped title
    pub title: Vec<String>,
    /// Wrapped provider name
    pub provider_name: Vec<String>,
    /// Wrapped state
    pub state: Vec<String>,
    /// Wrapped mergeable flag
    pub mergeable: Vec<String>,
    /// Wrapped approving reviewers
    pub approved: Vec<String>,
    /// Wrapped commenting reviewers
    pub commented: Vec<String>,
    /// Wrapped change-requesting reviewers
    pub requested_changes: Vec<String>,
    /// Wrapped URL
    pub url: Vec<String>,
    /// Number of table lines this row needs
    pub max_rows: usize,
}

impl PrintablePullRequest {
    fn order_key(&self) -> (Option<ProviderType>, &str, Reverse<u64>, &str) {
        (
            self.provider_type_raw,
            &self.provider_name_raw,
            Reverse(self.number_raw),
            &self.url_raw,
        )
    }
}

/// Same order as [`compare_pull_requests`], on the unwrapped sort keys
pub fn compare_printable(a: &PrintablePullRequest, b: &PrintablePullRequest) -> Ordering {
    a.order_key().cmp(&b.order_key())
}

/// One fetched PR with its printable projection
#[derive(Debug, Clone)]
pub struct PullRequestResponse {
    /// Raw record
    pub pr: PullRequest,
    /// Printable projection
    pub printable: PrintablePullRequest,
}

/// Sort responses into display order
pub fn sort_responses(responses: &mut [PullRequestResponse]) {
    responses.sort_by(|a, b| compare_pull_requests(&a.pr, &b.pr));
}

/// Deduplicated reviewer names per review decision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewerSets {
    /// Reviewers with an approval
    pub approved: BTreeSet<String>,
    /// Reviewers with a plain or inline comment
    pub commented: BTreeSet<String>,
    /// Reviewers who requested changes
    pub requested_changes: BTreeSet<String>,
}

/// Review decision category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Approved
    Approved,
    /// Commented
    Commented,
    /// Requested changes
    ChangesRequested,
}

impl ReviewerSets {
    /// Fold review activity into per-category author sets
    ///
    /// Membership is presence-based: repeated activity from the same author
    /// in one category adds the name once.
    pub fn fold<I, S>(activity: I) -> Self
    where
        I: IntoIterator<Item = (S, ReviewDecision)>,
        S: Into<String>,
    {
        let mut sets = Self::default();
        for (author, decision) in activity {
            let author = author.into();
            match decision {
                ReviewDecision::Approved => sets.approved.insert(author),
                ReviewDecision::Commented => sets.commented.insert(author),
                ReviewDecision::ChangesRequested => sets.requested_changes.insert(author),
            };
        }
        sets
    }
}
