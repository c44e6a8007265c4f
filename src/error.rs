//! Error types for pr-monitor

use thiserror::Error;

/// Errors that can occur while managing providers or collecting pull requests
#[derive(Error, Debug)]
pub enum Error {
    /// Provider type tag not recognized
    #[error("unknown provider type: {0}")]
    UnknownProviderType(String),

    /// PR state filter not one of open, closed, merged, all
    #[error("invalid state '{0}': expected one of open, closed, merged, all")]
    InvalidState(String),

    /// No provider stored under this name
    #[error("SCM provider {0} does not exist")]
    ProviderNotFound(String),

    /// A provider with this name is already stored
    #[error("SCM provider {0} already exists")]
    ProviderExists(String),

    /// Personal access token is malformed for its provider
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Host URL could not be parsed
    #[error("invalid host '{host}': {reason}")]
    InvalidHost {
        /// Host as given by the user
        host: String,
        /// Why parsing failed
        reason: String,
    },

    /// Stored provider is missing its cached identity
    #[error("SCM provider {0} has no identity, run 'prm refresh providers'")]
    MissingIdentity(String),

    /// GitHub API error
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Harness API error
    #[error("Harness API error: {0}")]
    HarnessApi(String),

    /// Provider directory read/write/decode error
    #[error("provider store error: {0}")]
    Store(String),

    /// Output serialization error
    #[error("output error: {0}")]
    Output(String),

    /// The invocation deadline passed before this unit of work finished
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The unit of work was cancelled by its parent scope
    #[error("operation cancelled")]
    Cancelled,

    /// A concurrent worker panicked or was aborted
    #[error("worker task failed: {0}")]
    Task(String),

    /// Error attributed to one configured provider
    #[error("provider {provider}: {source}")]
    Provider {
        /// Name of the provider the error came from
        provider: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Failure of one step, described by what was being attempted
    #[error("{context}: {source}")]
    Context {
        /// Step that failed
        context: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Combined report of every error collected during a fan-out
    #[error("errors encountered:\n{0}")]
    Aggregate(String),

    /// Interactive prompt failed
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Octocrab error
    #[error("GitHub error: {0}")]
    Octocrab(#[from] octocrab::Error),
}

impl Error {
    /// Attribute this error to a named provider
    ///
    /// Errors already attributed to the same provider are left as-is.
    #[must_use]
    pub fn for_provider(self, provider: &str) -> Self {
        if matches!(&self, Self::Provider { provider: existing, .. } if existing == provider) {
            return self;
        }
        Self::Provider {
            provider: provider.to_string(),
            source: Box::new(self),
        }
    }

    /// Describe the step this error interrupted
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Result type alias for pr-monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Join error messages one per line for the combined report
pub fn format_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
