use crate::pr_ref::PrRef;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InputInvalid(String),
    #[error("Unauthorized: no GitHub token found in environment variable \"{0}\"")]
    AuthMissing(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Expected nbr of items ({expected}) does not match retrieved nbr of items ({retrieved})")]
    CountMismatch { expected: u32, retrieved: u32 },
    #[error("Rate budget exhausted: {0}")]
    BudgetExhausted(String),
    #[error("Something went horribly wrong: {0}")]
    InternalInvariant(String),
    #[error("Aborted")]
    Aborted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Errors which must stop the whole run, even where a single failed query is otherwise skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AuthMissing(_) | Error::BudgetExhausted(_) | Error::InternalInvariant(_) | Error::Aborted
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Items requested per page of a paginated query.
pub const PAGE_SIZE: u32 = 100;

/// Rate limit block reported with every query.
#[derive(Constructor, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateState {
    pub limit: i64,
    pub cost: i64,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

/// Query result together with the rate state reported by the same response.
#[derive(Constructor, Debug)]
pub struct Rated<T> {
    pub data: T,
    pub rate: RateState,
}

#[derive(Constructor, Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub login: String,
    pub resource_path: String,
}

impl Author {
    /// Applications have a resource path starting with `/apps/`.
    pub fn is_bot(&self) -> bool {
        self.resource_path.starts_with("/apps/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub org: String,
    pub repository: String,
    pub number: u64,
    pub url: String,
    pub state: PullRequestState,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author: Option<Author>,
    pub title: String,
}

/// One page of a pull request search.
#[derive(Debug, Clone, Default)]
pub struct PullRequestPage {
    pub issue_count: u32,
    /// Number of search edges received, whatever their kind.
    pub drained: u32,
    pub pull_requests: Vec<PullRequest>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Constructor, Debug, Clone, PartialEq)]
pub struct Comment {
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub body: String,
}

#[derive(Constructor, Debug, Clone, PartialEq)]
pub struct Review {
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub body_text: String,
    pub comments: Vec<Comment>,
}

/// Comments and reviews attached to a single pull request.
#[derive(Constructor, Debug, Clone, Default)]
pub struct PullRequestActivity {
    pub comments: Vec<Comment>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub login: String,
    pub name: String,
    pub company: String,
    pub avatar_url: String,
    pub url: String,
}

/// Pull requests found for one author, reduced to the repositories they target.
#[derive(Constructor, Debug, Clone, Default)]
pub struct AuthoredPullRequests {
    pub issue_count: u32,
    /// `owner/name` of the repository of every returned pull request, in search order.
    pub repositories: Vec<String>,
}

/// Read-only access to the code hosting platform.
#[async_trait]
pub trait Client: Send + Sync {
    /// Total number of pull requests matching `search`.
    async fn count_pull_requests(&self, search: &str) -> Result<Rated<u32>>;

    /// Page of pull requests matching `search`, starting after the `after` cursor.
    async fn search_pull_requests(&self, search: &str, after: Option<String>) -> Result<Rated<PullRequestPage>>;

    async fn pull_request_activity(&self, pr: &PrRef) -> Result<Rated<PullRequestActivity>>;

    async fn user_profile(&self, login: &str) -> Result<Rated<UserProfile>>;

    async fn authored_pull_requests(&self, search: &str) -> Result<Rated<AuthoredPullRequests>>;

    /// Cheapest possible query, only used to learn the current quota.
    async fn rate_limit(&self) -> Result<RateState>;
}

/// Guard keeping the caller within the API rate budget.
#[async_trait]
pub trait Budget: Send + Sync {
    /// Returns once at least `min_calls` calls fit in the remaining budget, sleeping until reset if needed.
    async fn ensure_budget(&self, min_calls: i64) -> Result<()>;

    /// Records the rate state reported by the latest response.
    async fn observe(&self, rate: &RateState) -> Result<()>;
}
