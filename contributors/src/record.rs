use crate::api::PullRequest;
use crate::pr_ref::PrRef;
use crate::text::clean_title;
use chrono::{DateTime, SecondsFormat, Utc};

pub const SUBMITTERS_HEADER: &str = "org,repository,number,url,state,created_at,merged_at,user.login,month_year,title";
pub const COMMENTERS_HEADER: &str = "PR_ref,commenter,month";

/// Canonical commenter or submitter name when the platform no longer knows the author.
pub const DELETED_USER: &str = "deleted_user";

/// Columns of [`SUBMITTERS_HEADER`], used to validate PR list files.
pub fn submitters_columns() -> Vec<&'static str> {
    SUBMITTERS_HEADER.split(',').collect()
}

pub fn year_month(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m").to_string()
}

fn author_or_deleted(login: Option<&str>) -> String {
    match login {
        Some(login) if !login.is_empty() => login.to_string(),
        _ => DELETED_USER.to_string(),
    }
}

fn quoted(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| format!("\"{}\"", field))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterRecord {
    pub org: String,
    pub repository: String,
    pub number: u64,
    pub url: String,
    pub state: String,
    pub created_at: String,
    pub merged_at: String,
    pub author: String,
    pub year_month: String,
    pub title: String,
}

impl From<&PullRequest> for SubmitterRecord {
    fn from(pr: &PullRequest) -> Self {
        SubmitterRecord {
            org: pr.org.clone(),
            repository: pr.repository.clone(),
            number: pr.number,
            url: pr.url.clone(),
            state: pr.state.to_string(),
            created_at: pr.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            merged_at: pr
                .merged_at
                .map(|merged_at| merged_at.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            author: author_or_deleted(pr.author.as_ref().map(|author| author.login.as_str())),
            year_month: year_month(&pr.created_at),
            title: clean_title(&pr.title),
        }
    }
}

impl SubmitterRecord {
    pub fn to_csv_line(&self) -> String {
        quoted(&[
            &self.org,
            &self.repository,
            &self.number.to_string(),
            &self.url,
            &self.state,
            &self.created_at,
            &self.merged_at,
            &self.author,
            &self.year_month,
            &self.title,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub pr_ref: String,
    pub author: String,
    pub year_month: String,
}

impl CommentRecord {
    /// Record dated by `created_at`; a missing or empty author becomes [`DELETED_USER`].
    pub fn new(pr: &PrRef, author: Option<&str>, created_at: &DateTime<Utc>) -> Self {
        CommentRecord {
            pr_ref: pr.to_string(),
            author: author_or_deleted(author),
            year_month: year_month(created_at),
        }
    }

    pub fn to_csv_line(&self) -> String {
        quoted(&[&self.pr_ref, &self.author, &self.year_month])
    }
}
