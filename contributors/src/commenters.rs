use crate::api::{Budget, Client, PullRequestActivity, Result};
use crate::pr_ref::PrRef;
use crate::progress::Progress;
use crate::record::CommentRecord;
use crate::text::clean_title;
use derive_more::Constructor;
use log::{debug, error};
use std::sync::Arc;

/// Records of the general comments, then of each review followed by its line comments.
///
/// A review is only recorded when it has a body. Line comments are dated by their review.
pub fn comment_records(pr: &PrRef, activity: &PullRequestActivity) -> Vec<CommentRecord> {
    let mut records = Vec::new();
    for (index, comment) in activity.comments.iter().enumerate() {
        let record = CommentRecord::new(pr, comment.author.as_deref(), &comment.created_at);
        debug!("{}. {}, {}, \"{}\"", index + 1, record.author, comment.created_at, clean_title(&comment.body));
        records.push(record);
    }
    for (index, review) in activity.reviews.iter().enumerate() {
        let record = CommentRecord::new(pr, review.author.as_deref(), &review.created_at);
        debug!("{}. {}, {}, \"{}\"", index + 1, record.author, review.created_at, clean_title(&review.body_text));
        if !review.body_text.is_empty() {
            records.push(record);
        }
        for (line_index, comment) in review.comments.iter().enumerate() {
            let record = CommentRecord::new(pr, comment.author.as_deref(), &review.created_at);
            debug!(
                "  {}. {}, {}, \"{}\"",
                line_index + 1,
                record.author,
                comment.created_at,
                clean_title(&comment.body)
            );
            records.push(record);
        }
    }
    records
}

/// Collects who commented on single pull requests.
#[derive(Constructor)]
pub struct CommenterCollector<CLIENT, BUDGET>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    client: Arc<CLIENT>,
    budget: Arc<BUDGET>,
    /// Checks the quota before every pull request, for lists longer than the remaining budget.
    big_file: bool,
    progress: Arc<Progress>,
}

impl<CLIENT, BUDGET> CommenterCollector<CLIENT, BUDGET>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    /// Returns the number of records and the records of `pr`.
    ///
    /// A failed query is logged and yields no record, unless the error must stop the run.
    pub async fn collect(&self, pr: &PrRef) -> Result<(usize, Vec<CommentRecord>)> {
        self.progress.verbose(format!("Fetching comments for {}", pr));
        match self.fetch(pr).await {
            Ok(records) => {
                if records.is_empty() {
                    self.progress.verbose("   No comments found for PR, skipping...");
                }
                Ok((records.len(), records))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                error!("Unexpected error getting comments of {}: {}", pr, err);
                Ok((0, Vec::new()))
            }
        }
    }

    async fn fetch(&self, pr: &PrRef) -> Result<Vec<CommentRecord>> {
        if self.big_file {
            let rate = self.client.rate_limit().await?;
            self.budget.observe(&rate).await?;
            self.budget.ensure_budget(5).await?;
        }
        let activity = self.client.pull_request_activity(pr).await?;
        self.budget.observe(&activity.rate).await?;

        let records = comment_records(pr, &activity.data);
        debug!(
            "For {:<40} found {} comment(s). (quota cost: {}, remaining: {})",
            format!("\"{}\"", pr),
            records.len(),
            activity.rate.cost,
            activity.rate.remaining
        );
        self.budget.ensure_budget(2).await?;
        Ok(records)
    }
}
