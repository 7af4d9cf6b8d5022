use crate::api::{Budget, Client, Error, PullRequest, PullRequestState, Result};
use crate::exclusions::ExcludedAuthors;
use crate::period::{DateRange, Month};
use crate::progress::{Progress, RunState};
use crate::record::SubmitterRecord;
use crate::splitter::{split, QUERY_LIMIT};
use derive_more::Constructor;
use log::{debug, info, warn};
use std::sync::Arc;

/// Search predicate for the pull requests of `org` created within `range`.
///
/// Common automation accounts are already filtered out by the platform.
pub fn submitter_search(org: &str, range: &DateRange) -> String {
    format!(
        "org:{} is:pr -author:app/dependabot -author:app/renovate -author:app/github-actions -author:jenkins-infra-bot created:{}",
        org, range
    )
}

/// Number of pull requests created in `org` during `month`.
pub async fn count_probe<CLIENT, BUDGET>(client: &CLIENT, budget: &BUDGET, org: &str, month: &Month) -> Result<u32>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    let search = submitter_search(org, &month.range()?);
    budget.ensure_budget(2).await?;
    let count = client.count_pull_requests(&search).await?;
    budget.observe(&count.rate).await?;
    debug!("Count probe \"{}\": {} item(s)", search, count.data);
    Ok(count.data)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmittersSummary {
    /// Items announced by the count probe.
    pub total: u32,
    /// Search edges received over all pages.
    pub drained: u32,
    pub emitted: usize,
    pub windows: u32,
}

/// Collects the pull requests created in an organization during a month.
#[derive(Constructor)]
pub struct SubmitterCollector<CLIENT, BUDGET>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    client: Arc<CLIENT>,
    budget: Arc<BUDGET>,
    excluded: ExcludedAuthors,
    skip_closed: bool,
    progress: Arc<Progress>,
}

impl<CLIENT, BUDGET> SubmitterCollector<CLIENT, BUDGET>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    /// Drains every sub-window of `month`, handing the records of each page to `emit`.
    ///
    /// Records already handed over stay emitted when a later query fails.
    ///
    /// # Arguments
    /// * `org` - GitHub organization
    /// * `month` - Month the pull requests were created in
    /// * `emit` - Receives the surviving records of each page, in search order
    pub async fn collect<F>(&self, org: &str, month: &Month, mut emit: F) -> Result<SubmittersSummary>
    where
        F: FnMut(Vec<SubmitterRecord>) -> Result<()>,
    {
        let result = self.drain_month(org, month, &mut emit).await;
        self.progress.enter(match &result {
            Ok(_) => RunState::Done,
            Err(_) => RunState::Aborted,
        });
        self.progress.finish();
        result
    }

    async fn drain_month<F>(&self, org: &str, month: &Month, emit: &mut F) -> Result<SubmittersSummary>
    where
        F: FnMut(Vec<SubmitterRecord>) -> Result<()>,
    {
        self.progress.enter(RunState::Probing);
        let total = count_probe(self.client.as_ref(), self.budget.as_ref(), org, month).await?;
        info!("{} pull request(s) created in {} during {}", total, org, month);
        self.progress.verbose(format!("Found {} PRs to analyze for {} in {}", total, org, month));
        self.progress.reset_total(u64::from(total));

        let mut summary = SubmittersSummary {
            total,
            ..Default::default()
        };
        let mut iteration = 0;
        loop {
            self.progress.enter(RunState::Splitting);
            let window = split(total, month, iteration)?;
            self.progress.set_message(window.range.to_string());
            self.drain_window(&submitter_search(org, &window.range), &mut summary, emit)
                .await?;
            summary.windows += 1;
            if !window.has_more {
                break;
            }
            iteration += 1;
        }

        if summary.drained != total {
            return Err(Error::CountMismatch {
                expected: total,
                retrieved: summary.drained,
            });
        }
        self.progress
            .verbose(format!("Retrieved {} PRs, kept {}", summary.drained, summary.emitted));
        Ok(summary)
    }

    async fn drain_window<F>(&self, search: &str, summary: &mut SubmittersSummary, emit: &mut F) -> Result<()>
    where
        F: FnMut(Vec<SubmitterRecord>) -> Result<()>,
    {
        let mut cursor = None;
        loop {
            self.progress.enter(RunState::Draining);
            self.budget.ensure_budget(2).await?;
            let page = self.client.search_pull_requests(search, cursor).await?;
            self.budget.observe(&page.rate).await?;
            let page = page.data;
            if page.issue_count > QUERY_LIMIT {
                warn!(
                    "Search \"{}\" matches {} items, only {} can be retrieved",
                    search, page.issue_count, QUERY_LIMIT
                );
            }

            summary.drained += page.drained;
            self.progress.inc(u64::from(page.drained));
            let records: Vec<SubmitterRecord> = page
                .pull_requests
                .iter()
                .filter(|pr| self.is_kept(pr))
                .map(SubmitterRecord::from)
                .collect();
            summary.emitted += records.len();
            emit(records)?;

            if !page.has_next_page {
                return Ok(());
            }
            cursor = match page.end_cursor {
                Some(cursor) => Some(cursor),
                None => {
                    return Err(Error::QueryFailed(format!(
                        "search \"{}\" announced a next page without a cursor",
                        search
                    )))
                }
            };
        }
    }

    fn is_kept(&self, pr: &PullRequest) -> bool {
        match &pr.author {
            Some(author) if author.is_bot() => {
                debug!("Skipping {} by bot {}", pr.url, author.login);
                false
            }
            Some(author) if self.excluded.contains(&author.login) => {
                self.progress
                    .verbose(format!("Skipping {} by excluded author {}", pr.url, author.login));
                false
            }
            _ if self.skip_closed && pr.state == PullRequestState::Closed => {
                debug!("Skipping closed {}", pr.url);
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PullRequestPage;
    use crate::record::DELETED_USER;
    use crate::testing::{bot_pull_request, pull_request, FakeClient, RecordingBudget};

    fn range(value: &str) -> DateRange {
        let (start, end) = value.split_once("..").unwrap();
        DateRange::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    fn page(drained: u32, pull_requests: Vec<PullRequest>, end_cursor: Option<&str>) -> PullRequestPage {
        PullRequestPage {
            issue_count: 0,
            drained,
            pull_requests,
            end_cursor: end_cursor.map(String::from),
            has_next_page: end_cursor.is_some(),
        }
    }

    fn open_pull_request(number: u64, login: &str) -> PullRequest {
        pull_request("jenkinsci", number, Some(login), PullRequestState::Open)
    }

    fn collector(
        client: FakeClient,
        excluded: &[&str],
        skip_closed: bool,
    ) -> (SubmitterCollector<FakeClient, RecordingBudget>, Arc<FakeClient>, Arc<RecordingBudget>, Arc<Progress>) {
        let client = Arc::new(client);
        let budget = Arc::new(RecordingBudget::default());
        let progress = Arc::new(Progress::hidden());
        let collector = SubmitterCollector::new(
            client.clone(),
            budget.clone(),
            ExcludedAuthors::from_handles(excluded.iter().copied()),
            skip_closed,
            progress.clone(),
        );
        (collector, client, budget, progress)
    }

    #[test]
    fn search_test() {
        assert_eq!(
            submitter_search("jenkinsci", &range("2023-09-01..2023-09-30")),
            "org:jenkinsci is:pr -author:app/dependabot -author:app/renovate -author:app/github-actions \
             -author:jenkins-infra-bot created:2023-09-01..2023-09-30"
        );
    }

    #[tokio::test]
    async fn count_probe_test() {
        let search = submitter_search("jenkinsci", &range("2023-09-01..2023-09-30"));
        let client = FakeClient::default().with_count(search, 692);
        let budget = RecordingBudget::default();
        let month = "2023-09".parse().unwrap();
        assert_eq!(count_probe(&client, &budget, "jenkinsci", &month).await.unwrap(), 692);
        assert_eq!(budget.observed(), 1);
    }

    #[tokio::test]
    async fn filter_test() {
        let search = submitter_search("jenkinsci", &range("2023-09-01..2023-09-30"));
        let client = FakeClient::default()
            .with_count(search.clone(), 6)
            .with_page(
                search.clone(),
                None,
                page(
                    3,
                    vec![
                        bot_pull_request("jenkinsci", 1, "dependabot"),
                        pull_request("jenkinsci", 2, Some("alice"), PullRequestState::Merged),
                        pull_request("jenkinsci", 3, Some("excluded-bob"), PullRequestState::Open),
                    ],
                    Some("cursor-1"),
                ),
            )
            .with_page(
                search.clone(),
                Some("cursor-1"),
                page(
                    3,
                    vec![
                        pull_request("jenkinsci", 4, Some("carol"), PullRequestState::Closed),
                        pull_request("jenkinsci", 5, None, PullRequestState::Open),
                        pull_request("jenkinsci", 6, Some("alice"), PullRequestState::Open),
                    ],
                    None,
                ),
            );
        let (collector, client, budget, progress) = collector(client, &["excluded-bob"], true);

        let mut records = Vec::new();
        let summary = collector
            .collect("jenkinsci", &"2023-09".parse().unwrap(), |page| {
                records.extend(page);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(
            summary,
            SubmittersSummary {
                total: 6,
                drained: 6,
                emitted: 3,
                windows: 1
            }
        );
        let kept: Vec<(u64, &str)> = records.iter().map(|r| (r.number, r.author.as_str())).collect();
        assert_eq!(kept, vec![(2, "alice"), (5, DELETED_USER), (6, "alice")]);
        assert_eq!(client.calls().len(), 3);
        assert_eq!(budget.ensured(), vec![2, 2, 2]);
        assert_eq!(budget.observed(), 3);
        assert_eq!(progress.state(), RunState::Done);
    }

    #[tokio::test]
    async fn keep_closed_test() {
        let search = submitter_search("jenkinsci", &range("2023-09-01..2023-09-30"));
        let client = FakeClient::default().with_count(search.clone(), 1).with_page(
            search,
            None,
            page(1, vec![pull_request("jenkinsci", 4, Some("carol"), PullRequestState::Closed)], None),
        );
        let (collector, _, _, _) = collector(client, &[], false);
        let mut records = Vec::new();
        collector
            .collect("jenkinsci", &"2023-09".parse().unwrap(), |page| {
                records.extend(page);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, "CLOSED");
    }

    #[tokio::test]
    async fn split_month_test() {
        let whole = submitter_search("jenkinsci", &range("2020-01-01..2020-01-31"));
        let first = submitter_search("jenkinsci", &range("2020-01-01..2020-01-15"));
        let second = submitter_search("jenkinsci", &range("2020-01-16..2020-01-31"));
        let client = FakeClient::default()
            .with_count(whole, 1233)
            .with_page(first.clone(), None, page(100, vec![open_pull_request(1, "a")], Some("f1")))
            .with_page(first, Some("f1"), page(500, vec![open_pull_request(2, "b")], None))
            .with_page(second, None, page(633, vec![open_pull_request(3, "c")], None));
        let (collector, client, _, _) = collector(client, &[], false);

        let mut numbers = Vec::new();
        let summary = collector
            .collect("jenkinsci", &"2020-01".parse().unwrap(), |page| {
                numbers.extend(page.iter().map(|r| r.number));
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(summary.windows, 2);
        assert_eq!(summary.drained, 1233);
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(client.calls().len(), 4);
    }

    #[tokio::test]
    async fn count_mismatch_test() {
        let search = submitter_search("jenkinsci", &range("2023-09-01..2023-09-30"));
        let client = FakeClient::default().with_count(search.clone(), 692).with_page(
            search,
            None,
            page(2, vec![pull_request("jenkinsci", 1, Some("a"), PullRequestState::Open)], None),
        );
        let (collector, _, _, progress) = collector(client, &[], false);
        let mut emitted = 0;
        let result = collector
            .collect("jenkinsci", &"2023-09".parse().unwrap(), |page| {
                emitted += page.len();
                Ok(())
            })
            .await;
        assert!(matches!(
            result,
            Err(Error::CountMismatch {
                expected: 692,
                retrieved: 2
            })
        ));
        assert_eq!(emitted, 1, "rows of successful pages are kept");
        assert_eq!(progress.state(), RunState::Aborted);
    }

    #[tokio::test]
    async fn query_failure_test() {
        let search = submitter_search("jenkinsci", &range("2023-09-01..2023-09-30"));
        let client = FakeClient::default().with_count(search.clone(), 200).with_page(
            search,
            None,
            page(100, vec![pull_request("jenkinsci", 1, Some("a"), PullRequestState::Open)], Some("missing")),
        );
        let (collector, _, _, progress) = collector(client, &[], false);
        let mut emitted = 0;
        let result = collector
            .collect("jenkinsci", &"2023-09".parse().unwrap(), |page| {
                emitted += page.len();
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::QueryFailed(_))));
        assert_eq!(emitted, 1);
        assert_eq!(progress.state(), RunState::Aborted);
    }

    #[tokio::test]
    async fn too_many_items_test() {
        let search = submitter_search("jenkinsci", &range("2023-09-01..2023-09-30"));
        let client = FakeClient::default().with_count(search, 28_001);
        let (collector, client, _, _) = collector(client, &[], false);
        let result = collector
            .collect("jenkinsci", &"2023-09".parse().unwrap(), |_| Ok(()))
            .await;
        assert!(matches!(result, Err(Error::InputInvalid(_))));
        assert_eq!(client.calls().len(), 1);
    }
}
