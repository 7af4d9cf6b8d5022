use crate::api::{
    AuthoredPullRequests, Author, Budget, Client, Error, PullRequest, PullRequestActivity, PullRequestPage,
    PullRequestState, RateState, Rated, Result, UserProfile,
};
use crate::pr_ref::PrRef;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub(crate) fn rate(remaining: i64) -> RateState {
    RateState::new(5000, 1, remaining, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
}

pub(crate) fn at(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
}

pub(crate) fn pull_request(org: &str, number: u64, login: Option<&str>, state: PullRequestState) -> PullRequest {
    PullRequest {
        org: org.to_string(),
        repository: "some-plugin".to_string(),
        number,
        url: format!("https://github.com/{}/some-plugin/pull/{}", org, number),
        state,
        created_at: at("2023-09-10T12:00:00Z"),
        merged_at: None,
        author: login.map(|login| Author::new(login.to_string(), format!("/{}", login))),
        title: format!("Change number {}", number),
    }
}

pub(crate) fn bot_pull_request(org: &str, number: u64, login: &str) -> PullRequest {
    let mut pr = pull_request(org, number, Some(login), PullRequestState::Open);
    pr.author = Some(Author::new(login.to_string(), format!("/apps/{}", login)));
    pr
}

/// Scripted platform: unknown requests fail with `QueryFailed`.
#[derive(Default)]
pub(crate) struct FakeClient {
    counts: HashMap<String, u32>,
    pages: HashMap<(String, Option<String>), PullRequestPage>,
    activities: HashMap<String, PullRequestActivity>,
    profiles: HashMap<String, UserProfile>,
    authored: HashMap<String, AuthoredPullRequests>,
    remaining: Option<i64>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn with_count(mut self, search: impl Into<String>, count: u32) -> Self {
        self.counts.insert(search.into(), count);
        self
    }

    pub fn with_page(mut self, search: impl Into<String>, after: Option<&str>, page: PullRequestPage) -> Self {
        self.pages.insert((search.into(), after.map(String::from)), page);
        self
    }

    pub fn with_activity(mut self, pr: &str, activity: PullRequestActivity) -> Self {
        self.activities.insert(pr.to_string(), activity);
        self
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profiles.insert(profile.login.clone(), profile);
        self
    }

    pub fn with_authored(mut self, search: impl Into<String>, authored: AuthoredPullRequests) -> Self {
        self.authored.insert(search.into(), authored);
        self
    }

    pub fn with_remaining(mut self, remaining: i64) -> Self {
        self.remaining = Some(remaining);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn rated<T: Clone>(&self, call: String, found: Option<&T>) -> Result<Rated<T>> {
        self.calls.lock().unwrap().push(call.clone());
        found
            .cloned()
            .map(|data| Rated::new(data, rate(self.remaining.unwrap_or(4999))))
            .ok_or_else(|| Error::QueryFailed(format!("no scripted response for {}", call)))
    }
}

#[async_trait]
impl Client for FakeClient {
    async fn count_pull_requests(&self, search: &str) -> Result<Rated<u32>> {
        self.rated(format!("count {}", search), self.counts.get(search))
    }

    async fn search_pull_requests(&self, search: &str, after: Option<String>) -> Result<Rated<PullRequestPage>> {
        let call = format!("search {} after {:?}", search, after);
        self.rated(call, self.pages.get(&(search.to_string(), after)))
    }

    async fn pull_request_activity(&self, pr: &PrRef) -> Result<Rated<PullRequestActivity>> {
        self.rated(format!("activity {}", pr), self.activities.get(&pr.to_string()))
    }

    async fn user_profile(&self, login: &str) -> Result<Rated<UserProfile>> {
        self.rated(format!("user {}", login), self.profiles.get(login))
    }

    async fn authored_pull_requests(&self, search: &str) -> Result<Rated<AuthoredPullRequests>> {
        self.rated(format!("authored {}", search), self.authored.get(search))
    }

    async fn rate_limit(&self) -> Result<RateState> {
        self.calls.lock().unwrap().push("rate_limit".to_string());
        Ok(rate(self.remaining.unwrap_or(4999)))
    }
}

/// Budget that never waits and records how it was consulted.
#[derive(Default)]
pub(crate) struct RecordingBudget {
    pub ensured: Mutex<Vec<i64>>,
    pub observed: Mutex<Vec<RateState>>,
    pub exhausted: bool,
}

impl RecordingBudget {
    pub fn exhausted() -> Self {
        RecordingBudget {
            exhausted: true,
            ..Default::default()
        }
    }

    pub fn ensured(&self) -> Vec<i64> {
        self.ensured.lock().unwrap().clone()
    }

    pub fn observed(&self) -> usize {
        self.observed.lock().unwrap().len()
    }
}

#[async_trait]
impl Budget for RecordingBudget {
    async fn ensure_budget(&self, min_calls: i64) -> Result<()> {
        self.ensured.lock().unwrap().push(min_calls);
        if self.exhausted {
            return Err(Error::BudgetExhausted("reset is too far away".to_string()));
        }
        Ok(())
    }

    async fn observe(&self, rate: &RateState) -> Result<()> {
        self.observed.lock().unwrap().push(*rate);
        Ok(())
    }
}
