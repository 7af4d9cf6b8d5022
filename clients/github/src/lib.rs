//! GitHub GraphQL v4 implementation of the [`contributors::api::Client`] seam.

mod builder;
pub mod limiter;
mod payload;
mod query;

pub use builder::{GithubClientBuilder, DEFAULT_GITHUB_URL};
pub use limiter::RateLimiter;

use async_trait::async_trait;
use contributors::api::{
    AuthoredPullRequests, Client, Error, PullRequestActivity, PullRequestPage, RateState, Rated, Result, UserProfile,
    PAGE_SIZE,
};
use contributors::PrRef;
use derive_more::Constructor;
use log::debug;
use payload::{ActivityData, AuthoredData, CountData, GraphqlResponse, QuotaData, SearchData, UserData};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

#[derive(Constructor)]
pub struct GithubClient {
    client: reqwest::Client,
    graphql_url: Url,
}

impl GithubClient {
    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        debug!("GraphQL query with {}", variables);
        let response = self
            .client
            .post(self.graphql_url.clone())
            .json(&query::body(query, variables))
            .send()
            .await?;
        read_response(response).await
    }
}

async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::QueryFailed(format!("{}: {}", status, body.trim())));
    }
    let response = response.json::<GraphqlResponse>().await?;
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|error| error.message).collect();
        return Err(Error::QueryFailed(messages.join("; ")));
    }
    let data = response
        .data
        .ok_or_else(|| Error::QueryFailed("response without data".to_string()))?;
    serde_json::from_value(data).map_err(|err| Error::QueryFailed(format!("unexpected response data: {}", err)))
}

#[async_trait]
impl Client for GithubClient {
    async fn count_pull_requests(&self, search: &str) -> Result<Rated<u32>> {
        let data: CountData = self.query(query::COUNT, json!({ "searchQuery": search })).await?;
        Ok(Rated::new(data.search.issue_count, data.rate_limit.into()))
    }

    async fn search_pull_requests(&self, search: &str, after: Option<String>) -> Result<Rated<PullRequestPage>> {
        let variables = json!({ "searchQuery": search, "count": PAGE_SIZE, "cursor": after });
        let data: SearchData = self.query(query::SEARCH_PULL_REQUESTS, variables).await?;
        Ok(Rated::new(PullRequestPage::try_from(data.search)?, data.rate_limit.into()))
    }

    async fn pull_request_activity(&self, pr: &PrRef) -> Result<Rated<PullRequestActivity>> {
        let variables = json!({ "owner": pr.org, "name": pr.project, "pr": pr.number });
        let data: ActivityData = self.query(query::PULL_REQUEST_ACTIVITY, variables).await?;
        let activity = data
            .repository
            .and_then(|repository| repository.pull_request)
            .ok_or_else(|| Error::QueryFailed(format!("pull request {} not found", pr)))?;
        Ok(Rated::new(activity.into(), data.rate_limit.into()))
    }

    async fn user_profile(&self, login: &str) -> Result<Rated<UserProfile>> {
        let data: UserData = self.query(query::USER, json!({ "login": login })).await?;
        let user = data
            .user
            .ok_or_else(|| Error::QueryFailed(format!("user {} not found", login)))?;
        Ok(Rated::new(user.into(), data.rate_limit.into()))
    }

    async fn authored_pull_requests(&self, search: &str) -> Result<Rated<AuthoredPullRequests>> {
        let variables = json!({ "searchQuery": search, "count": PAGE_SIZE });
        let data: AuthoredData = self.query(query::AUTHORED_PULL_REQUESTS, variables).await?;
        Ok(Rated::new(AuthoredPullRequests::try_from(data.search)?, data.rate_limit.into()))
    }

    async fn rate_limit(&self) -> Result<RateState> {
        let data: QuotaData = self.query(query::QUOTA, json!({})).await?;
        Ok(data.rate_limit.into())
    }
}
