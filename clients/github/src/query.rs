//! GraphQL v4 documents. Every query also asks for the rate limit block.

use serde_json::{json, Value};

pub const COUNT: &str = r#"query($searchQuery: String!) {
  search(query: $searchQuery, type: ISSUE, first: 1) {
    issueCount
  }
  rateLimit { limit cost remaining resetAt }
}"#;

pub const SEARCH_PULL_REQUESTS: &str = r#"query($searchQuery: String!, $count: Int!, $cursor: String) {
  search(query: $searchQuery, type: ISSUE, first: $count, after: $cursor) {
    issueCount
    edges {
      node {
        ... on PullRequest {
          number
          url
          state
          createdAt
          mergedAt
          title
          repository { name owner { login } }
          author { login resourcePath }
        }
      }
    }
    pageInfo { endCursor hasNextPage }
  }
  rateLimit { limit cost remaining resetAt }
}"#;

pub const PULL_REQUEST_ACTIVITY: &str = r#"query($owner: String!, $name: String!, $pr: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $pr) {
      comments(first: 100) {
        nodes { author { login } createdAt body }
      }
      reviews(first: 100) {
        nodes {
          author { login }
          createdAt
          bodyText
          comments(first: 100) {
            nodes { author { login } createdAt body }
          }
        }
      }
    }
  }
  rateLimit { limit cost remaining resetAt }
}"#;

pub const USER: &str = r#"query($login: String!) {
  user(login: $login) { login name company avatarUrl url }
  rateLimit { limit cost remaining resetAt }
}"#;

pub const AUTHORED_PULL_REQUESTS: &str = r#"query($searchQuery: String!, $count: Int!) {
  search(query: $searchQuery, type: ISSUE, first: $count) {
    issueCount
    edges {
      node {
        ... on PullRequest {
          repository { name owner { login } }
        }
      }
    }
  }
  rateLimit { limit cost remaining resetAt }
}"#;

pub const QUOTA: &str = r#"query {
  viewer { login }
  rateLimit { limit cost remaining resetAt }
}"#;

/// Request body posted to the GraphQL endpoint.
pub fn body(query: &str, variables: Value) -> Value {
    json!({ "query": query, "variables": variables })
}

#[test]
fn rate_limit_requested_test() {
    const RATE_LIMIT: &str = "rateLimit { limit cost remaining resetAt }";
    for query in [COUNT, SEARCH_PULL_REQUESTS, PULL_REQUEST_ACTIVITY, USER, AUTHORED_PULL_REQUESTS, QUOTA] {
        assert!(query.contains(RATE_LIMIT), "{}", query);
    }
}
