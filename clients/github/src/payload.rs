use chrono::{DateTime, Utc};
use contributors::api::{
    AuthoredPullRequests, Author, Comment, Error, PullRequest, PullRequestActivity, PullRequestPage, RateState, Review,
    UserProfile,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug)]
pub struct GraphqlResponse<T = Value> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Deserialize, Debug)]
pub struct GraphqlError {
    pub message: String,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub limit: i64,
    pub cost: i64,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

impl From<RateLimit> for RateState {
    fn from(rate: RateLimit) -> Self {
        RateState::new(rate.limit, rate.cost, rate.remaining, rate.reset_at)
    }
}

#[derive(Deserialize, Debug)]
pub struct Login {
    pub login: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuotaData {
    pub rate_limit: RateLimit,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CountData {
    pub search: Count,
    pub rate_limit: RateLimit,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Count {
    pub issue_count: u32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub search: Search,
    pub rate_limit: RateLimit,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Search {
    pub issue_count: u32,
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

#[derive(Deserialize, Debug)]
pub struct Edge {
    pub node: Option<Value>,
}

impl Edge {
    /// Search results of other kinds than pull requests come as empty objects and yield `None`.
    fn pull_request<NODE: DeserializeOwned>(self) -> Result<Option<NODE>, Error> {
        match self.node {
            None => Ok(None),
            Some(Value::Object(fields)) if fields.is_empty() => Ok(None),
            Some(node) => serde_json::from_value(node)
                .map(Some)
                .map_err(|err| Error::QueryFailed(format!("malformed pull request in search results: {}", err))),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub number: u64,
    pub url: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub title: String,
    pub repository: Repository,
    pub author: Option<AuthorNode>,
}

#[derive(Deserialize, Debug)]
pub struct Repository {
    pub name: String,
    pub owner: Login,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthorNode {
    pub login: String,
    pub resource_path: String,
}

impl TryFrom<PullRequestNode> for PullRequest {
    type Error = Error;

    fn try_from(node: PullRequestNode) -> Result<Self, Error> {
        let state = node
            .state
            .parse()
            .map_err(|_| Error::QueryFailed(format!("unknown pull request state \"{}\"", node.state)))?;
        Ok(PullRequest {
            org: node.repository.owner.login,
            repository: node.repository.name,
            number: node.number,
            url: node.url,
            state,
            created_at: node.created_at,
            merged_at: node.merged_at,
            author: node.author.map(|author| Author::new(author.login, author.resource_path)),
            title: node.title,
        })
    }
}

impl TryFrom<Search> for PullRequestPage {
    type Error = Error;

    fn try_from(search: Search) -> Result<Self, Error> {
        let drained = search.edges.len() as u32;
        let pull_requests = search
            .edges
            .into_iter()
            .map(|edge| edge.pull_request::<PullRequestNode>())
            .filter_map(|node| node.transpose())
            .map(|node| node.and_then(PullRequest::try_from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PullRequestPage {
            issue_count: search.issue_count,
            drained,
            pull_requests,
            end_cursor: search.page_info.end_cursor,
            has_next_page: search.page_info.has_next_page,
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ActivityData {
    pub repository: Option<ActivityRepository>,
    pub rate_limit: RateLimit,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRepository {
    pub pull_request: Option<ActivityPullRequest>,
}

#[derive(Deserialize, Debug)]
pub struct ActivityPullRequest {
    pub comments: Nodes<CommentNode>,
    pub reviews: Nodes<ReviewNode>,
}

#[derive(Deserialize, Debug)]
pub struct Nodes<NODE> {
    pub nodes: Vec<NODE>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub author: Option<Login>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub body: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNode {
    pub author: Option<Login>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub body_text: String,
    pub comments: Nodes<CommentNode>,
}

impl From<CommentNode> for Comment {
    fn from(comment: CommentNode) -> Self {
        Comment::new(comment.author.map(|author| author.login), comment.created_at, comment.body)
    }
}

impl From<ReviewNode> for Review {
    fn from(review: ReviewNode) -> Self {
        Review::new(
            review.author.map(|author| author.login),
            review.created_at,
            review.body_text,
            review.comments.nodes.into_iter().map(Comment::from).collect(),
        )
    }
}

impl From<ActivityPullRequest> for PullRequestActivity {
    fn from(pr: ActivityPullRequest) -> Self {
        PullRequestActivity::new(
            pr.comments.nodes.into_iter().map(Comment::from).collect(),
            pr.reviews.nodes.into_iter().map(Review::from).collect(),
        )
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub user: Option<UserNode>,
    pub rate_limit: RateLimit,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub login: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub avatar_url: String,
    pub url: String,
}

impl From<UserNode> for UserProfile {
    fn from(user: UserNode) -> Self {
        UserProfile {
            login: user.login,
            name: user.name.unwrap_or_default(),
            company: user.company.unwrap_or_default(),
            avatar_url: user.avatar_url,
            url: user.url,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredData {
    pub search: AuthoredSearch,
    pub rate_limit: RateLimit,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredSearch {
    pub issue_count: u32,
    pub edges: Vec<Edge>,
}

#[derive(Deserialize, Debug)]
pub struct AuthoredNode {
    pub repository: Repository,
}

impl TryFrom<AuthoredSearch> for AuthoredPullRequests {
    type Error = Error;

    fn try_from(search: AuthoredSearch) -> Result<Self, Error> {
        let mut repositories = Vec::new();
        for edge in search.edges {
            if let Some(AuthoredNode { repository }) = edge.pull_request()? {
                repositories.push(format!("{}/{}", repository.owner.login, repository.name));
            }
        }
        Ok(AuthoredPullRequests::new(search.issue_count, repositories))
    }
}

#[test]
fn search_page_test() {
    let body = r#"{
        "data": {
            "search": {
                "issueCount": 3,
                "edges": [
                    {"node": {
                        "number": 475, "url": "https://github.com/jenkinsci/credentials-plugin/pull/475",
                        "state": "MERGED", "createdAt": "2023-09-04T08:15:00Z", "mergedAt": "2023-09-12T17:02:33Z",
                        "title": "Use SecretBytes", "repository": {"name": "credentials-plugin", "owner": {"login": "jenkinsci"}},
                        "author": {"login": "jtnord", "resourcePath": "/jtnord"}
                    }},
                    {"node": {}},
                    {"node": {
                        "number": 12, "url": "https://github.com/jenkinsci/bom/pull/12",
                        "state": "OPEN", "createdAt": "2023-09-05T08:15:00Z", "mergedAt": null,
                        "title": "Bump", "repository": {"name": "bom", "owner": {"login": "jenkinsci"}},
                        "author": null
                    }}
                ],
                "pageInfo": {"endCursor": "Y3Vyc29yOjM=", "hasNextPage": true}
            },
            "rateLimit": {"limit": 5000, "cost": 1, "remaining": 4990, "resetAt": "2023-09-30T10:00:00Z"}
        }
    }"#;
    let response: GraphqlResponse<SearchData> = serde_json::from_str(body).unwrap();
    let data = response.data.unwrap();
    assert_eq!(RateState::from(data.rate_limit).remaining, 4990);

    let page = PullRequestPage::try_from(data.search).unwrap();
    assert_eq!(page.drained, 3);
    assert_eq!(page.pull_requests.len(), 2);
    assert_eq!(page.pull_requests[0].org, "jenkinsci");
    assert_eq!(page.pull_requests[0].author.as_ref().unwrap().login, "jtnord");
    assert!(page.pull_requests[1].author.is_none());
    assert_eq!(page.end_cursor.as_deref(), Some("Y3Vyc29yOjM="));
    assert!(page.has_next_page);
}

#[test]
fn errors_test() {
    let body = r#"{"data": null, "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a User"}]}"#;
    let response: GraphqlResponse<UserData> = serde_json::from_str(body).unwrap();
    assert!(response.data.is_none());
    assert_eq!(response.errors[0].message, "Could not resolve to a User");
}

#[test]
fn malformed_pull_request_test() {
    let body = r#"{
        "issueCount": 2,
        "edges": [
            {"node": {}},
            {"node": {
                "number": 475, "url": "https://github.com/jenkinsci/credentials-plugin/pull/475",
                "state": "MERGED", "createdAt": "2023-09-04T08:15:00Z", "mergedAt": null,
                "title": "Use SecretBytes", "repository": {"name": "credentials-plugin", "owner": {"login": "jenkinsci"}},
                "author": {"login": "jtnord"}
            }}
        ],
        "pageInfo": {"endCursor": null, "hasNextPage": false}
    }"#;
    let search: Search = serde_json::from_str(body).unwrap();
    match PullRequestPage::try_from(search) {
        Err(Error::QueryFailed(message)) => assert!(message.contains("resourcePath"), "{}", message),
        other => panic!("a pull request missing its author path must not be dropped: {:?}", other),
    }
}

#[test]
fn authored_test() {
    let body = r#"{
        "issueCount": 3,
        "edges": [
            {"node": {"repository": {"name": "credentials-plugin", "owner": {"login": "jenkinsci"}}}},
            {"node": {}},
            {"node": {"repository": {"name": "bom", "owner": {"login": "jenkinsci"}}}}
        ]
    }"#;
    let search: AuthoredSearch = serde_json::from_str(body).unwrap();
    let authored = AuthoredPullRequests::try_from(search).unwrap();
    assert_eq!(authored.issue_count, 3);
    assert_eq!(authored.repositories, vec!["jenkinsci/credentials-plugin", "jenkinsci/bom"]);

    let malformed: AuthoredSearch =
        serde_json::from_str(r#"{"issueCount": 1, "edges": [{"node": {"repository": {"name": "bom"}}}]}"#).unwrap();
    assert!(matches!(AuthoredPullRequests::try_from(malformed), Err(Error::QueryFailed(_))));
}
