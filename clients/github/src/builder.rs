use crate::GithubClient;
use contributors::api::{Error, Result};
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use url::Url;

pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";

pub struct GithubClientBuilder {
    client_builder: ClientBuilder,
    github_url: String,
    headers: HeaderMap,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        let mut headers = HeaderMap::default();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("contributors"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            client_builder: ClientBuilder::default(),
            github_url: DEFAULT_GITHUB_URL.to_string(),
            headers,
        }
    }
}

impl GithubClientBuilder {
    pub fn try_with_token(self, token: secrecy::SecretString) -> Result<GithubClientBuilder> {
        let mut value = HeaderValue::from_str(&format!("bearer {}", token.expose_secret()))
            .map_err(|_| Error::AuthMissing("token is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        Ok(self.with_header_value(header::AUTHORIZATION, value))
    }

    pub fn try_with_user_agent<STR: AsRef<str>>(self, user_agent: STR) -> Result<GithubClientBuilder> {
        Ok(self.try_with_header(header::USER_AGENT, user_agent)?)
    }

    /// REST API root; the GraphQL endpoint is `<url>/graphql`.
    pub fn with_github_url<STR: AsRef<str>>(mut self, url: STR) -> GithubClientBuilder {
        self.github_url = url.as_ref().to_string();
        self
    }

    fn try_with_header(self, key: HeaderName, val: impl AsRef<str>) -> anyhow::Result<GithubClientBuilder> {
        let val = HeaderValue::from_str(val.as_ref())?;
        Ok(self.with_header_value(key, val))
    }

    fn with_header_value(mut self, key: HeaderName, val: HeaderValue) -> GithubClientBuilder {
        self.headers.insert(key, val);
        self
    }

    pub fn build(self) -> Result<GithubClient> {
        let graphql_url = graphql_url(&self.github_url)?;
        let client = self.client_builder.default_headers(self.headers).build()?;
        Ok(GithubClient::new(client, graphql_url))
    }
}

fn graphql_url(github_url: &str) -> Result<Url> {
    let base = format!("{}/", github_url.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join("graphql"))
        .map_err(|err| Error::InputInvalid(format!("Invalid GitHub API URL \"{}\": {}", github_url, err)))
}

#[test]
fn graphql_url_test() {
    assert_eq!(graphql_url(DEFAULT_GITHUB_URL).unwrap().as_str(), "https://api.github.com/graphql");
    assert_eq!(graphql_url("http://127.0.0.1:8080").unwrap().as_str(), "http://127.0.0.1:8080/graphql");
    assert_eq!(
        graphql_url("https://github.example.com/api/").unwrap().as_str(),
        "https://github.example.com/api/graphql"
    );
    assert!(matches!(graphql_url("not a url"), Err(Error::InputInvalid(_))));
}
