//! GitHub REST client
//!
//! Implements [`RepoHost`] against the GitHub REST v3 API (or a GitHub
//! Enterprise `/api/v3` base URL). Pagination for list endpoints is handled
//! here; callers always receive complete lists.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{header, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::HostError;
use crate::host_traits::*;

const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("tidybot/", env!("CARGO_PKG_VERSION"));

/// GitHub connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    pub api_url: String,
    /// Token sent as a bearer credential (optional for public reads)
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            token: std::env::var("GITHUB_TOKEN").ok(),
            timeout_secs: 30,
        }
    }
}

impl GitHubConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific API base URL
    pub fn new(api_url: &str) -> Self {
        GitHubConfig {
            api_url: api_url.to_string(),
            token: None,
            timeout_secs: 30,
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// GitHub-backed repository host
pub struct GitHubHost {
    config: GitHubConfig,
    base: Url,
    http_client: reqwest::Client,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<ApiIssue> for Issue {
    fn from(api: ApiIssue) -> Self {
        Issue {
            number: api.number,
            title: api.title,
            body: api.body,
            state: if api.state == "closed" {
                IssueState::Closed
            } else {
                IssueState::Open
            },
            labels: api.labels.into_iter().map(|l| l.name).collect(),
            updated_at: api.updated_at,
            author: api.user.map(|u| u.login),
            is_pull_request: api.pull_request.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    filename: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct ApiPermission {
    permission: String,
}

#[derive(Debug, Deserialize)]
struct ApiSearch {
    total_count: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl GitHubHost {
    /// Create a new GitHub host client
    pub fn new(config: GitHubConfig) -> HostResult<Self> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| HostError::InvalidUrl(format!("{}: {e}", config.api_url)))?;
        if base.cannot_be_a_base() {
            return Err(HostError::InvalidUrl(config.api_url.clone()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(GitHubHost {
            config,
            base,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> HostResult<Self> {
        Self::new(GitHubConfig::from_env())
    }

    /// Build an endpoint URL from raw path segments; each segment is
    /// percent-encoded, so label names with spaces or colons are safe.
    fn endpoint(&self, segments: &[&str]) -> HostResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| HostError::InvalidUrl(self.config.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, owner: &str, repo: &str, rest: &[&str]) -> HostResult<Url> {
        let mut segments = vec!["repos", owner, repo];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and map non-success statuses to `HostError`.
    async fn send(&self, builder: RequestBuilder) -> HostResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if let Some(reset_at) = rate_limit_reset(&response) {
            return Err(HostError::RateLimited {
                reset_at: Some(reset_at),
            });
        }

        let code = status.as_u16();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
        };
        Err(HostError::Api {
            status: code,
            message,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> HostResult<T> {
        let response = self.send(self.request(Method::GET, url).query(query)).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Walk every page of a list endpoint.
    async fn get_all_pages<T: serde::de::DeserializeOwned>(&self, url: Url) -> HostResult<Vec<T>> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let batch: Vec<T> = self
                .get_json(
                    url.clone(),
                    &[
                        ("per_page", MAX_PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let short = batch.len() < MAX_PER_PAGE as usize;
            all.extend(batch);
            if short {
                break;
            }
            page += 1;
        }
        Ok(all)
    }
}

/// Rate-limit reset time, if the response is a rate-limit rejection.
fn rate_limit_reset(response: &Response) -> Option<DateTime<Utc>> {
    let status = response.status().as_u16();
    if status != 403 && status != 429 {
        return None;
    }
    let headers = response.headers();
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    if remaining != Some(0) {
        return None;
    }
    headers
        .get("x-ratelimit-reset")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .or(Some(Utc::now()))
}

#[async_trait]
impl RepoHost for GitHubHost {
    #[instrument(skip(self))]
    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> HostResult<Issue> {
        let n = number.to_string();
        let url = self.repo_endpoint(owner, repo, &["issues", &n])?;
        let issue: ApiIssue = self.get_json(url, &[]).await?;
        Ok(issue.into())
    }

    #[instrument(skip(self))]
    async fn get_issues(
        &self,
        owner: &str,
        repo: &str,
        query: IssueQuery,
    ) -> HostResult<Vec<Issue>> {
        let url = self.repo_endpoint(owner, repo, &["issues"])?;
        let issues: Vec<ApiIssue> = self
            .get_json(
                url,
                &[
                    ("state", query.state.as_str().to_string()),
                    ("per_page", query.per_page.to_string()),
                    ("page", query.page.to_string()),
                ],
            )
            .await?;
        debug!(count = issues.len(), page = query.page, "fetched issues page");
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    #[instrument(skip(self))]
    async fn get_pr_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> HostResult<Vec<ChangedFile>> {
        let n = number.to_string();
        let url = self.repo_endpoint(owner, repo, &["pulls", &n, "files"])?;
        let files: Vec<ApiFile> = self.get_all_pages(url).await?;
        Ok(files
            .into_iter()
            .map(|f| ChangedFile {
                filename: f.filename,
                additions: f.additions,
                deletions: f.deletions,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> HostResult<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let n = number.to_string();
        let url = self.repo_endpoint(owner, repo, &["issues", &n, "labels"])?;
        let body = serde_json::json!({ "labels": labels });
        self.send(self.request(Method::POST, url).json(&body)).await?;
        info!("Added {} labels to {}/{}#{}", labels.len(), owner, repo, number);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> HostResult<()> {
        let n = number.to_string();
        let url = self.repo_endpoint(owner, repo, &["issues", &n, "labels", label])?;
        match self.send(self.request(Method::DELETE, url)).await {
            Ok(_) => Ok(()),
            // Already gone
            Err(e) if e.is_not_found() => {
                debug!("Label '{}' not present on {}/{}#{}", label, owner, repo, number);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, body))]
    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> HostResult<()> {
        let n = number.to_string();
        let url = self.repo_endpoint(owner, repo, &["issues", &n, "comments"])?;
        let payload = serde_json::json!({ "body": body });
        self.send(self.request(Method::POST, url).json(&payload)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> HostResult<()> {
        let n = number.to_string();
        let url = self.repo_endpoint(owner, repo, &["issues", &n])?;
        let payload = serde_json::json!({ "state": "closed" });
        self.send(self.request(Method::PATCH, url).json(&payload)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn collaborator_permission(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> HostResult<Permission> {
        let url = self.repo_endpoint(owner, repo, &["collaborators", user, "permission"])?;
        let body: ApiPermission = self.get_json(url, &[]).await?;
        Ok(Permission::parse(&body.permission))
    }

    #[instrument(skip(self))]
    async fn count_authored_items(&self, owner: &str, repo: &str, user: &str) -> HostResult<u64> {
        let url = self.endpoint(&["search", "issues"])?;
        let q = format!("repo:{owner}/{repo} author:{user}");
        // Only the total matters; keep the page tiny.
        let body: ApiSearch = self
            .get_json(url, &[("q", q), ("per_page", "2".to_string())])
            .await?;
        Ok(body.total_count)
    }

    #[instrument(skip(self))]
    async fn list_repo_labels(&self, owner: &str, repo: &str) -> HostResult<Vec<RepoLabel>> {
        let url = self.repo_endpoint(owner, repo, &["labels"])?;
        let labels: Vec<ApiLabel> = self.get_all_pages(url).await?;
        Ok(labels
            .into_iter()
            .map(|l| RepoLabel {
                name: l.name,
                color: l.color,
                description: l.description,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_label(&self, owner: &str, repo: &str, label: &RepoLabel) -> HostResult<()> {
        let url = self.repo_endpoint(owner, repo, &["labels"])?;
        self.send(self.request(Method::POST, url).json(label)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> HostResult<()> {
        let url = self.repo_endpoint(owner, repo, &["statuses", sha])?;
        self.send(self.request(Method::POST, url).json(status)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(api_url: &str) -> GitHubHost {
        GitHubHost::new(GitHubConfig::new(api_url)).unwrap()
    }

    #[test]
    fn test_github_config_new() {
        let config = GitHubConfig::new("https://ghe.example.com/api/v3");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
        assert!(config.token.is_none());
    }

    #[test]
    fn test_github_config_with_token() {
        let config = GitHubConfig::new(DEFAULT_API_URL).with_token("secret-token");
        assert_eq!(config.token, Some("secret-token".to_string()));
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let err = GitHubHost::new(GitHubConfig::new("not a url")).err().unwrap();
        assert!(matches!(err, HostError::InvalidUrl(_)));
    }

    #[test]
    fn test_label_segment_is_percent_encoded() {
        let host = host(DEFAULT_API_URL);
        let url = host
            .repo_endpoint("octo", "widgets", &["issues", "7", "labels", "priority: critical"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/widgets/issues/7/labels/priority:%20critical"
        );
    }

    #[test]
    fn test_enterprise_base_path_is_preserved() {
        let host = host("https://ghe.example.com/api/v3/");
        let url = host.repo_endpoint("octo", "widgets", &["labels"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/widgets/labels"
        );
    }

    #[test]
    fn test_api_issue_decodes_pull_request_marker() {
        let json = r#"{
            "number": 42,
            "title": "Fix crash",
            "body": null,
            "state": "open",
            "labels": [{"name": "bug", "color": "d73a4a"}],
            "updated_at": "2024-01-02T03:04:05Z",
            "user": {"login": "octocat"},
            "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/42"}
        }"#;
        let issue: Issue = serde_json::from_str::<ApiIssue>(json).unwrap().into();
        assert_eq!(issue.number, 42);
        assert_eq!(issue.labels, vec!["bug".to_string()]);
        assert_eq!(issue.author.as_deref(), Some("octocat"));
        assert!(issue.is_pull_request);
        assert_eq!(issue.state, IssueState::Open);
    }

    #[test]
    fn test_api_issue_without_user_or_pr() {
        let json = r#"{
            "number": 3,
            "state": "closed",
            "updated_at": "2024-01-02T03:04:05Z"
        }"#;
        let issue: Issue = serde_json::from_str::<ApiIssue>(json).unwrap().into();
        assert!(issue.author.is_none());
        assert!(!issue.is_pull_request);
        assert_eq!(issue.state, IssueState::Closed);
        assert!(issue.labels.is_empty());
    }
}
