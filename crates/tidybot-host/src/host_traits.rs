//! Repository host capability for tidybot
//!
//! `RepoHost` is the narrow interface the decision engines consume:
//! - item reads (`get_issue`, `get_issues`, `list_open_items`, `get_pr_files`)
//! - item writes (`add_labels`, `remove_label`, `create_comment`, `close_issue`)
//! - contributor history (`collaborator_permission`, `count_authored_items`,
//!   `get_user_info`)
//! - repository catalog and statuses (`list_repo_labels`, `create_label`,
//!   `create_status`)
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HostError;

/// Result type for host operations
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Largest page size the host accepts for list endpoints.
pub const MAX_PER_PAGE: u32 = 100;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Open/closed state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
    All,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

/// An issue or pull request as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: IssueState,
    /// Label names currently applied
    pub labels: Vec<String>,
    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
    /// Login of the author, if the host reports one
    pub author: Option<String>,
    pub is_pull_request: bool,
}

impl Issue {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Filter and page selection for `get_issues`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueQuery {
    pub state: IssueState,
    pub per_page: u32,
    /// 1-based page index
    pub page: u32,
}

impl IssueQuery {
    /// First page of open items at the maximum page size.
    pub fn open() -> Self {
        Self {
            state: IssueState::Open,
            per_page: MAX_PER_PAGE,
            page: 1,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// A file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    pub additions: u64,
    pub deletions: u64,
}

impl ChangedFile {
    pub fn changes(&self) -> u64 {
        self.additions + self.deletions
    }
}

// ---------------------------------------------------------------------------
// Contributors
// ---------------------------------------------------------------------------

/// Repository permission level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
    None,
}

impl Permission {
    /// Parse the host's permission string. Unknown values map to `None`.
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Permission::Admin,
            "maintain" => Permission::Maintain,
            "write" => Permission::Write,
            "triage" => Permission::Triage,
            "read" => Permission::Read,
            _ => Permission::None,
        }
    }

    /// Only `admin` and `write` count as maintainer access.
    pub fn is_maintainer(self) -> bool {
        matches!(self, Permission::Admin | Permission::Write)
    }
}

/// Advisory signals about the author of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorSignals {
    pub is_first_time_contributor: bool,
    pub is_maintainer: bool,
}

// ---------------------------------------------------------------------------
// Repository catalog and statuses
// ---------------------------------------------------------------------------

/// A label defined on the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLabel {
    pub name: String,
    /// Hex colour without the leading `#`
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Commit status state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    Error,
    Failure,
    Pending,
    Success,
}

/// A commit status to publish against a SHA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: StatusState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

// ---------------------------------------------------------------------------
// RepoHost
// ---------------------------------------------------------------------------

/// Repository host capability.
///
/// Guarantees:
/// - Every method is a single fallible host round trip unless documented
///   otherwise (`list_open_items`, `get_user_info`).
/// - `remove_label` succeeds when the label is already absent.
/// - `add_labels` is all-or-nothing at the host boundary.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Fetch one issue or pull request.
    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> HostResult<Issue>;

    /// Fetch one page of issues and pull requests.
    async fn get_issues(
        &self,
        owner: &str,
        repo: &str,
        query: IssueQuery,
    ) -> HostResult<Vec<Issue>>;

    /// List changed files of a pull request.
    async fn get_pr_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> HostResult<Vec<ChangedFile>>;

    /// Add labels to an item.
    async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> HostResult<()>;

    /// Remove one label from an item.
    async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> HostResult<()>;

    /// Post a comment on an item.
    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> HostResult<()>;

    /// Set an item's state to closed.
    async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> HostResult<()>;

    /// Permission level of `user` on the repository.
    async fn collaborator_permission(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> HostResult<Permission>;

    /// Number of issues and pull requests `user` has authored in the repository.
    async fn count_authored_items(&self, owner: &str, repo: &str, user: &str) -> HostResult<u64>;

    /// List labels defined on the repository.
    async fn list_repo_labels(&self, owner: &str, repo: &str) -> HostResult<Vec<RepoLabel>>;

    /// Create a repository label.
    async fn create_label(&self, owner: &str, repo: &str, label: &RepoLabel) -> HostResult<()>;

    /// Publish a commit status.
    async fn create_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> HostResult<()>;

    /// Every open item, walking pages until a short page is returned.
    async fn list_open_items(&self, owner: &str, repo: &str) -> HostResult<Vec<Issue>> {
        let mut items = Vec::new();
        let mut query = IssueQuery::open();
        loop {
            let page = self.get_issues(owner, repo, query).await?;
            let short = page.len() < query.per_page as usize;
            items.extend(page);
            if short {
                break;
            }
            query = query.with_page(query.page + 1);
        }
        debug!(owner, repo, count = items.len(), "listed open items");
        Ok(items)
    }

    /// Contributor signals for the author of an item.
    ///
    /// Fails only when the item itself cannot be fetched. The permission and
    /// authored-count lookups are advisory: either failing yields `false`
    /// for that signal.
    async fn get_user_info(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> HostResult<ContributorSignals> {
        let issue = self.get_issue(owner, repo, number).await?;
        let user = issue.author.unwrap_or_else(|| "unknown".to_string());

        let is_maintainer = match self.collaborator_permission(owner, repo, &user).await {
            Ok(permission) => permission.is_maintainer(),
            Err(e) => {
                debug!(
                    user = %user,
                    error = %e,
                    "permission lookup failed, assuming non-maintainer"
                );
                false
            }
        };

        let is_first_time_contributor = match self.count_authored_items(owner, repo, &user).await {
            Ok(count) => count <= 1,
            Err(e) => {
                debug!(
                    user = %user,
                    error = %e,
                    "history lookup failed, assuming returning contributor"
                );
                false
            }
        };

        Ok(ContributorSignals {
            is_first_time_contributor,
            is_maintainer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_parse_and_maintainer() {
        assert!(Permission::parse("admin").is_maintainer());
        assert!(Permission::parse("write").is_maintainer());
        assert!(!Permission::parse("maintain").is_maintainer());
        assert!(!Permission::parse("read").is_maintainer());
        assert_eq!(Permission::parse("bogus"), Permission::None);
    }

    #[test]
    fn test_changed_file_changes_sums_both_sides() {
        let file = ChangedFile {
            filename: "src/lib.rs".to_string(),
            additions: 7,
            deletions: 3,
        };
        assert_eq!(file.changes(), 10);
    }

    #[test]
    fn test_issue_query_paging() {
        let q = IssueQuery::open();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, MAX_PER_PAGE);
        assert_eq!(q.with_page(3).page, 3);
        assert_eq!(q.state.as_str(), "open");
    }

    #[test]
    fn test_commit_status_omits_unset_fields() {
        let status = CommitStatus {
            state: StatusState::Failure,
            description: Some("PR title format is invalid".to_string()),
            context: None,
            target_url: None,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"state": "failure", "description": "PR title format is invalid"})
        );
    }
}
