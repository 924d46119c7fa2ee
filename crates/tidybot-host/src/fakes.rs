//! In-memory fake for the host trait (testing only)
//!
//! `MemoryRepoHost` satisfies the `RepoHost` contract without any network
//! access. It records every write in order, counts reads per operation, and
//! can be told to fail a given operation for a given item.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::HostError;
use crate::host_traits::*;

/// Host operations, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    GetIssue,
    GetIssues,
    GetPrFiles,
    AddLabels,
    RemoveLabel,
    CreateComment,
    CloseIssue,
    CollaboratorPermission,
    CountAuthoredItems,
    ListRepoLabels,
    CreateLabel,
    CreateStatus,
}

/// A recorded write against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostWrite {
    AddLabels { number: u64, labels: Vec<String> },
    RemoveLabel { number: u64, label: String },
    Comment { number: u64, body: String },
    Close { number: u64 },
    CreateLabel { label: RepoLabel },
    Status { sha: String, status: CommitStatus },
}

#[derive(Debug, Default)]
struct HostState {
    issues: BTreeMap<u64, Issue>,
    files: HashMap<u64, Vec<ChangedFile>>,
    permissions: HashMap<String, Permission>,
    authored: HashMap<String, u64>,
    repo_labels: Vec<RepoLabel>,
    writes: Vec<HostWrite>,
    calls: HashMap<HostOp, usize>,
    /// `None` item means "fail for every item"
    failures: HashSet<(HostOp, Option<u64>)>,
}

impl HostState {
    fn enter(&mut self, op: HostOp, number: Option<u64>) -> HostResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        if self.failures.contains(&(op, None))
            || number.is_some_and(|n| self.failures.contains(&(op, Some(n))))
        {
            return Err(HostError::Injected(format!("{op:?} failed")));
        }
        Ok(())
    }

    fn issue_mut(&mut self, number: u64) -> HostResult<&mut Issue> {
        self.issues.get_mut(&number).ok_or_else(|| HostError::NotFound {
            what: format!("item #{number}"),
        })
    }
}

/// In-memory repository host for a single repository.
///
/// `owner`/`repo` arguments are accepted but not checked; one fake models
/// one repository.
#[derive(Debug, Default)]
pub struct MemoryRepoHost {
    state: Mutex<HostState>,
}

impl MemoryRepoHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    pub fn insert_issue(&self, issue: Issue) {
        let mut state = self.state.lock().unwrap();
        state.issues.insert(issue.number, issue);
    }

    /// Set the changed files of a pull request.
    pub fn set_pr_files(&self, number: u64, files: Vec<ChangedFile>) {
        self.state.lock().unwrap().files.insert(number, files);
    }

    pub fn set_permission(&self, user: &str, permission: Permission) {
        self.state
            .lock()
            .unwrap()
            .permissions
            .insert(user.to_string(), permission);
    }

    pub fn set_authored_count(&self, user: &str, count: u64) {
        self.state
            .lock()
            .unwrap()
            .authored
            .insert(user.to_string(), count);
    }

    pub fn add_repo_label(&self, label: RepoLabel) {
        self.state.lock().unwrap().repo_labels.push(label);
    }

    /// Make `op` fail for item `number`.
    pub fn fail_on(&self, op: HostOp, number: u64) {
        self.state.lock().unwrap().failures.insert((op, Some(number)));
    }

    /// Make `op` fail for every item.
    pub fn fail_always(&self, op: HostOp) {
        self.state.lock().unwrap().failures.insert((op, None));
    }

    /// Snapshot of an item.
    pub fn issue(&self, number: u64) -> Option<Issue> {
        self.state.lock().unwrap().issues.get(&number).cloned()
    }

    /// All writes, in the order they were made.
    pub fn writes(&self) -> Vec<HostWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Writes that touched item `number`.
    pub fn writes_for(&self, number: u64) -> Vec<HostWrite> {
        self.writes()
            .into_iter()
            .filter(|w| match w {
                HostWrite::AddLabels { number: n, .. }
                | HostWrite::RemoveLabel { number: n, .. }
                | HostWrite::Comment { number: n, .. }
                | HostWrite::Close { number: n } => *n == number,
                _ => false,
            })
            .collect()
    }

    /// How many times `op` was invoked.
    pub fn calls(&self, op: HostOp) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    pub fn repo_labels(&self) -> Vec<RepoLabel> {
        self.state.lock().unwrap().repo_labels.clone()
    }
}

#[async_trait]
impl RepoHost for MemoryRepoHost {
    async fn get_issue(&self, _owner: &str, _repo: &str, number: u64) -> HostResult<Issue> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::GetIssue, Some(number))?;
        state.issue_mut(number).map(|i| i.clone())
    }

    async fn get_issues(
        &self,
        _owner: &str,
        _repo: &str,
        query: IssueQuery,
    ) -> HostResult<Vec<Issue>> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::GetIssues, None)?;
        let per_page = query.per_page.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1) * per_page;
        Ok(state
            .issues
            .values()
            .filter(|i| query.state == IssueState::All || i.state == query.state)
            .skip(skip)
            .take(per_page)
            .cloned()
            .collect())
    }

    async fn get_pr_files(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> HostResult<Vec<ChangedFile>> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::GetPrFiles, Some(number))?;
        Ok(state.files.get(&number).cloned().unwrap_or_default())
    }

    async fn add_labels(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        labels: &[String],
    ) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::AddLabels, Some(number))?;
        let issue = state.issue_mut(number)?;
        for label in labels {
            if !issue.has_label(label) {
                issue.labels.push(label.clone());
            }
        }
        state.writes.push(HostWrite::AddLabels {
            number,
            labels: labels.to_vec(),
        });
        Ok(())
    }

    async fn remove_label(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        label: &str,
    ) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::RemoveLabel, Some(number))?;
        state.issue_mut(number)?.labels.retain(|l| l != label);
        state.writes.push(HostWrite::RemoveLabel {
            number,
            label: label.to_string(),
        });
        Ok(())
    }

    async fn create_comment(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        body: &str,
    ) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::CreateComment, Some(number))?;
        state.issue_mut(number)?;
        state.writes.push(HostWrite::Comment {
            number,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn close_issue(&self, _owner: &str, _repo: &str, number: u64) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::CloseIssue, Some(number))?;
        state.issue_mut(number)?.state = IssueState::Closed;
        state.writes.push(HostWrite::Close { number });
        Ok(())
    }

    async fn collaborator_permission(
        &self,
        _owner: &str,
        _repo: &str,
        user: &str,
    ) -> HostResult<Permission> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::CollaboratorPermission, None)?;
        Ok(state
            .permissions
            .get(user)
            .copied()
            .unwrap_or(Permission::None))
    }

    async fn count_authored_items(&self, _owner: &str, _repo: &str, user: &str) -> HostResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::CountAuthoredItems, None)?;
        if let Some(count) = state.authored.get(user) {
            return Ok(*count);
        }
        Ok(state
            .issues
            .values()
            .filter(|i| i.author.as_deref() == Some(user))
            .count() as u64)
    }

    async fn list_repo_labels(&self, _owner: &str, _repo: &str) -> HostResult<Vec<RepoLabel>> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::ListRepoLabels, None)?;
        Ok(state.repo_labels.clone())
    }

    async fn create_label(&self, _owner: &str, _repo: &str, label: &RepoLabel) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::CreateLabel, None)?;
        if state.repo_labels.iter().any(|l| l.name == label.name) {
            return Err(HostError::Api {
                status: 422,
                message: format!("label {} already exists", label.name),
            });
        }
        state.repo_labels.push(label.clone());
        state.writes.push(HostWrite::CreateLabel {
            label: label.clone(),
        });
        Ok(())
    }

    async fn create_status(
        &self,
        _owner: &str,
        _repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(HostOp::CreateStatus, None)?;
        state.writes.push(HostWrite::Status {
            sha: sha.to_string(),
            status: status.clone(),
        });
        Ok(())
    }
}
