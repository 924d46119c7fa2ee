//! Trait contract tests for RepoHost.
//!
//! These tests verify the behavioral contracts of the host trait, including
//! its default methods, using the in-memory fake.

use chrono::{Duration, Utc};
use tidybot_host::fakes::{HostOp, HostWrite, MemoryRepoHost};
use tidybot_host::*;

fn issue(number: u64, author: &str, labels: &[&str]) -> Issue {
    Issue {
        number,
        title: format!("item {number}"),
        body: None,
        state: IssueState::Open,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        updated_at: Utc::now() - Duration::days(1),
        author: Some(author.to_string()),
        is_pull_request: false,
    }
}

// ===========================================================================
// Reads
// ===========================================================================

#[tokio::test]
async fn test_get_issue_not_found() {
    let host = MemoryRepoHost::new();
    let err = host.get_issue("o", "r", 9).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_open_items_walks_every_page() {
    let host = MemoryRepoHost::new();
    for n in 1..=250 {
        host.insert_issue(issue(n, "alice", &[]));
    }
    let mut closed = issue(251, "alice", &[]);
    closed.state = IssueState::Closed;
    host.insert_issue(closed);

    let items = host.list_open_items("o", "r").await.unwrap();

    assert_eq!(items.len(), 250);
    assert!(items.iter().all(|i| i.state == IssueState::Open));
    assert_eq!(host.calls(HostOp::GetIssues), 3);
}

#[tokio::test]
async fn test_list_open_items_exact_page_boundary_fetches_empty_tail() {
    let host = MemoryRepoHost::new();
    for n in 1..=100 {
        host.insert_issue(issue(n, "alice", &[]));
    }

    let items = host.list_open_items("o", "r").await.unwrap();

    assert_eq!(items.len(), 100);
    assert_eq!(host.calls(HostOp::GetIssues), 2);
}

#[tokio::test]
async fn test_list_open_items_propagates_failure() {
    let host = MemoryRepoHost::new();
    host.fail_always(HostOp::GetIssues);
    assert!(host.list_open_items("o", "r").await.is_err());
}

// ===========================================================================
// Writes
// ===========================================================================

#[tokio::test]
async fn test_add_labels_is_recorded_and_applied() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "alice", &["bug"]));

    host.add_labels("o", "r", 1, &["bug".to_string(), "ui".to_string()])
        .await
        .unwrap();

    assert_eq!(host.issue(1).unwrap().labels, vec!["bug", "ui"]);
    assert_eq!(
        host.writes(),
        vec![HostWrite::AddLabels {
            number: 1,
            labels: vec!["bug".to_string(), "ui".to_string()],
        }]
    );
}

#[tokio::test]
async fn test_remove_absent_label_succeeds() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "alice", &[]));
    host.remove_label("o", "r", 1, "stale").await.unwrap();
    assert!(host.issue(1).unwrap().labels.is_empty());
}

#[tokio::test]
async fn test_close_issue_removes_item_from_open_listing() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "alice", &[]));
    host.insert_issue(issue(2, "bob", &[]));

    host.close_issue("o", "r", 1).await.unwrap();

    let open = host.list_open_items("o", "r").await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].number, 2);
}

#[tokio::test]
async fn test_injected_failure_is_scoped_to_item() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "alice", &[]));
    host.insert_issue(issue(2, "bob", &[]));
    host.fail_on(HostOp::CreateComment, 1);

    assert!(host.create_comment("o", "r", 1, "hi").await.is_err());
    assert!(host.create_comment("o", "r", 2, "hi").await.is_ok());
    assert!(host.writes_for(1).is_empty());
    assert_eq!(host.writes_for(2).len(), 1);
}

// ===========================================================================
// get_user_info default method
// ===========================================================================

#[tokio::test]
async fn test_user_info_first_time_and_maintainer() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "alice", &[]));
    host.set_permission("alice", Permission::Admin);

    let info = host.get_user_info("o", "r", 1).await.unwrap();

    assert!(info.is_first_time_contributor);
    assert!(info.is_maintainer);
}

#[tokio::test]
async fn test_user_info_returning_read_only_contributor() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "bob", &[]));
    host.set_authored_count("bob", 5);
    host.set_permission("bob", Permission::Read);

    let info = host.get_user_info("o", "r", 1).await.unwrap();

    assert!(!info.is_first_time_contributor);
    assert!(!info.is_maintainer);
}

#[tokio::test]
async fn test_user_info_sub_lookup_failures_default_to_false() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "alice", &[]));
    host.set_permission("alice", Permission::Write);
    host.fail_always(HostOp::CollaboratorPermission);
    host.fail_always(HostOp::CountAuthoredItems);

    let info = host.get_user_info("o", "r", 1).await.unwrap();

    assert_eq!(info, ContributorSignals::default());
}

#[tokio::test]
async fn test_user_info_fails_when_item_fetch_fails() {
    let host = MemoryRepoHost::new();
    host.insert_issue(issue(1, "alice", &[]));
    host.fail_on(HostOp::GetIssue, 1);
    assert!(host.get_user_info("o", "r", 1).await.is_err());
}

// ===========================================================================
// Catalog
// ===========================================================================

#[tokio::test]
async fn test_create_duplicate_label_is_rejected() {
    let host = MemoryRepoHost::new();
    let label = RepoLabel {
        name: "bug".to_string(),
        color: "fbca04".to_string(),
        description: None,
    };
    host.create_label("o", "r", &label).await.unwrap();
    let err = host.create_label("o", "r", &label).await.unwrap_err();
    assert!(matches!(err, HostError::Api { status: 422, .. }));
    assert_eq!(host.list_repo_labels("o", "r").await.unwrap().len(), 1);
}
