//! Staleness lifecycle.
//!
//! Lifecycle state is never stored; it is inferred on every sweep from the
//! item's labels and last-activity timestamp:
//!
//! ```text
//! Active --(idle > daysBeforeStale)--> Stale --(idle > stale+close days)--> Closed
//!    ^                                   |
//!    +------------(activity)-------------+
//! ```
//!
//! [`decide`] is the whole state machine. [`StaleManager`] fetches open
//! items, applies the decided action per item and collects a report. A
//! failing item is recorded and the sweep moves on.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tidybot_host::{Issue, RepoHost};
use tracing::{debug, info, instrument, Instrument};

use crate::config::StaleConfig;
use crate::error::{item_target, Result, TidyError};
use crate::obs::{self, SweepSpan};

// ---------------------------------------------------------------------------
// Decision table
// ---------------------------------------------------------------------------

/// Cut-off instants for one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Items idle since before this are stale.
    pub stale: DateTime<Utc>,
    /// Stale items idle since before this are closed.
    pub close: DateTime<Utc>,
}

impl Thresholds {
    /// Fails with [`TidyError::InvalidConfig`] when a window reaches past
    /// the representable date range.
    pub fn at(now: DateTime<Utc>, config: &StaleConfig) -> Result<Self> {
        let stale_days = i64::from(config.days_before_stale);
        let close_days = stale_days + i64::from(config.days_before_close);
        Ok(Self {
            stale: days_before(now, stale_days, "stale.daysBeforeStale")?,
            close: days_before(now, close_days, "stale.daysBeforeClose")?,
        })
    }
}

fn days_before(now: DateTime<Utc>, days: i64, option: &str) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            TidyError::InvalidConfig(format!("{option} of {days} days is out of range"))
        })
}

/// Inferred lifecycle state of an open item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Active,
    Stale,
    PendingClose,
}

impl LifecycleState {
    pub fn infer(
        labels: &[String],
        updated_at: DateTime<Utc>,
        thresholds: &Thresholds,
        config: &StaleConfig,
    ) -> Self {
        if !has(labels, &config.stale_label) {
            LifecycleState::Active
        } else if updated_at < thresholds.close {
            LifecycleState::PendingClose
        } else {
            LifecycleState::Stale
        }
    }
}

/// What a sweep does to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleAction {
    NoAction,
    /// Add the stale label, then the stale comment if configured.
    MarkStale,
    /// Remove the stale label; no comment.
    Unmark,
    /// Close comment if configured, then close.
    Close,
}

impl StaleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StaleAction::NoAction => "no_action",
            StaleAction::MarkStale => "mark_stale",
            StaleAction::Unmark => "unmark",
            StaleAction::Close => "close",
        }
    }
}

fn has(labels: &[String], label: &str) -> bool {
    labels.iter().any(|l| l == label)
}

/// Decide the action for an item. Pure; exemption is checked first and is
/// absolute.
pub fn decide(
    labels: &[String],
    updated_at: DateTime<Utc>,
    thresholds: &Thresholds,
    config: &StaleConfig,
) -> StaleAction {
    if config.exempt_labels.iter().any(|exempt| has(labels, exempt)) {
        return StaleAction::NoAction;
    }

    let is_stale = has(labels, &config.stale_label);
    if is_stale && updated_at < thresholds.close {
        StaleAction::Close
    } else if !is_stale && updated_at < thresholds.stale {
        StaleAction::MarkStale
    } else if is_stale && updated_at >= thresholds.stale {
        StaleAction::Unmark
    } else {
        StaleAction::NoAction
    }
}

// ---------------------------------------------------------------------------
// Sweep report
// ---------------------------------------------------------------------------

/// Action taken on one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleOutcome {
    pub number: u64,
    pub action: StaleAction,
}

/// An item whose processing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleFailure {
    pub number: u64,
    /// Host operation that failed
    pub operation: String,
    pub message: String,
}

/// Result of one sweep over a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleSweepReport {
    /// Items that were processed, ordered by number.
    pub outcomes: Vec<StaleOutcome>,
    /// Items that failed, ordered by number.
    pub failures: Vec<StaleFailure>,
}

impl StaleSweepReport {
    pub fn examined(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    /// Items that had a write applied.
    pub fn acted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action != StaleAction::NoAction)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn action_for(&self, number: u64) -> Option<StaleAction> {
        self.outcomes
            .iter()
            .find(|o| o.number == number)
            .map(|o| o.action)
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Runs staleness sweeps against a repository host.
pub struct StaleManager {
    host: Arc<dyn RepoHost>,
    config: StaleConfig,
}

impl StaleManager {
    pub fn new(host: Arc<dyn RepoHost>, config: StaleConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &StaleConfig {
        &self.config
    }

    /// Sweep every open item of `owner/repo` as of now.
    pub async fn process_stale_items(&self, owner: &str, repo: &str) -> Result<StaleSweepReport> {
        self.process_stale_items_at(owner, repo, Utc::now()).await
    }

    /// Sweep every open item of `owner/repo` as of `now`.
    ///
    /// Listing the open items is the only failure that aborts the sweep.
    pub async fn process_stale_items_at(
        &self,
        owner: &str,
        repo: &str,
        now: DateTime<Utc>,
    ) -> Result<StaleSweepReport> {
        let repo_target = format!("{owner}/{repo}");
        let sweep = SweepSpan::new(&repo_target);
        debug!(sweep_id = %sweep.sweep_id(), "starting stale sweep");

        self.sweep(owner, repo, now)
            .instrument(sweep.span())
            .await
    }

    async fn sweep(&self, owner: &str, repo: &str, now: DateTime<Utc>) -> Result<StaleSweepReport> {
        let repo_target = format!("{owner}/{repo}");
        let thresholds = Thresholds::at(now, &self.config)?;
        let items = self
            .host
            .list_open_items(owner, repo)
            .await
            .map_err(|e| TidyError::host("list_open_items", &repo_target, e))?;

        info!(
            items = items.len(),
            stale_before = %thresholds.stale,
            close_before = %thresholds.close,
            "sweeping open items"
        );

        let results: Vec<(u64, Result<StaleAction>)> = stream::iter(items.iter())
            .map(|item| async move {
                let result = self.process_item(owner, repo, item, &thresholds).await;
                (item.number, result)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = StaleSweepReport::default();
        for (number, result) in results {
            match result {
                Ok(action) => report.outcomes.push(StaleOutcome { number, action }),
                Err(e) => {
                    obs::emit_stale_item_failed(&item_target(owner, repo, number), &e);
                    let operation = match &e {
                        TidyError::HostCall { operation, .. } => operation.to_string(),
                        _ => "process_item".to_string(),
                    };
                    report.failures.push(StaleFailure {
                        number,
                        operation,
                        message: e.to_string(),
                    });
                }
            }
        }
        report.outcomes.sort_by_key(|o| o.number);
        report.failures.sort_by_key(|f| f.number);

        obs::emit_sweep_finished(
            &repo_target,
            report.examined(),
            report.acted(),
            report.failures.len(),
        );
        Ok(report)
    }

    /// Apply the decided action to one item.
    #[instrument(skip(self, item, thresholds), fields(number = item.number))]
    async fn process_item(
        &self,
        owner: &str,
        repo: &str,
        item: &Issue,
        thresholds: &Thresholds,
    ) -> Result<StaleAction> {
        let target = item_target(owner, repo, item.number);
        let state = LifecycleState::infer(&item.labels, item.updated_at, thresholds, &self.config);
        let action = decide(&item.labels, item.updated_at, thresholds, &self.config);
        debug!(?state, action = action.as_str(), "decided");

        match action {
            StaleAction::NoAction => return Ok(action),
            StaleAction::Close => {
                if let Some(message) = non_empty(&self.config.close_message) {
                    self.host
                        .create_comment(owner, repo, item.number, message)
                        .await
                        .map_err(|e| TidyError::host("create_comment", &target, e))?;
                }
                self.host
                    .close_issue(owner, repo, item.number)
                    .await
                    .map_err(|e| TidyError::host("close_issue", &target, e))?;
            }
            StaleAction::MarkStale => {
                self.host
                    .add_labels(
                        owner,
                        repo,
                        item.number,
                        std::slice::from_ref(&self.config.stale_label),
                    )
                    .await
                    .map_err(|e| TidyError::host("add_labels", &target, e))?;
                if let Some(message) = non_empty(&self.config.stale_message) {
                    self.host
                        .create_comment(owner, repo, item.number, message)
                        .await
                        .map_err(|e| TidyError::host("create_comment", &target, e))?;
                }
            }
            StaleAction::Unmark => {
                self.host
                    .remove_label(owner, repo, item.number, &self.config.stale_label)
                    .await
                    .map_err(|e| TidyError::host("remove_label", &target, e))?;
            }
        }

        obs::emit_stale_transition(&target, action.as_str());
        Ok(action)
    }
}

fn non_empty(message: &Option<String>) -> Option<&str> {
    message.as_deref().filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn decide_for(names: &[&str], idle_days: i64) -> StaleAction {
        let config = StaleConfig::default();
        let thresholds = Thresholds::at(now(), &config).unwrap();
        decide(&labels(names), days_ago(idle_days), &thresholds, &config)
    }

    #[test]
    fn test_thresholds() {
        let t = Thresholds::at(now(), &StaleConfig::default()).unwrap();
        assert_eq!(t.stale, days_ago(60));
        assert_eq!(t.close, days_ago(67));
    }

    #[test]
    fn test_thresholds_out_of_range_is_an_error() {
        let config = StaleConfig {
            days_before_stale: u32::MAX,
            ..StaleConfig::default()
        };
        let err = Thresholds::at(now(), &config).unwrap_err();
        assert!(matches!(err, TidyError::InvalidConfig(_)));
        assert!(err.to_string().contains("daysBeforeStale"));

        let config = StaleConfig {
            days_before_close: u32::MAX,
            ..StaleConfig::default()
        };
        assert!(Thresholds::at(now(), &config).is_err());
    }

    #[test]
    fn test_decision_table() {
        assert_eq!(decide_for(&[], 61), StaleAction::MarkStale);
        assert_eq!(decide_for(&["stale"], 68), StaleAction::Close);
        assert_eq!(decide_for(&["stale"], 59), StaleAction::Unmark);
        assert_eq!(decide_for(&["pinned"], 61), StaleAction::NoAction);
        assert_eq!(decide_for(&["pinned", "stale"], 400), StaleAction::NoAction);
        assert_eq!(decide_for(&[], 59), StaleAction::NoAction);
        // Stale but not yet past the close cut-off
        assert_eq!(decide_for(&["stale"], 64), StaleAction::NoAction);
    }

    #[test]
    fn test_boundaries_are_strict() {
        // Exactly at the stale threshold is not stale yet
        assert_eq!(decide_for(&[], 60), StaleAction::NoAction);
        // Exactly at the stale threshold with the label counts as active again
        assert_eq!(decide_for(&["stale"], 60), StaleAction::Unmark);
        // Exactly at the close threshold is not closed yet
        assert_eq!(decide_for(&["stale"], 67), StaleAction::NoAction);
    }

    #[test]
    fn test_infer_state() {
        let config = StaleConfig::default();
        let t = Thresholds::at(now(), &config).unwrap();
        assert_eq!(
            LifecycleState::infer(&labels(&[]), days_ago(90), &t, &config),
            LifecycleState::Active
        );
        assert_eq!(
            LifecycleState::infer(&labels(&["stale"]), days_ago(61), &t, &config),
            LifecycleState::Stale
        );
        assert_eq!(
            LifecycleState::infer(&labels(&["stale"]), days_ago(68), &t, &config),
            LifecycleState::PendingClose
        );
    }

    #[test]
    fn test_blank_messages_are_skipped() {
        assert_eq!(non_empty(&Some("  ".to_string())), None);
        assert_eq!(non_empty(&None), None);
        assert_eq!(non_empty(&Some("bye".to_string())), Some("bye"));
    }

    #[test]
    fn test_report_counts() {
        let report = StaleSweepReport {
            outcomes: vec![
                StaleOutcome {
                    number: 1,
                    action: StaleAction::Close,
                },
                StaleOutcome {
                    number: 2,
                    action: StaleAction::NoAction,
                },
            ],
            failures: vec![StaleFailure {
                number: 3,
                operation: "close_issue".to_string(),
                message: "boom".to_string(),
            }],
        };
        assert_eq!(report.examined(), 3);
        assert_eq!(report.acted(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.action_for(1), Some(StaleAction::Close));
        assert_eq!(report.action_for(3), None);
    }
}
