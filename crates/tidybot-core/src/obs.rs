//! Structured observability events for tidybot runs.
//!
//! This module provides:
//! - A sweep-scoped tracing span via `SweepSpan`
//! - Emission functions for label writes, stale transitions, sweep
//!   completion, label sync and PR-title checks
//!
//! Events are emitted at `info!` level unless noted; set `RUST_LOG` to
//! filter and pass `--json` to the CLI for machine-readable output.

use tracing::info;
use uuid::Uuid;

/// Sweep-scoped span tagged with a fresh sweep id.
///
/// The span is not entered here; attach it to the sweep
/// future with [`tracing::Instrument`] so it stays correct across awaits.
///
/// ```ignore
/// let sweep = SweepSpan::new("octo/widgets");
/// run_sweep().instrument(sweep.span()).await;
/// ```
pub struct SweepSpan {
    sweep_id: Uuid,
    span: tracing::Span,
}

impl SweepSpan {
    pub fn new(repo: &str) -> Self {
        let sweep_id = Uuid::new_v4();
        let span = tracing::info_span!("tidybot.sweep", sweep_id = %sweep_id, repo = %repo);
        Self { sweep_id, span }
    }

    pub fn sweep_id(&self) -> Uuid {
        self.sweep_id
    }

    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }
}

/// Emit event: labels were added to an item.
pub fn emit_labels_added(target: &str, labels: &[String]) {
    info!(
        event = "labels.added",
        item = %target,
        count = labels.len(),
        labels = %labels.join(", "),
    );
}

/// Emit event: a stale lifecycle action was applied to an item.
pub fn emit_stale_transition(target: &str, action: &str) {
    info!(event = "stale.transition", item = %target, action = %action);
}

/// Emit event: a stale sweep finished.
pub fn emit_sweep_finished(repo: &str, examined: usize, acted: usize, failed: usize) {
    info!(
        event = "stale.sweep_finished",
        repo = %repo,
        examined = examined,
        acted = acted,
        failed = failed,
    );
}

/// Emit event: per-item stale failure (warning level).
pub fn emit_stale_item_failed(target: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "stale.item_failed", item = %target, error = %error);
}

/// Emit event: label catalog sync created `created` labels.
pub fn emit_labels_synced(repo: &str, created: usize) {
    info!(event = "labels.synced", repo = %repo, created = created);
}

/// Emit event: a PR title was checked.
pub fn emit_pr_title_validated(target: &str, valid: bool, errors: usize) {
    info!(
        event = "pr_title.validated",
        item = %target,
        valid = valid,
        errors = errors,
    );
}
