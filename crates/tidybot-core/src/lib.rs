//! tidybot Core Library
//!
//! Label classification, staleness lifecycle, label-catalog sync and
//! PR-title checks over an abstract repository host.

pub mod config;
pub mod error;
pub mod labels;
pub mod obs;
pub mod pr_title;
pub mod rules;
pub mod stale;
pub mod telemetry;

pub use config::{
    load_config, AutoLabelingConfig, ClassificationRule, ContributorBasedConfig,
    ContributorLabels, FileBasedConfig, FileRule, LabelConfig, PrTitleConfig, RuleConditions,
    RuleScope, SizeBasedConfig, SizeLabels, SizeThresholds, StaleConfig, TidyConfig,
};

pub use error::{item_target, Result, TidyError};

pub use labels::{
    category_color, full_label_name, resolve, size_label, subtract_present, ClassifyRequest,
    ContributorCache, ItemKey, ItemSnapshot, LabelCandidate, LabelManager,
};

pub use obs::{
    emit_labels_added, emit_labels_synced, emit_pr_title_validated, emit_stale_item_failed,
    emit_stale_transition, emit_sweep_finished, SweepSpan,
};

pub use pr_title::{help_comment, validate_title, PrTitleValidator, TitleValidation};

pub use stale::{
    decide, LifecycleState, StaleAction, StaleFailure, StaleManager, StaleOutcome,
    StaleSweepReport, Thresholds,
};

pub use telemetry::init_tracing;

/// tidybot version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
