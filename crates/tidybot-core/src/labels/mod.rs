//! Label classification.
//!
//! Candidate labels come from four independent producers (content rules,
//! file rules, size tiers, contributor status). Each producer is a pure
//! function of an [`ItemSnapshot`] and the auto-labeling config; the engine
//! gathers the snapshot from the host once, concatenates producer output in
//! a fixed order and reduces it once in [`resolve`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tidybot_host::{ChangedFile, ContributorSignals};

pub mod engine;
pub mod producers;
pub mod resolve;
pub mod sync;

pub use engine::LabelManager;
pub use producers::{size_label, PIPELINE};
pub use resolve::{resolve, subtract_present};
pub use sync::{category_color, full_label_name};

/// A (label, priority) pair produced by one rule match, before dedup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCandidate {
    pub label: String,
    pub priority: u32,
}

impl LabelCandidate {
    pub fn new(label: impl Into<String>, priority: u32) -> Self {
        Self {
            label: label.into(),
            priority,
        }
    }
}

/// Input to one classification call.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRequest<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub number: u64,
    /// Body text
    pub content: &'a str,
    pub title: Option<&'a str>,
    pub is_pr: bool,
}

/// Everything the producers may look at, fetched once per call.
///
/// `current_labels` is the snapshot taken at the start of the call and is
/// never refreshed while candidates are computed.
#[derive(Debug, Clone)]
pub struct ItemSnapshot<'a> {
    pub content: &'a str,
    pub title: Option<&'a str>,
    pub current_labels: &'a [String],
    /// Present only for pull requests whose files were needed
    pub changed_files: Option<&'a [ChangedFile]>,
    /// Present only when some producer needed it
    pub contributor: Option<ContributorSignals>,
}

impl ItemSnapshot<'_> {
    pub fn has_label(&self, label: &str) -> bool {
        self.current_labels.iter().any(|l| l == label)
    }
}

/// Key of the call-scoped contributor lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// Contributor signals memoised for the lifetime of one classification call.
pub type ContributorCache = HashMap<ItemKey, ContributorSignals>;
