use std::sync::Arc;

use tidybot_host::{ChangedFile, ContributorSignals, RepoHost};
use tracing::{debug, instrument, warn};

use super::producers::{self, PIPELINE};
use super::resolve::{resolve, subtract_present};
use super::{ClassifyRequest, ContributorCache, ItemKey, ItemSnapshot};
use crate::config::LabelConfig;
use crate::error::{item_target, Result, TidyError};
use crate::obs;

/// Applies the auto-labeling rule families to one item at a time.
pub struct LabelManager {
    host: Arc<dyn RepoHost>,
    config: LabelConfig,
}

impl LabelManager {
    pub fn new(host: Arc<dyn RepoHost>, config: LabelConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub(crate) fn host(&self) -> &dyn RepoHost {
        self.host.as_ref()
    }

    /// Classify an item and apply the labels it is missing.
    ///
    /// Returns the labels that were added, highest priority first. An item
    /// that already carries every matching label gets no write at all.
    pub async fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Vec<String>> {
        let mut cache = ContributorCache::new();
        self.classify_with_cache(request, &mut cache).await
    }

    /// As [`classify`](Self::classify), reusing contributor lookups from
    /// `cache`. The cache is owned by the caller and never outlives it.
    #[instrument(
        skip(self, request, cache),
        fields(item = %item_target(request.owner, request.repo, request.number))
    )]
    pub async fn classify_with_cache(
        &self,
        request: &ClassifyRequest<'_>,
        cache: &mut ContributorCache,
    ) -> Result<Vec<String>> {
        let target = item_target(request.owner, request.repo, request.number);
        let auto = &self.config.auto_labeling;

        let item = self
            .host
            .get_issue(request.owner, request.repo, request.number)
            .await
            .map_err(|e| TidyError::host("get_issue", &target, e))?;
        let current_labels = item.labels;

        let mut snapshot = ItemSnapshot {
            content: request.content,
            title: request.title,
            current_labels: &current_labels,
            changed_files: None,
            contributor: None,
        };

        let content_needs_signals = auto.rules.iter().any(|rule| {
            rule.conditions
                .as_ref()
                .is_some_and(|c| c.needs_contributor_signals())
                && !producers::is_excluded(rule, &snapshot)
        });
        if content_needs_signals || auto.contributor_rule().is_some() {
            snapshot.contributor = Some(self.contributor_signals(request, cache).await);
        }

        let files: Option<Vec<ChangedFile>> =
            if request.is_pr && (!auto.file_rules().is_empty() || auto.size_rule().is_some()) {
                let files = self
                    .host
                    .get_pr_files(request.owner, request.repo, request.number)
                    .await
                    .map_err(|e| TidyError::host("get_pr_files", &target, e))?;
                Some(files)
            } else {
                None
            };
        snapshot.changed_files = files.as_deref();

        let mut candidates = Vec::new();
        for (family, produce) in PIPELINE {
            let produced = produce(&snapshot, auto)?;
            debug!(family, count = produced.len(), "label candidates");
            candidates.extend(produced);
        }

        let to_add = subtract_present(resolve(candidates), &current_labels);
        if to_add.is_empty() {
            debug!("no new labels");
            return Ok(to_add);
        }

        self.host
            .add_labels(request.owner, request.repo, request.number, &to_add)
            .await
            .map_err(|e| TidyError::host("add_labels", &target, e))?;
        obs::emit_labels_added(&target, &to_add);
        Ok(to_add)
    }

    /// Contributor signals for the item author, memoised in `cache`.
    ///
    /// Lookup failure degrades to "neither first-time nor maintainer".
    async fn contributor_signals(
        &self,
        request: &ClassifyRequest<'_>,
        cache: &mut ContributorCache,
    ) -> ContributorSignals {
        let key = ItemKey {
            owner: request.owner.to_string(),
            repo: request.repo.to_string(),
            number: request.number,
        };
        if let Some(signals) = cache.get(&key) {
            return *signals;
        }

        let signals = match self
            .host
            .get_user_info(request.owner, request.repo, request.number)
            .await
        {
            Ok(signals) => signals,
            Err(e) => {
                warn!(
                    item = %item_target(request.owner, request.repo, request.number),
                    error = %e,
                    "contributor lookup failed, using defaults"
                );
                ContributorSignals::default()
            }
        };
        cache.insert(key, signals);
        signals
    }
}
