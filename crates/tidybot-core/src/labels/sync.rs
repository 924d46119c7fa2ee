//! Label catalog sync: make sure every configured category label exists on
//! the repository.

use std::collections::HashSet;

use tidybot_host::RepoLabel;
use tracing::{debug, instrument};

use super::LabelManager;
use crate::error::{Result, TidyError};
use crate::obs;

/// Colour for labels of `category`, hex without `#`.
pub fn category_color(category: &str) -> &'static str {
    match category {
        "type" => "fbca04",
        "priority" => "e11d21",
        "status" => "0e8a16",
        _ => "5319e7",
    }
}

/// Repository label name for `label` in `category`.
///
/// `type` labels are bare. Other categories are prefixed with
/// `"<category>: "` unless the label already carries that prefix.
pub fn full_label_name(category: &str, label: &str) -> String {
    if category == "type" {
        return label.to_string();
    }
    let prefix = format!("{category}: ");
    if label.starts_with(&prefix) {
        label.to_string()
    } else {
        format!("{prefix}{label}")
    }
}

impl LabelManager {
    /// Create every configured category label missing from the repository.
    ///
    /// Returns the names created, in category then list order. Existing
    /// labels are never modified.
    #[instrument(skip(self))]
    pub async fn sync_labels(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let target = format!("{owner}/{repo}");
        let existing: HashSet<String> = self
            .host()
            .list_repo_labels(owner, repo)
            .await
            .map_err(|e| TidyError::host("list_repo_labels", &target, e))?
            .into_iter()
            .map(|l| l.name)
            .collect();

        let mut created = Vec::new();
        for (category, labels) in &self.config().categories {
            let color = category_color(category);
            for label in labels {
                let name = full_label_name(category, label);
                if existing.contains(&name) || created.contains(&name) {
                    debug!(label = %name, "label exists");
                    continue;
                }
                let repo_label = RepoLabel {
                    name: name.clone(),
                    color: color.to_string(),
                    description: Some(format!("Label for {name}")),
                };
                self.host()
                    .create_label(owner, repo, &repo_label)
                    .await
                    .map_err(|e| TidyError::host("create_label", &target, e))?;
                created.push(name);
            }
        }

        obs::emit_labels_synced(&target, created.len());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_colors() {
        assert_eq!(category_color("type"), "fbca04");
        assert_eq!(category_color("priority"), "e11d21");
        assert_eq!(category_color("status"), "0e8a16");
        assert_eq!(category_color("size"), "5319e7");
    }

    #[test]
    fn test_full_label_name() {
        assert_eq!(full_label_name("type", "bug"), "bug");
        assert_eq!(full_label_name("priority", "critical"), "priority: critical");
        assert_eq!(full_label_name("size", "size: small"), "size: small");
    }
}
