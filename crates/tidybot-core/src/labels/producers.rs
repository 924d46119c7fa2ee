//! Candidate producers.
//!
//! Evaluation order is fixed by [`PIPELINE`]: content rules, file rules,
//! size tier, contributor status. Ties in priority are later resolved in
//! this order.

use tidybot_host::ChangedFile;

use super::{ItemSnapshot, LabelCandidate};
use crate::config::{AutoLabelingConfig, ClassificationRule, SizeLabels, SizeThresholds};
use crate::error::Result;
use crate::rules;

/// A pure candidate producer.
pub type Producer = fn(&ItemSnapshot<'_>, &AutoLabelingConfig) -> Result<Vec<LabelCandidate>>;

/// Producers in evaluation order.
pub const PIPELINE: [(&str, Producer); 4] = [
    ("content", content_candidates),
    ("file", file_candidates),
    ("size", size_candidates),
    ("contributor", contributor_candidates),
];

/// Whether an exclusion on `rule` is triggered by the snapshot labels.
pub fn is_excluded(rule: &ClassificationRule, snapshot: &ItemSnapshot<'_>) -> bool {
    rule.conditions.as_ref().is_some_and(|c| {
        c.exclude_labels
            .iter()
            .any(|label| snapshot.has_label(label))
    })
}

/// Content rules, in list order.
pub fn content_candidates(
    snapshot: &ItemSnapshot<'_>,
    config: &AutoLabelingConfig,
) -> Result<Vec<LabelCandidate>> {
    let mut out = Vec::new();
    for rule in &config.rules {
        let pattern = rules::compile(&rule.pattern)?;

        if is_excluded(rule, snapshot) {
            continue;
        }
        if let Some(conditions) = &rule.conditions {
            let signals = snapshot.contributor.unwrap_or_default();
            if conditions.require_first_time_contributor && !signals.is_first_time_contributor {
                continue;
            }
            if conditions.require_maintainer && !signals.is_maintainer {
                continue;
            }
        }

        let mut matched = rule.scope.includes_body() && pattern.is_match(snapshot.content);
        if !matched && rule.scope.includes_title() {
            matched = snapshot.title.is_some_and(|t| pattern.is_match(t));
        }

        if matched {
            out.extend(
                rule.labels
                    .iter()
                    .map(|label| LabelCandidate::new(label.clone(), rule.priority)),
            );
        }
    }
    Ok(out)
}

/// File rules; needs the changed-file list.
pub fn file_candidates(
    snapshot: &ItemSnapshot<'_>,
    config: &AutoLabelingConfig,
) -> Result<Vec<LabelCandidate>> {
    let Some(files) = snapshot.changed_files else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for rule in config.file_rules() {
        let patterns = rules::compile_all(&rule.file_patterns)?;
        if rules::any_path_matches(&patterns, files.iter().map(|f| f.filename.as_str())) {
            out.extend(rule.labels.iter().map(|l| LabelCandidate::new(l.clone(), 1)));
        }
    }
    Ok(out)
}

/// Pick the size label for `total` changed lines.
///
/// Bounds are inclusive and compared in order small, medium, large;
/// anything above `large` is extra-large. Threshold ordering is not
/// re-validated here.
pub fn size_label<'a>(thresholds: &SizeThresholds, labels: &'a SizeLabels, total: u64) -> &'a str {
    if total <= thresholds.small {
        &labels.small
    } else if total <= thresholds.medium {
        &labels.medium
    } else if total <= thresholds.large {
        &labels.large
    } else {
        &labels.extra_large
    }
}

/// Total additions plus deletions.
pub fn total_changes(files: &[ChangedFile]) -> u64 {
    files.iter().map(ChangedFile::changes).sum()
}

/// Exactly one size label when size labeling is enabled and files are known.
pub fn size_candidates(
    snapshot: &ItemSnapshot<'_>,
    config: &AutoLabelingConfig,
) -> Result<Vec<LabelCandidate>> {
    let (Some(size), Some(files)) = (config.size_rule(), snapshot.changed_files) else {
        return Ok(Vec::new());
    };
    let label = size_label(&size.thresholds, &size.labels, total_changes(files));
    Ok(vec![LabelCandidate::new(label, 1)])
}

/// First-time-contributor and maintainer labels, independently.
pub fn contributor_candidates(
    snapshot: &ItemSnapshot<'_>,
    config: &AutoLabelingConfig,
) -> Result<Vec<LabelCandidate>> {
    let (Some(contributor), Some(signals)) = (config.contributor_rule(), snapshot.contributor)
    else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    if signals.is_first_time_contributor {
        out.push(LabelCandidate::new(
            contributor.labels.first_time_contributor.clone(),
            1,
        ));
    }
    if signals.is_maintainer {
        out.push(LabelCandidate::new(contributor.labels.maintainer.clone(), 1));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ContributorBasedConfig, FileBasedConfig, FileRule, RuleConditions, RuleScope,
        SizeBasedConfig,
    };
    use tidybot_host::ContributorSignals;

    fn snapshot<'a>(
        content: &'a str,
        title: Option<&'a str>,
        labels: &'a [String],
    ) -> ItemSnapshot<'a> {
        ItemSnapshot {
            content,
            title,
            current_labels: labels,
            changed_files: None,
            contributor: None,
        }
    }

    fn rules_only(rules: Vec<ClassificationRule>) -> AutoLabelingConfig {
        AutoLabelingConfig {
            rules,
            ..AutoLabelingConfig::default()
        }
    }

    fn labels_of(candidates: &[LabelCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_body_match_then_title_fallback() {
        let config = rules_only(vec![ClassificationRule::new(r"\bbug\b", &["bug"])]);
        let none: Vec<String> = vec![];

        let body = content_candidates(&snapshot("a bug here", None, &none), &config).unwrap();
        assert_eq!(labels_of(&body), vec!["bug"]);

        let title =
            content_candidates(&snapshot("nothing", Some("Bug: crash"), &none), &config).unwrap();
        assert_eq!(labels_of(&title), vec!["bug"]);
    }

    #[test]
    fn test_title_scope_never_matches_body_without_title() {
        let config = rules_only(vec![
            ClassificationRule::new("security", &["security"]).with_scope(RuleScope::Title)
        ]);
        let none: Vec<String> = vec![];
        let out = content_candidates(&snapshot("security hole", None, &none), &config).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_body_scope_ignores_title() {
        let config = rules_only(vec![
            ClassificationRule::new("docs", &["documentation"]).with_scope(RuleScope::Body)
        ]);
        let none: Vec<String> = vec![];
        let snap = snapshot("unrelated", Some("docs update"), &none);
        let out = content_candidates(&snap, &config).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_exclusion_uses_snapshot_labels() {
        let config = rules_only(vec![ClassificationRule::new("security", &["security"])
            .with_conditions(RuleConditions {
                exclude_labels: vec!["documentation".to_string()],
                ..RuleConditions::default()
            })]);
        let present = vec!["documentation".to_string()];
        let out = content_candidates(&snapshot("security", None, &present), &config).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_maintainer_requirement_without_signals_skips() {
        let config = rules_only(vec![ClassificationRule::new(".*", &["triaged"])
            .with_conditions(RuleConditions {
                require_maintainer: true,
                ..RuleConditions::default()
            })]);
        let none: Vec<String> = vec![];
        let mut snap = snapshot("x", None, &none);
        assert!(content_candidates(&snap, &config).unwrap().is_empty());

        snap.contributor = Some(ContributorSignals {
            is_first_time_contributor: false,
            is_maintainer: true,
        });
        assert_eq!(
            labels_of(&content_candidates(&snap, &config).unwrap()),
            vec!["triaged"]
        );
    }

    #[test]
    fn test_empty_label_list_contributes_nothing() {
        let config = rules_only(vec![ClassificationRule::new("x", &[])]);
        let none: Vec<String> = vec![];
        assert!(content_candidates(&snapshot("x", None, &none), &config)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_pattern_fails_even_when_excluded() {
        let config = rules_only(vec![ClassificationRule::new("(bad", &["x"]).with_conditions(
            RuleConditions {
                exclude_labels: vec!["skip".to_string()],
                ..RuleConditions::default()
            },
        )]);
        let present = vec!["skip".to_string()];
        assert!(content_candidates(&snapshot("x", None, &present), &config).is_err());
    }

    #[test]
    fn test_file_rules_need_files() {
        let config = AutoLabelingConfig {
            file_based: Some(FileBasedConfig {
                rules: vec![FileRule::new(&[r"\.md$"], &["documentation"])],
            }),
            ..AutoLabelingConfig::default()
        };
        let none: Vec<String> = vec![];
        let mut snap = snapshot("", None, &none);
        assert!(file_candidates(&snap, &config).unwrap().is_empty());

        let files = vec![ChangedFile {
            filename: "docs/README.md".to_string(),
            additions: 1,
            deletions: 0,
        }];
        snap.changed_files = Some(&files);
        let out = file_candidates(&snap, &config).unwrap();
        assert_eq!(out, vec![LabelCandidate::new("documentation", 1)]);
    }

    #[test]
    fn test_size_tiers_are_inclusive_upper_bounds() {
        let t = SizeThresholds {
            small: 10,
            medium: 100,
            large: 500,
        };
        let l = SizeLabels::default();
        assert_eq!(size_label(&t, &l, 0), "size: small");
        assert_eq!(size_label(&t, &l, 10), "size: small");
        assert_eq!(size_label(&t, &l, 11), "size: medium");
        assert_eq!(size_label(&t, &l, 100), "size: medium");
        assert_eq!(size_label(&t, &l, 500), "size: large");
        assert_eq!(size_label(&t, &l, 501), "size: extra-large");
    }

    #[test]
    fn test_non_monotonic_thresholds_use_literal_order() {
        let t = SizeThresholds {
            small: 100,
            medium: 10,
            large: 50,
        };
        let l = SizeLabels::default();
        assert_eq!(size_label(&t, &l, 60), "size: small");
        assert_eq!(size_label(&t, &l, 101), "size: extra-large");
    }

    #[test]
    fn test_size_disabled_yields_nothing() {
        let config = AutoLabelingConfig {
            size_based: Some(SizeBasedConfig {
                enabled: false,
                ..SizeBasedConfig::default()
            }),
            ..AutoLabelingConfig::default()
        };
        let none: Vec<String> = vec![];
        let files: Vec<ChangedFile> = vec![];
        let mut snap = snapshot("", None, &none);
        snap.changed_files = Some(&files);
        assert!(size_candidates(&snap, &config).unwrap().is_empty());
    }

    #[test]
    fn test_contributor_can_receive_both_labels() {
        let config = AutoLabelingConfig {
            contributor_based: Some(ContributorBasedConfig {
                enabled: true,
                ..ContributorBasedConfig::default()
            }),
            ..AutoLabelingConfig::default()
        };
        let none: Vec<String> = vec![];
        let mut snap = snapshot("", None, &none);
        snap.contributor = Some(ContributorSignals {
            is_first_time_contributor: true,
            is_maintainer: true,
        });
        let out = contributor_candidates(&snap, &config).unwrap();
        assert_eq!(labels_of(&out), vec!["first-time-contributor", "maintainer"]);
    }
}
