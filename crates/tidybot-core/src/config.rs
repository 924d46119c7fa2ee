//! Configuration model and loader.
//!
//! Field names follow the camelCase option names of the configuration file
//! (`daysBeforeStale`, `autoLabeling.fileBased.rules`, ...). JSON and TOML
//! files are accepted; a missing path yields [`TidyConfig::default`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TidyError};
use crate::rules;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyConfig {
    #[serde(default)]
    pub stale: StaleConfig,
    #[serde(default)]
    pub pr_title: PrTitleConfig,
    #[serde(default)]
    pub labels: LabelConfig,
}

// ---------------------------------------------------------------------------
// Stale
// ---------------------------------------------------------------------------

/// Staleness lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleConfig {
    pub days_before_stale: u32,
    pub days_before_close: u32,
    #[serde(default)]
    pub exempt_labels: Vec<String>,
    pub stale_label: String,
    #[serde(default)]
    pub stale_message: Option<String>,
    #[serde(default)]
    pub close_message: Option<String>,
    /// Items processed concurrently during a sweep.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            days_before_stale: 60,
            days_before_close: 7,
            exempt_labels: vec!["pinned".into(), "security".into(), "bug".into()],
            stale_label: "stale".into(),
            stale_message: Some(
                "This item has been automatically marked as stale because it has not had any \
                 activity in the last 60 days.\n\n\
                 - If this is still relevant, please comment or update it within 7 days.\n\
                 - If no activity occurs, it will be closed automatically.\n\n\
                 Thank you for helping keep this repository organized."
                    .into(),
            ),
            close_message: Some(
                "This item has been automatically closed due to inactivity.\n\n\
                 Feel free to reopen it if it still needs attention."
                    .into(),
            ),
            concurrency: default_concurrency(),
        }
    }
}

// ---------------------------------------------------------------------------
// PR title
// ---------------------------------------------------------------------------

/// Conventional PR-title rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrTitleConfig {
    pub types: Vec<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    pub patterns: Vec<String>,
}

impl Default for PrTitleConfig {
    fn default() -> Self {
        let types = [
            "feat", "fix", "docs", "style", "refactor", "test", "chore", "build", "ci", "revert",
        ];
        Self {
            types: types.iter().map(|t| t.to_string()).collect(),
            scopes: Some(
                ["core", "api", "ui", "docs", "deps"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            patterns: vec![format!(r"^({})(\(\w+\))?!?: .+$", types.join("|"))],
        }
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Label catalog and auto-labeling rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelConfig {
    /// Category name -> label names, used by label sync.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub auto_labeling: AutoLabelingConfig,
}

/// Which text field(s) a content rule inspects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    Title,
    Body,
    #[default]
    Both,
}

impl RuleScope {
    pub fn includes_body(self) -> bool {
        matches!(self, RuleScope::Body | RuleScope::Both)
    }

    pub fn includes_title(self) -> bool {
        matches!(self, RuleScope::Title | RuleScope::Both)
    }
}

/// Optional gates on a content rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConditions {
    /// Skip the rule if any of these labels is already on the item.
    #[serde(default)]
    pub exclude_labels: Vec<String>,
    #[serde(default)]
    pub require_first_time_contributor: bool,
    #[serde(default)]
    pub require_maintainer: bool,
}

impl RuleConditions {
    pub fn needs_contributor_signals(&self) -> bool {
        self.require_first_time_contributor || self.require_maintainer
    }
}

/// Content-pattern rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRule {
    pub pattern: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub scope: RuleScope,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default)]
    pub conditions: Option<RuleConditions>,
}

fn default_priority() -> u32 {
    1
}

impl ClassificationRule {
    pub fn new(pattern: &str, labels: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            scope: RuleScope::Both,
            priority: 1,
            conditions: None,
        }
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_conditions(mut self, conditions: RuleConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }
}

/// Changed-file rule: matches if any path matches any pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRule {
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl FileRule {
    pub fn new(file_patterns: &[&str], labels: &[&str]) -> Self {
        Self {
            file_patterns: file_patterns.iter().map(|p| p.to_string()).collect(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBasedConfig {
    #[serde(default)]
    pub rules: Vec<FileRule>,
}

/// Inclusive upper bounds (total changed lines) for each size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeThresholds {
    pub small: u64,
    pub medium: u64,
    pub large: u64,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            small: 10,
            medium: 100,
            large: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeLabels {
    pub small: String,
    pub medium: String,
    pub large: String,
    pub extra_large: String,
}

impl Default for SizeLabels {
    fn default() -> Self {
        Self {
            small: "size: small".into(),
            medium: "size: medium".into(),
            large: "size: large".into(),
            extra_large: "size: extra-large".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeBasedConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub thresholds: SizeThresholds,
    #[serde(default)]
    pub labels: SizeLabels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorLabels {
    pub first_time_contributor: String,
    pub maintainer: String,
}

impl Default for ContributorLabels {
    fn default() -> Self {
        Self {
            first_time_contributor: "first-time-contributor".into(),
            maintainer: "maintainer".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorBasedConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub labels: ContributorLabels,
}

/// The four rule families feeding the label classification engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLabelingConfig {
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
    #[serde(default)]
    pub file_based: Option<FileBasedConfig>,
    #[serde(default)]
    pub size_based: Option<SizeBasedConfig>,
    #[serde(default)]
    pub contributor_based: Option<ContributorBasedConfig>,
}

impl AutoLabelingConfig {
    pub fn file_rules(&self) -> &[FileRule] {
        self.file_based.as_ref().map_or(&[], |f| f.rules.as_slice())
    }

    /// Size config, only when enabled.
    pub fn size_rule(&self) -> Option<&SizeBasedConfig> {
        self.size_based.as_ref().filter(|s| s.enabled)
    }

    /// Contributor config, only when enabled.
    pub fn contributor_rule(&self) -> Option<&ContributorBasedConfig> {
        self.contributor_based.as_ref().filter(|c| c.enabled)
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        fn names(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        let mut categories = BTreeMap::new();
        categories.insert(
            "type".to_string(),
            names(&["feature", "bug", "enhancement", "documentation", "maintenance"]),
        );
        categories.insert(
            "priority".to_string(),
            names(&["critical", "high", "medium", "low"]),
        );
        categories.insert(
            "status".to_string(),
            names(&["in-progress", "review-needed", "blocked", "completed"]),
        );
        categories.insert(
            "size".to_string(),
            names(&["small", "medium", "large", "extra-large"]),
        );
        categories.insert(
            "contributor".to_string(),
            names(&["first-time-contributor", "maintainer"]),
        );

        Self {
            categories,
            auto_labeling: AutoLabelingConfig {
                rules: vec![
                    ClassificationRule::new(r"\bfix(es|ed)?\b|\bbug\b", &["bug"]),
                    ClassificationRule::new(r"\bdoc(s|umentation)?\b", &["documentation"]),
                    ClassificationRule::new(r"\bfeature\b|\benhancement\b", &["enhancement"]),
                    ClassificationRule::new(
                        r"\bcritical\b|\burgent\b|\bhigh\spriority\b",
                        &["priority: critical"],
                    )
                    .with_priority(2),
                    ClassificationRule::new(
                        r"\bsecurity\b|\bvulnerability\b",
                        &["bug", "priority: critical"],
                    )
                    .with_priority(3)
                    .with_conditions(RuleConditions {
                        exclude_labels: names(&["enhancement", "documentation"]),
                        ..RuleConditions::default()
                    }),
                ],
                file_based: Some(FileBasedConfig {
                    rules: vec![
                        FileRule::new(&[r"\.md$", "docs/.*"], &["documentation"]),
                        FileRule::new(&[r"\.rs$", r"Cargo\.toml$"], &["rust"]),
                        FileRule::new(&[r"\.tsx?$", r"\.jsx?$", r"\.css$"], &["frontend"]),
                        FileRule::new(
                            &[r"Cargo\.lock$", r"package\.json$", r"package-lock\.json$"],
                            &["dependencies"],
                        ),
                        FileRule::new(&[r"\.github/.*", "workflows/.*"], &["ci/cd"]),
                    ],
                }),
                size_based: Some(SizeBasedConfig {
                    enabled: true,
                    thresholds: SizeThresholds::default(),
                    labels: SizeLabels::default(),
                }),
                contributor_based: Some(ContributorBasedConfig {
                    enabled: true,
                    labels: ContributorLabels::default(),
                }),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl TidyConfig {
    /// Parse a configuration document. `.toml` paths are parsed as TOML,
    /// everything else as JSON.
    pub fn from_str_for_path(contents: &str, path: &Path) -> Result<Self> {
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config: TidyConfig = if is_toml {
            toml::from_str(contents)?
        } else {
            serde_json::from_str(contents)?
        };
        Ok(config)
    }

    /// Check the load-time invariants.
    ///
    /// The engines never re-run these checks; an invalid pattern that slips
    /// through still fails the engine call that evaluates it.
    pub fn validate(&self) -> Result<()> {
        let stale = &self.stale;
        if stale.days_before_stale < 1 {
            return Err(TidyError::InvalidConfig(
                "stale.daysBeforeStale must be at least 1".to_string(),
            ));
        }
        if stale.days_before_close < 1 {
            return Err(TidyError::InvalidConfig(
                "stale.daysBeforeClose must be at least 1".to_string(),
            ));
        }
        if stale.stale_label.trim().is_empty() {
            return Err(TidyError::InvalidConfig(
                "stale.staleLabel is empty".to_string(),
            ));
        }
        if stale.concurrency < 1 {
            return Err(TidyError::InvalidConfig(
                "stale.concurrency must be at least 1".to_string(),
            ));
        }

        if self.pr_title.types.is_empty() {
            return Err(TidyError::InvalidConfig(
                "prTitle.types is empty".to_string(),
            ));
        }
        if self.pr_title.patterns.is_empty() {
            return Err(TidyError::InvalidConfig(
                "prTitle.patterns is empty".to_string(),
            ));
        }
        for pattern in &self.pr_title.patterns {
            regex::Regex::new(pattern).map_err(|source| TidyError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let auto = &self.labels.auto_labeling;
        for rule in &auto.rules {
            rules::compile(&rule.pattern)?;
        }
        for rule in auto.file_rules() {
            rules::compile_all(&rule.file_patterns)?;
        }
        if let Some(size) = auto.size_rule() {
            let t = size.thresholds;
            if !(t.small < t.medium && t.medium < t.large) {
                return Err(TidyError::InvalidConfig(format!(
                    "size thresholds must satisfy small < medium < large (got {}/{}/{})",
                    t.small, t.medium, t.large
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate configuration. `None` yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<TidyConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let contents = std::fs::read_to_string(path)?;
            TidyConfig::from_str_for_path(&contents, path)?
        }
        None => {
            debug!("No configuration file given, using defaults");
            TidyConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        TidyConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_pr_title_pattern_accepts_conventional_title() {
        let config = PrTitleConfig::default();
        let re = regex::Regex::new(&config.patterns[0]).unwrap();
        assert!(re.is_match("feat(ui): add button"));
        assert!(!re.is_match("Add button"));
    }

    #[test]
    fn test_rule_defaults_when_omitted() {
        let rule: ClassificationRule =
            serde_json::from_str(r#"{"pattern": "bug", "labels": ["bug"]}"#).unwrap();
        assert_eq!(rule.scope, RuleScope::Both);
        assert_eq!(rule.priority, 1);
        assert!(rule.conditions.is_none());
    }

    #[test]
    fn test_camel_case_option_names() {
        let json = r#"{
            "stale": {
                "daysBeforeStale": 30,
                "daysBeforeClose": 5,
                "exemptLabels": ["pinned"],
                "staleLabel": "inactive"
            },
            "labels": {
                "autoLabeling": {
                    "rules": [{
                        "pattern": "security",
                        "labels": ["security"],
                        "scope": "title",
                        "priority": 3,
                        "conditions": {"excludeLabels": ["documentation"], "requireMaintainer": true}
                    }],
                    "fileBased": {"rules": [{"filePatterns": ["\\.md$"], "labels": ["docs"]}]},
                    "sizeBased": {"enabled": true, "thresholds": {"small": 1, "medium": 2, "large": 3},
                                  "labels": {"small": "S", "medium": "M", "large": "L", "extraLarge": "XL"}},
                    "contributorBased": {"enabled": false}
                }
            }
        }"#;
        let config = TidyConfig::from_str_for_path(json, Path::new("tidybot.json")).unwrap();
        assert_eq!(config.stale.days_before_stale, 30);
        assert_eq!(config.stale.stale_label, "inactive");
        assert_eq!(config.stale.concurrency, 4);
        assert!(config.stale.stale_message.is_none());

        let auto = &config.labels.auto_labeling;
        let rule = &auto.rules[0];
        assert_eq!(rule.scope, RuleScope::Title);
        let conditions = rule.conditions.as_ref().unwrap();
        assert_eq!(conditions.exclude_labels, vec!["documentation"]);
        assert!(conditions.require_maintainer);
        assert!(!conditions.require_first_time_contributor);
        assert_eq!(auto.file_rules().len(), 1);
        assert_eq!(auto.size_rule().unwrap().labels.extra_large, "XL");
        assert!(auto.contributor_rule().is_none());

        // Omitted section falls back to defaults
        assert_eq!(config.pr_title, PrTitleConfig::default());
    }

    #[test]
    fn test_validate_rejects_invalid_pattern() {
        let mut config = TidyConfig::default();
        config
            .labels
            .auto_labeling
            .rules
            .push(ClassificationRule::new("(unclosed", &["x"]));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TidyError::InvalidPattern { .. }));
    }

    #[test]
    fn test_validate_rejects_non_monotonic_thresholds() {
        let mut config = TidyConfig::default();
        if let Some(size) = config.labels.auto_labeling.size_based.as_mut() {
            size.thresholds = SizeThresholds {
                small: 100,
                medium: 10,
                large: 500,
            };
        }
        assert!(matches!(
            config.validate().unwrap_err(),
            TidyError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_validate_rejects_zero_days() {
        let mut config = TidyConfig::default();
        config.stale.days_before_close = 0;
        assert!(config.validate().is_err());
    }
}
