//! Conventional PR-title checks.
//!
//! Configured patterns are matched case-sensitively, unlike label rules.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tidybot_host::{CommitStatus, RepoHost, StatusState};
use tracing::instrument;

use crate::config::PrTitleConfig;
use crate::error::{item_target, Result, TidyError};
use crate::obs;

/// Commit-status context used for title checks.
pub const STATUS_CONTEXT: &str = "tidybot/pr-title";

const TYPE_PREFIX: &str = r"^([a-z]+)(\([a-z-]+\))?!?:";
const SCOPE_PREFIX: &str = r"^\w+\(([a-z-]+)\)!?:";
const WITH_DESCRIPTION: &str = r"^[a-z]+(\([a-z-]+\))?!?: .+";

/// Outcome of checking one title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleValidation {
    pub valid: bool,
    /// One-line summary used as the status description
    pub message: String,
    pub errors: Vec<String>,
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| TidyError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Check `title` against `config`, collecting every problem found.
pub fn validate_title(title: &str, config: &PrTitleConfig) -> Result<TitleValidation> {
    let mut errors = Vec::new();

    let mut matches_any = false;
    for pattern in &config.patterns {
        if regex(pattern)?.is_match(title) {
            matches_any = true;
            break;
        }
    }
    if !matches_any {
        errors.push("Title does not match the required format".to_string());
    }

    if let Some(caps) = regex(TYPE_PREFIX)?.captures(title) {
        let kind = &caps[1];
        if !config.types.iter().any(|t| t == kind) {
            errors.push(format!(
                "Type \"{kind}\" is not allowed. Allowed types: {}",
                config.types.join(", ")
            ));
        }

        if let (Some(scopes), Some(caps)) = (&config.scopes, regex(SCOPE_PREFIX)?.captures(title)) {
            let scope = &caps[1];
            if !scopes.iter().any(|s| s == scope) {
                errors.push(format!(
                    "Scope \"{scope}\" is not allowed. Allowed scopes: {}",
                    scopes.join(", ")
                ));
            }
        }
    }

    if !regex(WITH_DESCRIPTION)?.is_match(title) {
        errors.push("Title must include a description after the type".to_string());
    }

    let valid = errors.is_empty();
    Ok(TitleValidation {
        valid,
        message: if valid {
            "PR title format is valid".to_string()
        } else {
            "PR title format is invalid".to_string()
        },
        errors,
    })
}

/// Markdown comment explaining a failed title check.
pub fn help_comment(title: &str, validation: &TitleValidation, config: &PrTitleConfig) -> String {
    let mut out = String::from("## PR Title Validation Failed\n\n");
    out.push_str(&format!(
        "Your PR title `{title}` does not meet the formatting requirements.\n\n"
    ));

    out.push_str("### Errors:\n");
    for error in &validation.errors {
        out.push_str(&format!("- {error}\n"));
    }

    out.push_str("\n### Required Format:\n```\n<type>(<scope>): <description>\n```\n\n");
    out.push_str(&format!(
        "### Allowed Types:\n`{}`\n\n",
        config.types.join("`, `")
    ));
    if let Some(scopes) = &config.scopes {
        out.push_str(&format!("### Allowed Scopes:\n`{}`\n\n", scopes.join("`, `")));
    }

    out.push_str("### Examples:\n");
    out.push_str("- `feat(ui): add new button component`\n");
    out.push_str("- `fix(api): resolve authentication issue`\n");
    out.push_str("- `docs: update README with new instructions`\n\n");
    out.push_str("Please update your PR title to match the required format.");
    out
}

/// Validates PR titles and reports the result on the host.
pub struct PrTitleValidator {
    host: Arc<dyn RepoHost>,
    config: PrTitleConfig,
}

impl PrTitleValidator {
    pub fn new(host: Arc<dyn RepoHost>, config: PrTitleConfig) -> Self {
        Self { host, config }
    }

    /// Validate `title`, publish a commit status on `sha` and, when the
    /// title is invalid, post a help comment on the pull request.
    #[instrument(skip(self, title))]
    pub async fn validate_pr_title(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        title: &str,
        sha: &str,
    ) -> Result<TitleValidation> {
        let target = item_target(owner, repo, number);
        let validation = validate_title(title, &self.config)?;

        let status = CommitStatus {
            state: if validation.valid {
                StatusState::Success
            } else {
                StatusState::Failure
            },
            description: Some(validation.message.clone()),
            context: Some(STATUS_CONTEXT.to_string()),
            target_url: None,
        };
        self.host
            .create_status(owner, repo, sha, &status)
            .await
            .map_err(|e| TidyError::host("create_status", &target, e))?;

        if !validation.valid {
            let body = help_comment(title, &validation, &self.config);
            self.host
                .create_comment(owner, repo, number, &body)
                .await
                .map_err(|e| TidyError::host("create_comment", &target, e))?;
        }

        obs::emit_pr_title_validated(&target, validation.valid, validation.errors.len());
        Ok(validation)
    }
}
