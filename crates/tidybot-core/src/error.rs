//! Error taxonomy for the tidybot engines.

use tidybot_host::HostError;

/// tidybot domain errors.
#[derive(Debug, thiserror::Error)]
pub enum TidyError {
    /// A repository host operation failed.
    #[error("{operation} failed for {target}: {source}")]
    HostCall {
        operation: &'static str,
        target: String,
        #[source]
        source: HostError,
    },

    /// A configured regular expression does not compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration is structurally valid but semantically wrong.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TidyError {
    /// Wrap a host failure with the operation and `owner/repo[#n]` target.
    pub fn host(operation: &'static str, target: impl Into<String>, source: HostError) -> Self {
        TidyError::HostCall {
            operation,
            target: target.into(),
            source,
        }
    }

    /// Whether this is a configuration problem rather than a host failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TidyError::InvalidPattern { .. } | TidyError::InvalidConfig(_)
        )
    }
}

/// Result type for tidybot operations.
pub type Result<T> = std::result::Result<T, TidyError>;

/// `owner/repo#number` rendering used in errors and logs.
pub fn item_target(owner: &str, repo: &str, number: u64) -> String {
    format!("{owner}/{repo}#{number}")
}
