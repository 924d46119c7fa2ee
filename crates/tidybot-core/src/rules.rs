//! Rule matcher: case-insensitive pattern evaluation shared by content
//! rules and file rules.
//!
//! Patterns are trusted configuration and are used verbatim. A pattern that
//! does not compile is a fatal configuration error for the calling
//! operation; it is never skipped.

use regex::{Regex, RegexBuilder};

use crate::error::{Result, TidyError};

/// Compile `pattern` case-insensitively.
pub fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| TidyError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Compile a list of patterns, failing on the first invalid one.
pub fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p.as_ref())).collect()
}

/// Whether `pattern` matches anywhere in `text`.
pub fn matches(pattern: &str, text: &str) -> Result<bool> {
    Ok(compile(pattern)?.is_match(text))
}

/// Whether any of `patterns` matches any of `paths`.
pub fn any_path_matches<'a, I>(patterns: &[Regex], paths: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    paths
        .into_iter()
        .any(|path| patterns.iter().any(|p| p.is_match(path)))
}
