//! tidybot-host: Repository Host Capability
//!
//! This crate owns every interaction with the code-hosting platform. The
//! decision engines in `tidybot-core` only ever see the [`RepoHost`] trait,
//! so they can run against GitHub in production and against
//! [`fakes::MemoryRepoHost`] in tests.
//!
//! ## Key Components
//!
//! - `RepoHost`: async capability trait (issues, PR files, labels, comments,
//!   statuses, contributor lookups)
//! - `GitHubHost`: REST v3 implementation backed by `reqwest`
//! - `MemoryRepoHost`: in-memory fake with a write log and failure injection

mod error;
pub mod fakes;
pub mod github;
pub mod host_traits;

pub use error::HostError;
pub use github::{GitHubConfig, GitHubHost};
pub use host_traits::{
    ChangedFile, CommitStatus, ContributorSignals, HostResult, Issue, IssueQuery, IssueState,
    Permission, RepoHost, RepoLabel, StatusState,
};
