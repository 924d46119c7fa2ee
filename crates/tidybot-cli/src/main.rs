//! tidybot - repository hygiene automation
//!
//! ## Commands
//!
//! - `auto-label`: classify one issue or pull request and apply labels
//! - `stale`: run the staleness sweep over every open item
//! - `sync-labels`: create missing category labels on the repository
//! - `pr-title`: check a pull request title and publish a commit status
//! - `config`: print the effective configuration

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use tidybot_core::{
    load_config, ClassifyRequest, LabelManager, PrTitleValidator, StaleAction, StaleManager,
    TidyConfig,
};
use tidybot_host::{GitHubConfig, GitHubHost, RepoHost};

#[derive(Parser)]
#[command(name = "tidybot")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Label classification and stale-item lifecycle for GitHub repositories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and JSON command output
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (.json or .toml); defaults are used when absent
    #[arg(short, long, global = true, env = "TIDYBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Target repository as owner/repo
    #[arg(long, global = true, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, global = true, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an issue or pull request and add the labels it is missing
    AutoLabel {
        /// Issue or pull request number
        #[arg(short, long)]
        number: u64,

        /// Title text (fetched from the host when no text is given)
        #[arg(long)]
        title: Option<String>,

        /// Body text
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read body text from a file
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Treat the item as a pull request
        #[arg(long)]
        pr: bool,
    },

    /// Mark, unmark and close inactive items
    Stale,

    /// Create configured category labels missing from the repository
    SyncLabels,

    /// Validate a pull request title and publish a commit status
    PrTitle {
        /// Pull request number
        #[arg(short, long)]
        number: u64,

        /// Title to validate
        #[arg(long)]
        title: String,

        /// Head commit SHA to attach the status to
        #[arg(long)]
        sha: String,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tidybot_core::init_tracing(cli.json, level);

    if let Commands::Config { default } = cli.command {
        return cmd_config(cli.config.as_deref(), default);
    }

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let repo = cli
        .repo
        .as_deref()
        .context("No repository given; pass --repo owner/repo or set GITHUB_REPOSITORY")?;
    let (owner, repo) = parse_repo(repo)?;

    let mut github = GitHubConfig::from_env();
    if let Some(api_url) = cli.api_url {
        github.api_url = api_url;
    }
    let host: Arc<dyn RepoHost> =
        Arc::new(GitHubHost::new(github).context("Failed to create GitHub client")?);

    match cli.command {
        Commands::AutoLabel {
            number,
            title,
            content,
            content_file,
            pr,
        } => {
            let content = match content_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => content,
            };
            let item = ItemText { title, content, pr };
            cmd_auto_label(host, config, &owner, &repo, number, item, cli.json).await
        }
        Commands::Stale => cmd_stale(host, config, &owner, &repo, cli.json).await,
        Commands::SyncLabels => cmd_sync_labels(host, config, &owner, &repo, cli.json).await,
        Commands::PrTitle { number, title, sha } => {
            cmd_pr_title(host, config, &owner, &repo, number, &title, &sha, cli.json).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Split `owner/repo`.
fn parse_repo(value: &str) -> Result<(String, String)> {
    match value.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("Invalid repository {value:?}; expected owner/repo"),
    }
}

/// Item text supplied on the command line.
struct ItemText {
    title: Option<String>,
    content: Option<String>,
    pr: bool,
}

// ========== Commands ==========

async fn cmd_auto_label(
    host: Arc<dyn RepoHost>,
    config: TidyConfig,
    owner: &str,
    repo: &str,
    number: u64,
    item: ItemText,
    json: bool,
) -> Result<()> {
    let ItemText {
        mut title,
        mut content,
        mut pr,
    } = item;

    if title.is_none() && content.is_none() {
        let issue = host
            .get_issue(owner, repo, number)
            .await
            .with_context(|| format!("Failed to fetch {owner}/{repo}#{number}"))?;
        info!(number, "using title and body from the host");
        title = Some(issue.title);
        content = issue.body;
        pr = pr || issue.is_pull_request;
    }

    let labels = LabelManager::new(host, config.labels);
    let request = ClassifyRequest {
        owner,
        repo,
        number,
        content: content.as_deref().unwrap_or(""),
        title: title.as_deref(),
        is_pr: pr,
    };
    let added = labels.classify(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else if added.is_empty() {
        println!("No new labels for {owner}/{repo}#{number}");
    } else {
        println!("Added to {owner}/{repo}#{number}: {}", added.join(", "));
    }
    Ok(())
}

async fn cmd_stale(
    host: Arc<dyn RepoHost>,
    config: TidyConfig,
    owner: &str,
    repo: &str,
    json: bool,
) -> Result<()> {
    let stale = StaleManager::new(host, config.stale);
    let report = stale.process_stale_items(owner, repo).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Examined {} items: {} acted on, {} failed",
            report.examined(),
            report.acted(),
            report.failures.len()
        );
        for outcome in report
            .outcomes
            .iter()
            .filter(|o| o.action != StaleAction::NoAction)
        {
            println!("  #{} {}", outcome.number, outcome.action.as_str());
        }
        for failure in &report.failures {
            println!(
                "  #{} FAILED {}: {}",
                failure.number, failure.operation, failure.message
            );
        }
    }

    if !report.is_clean() {
        bail!(
            "Stale sweep of {owner}/{repo} had {} failed items",
            report.failures.len()
        );
    }
    Ok(())
}

async fn cmd_sync_labels(
    host: Arc<dyn RepoHost>,
    config: TidyConfig,
    owner: &str,
    repo: &str,
    json: bool,
) -> Result<()> {
    let labels = LabelManager::new(host, config.labels);
    let created = labels.sync_labels(owner, repo).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else if created.is_empty() {
        println!("All labels already exist on {owner}/{repo}");
    } else {
        println!("Created {} labels on {owner}/{repo}:", created.len());
        for name in &created {
            println!("  {name}");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_pr_title(
    host: Arc<dyn RepoHost>,
    config: TidyConfig,
    owner: &str,
    repo: &str,
    number: u64,
    title: &str,
    sha: &str,
    json: bool,
) -> Result<()> {
    let validator = PrTitleValidator::new(host, config.pr_title);
    let result = validator
        .validate_pr_title(owner, repo, number, title, sha)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.message);
        for error in &result.errors {
            println!("  - {error}");
        }
    }

    if !result.valid {
        bail!("PR title of {owner}/{repo}#{number} is invalid");
    }
    Ok(())
}

fn cmd_config(path: Option<&Path>, default: bool) -> Result<()> {
    let config = if default {
        TidyConfig::default()
    } else {
        load_config(path).context("Failed to load configuration")?
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
