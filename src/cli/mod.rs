use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PullwardenConfig;
use crate::github::{PullId, Slug};
use crate::telemetry::LogFormat;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "pullwarden")]
#[command(version)]
#[command(about = "Maintenance bots for GitHub pull requests")]
#[command(long_about = "Maintenance bots for GitHub pull requests: a pairwise conflict matrix \
                       and a review summary published in a metadata comment, needs-rebase \
                       labels, reminders on long-inactive rebase candidates and locking of \
                       long-closed conversations.")]
pub struct Cli {
    /// Configuration file (default: ./pullwarden.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The access token for GitHub
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_access_token: Option<String>,

    /// The repo slugs of the monotree remotes on GitHub. Format: owner/repo
    #[arg(long, global = true)]
    pub github_repo: Vec<Slug>,

    /// Print changes/edits instead of calling the GitHub API
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Determine conflicting pull requests
    Conflicts {
        /// The local dir used for scratching
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
        /// Update the conflicts section for this pull request only.
        /// Format: owner/repo/number
        #[arg(long, conflicts_with = "update_comments")]
        pull_id: Option<PullId>,
        /// Update the conflicts section of every mergeable pull request
        #[arg(long)]
        update_comments: bool,
        /// Target branch (default: the first repo's default branch)
        #[arg(long)]
        base: Option<String>,
    },
    /// Update the label that indicates a rebase is required
    LabelRebase,
    /// Comment on pull requests that needed a rebase for too long
    Stale,
    /// Update the reviews section of the metadata comment
    Reviews {
        /// Update this pull request only. Format: owner/repo/number
        #[arg(long)]
        pull_id: Option<PullId>,
    },
    /// Lock the conversation on long-closed issues and pull requests
    LockArchive,
    /// Write the current configuration to a file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Conflicts { .. } => "conflicts",
            Commands::LabelRebase => "label-rebase",
            Commands::Stale => "stale",
            Commands::Reviews { .. } => "reviews",
            Commands::LockArchive => "lock-archive",
            Commands::Init { .. } => "init",
        }
    }
}

impl Cli {
    /// Command-line flags take precedence over every other configuration source
    pub fn apply_to(&self, config: &mut PullwardenConfig) {
        if let Some(token) = &self.github_access_token {
            config.github.token = Some(token.clone());
        }
        if !self.github_repo.is_empty() {
            config.github.repos = self.github_repo.iter().map(Slug::to_string).collect();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}
