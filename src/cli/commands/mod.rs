use anyhow::{bail, Context, Result};

use crate::config::PullwardenConfig;
use crate::github::{GitHubClient, Slug};

pub mod conflicts;
pub mod init;
pub mod lock;
pub mod rebase;
pub mod reviews;
pub mod stale;

pub use conflicts::ConflictsCommand;
pub use init::InitCommand;
pub use lock::LockArchiveCommand;
pub use rebase::LabelRebaseCommand;
pub use reviews::ReviewsCommand;
pub use stale::StaleCommand;

pub fn connect_github(config: &PullwardenConfig) -> Result<GitHubClient> {
    if config.github.token.is_none() {
        tracing::warn!("No GitHub token configured, using unauthenticated requests");
    }
    let api_base = config.github.api_base.as_deref();
    GitHubClient::with_base_url(config.github.token.clone(), api_base)
        .context("Failed to initialize GitHub client")
}

pub fn tracked_repos(config: &PullwardenConfig) -> Result<Vec<Slug>> {
    let repos = config.slugs()?;
    if repos.is_empty() {
        bail!("No repositories given, pass --github-repo owner/repo or set github.repos");
    }
    Ok(repos)
}
