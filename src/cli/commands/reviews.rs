use anyhow::Result;

use super::{connect_github, tracked_repos};
use crate::config::PullwardenConfig;
use crate::github::{GitHubOps, PullId};
use crate::triage::ReviewSummarizer;

pub struct ReviewsCommand {
    config: PullwardenConfig,
    pull_id: Option<PullId>,
    dry_run: bool,
}

impl ReviewsCommand {
    pub fn new(config: PullwardenConfig) -> Self {
        Self {
            config,
            pull_id: None,
            dry_run: false,
        }
    }

    pub fn with_pull_id(mut self, pull_id: Option<PullId>) -> Self {
        self.pull_id = pull_id;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let github = connect_github(&self.config)?;
        self.execute_with(&github).await
    }

    /// Run against any forge implementation
    pub async fn execute_with<G: GitHubOps + ?Sized>(&self, github: &G) -> Result<()> {
        let summarizer = ReviewSummarizer::new(github, &self.config.reviews, self.dry_run);

        if let Some(pull_id) = &self.pull_id {
            let pull = github.get_pull(pull_id).await?;
            let outcome = summarizer.run(&pull).await?;
            println!("{pull_id}: reviews section {outcome}");
            return Ok(());
        }

        for slug in &tracked_repos(&self.config)? {
            let pulls = github.list_open_pulls(slug, None).await?;
            let mut written = 0;
            for pull in &pulls {
                if summarizer.run(pull).await?.is_write() {
                    written += 1;
                }
            }
            println!(
                "{slug}: {} open, {written} reviews sections {}",
                pulls.len(),
                if self.dry_run { "would change" } else { "changed" }
            );
        }
        Ok(())
    }
}
