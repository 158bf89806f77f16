use anyhow::Result;

use super::{connect_github, tracked_repos};
use crate::config::PullwardenConfig;
use crate::triage::RebaseLabeler;

pub struct LabelRebaseCommand {
    config: PullwardenConfig,
    dry_run: bool,
}

impl LabelRebaseCommand {
    pub fn new(config: PullwardenConfig) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let repos = tracked_repos(&self.config)?;
        let github = connect_github(&self.config)?;
        let labeler = RebaseLabeler::new(
            &github,
            self.config.retry_config(),
            &self.config.rebase,
            self.dry_run,
        );
        for slug in &repos {
            let summary = labeler.run(slug).await?;
            println!(
                "{slug}: {} open, {} labeled, {} unlabeled",
                summary.checked,
                summary.labeled.len(),
                summary.unlabeled.len()
            );
        }
        Ok(())
    }
}
