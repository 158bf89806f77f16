use anyhow::Result;
use chrono::Utc;

use super::{connect_github, tracked_repos};
use crate::config::PullwardenConfig;
use crate::triage::StaleReminder;

pub struct StaleCommand {
    config: PullwardenConfig,
    dry_run: bool,
}

impl StaleCommand {
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
        let reminder = StaleReminder::new(
            &github,
            &self.config.stale,
            &self.config.rebase.label,
            self.dry_run,
        );
        let now = Utc::now();
        for slug in &repos {
            let reminded = reminder.run(slug, now).await?;
            println!("{slug}: reminded {} pull requests", reminded.len());
        }
        Ok(())
    }
}
