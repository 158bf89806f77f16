use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::stale::cutoff_date;
use crate::config::LockConfig;
use crate::github::{GitHubError, GitHubOps, Slug};

/// Closed issues and pull requests still open for discussion and untouched
/// since `cutoff`
pub fn lock_query(slug: &Slug, cutoff: NaiveDate) -> String {
    format!(
        "repo:{slug} is:unlocked is:closed updated:<={}",
        cutoff.format("%F")
    )
}

/// Locks the discussion on long-closed issues and pull requests
pub struct ConversationLocker<'a, G: GitHubOps + ?Sized> {
    github: &'a G,
    config: &'a LockConfig,
    dry_run: bool,
}

impl<'a, G: GitHubOps + ?Sized> ConversationLocker<'a, G> {
    pub fn new(github: &'a G, config: &'a LockConfig, dry_run: bool) -> Self {
        Self {
            github,
            config,
            dry_run,
        }
    }

    /// Returns the numbers that were (or, in dry-run mode, would be) locked
    pub async fn run(&self, slug: &Slug, now: DateTime<Utc>) -> Result<Vec<u64>, GitHubError> {
        let cutoff = cutoff_date(now, self.config.inactive_days);
        info!(slug = %slug, cutoff = %cutoff, "Locking before date");
        let numbers = self.github.search_issues(&lock_query(slug, cutoff)).await?;
        info!(slug = %slug, items = numbers.len(), "Closed and inactive items");

        for (i, number) in numbers.iter().enumerate() {
            info!("{i}/{} (Item: {slug}#{number})", numbers.len());
            if self.dry_run {
                println!("{slug}#{number}.lock()");
            } else {
                self.github.lock_conversation(slug, *number).await?;
            }
        }
        Ok(numbers)
    }
}
