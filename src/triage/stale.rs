use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::info;

use crate::annotation::Marker;
use crate::config::StaleConfig;
use crate::github::{ChangeSet, GitHubError, GitHubOps, PullId, Slug};

/// Last update date that still counts as inactive
pub fn cutoff_date(now: DateTime<Utc>, inactive_days: i64) -> NaiveDate {
    (now - Duration::days(inactive_days)).date_naive()
}

/// Search query for open pull requests carrying `label` that were not
/// updated after `cutoff`
pub fn stale_query(slug: &Slug, label: &str, cutoff: NaiveDate) -> String {
    format!(
        "repo:{slug} is:open is:pr label:\"{label}\" updated:<={}",
        cutoff.format("%F")
    )
}

/// Search results can lag behind; re-check a hit against its current state
pub fn still_stale(pull: &ChangeSet, label: &str, cutoff: NaiveDate) -> bool {
    pull.open
        && pull.has_label(label)
        && pull
            .updated_at
            .map_or(true, |updated| updated.date_naive() <= cutoff)
}

/// Posts a reminder on pull requests that needed a rebase for too long
pub struct StaleReminder<'a, G: GitHubOps + ?Sized> {
    github: &'a G,
    config: &'a StaleConfig,
    label: &'a str,
    dry_run: bool,
}

impl<'a, G: GitHubOps + ?Sized> StaleReminder<'a, G> {
    pub fn new(github: &'a G, config: &'a StaleConfig, label: &'a str, dry_run: bool) -> Self {
        Self {
            github,
            config,
            label,
            dry_run,
        }
    }

    pub async fn run(&self, slug: &Slug, now: DateTime<Utc>) -> Result<Vec<PullId>, GitHubError> {
        let cutoff = cutoff_date(now, self.config.inactive_rebase_days);
        info!(slug = %slug, cutoff = %cutoff, "Mark stale before date");
        let query = stale_query(slug, self.label, cutoff);
        let numbers = self.github.search_issues(&query).await?;
        let text = format!("{}{}", Marker::InactiveRebase.as_str(), self.config.comment);

        let mut reminded = Vec::with_capacity(numbers.len());
        for (i, number) in numbers.iter().enumerate() {
            let pull = PullId::new(slug.clone(), *number);
            info!("{i}/{} (Item: {pull})", numbers.len());
            let current = self.github.get_pull(&pull).await?;
            if !still_stale(&current, self.label, cutoff) {
                info!(pull = %pull, "Active again since the search, skipping");
                continue;
            }
            if self.dry_run {
                println!("{pull}\n    .create_comment({text})");
            } else {
                self.github.create_comment(&pull, &text).await?;
            }
            reminded.push(pull);
        }
        Ok(reminded)
    }
}
