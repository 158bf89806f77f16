//! Change-set inventory
//!
//! Lists the open pull requests of a repository and waits until GitHub has
//! computed the mergeable flag of every one of them.

use tracing::{debug, info, warn};

use crate::github::{ChangeSet, GitHubError, GitHubOps, MergeState, RetryConfig, Slug};

pub struct ChangeSetInventory<'a, G: GitHubOps + ?Sized> {
    github: &'a G,
    retry: RetryConfig,
}

impl<'a, G: GitHubOps + ?Sized> ChangeSetInventory<'a, G> {
    pub fn new(github: &'a G, retry: RetryConfig) -> Self {
        Self { github, retry }
    }

    /// Open change-sets (optionally only those targeting `base`), each with a
    /// resolved merge state
    pub async fn open_change_sets(
        &self,
        slug: &Slug,
        base: Option<&str>,
    ) -> Result<Vec<ChangeSet>, GitHubError> {
        let pulls = self.github.list_open_pulls(slug, base).await?;
        info!(
            slug = %slug,
            base = base.unwrap_or("*"),
            count = pulls.len(),
            "Fetched open pull requests"
        );
        self.resolve(pulls).await
    }

    /// The mergeable subset of the open change-sets targeting `base`
    pub async fn mergeable(&self, slug: &Slug, base: &str) -> Result<Vec<ChangeSet>, GitHubError> {
        let pulls = self.open_change_sets(slug, Some(base)).await?;
        let total = pulls.len();
        let mergeable: Vec<ChangeSet> = pulls
            .into_iter()
            .filter(|p| p.merge_state == MergeState::Mergeable)
            .collect();
        info!(
            slug = %slug,
            base,
            open = total,
            mergeable = mergeable.len(),
            "Filtered mergeable pull requests"
        );
        Ok(mergeable)
    }

    /// Refresh every unknown entry until all are resolved. Entries that turn
    /// out merged or closed are dropped, they never resolve.
    pub async fn resolve(&self, mut pulls: Vec<ChangeSet>) -> Result<Vec<ChangeSet>, GitHubError> {
        pulls.retain(|p| !p.merged);
        for attempt in 0..self.retry.max_attempts {
            let pending: Vec<usize> = pulls
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.merge_state.is_resolved())
                .map(|(i, _)| i)
                .collect();
            if pending.is_empty() {
                return Ok(pulls);
            }
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                debug!(attempt, pending = pending.len(), ?delay, "Waiting for mergeable state");
                tokio::time::sleep(delay).await;
            }
            info!(
                attempt,
                pulls = ?pending.iter().map(|&i| pulls[i].id.number).collect::<Vec<_>>(),
                "Updating mergeable state"
            );
            for i in pending {
                let refreshed = self.github.get_pull(&pulls[i].id).await?;
                pulls[i] = refreshed;
            }
            pulls.retain(|p| p.open && !p.merged);
        }

        let pending: Vec<String> = pulls
            .iter()
            .filter(|p| !p.merge_state.is_resolved())
            .map(|p| p.id.to_string())
            .collect();
        if pending.is_empty() {
            return Ok(pulls);
        }
        warn!(
            attempts = self.retry.max_attempts,
            pending = ?pending,
            "Mergeable state never resolved"
        );
        Err(GitHubError::MergeableUnresolved {
            attempts: self.retry.max_attempts,
            pending: pending.join(", "),
        })
    }
}
