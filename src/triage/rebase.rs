use tracing::{debug, info};

use crate::annotation::Marker;
use crate::config::RebaseConfig;
use crate::github::{ChangeSet, GitHubError, GitHubOps, MergeState, PullId, RetryConfig, Slug};
use crate::inventory::ChangeSetInventory;

/// Label change required for one pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseAction {
    Keep,
    AddLabel,
    RemoveLabel,
}

pub fn rebase_action(pull: &ChangeSet, label: &str) -> RebaseAction {
    if pull.draft {
        return RebaseAction::Keep;
    }
    match (pull.merge_state, pull.has_label(label)) {
        (MergeState::Conflicted, false) => RebaseAction::AddLabel,
        (MergeState::Mergeable, true) => RebaseAction::RemoveLabel,
        _ => RebaseAction::Keep,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebaseSummary {
    pub checked: usize,
    pub labeled: Vec<PullId>,
    pub unlabeled: Vec<PullId>,
}

/// Keeps the needs-rebase label in line with the mergeable flag
pub struct RebaseLabeler<'a, G: GitHubOps + ?Sized> {
    github: &'a G,
    retry: RetryConfig,
    config: &'a RebaseConfig,
    dry_run: bool,
}

impl<'a, G: GitHubOps + ?Sized> RebaseLabeler<'a, G> {
    pub fn new(github: &'a G, retry: RetryConfig, config: &'a RebaseConfig, dry_run: bool) -> Self {
        Self {
            github,
            retry,
            config,
            dry_run,
        }
    }

    pub async fn run(&self, slug: &Slug) -> Result<RebaseSummary, GitHubError> {
        let inventory = ChangeSetInventory::new(self.github, self.retry.clone());
        let pulls = inventory.open_change_sets(slug, None).await?;
        let mut summary = RebaseSummary {
            checked: pulls.len(),
            ..RebaseSummary::default()
        };

        for (i, pull) in pulls.iter().enumerate() {
            debug!("{i}/{} (Pull: {})", pulls.len(), pull.id);
            match rebase_action(pull, &self.config.label) {
                RebaseAction::Keep => {}
                RebaseAction::AddLabel => {
                    self.add_label(&pull.id).await?;
                    summary.labeled.push(pull.id.clone());
                }
                RebaseAction::RemoveLabel => {
                    self.remove_label(&pull.id).await?;
                    summary.unlabeled.push(pull.id.clone());
                }
            }
        }

        info!(
            slug = %slug,
            checked = summary.checked,
            labeled = summary.labeled.len(),
            unlabeled = summary.unlabeled.len(),
            "Rebase labels updated"
        );
        Ok(summary)
    }

    async fn add_label(&self, pull: &PullId) -> Result<(), GitHubError> {
        info!(pull = %pull, label = %self.config.label, "Add label");
        let text = format!("{}{}", Marker::NeedsRebase.as_str(), self.config.comment);
        if self.dry_run {
            println!("{pull}\n    .add_label({})\n    .create_comment({text})", self.config.label);
            return Ok(());
        }
        self.github.add_label(pull, &self.config.label).await?;
        self.github.create_comment(pull, &text).await?;
        Ok(())
    }

    async fn remove_label(&self, pull: &PullId) -> Result<(), GitHubError> {
        let comments: Vec<u64> = self
            .github
            .list_comments(pull)
            .await?
            .into_iter()
            .filter(|c| Marker::NeedsRebase.owns(&c.body) || Marker::InactiveRebase.owns(&c.body))
            .map(|c| c.id)
            .collect();
        info!(
            pull = %pull,
            label = %self.config.label,
            comments = comments.len(),
            "Remove label and delete comments"
        );
        if self.dry_run {
            println!(
                "{pull}\n    .remove_label({})\n    .delete {} comments",
                self.config.label,
                comments.len()
            );
            return Ok(());
        }
        self.github.remove_label(pull, &self.config.label).await?;
        for id in comments {
            self.github.delete_comment(&pull.slug, id).await?;
        }
        Ok(())
    }
}
