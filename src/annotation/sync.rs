use std::fmt;
use tracing::{debug, info};

use super::metadata::{Marker, MetadataComment};
use crate::conflicts::conflicts_section;
use crate::github::{ChangeSet, GitHubError, GitHubOps, PullId};

/// What a synchronization did (or, in dry-run mode, would have done)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The section already had this body
    Unchanged,
    /// Nothing to report and no section to clear
    Suppressed,
    Created,
    Updated,
}

impl SyncOutcome {
    pub fn is_write(&self) -> bool {
        matches!(self, SyncOutcome::Created | SyncOutcome::Updated)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::Suppressed => "not needed",
            SyncOutcome::Created => "created",
            SyncOutcome::Updated => "updated",
        })
    }
}

/// Reconciles computed section bodies with the metadata comment of each pull
/// request, issuing at most one write per call
pub struct AnnotationSynchronizer<'a, G: GitHubOps + ?Sized> {
    github: &'a G,
    dry_run: bool,
}

impl<'a, G: GitHubOps + ?Sized> AnnotationSynchronizer<'a, G> {
    pub fn new(github: &'a G, dry_run: bool) -> Self {
        Self { github, dry_run }
    }

    pub async fn load(&self, pull: &PullId) -> Result<MetadataComment, GitHubError> {
        let comments = self.github.list_comments(pull).await?;
        Ok(MetadataComment::from_comments(&comments))
    }

    /// Make section `marker` of `pull`'s metadata comment read `body`
    pub async fn sync_section(
        &self,
        pull: &PullId,
        marker: Marker,
        body: &str,
    ) -> Result<SyncOutcome, GitHubError> {
        let comment = self.load(pull).await?;
        self.apply(pull, comment, marker, body).await
    }

    /// Publish the conflict list of `pull`. An empty list is only written
    /// when it flips an existing conflicts section to "no conflicts".
    pub async fn sync_conflicts(
        &self,
        pull: &PullId,
        conflicts: &[&ChangeSet],
    ) -> Result<SyncOutcome, GitHubError> {
        let comment = self.load(pull).await?;
        if conflicts.is_empty() && !comment.has_section(Marker::Conflicts) {
            debug!(pull = %pull, "No conflicts and no conflicts section, nothing to write");
            return Ok(SyncOutcome::Suppressed);
        }
        let body = conflicts_section(pull, conflicts);
        self.apply(pull, comment, Marker::Conflicts, &body).await
    }

    async fn apply(
        &self,
        pull: &PullId,
        mut comment: MetadataComment,
        marker: Marker,
        body: &str,
    ) -> Result<SyncOutcome, GitHubError> {
        if !comment.update(marker, body) {
            debug!(pull = %pull, section = ?marker, "Section up to date");
            return Ok(SyncOutcome::Unchanged);
        }
        let text = comment.render();
        match comment.comment_id {
            None => {
                info!(pull = %pull, section = ?marker, "Create new metadata comment");
                if self.dry_run {
                    println!("{pull}.new_comment.body = {text}");
                } else {
                    self.github.create_comment(pull, &text).await?;
                }
                Ok(SyncOutcome::Created)
            }
            Some(id) => {
                info!(pull = %pull, comment_id = id, section = ?marker, "Update metadata comment");
                if self.dry_run {
                    println!("{pull}.{id}.body = {text}");
                } else {
                    self.github.update_comment(&pull.slug, id, &text).await?;
                }
                Ok(SyncOutcome::Updated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::mocks::{change_set, InMemoryGitHub, RecordedWrite};
    use crate::github::{MergeState, Slug};

    fn pull(number: u64) -> PullId {
        PullId::new(Slug::new("o", "r"), number)
    }

    #[tokio::test]
    async fn test_second_identical_sync_is_a_no_op() {
        let github = InMemoryGitHub::new();
        let other = change_set(&Slug::new("o", "r"), 2, "main", MergeState::Mergeable);
        let sync = AnnotationSynchronizer::new(&github, false);

        let first = sync.sync_conflicts(&pull(1), &[&other]).await.unwrap();
        let second = sync.sync_conflicts(&pull(1), &[&other]).await.unwrap();

        assert_eq!(first, SyncOutcome::Created);
        assert_eq!(second, SyncOutcome::Unchanged);
        assert_eq!(github.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_without_section_writes_nothing() {
        let github = InMemoryGitHub::new();
        let sync = AnnotationSynchronizer::new(&github, false);

        let outcome = sync.sync_conflicts(&pull(3), &[]).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Suppressed);
        assert!(github.writes().is_empty());
        assert!(github.comments(&pull(3)).is_empty());
    }

    #[tokio::test]
    async fn test_updates_existing_comment_in_place() {
        let github = InMemoryGitHub::new();
        let mut existing = MetadataComment::default();
        existing.update(Marker::Coverage, "\n### Coverage\n96%");
        let id = github.insert_comment(&pull(4), &existing.render());
        let sync = AnnotationSynchronizer::new(&github, false);

        let outcome = sync
            .sync_section(&pull(4), Marker::Reviews, "\n### Reviews\nACK")
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Updated);
        match github.writes().as_slice() {
            [RecordedWrite::UpdateComment { comment_id, body }] => {
                assert_eq!(*comment_id, id);
                let parsed = MetadataComment::parse(None, body).unwrap();
                assert_eq!(parsed.section(Marker::Coverage), Some("\n### Coverage\n96%"));
                assert_eq!(parsed.section(Marker::Reviews), Some("\n### Reviews\nACK"));
            }
            writes => panic!("unexpected writes {writes:?}"),
        }
    }

    #[tokio::test]
    async fn test_conflicts_update_leaves_coverage_bytes_alone() {
        let github = InMemoryGitHub::new();
        let coverage = "\n### Coverage\n| Type | Lines |\n| ---- | ----- |\n| Unit | 83.1 % |\n";
        let mut existing = MetadataComment::default();
        existing.update(Marker::Conflicts, "\n### Conflicts\nNo conflicts as of last run.");
        existing.update(Marker::Coverage, coverage);
        let id = github.insert_comment(&pull(6), &existing.render());
        let other = change_set(&Slug::new("o", "r"), 9, "main", MergeState::Mergeable);
        let sync = AnnotationSynchronizer::new(&github, false);

        let outcome = sync.sync_conflicts(&pull(6), &[&other]).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Updated);
        let writes = github.writes();
        let [RecordedWrite::UpdateComment { comment_id, body }] = writes.as_slice() else {
            panic!("unexpected writes {writes:?}");
        };
        assert_eq!(*comment_id, id);
        assert!(body.contains(&format!("{}{coverage}", Marker::Coverage.as_str())));
        let parsed = MetadataComment::parse(None, body).unwrap();
        assert_eq!(parsed.section(Marker::Coverage), Some(coverage));
        assert!(parsed
            .section(Marker::Conflicts)
            .is_some_and(|c| c.contains("[#9](")));
    }

    #[tokio::test]
    async fn test_dry_run_performs_no_write() {
        let github = InMemoryGitHub::new();
        let other = change_set(&Slug::new("o", "r"), 2, "main", MergeState::Mergeable);
        let sync = AnnotationSynchronizer::new(&github, true);

        let outcome = sync.sync_conflicts(&pull(1), &[&other]).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Created);
        assert!(outcome.is_write());
        assert!(github.writes().is_empty());
    }
}
