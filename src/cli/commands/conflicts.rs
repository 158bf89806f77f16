use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use super::{connect_github, tracked_repos};
use crate::annotation::AnnotationSynchronizer;
use crate::config::PullwardenConfig;
use crate::conflicts::{summary_table, ConflictEngine};
use crate::git::{GitError, MergeStrategy, ScratchLayout, ScratchRepository};
use crate::github::{ChangeSet, GitHubOps, PullId};
use crate::inventory::ChangeSetInventory;

pub struct ConflictsCommand {
    config: PullwardenConfig,
    scratch_dir: Option<PathBuf>,
    pull_id: Option<PullId>,
    update_comments: bool,
    base: Option<String>,
    dry_run: bool,
}

impl ConflictsCommand {
    pub fn new(config: PullwardenConfig) -> Self {
        Self {
            config,
            scratch_dir: None,
            pull_id: None,
            update_comments: false,
            base: None,
            dry_run: false,
        }
    }

    pub fn with_scratch_dir(mut self, scratch_dir: Option<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    pub fn with_pull_id(mut self, pull_id: Option<PullId>) -> Self {
        self.pull_id = pull_id;
        self
    }

    pub fn with_update_comments(mut self, update_comments: bool) -> Self {
        self.update_comments = update_comments;
        self
    }

    pub fn with_base(mut self, base: Option<String>) -> Self {
        self.base = base;
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
        let repos = tracked_repos(&self.config)?;
        let strategy: MergeStrategy = self.config.conflicts.merge_strategy.parse()?;
        let scratch_dir = self
            .scratch_dir
            .clone()
            .unwrap_or_else(|| self.config.scratch.dir.clone());

        let layout = ScratchLayout::new(&scratch_dir, &repos);
        let mut lock = layout.lock()?;
        let _guard = lock
            .try_write()
            .map_err(|_| GitError::Locked(layout.root.clone()))?;
        let scratch = ScratchRepository::open_or_clone(
            &scratch_dir,
            &repos,
            &self.config.scratch.clone_base_url,
        )
        .context("Failed to prepare scratch repository")?;
        scratch.ensure_clean()?;

        let target = match &self.base {
            Some(base) => base.clone(),
            None => github.default_branch(&repos[0]).await?,
        };
        let inventory = ChangeSetInventory::new(github, self.config.retry_config());
        let mut pulls = Vec::new();
        for slug in &repos {
            let base = match &self.base {
                Some(base) => base.clone(),
                None => github.default_branch(slug).await?,
            };
            pulls.extend(inventory.mergeable(slug, &base).await?);
        }

        scratch.fetch_all()?;
        let pulls = with_local_heads(&scratch, pulls)?;
        let tip = scratch.fetch_target(&target)?;
        let disposable = scratch.disposable_workspace(&tip)?;
        info!(
            target = %target,
            pulls = pulls.len(),
            dir = %disposable.path().display(),
            "Calculate mergeable pulls"
        );

        let engine = ConflictEngine::new(disposable.workspace(), strategy);
        let sync = AnnotationSynchronizer::new(github, self.dry_run);

        if let Some(pull_id) = &self.pull_id {
            let (prepared, _) = engine.prepare_bases(&tip, &pulls)?;
            let Some(subject) = prepared.iter().find(|p| &p.change_set.id == pull_id) else {
                bail!(
                    "{pull_id} not found in all {} open, mergeable {target} pulls",
                    prepared.len()
                );
            };
            info!("Checking for conflicts {target} <> {pull_id} <> other_pulls ...");
            let conflicts = engine.conflicts_for(subject, &prepared)?;
            let outcome = sync.sync_conflicts(pull_id, &conflicts).await?;
            println!(
                "{pull_id}: {} conflicts, metadata comment {outcome}",
                conflicts.len()
            );
        } else if self.update_comments {
            let (prepared, _) = engine.prepare_bases(&tip, &pulls)?;
            let mut written = 0;
            for (i, subject) in prepared.iter().enumerate() {
                info!(
                    "{i}/{len} Checking for conflicts {target} <> {id} <> other_pulls ...",
                    len = prepared.len(),
                    id = subject.change_set.id
                );
                let conflicts = engine.conflicts_for(subject, &prepared)?;
                let outcome = sync
                    .sync_conflicts(&subject.change_set.id, &conflicts)
                    .await?;
                if outcome.is_write() {
                    written += 1;
                }
            }
            println!(
                "Checked {} pull requests, {written} metadata comments {}",
                prepared.len(),
                if self.dry_run { "would change" } else { "changed" }
            );
        } else {
            let matrix = engine.compute(&tip, &pulls)?;
            print!("{}", summary_table(&matrix));
            let asymmetric = matrix.asymmetric_pairs();
            if !asymmetric.is_empty() {
                info!(pairs = ?asymmetric, "Conflict relation is asymmetric for some pairs");
            }
        }
        Ok(())
    }
}

/// Point every change-set at its locally fetched head; change-sets whose
/// ref is missing (opened after the fetch) are left out of this run
fn with_local_heads(
    scratch: &ScratchRepository,
    pulls: Vec<ChangeSet>,
) -> Result<Vec<ChangeSet>> {
    let mut ready = Vec::with_capacity(pulls.len());
    for mut pull in pulls {
        match scratch.pull_head(&pull.id) {
            Ok(head) => {
                pull.head_sha = head;
                ready.push(pull);
            }
            Err(GitError::RevisionNotFound(reference)) => {
                warn!(pull = %pull.id, reference = %reference, "Head not fetched, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(ready)
}
