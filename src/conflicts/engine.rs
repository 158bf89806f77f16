use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::git::{GitError, MergeOutcome, MergeStrategy, MergeWorkspace};
use crate::github::{ChangeSet, PullId};

/// A change-set together with the commit obtained by merging it onto the
/// current tip of its target branch
#[derive(Debug, Clone)]
pub struct PreparedPull<'p> {
    pub change_set: &'p ChangeSet,
    pub merge_base: String,
}

/// Per change-set conflict lists of one run. Rows are computed independently
/// from each change-set's own merge base, so the relation may be asymmetric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictMatrix {
    rows: BTreeMap<PullId, Vec<PullId>>,
    skipped: Vec<PullId>,
}

impl ConflictMatrix {
    pub fn conflicts_of(&self, id: &PullId) -> Option<&[PullId]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&PullId, &[PullId])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Change-sets left out because their own merge onto the target failed
    pub fn skipped(&self) -> &[PullId] {
        &self.skipped
    }

    /// Pairs (a, b) where b conflicts with a's base but not the other way round
    pub fn asymmetric_pairs(&self) -> Vec<(PullId, PullId)> {
        let mut pairs = Vec::new();
        for (a, conflicts) in &self.rows {
            for b in conflicts {
                let reverse = self.rows.get(b).is_some_and(|r| r.contains(a));
                if !reverse && self.rows.contains_key(b) {
                    pairs.push((a.clone(), b.clone()));
                }
            }
        }
        pairs
    }
}

pub struct ConflictEngine<'w, W: MergeWorkspace + ?Sized> {
    workspace: &'w W,
    strategy: MergeStrategy,
}

impl<'w, W: MergeWorkspace + ?Sized> ConflictEngine<'w, W> {
    pub fn new(workspace: &'w W, strategy: MergeStrategy) -> Self {
        Self {
            workspace,
            strategy,
        }
    }

    /// Merge every change-set onto `target_tip`. A change-set the local merge
    /// tool cannot merge although the forge reported it mergeable is skipped
    /// for this run.
    pub fn prepare_bases<'p>(
        &self,
        target_tip: &str,
        pulls: &'p [ChangeSet],
    ) -> Result<(Vec<PreparedPull<'p>>, Vec<PullId>), GitError> {
        // pin the tip once so every base starts from the same commit
        let tip = self.workspace.rev_parse(target_tip)?;
        let mut prepared = Vec::with_capacity(pulls.len());
        let mut skipped = Vec::new();
        for pull in pulls {
            self.workspace.checkout(&tip)?;
            let message = format!("Prepare base for {}", pull.id);
            match self
                .workspace
                .merge(&pull.head_sha, self.strategy, &message)?
            {
                MergeOutcome::Merged { commit } => {
                    debug!(pull = %pull.id, base = %commit, "Prepared merge base");
                    prepared.push(PreparedPull {
                        change_set: pull,
                        merge_base: commit,
                    });
                }
                MergeOutcome::Conflicted { paths } => {
                    warn!(
                        pull = %pull.id,
                        ?paths,
                        "Reported mergeable but does not merge onto the target locally, skipping"
                    );
                    self.workspace.abort_merge()?;
                    skipped.push(pull.id.clone());
                }
            }
        }
        Ok((prepared, skipped))
    }

    /// Trial-merge every other prepared change-set into `subject`'s merge base
    /// and return the ones that fail, in input order
    pub fn conflicts_for<'p>(
        &self,
        subject: &PreparedPull<'_>,
        prepared: &[PreparedPull<'p>],
    ) -> Result<Vec<&'p ChangeSet>, GitError> {
        let mut conflicts = Vec::new();
        for other in prepared {
            if other.change_set.id == subject.change_set.id {
                continue;
            }
            self.workspace.checkout(&subject.merge_base)?;
            let message = format!(
                "Merge base_{}+{}",
                subject.change_set.id, other.change_set.id
            );
            let outcome = self
                .workspace
                .merge(&other.change_set.head_sha, self.strategy, &message)?;
            if let MergeOutcome::Conflicted { paths } = outcome {
                debug!(
                    pull = %subject.change_set.id,
                    other = %other.change_set.id,
                    ?paths,
                    "Trial merge conflicted"
                );
                self.workspace.abort_merge()?;
                conflicts.push(other.change_set);
            }
        }
        Ok(conflicts)
    }

    /// The full O(N^2) conflict matrix of `pulls` against `target_tip`
    pub fn compute(
        &self,
        target_tip: &str,
        pulls: &[ChangeSet],
    ) -> Result<ConflictMatrix, GitError> {
        let (prepared, skipped) = self.prepare_bases(target_tip, pulls)?;
        let mut rows = BTreeMap::new();
        for (i, subject) in prepared.iter().enumerate() {
            info!(
                "{i}/{len} Checking for conflicts {tip} <> {id} <> other_pulls ...",
                len = prepared.len(),
                tip = short(target_tip),
                id = subject.change_set.id
            );
            let conflicts = self.conflicts_for(subject, &prepared)?;
            rows.insert(
                subject.change_set.id.clone(),
                conflicts.into_iter().map(|c| c.id.clone()).collect(),
            );
        }
        Ok(ConflictMatrix { rows, skipped })
    }
}

fn short(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}
