use git2::build::CheckoutBuilder;
use git2::{Commit, ErrorCode, MergeOptions, Oid, Repository, Signature, StatusOptions};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("revision '{0}' not found")]
    RevisionNotFound(String),

    #[error("working tree at {path} is not clean ({entries} changed entries)")]
    DirtyWorkTree { path: PathBuf, entries: usize },

    #[error("scratch directory {0} is in use by another run")]
    Locked(PathBuf),

    #[error("unknown merge strategy '{0}', expected 'ort' or 'resolve'")]
    UnknownStrategy(String),

    #[error("no repositories configured")]
    NoRepositories,
}

/// Three-way merge flavour used for trial merges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Rename-aware merge, the git default
    #[default]
    Ort,
    /// Plain three-way merge without rename detection
    Resolve,
}

impl MergeStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MergeStrategy::Ort => "ort",
            MergeStrategy::Resolve => "resolve",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MergeStrategy {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ort" => Ok(MergeStrategy::Ort),
            "resolve" => Ok(MergeStrategy::Resolve),
            other => Err(GitError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// HEAD now points at `commit` (a merge commit, a fast-forward target or
    /// the unchanged HEAD when already up to date)
    Merged { commit: String },
    /// The merge stopped with conflicts in `paths`; call `abort_merge`
    Conflicted { paths: Vec<String> },
}

/// Narrow working-tree interface the conflict engine runs against
#[cfg_attr(test, mockall::automock)]
pub trait MergeWorkspace {
    /// Resolve a revision to a full commit id
    fn rev_parse(&self, rev: &str) -> Result<String, GitError>;

    /// Commit id currently checked out
    fn head(&self) -> Result<String, GitError>;

    /// Force-checkout `rev` as a detached HEAD
    fn checkout(&self, rev: &str) -> Result<(), GitError>;

    /// Merge `rev` into HEAD
    fn merge(&self, rev: &str, strategy: MergeStrategy, message: &str)
        -> Result<MergeOutcome, GitError>;

    /// Drop any partial merge state and reset the tree to HEAD
    fn abort_merge(&self) -> Result<(), GitError>;

    /// True when tracked files match HEAD
    fn is_clean(&self) -> Result<bool, GitError>;
}

/// Implementation of MergeWorkspace using git2
pub struct Git2Workspace {
    repo: Repository,
}

impl Git2Workspace {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        Ok(Self {
            repo: Repository::open(path)?,
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn get_signature(&self) -> Result<Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => Ok(Signature::now("none", "no@ne.nl")?),
        }
    }

    fn find_commit(&self, rev: &str) -> Result<Commit<'_>, GitError> {
        let object = self.repo.revparse_single(rev).map_err(|e| match e.code() {
            ErrorCode::NotFound | ErrorCode::Ambiguous | ErrorCode::InvalidSpec => {
                GitError::RevisionNotFound(rev.to_string())
            }
            _ => GitError::Git(e),
        })?;
        Ok(object.peel_to_commit()?)
    }

    fn move_head(&self, commit: Oid) -> Result<(), GitError> {
        let object = self.repo.find_object(commit, None)?;
        self.repo
            .checkout_tree(&object, Some(CheckoutBuilder::new().force()))?;
        self.repo.set_head_detached(commit)?;
        Ok(())
    }

    fn merge_options(strategy: MergeStrategy) -> MergeOptions {
        let mut opts = MergeOptions::new();
        opts.find_renames(strategy == MergeStrategy::Ort);
        opts
    }
}

impl MergeWorkspace for Git2Workspace {
    fn rev_parse(&self, rev: &str) -> Result<String, GitError> {
        Ok(self.find_commit(rev)?.id().to_string())
    }

    fn head(&self) -> Result<String, GitError> {
        Ok(self.repo.head()?.peel_to_commit()?.id().to_string())
    }

    fn checkout(&self, rev: &str) -> Result<(), GitError> {
        let commit = self.find_commit(rev)?.id();
        self.move_head(commit)
    }

    fn merge(
        &self,
        rev: &str,
        strategy: MergeStrategy,
        message: &str,
    ) -> Result<MergeOutcome, GitError> {
        let head = self.repo.head()?.peel_to_commit()?;
        let other = self.find_commit(rev)?;
        let annotated = self.repo.find_annotated_commit(other.id())?;
        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::Merged {
                commit: head.id().to_string(),
            });
        }
        if analysis.is_fast_forward() {
            self.move_head(other.id())?;
            return Ok(MergeOutcome::Merged {
                commit: other.id().to_string(),
            });
        }

        let mut index = self
            .repo
            .merge_commits(&head, &other, Some(&Self::merge_options(strategy)))?;
        if index.has_conflicts() {
            let mut paths = Vec::new();
            for conflict in index.conflicts()? {
                let conflict = conflict?;
                let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
                if let Some(entry) = entry {
                    paths.push(String::from_utf8_lossy(&entry.path).into_owned());
                }
            }
            debug!(head = %head.id(), other = %other.id(), ?paths, "Merge conflicted");
            return Ok(MergeOutcome::Conflicted { paths });
        }

        let tree_oid = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_oid)?;
        let signature = self.get_signature()?;
        let merged = self.repo.commit(
            None,
            &signature,
            &signature,
            message,
            &tree,
            &[&head, &other],
        )?;
        self.move_head(merged)?;
        Ok(MergeOutcome::Merged {
            commit: merged.to_string(),
        })
    }

    fn abort_merge(&self) -> Result<(), GitError> {
        self.repo.cleanup_state()?;
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(())
    }

    fn is_clean(&self) -> Result<bool, GitError> {
        Ok(dirty_entries(&self.repo)? == 0)
    }
}

/// Number of tracked entries that differ from HEAD
pub(crate) fn dirty_entries(repo: &Repository) -> Result<usize, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    Ok(repo.statuses(Some(&mut opts))?.len())
}
