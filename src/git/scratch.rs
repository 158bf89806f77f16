//! Scratch repository manager
//!
//! Keeps a long-lived clone of the tracked repositories under the scratch
//! directory, with one extra remote per repository exposing every pull
//! request ref, and hands out disposable copies of it for trial merges.

use fd_lock::RwLock;
use git2::{FetchOptions, Repository};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::operations::{dirty_entries, Git2Workspace, GitError, MergeWorkspace};
use crate::github::{PullId, Slug};

/// On-disk layout of one tracked (mono)tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchLayout {
    pub root: PathBuf,
    pub persist: PathBuf,
    pub temp: PathBuf,
    pub lock_file: PathBuf,
}

impl ScratchLayout {
    pub fn new(scratch_dir: &Path, repos: &[Slug]) -> Self {
        let name = repos
            .iter()
            .map(Slug::dir_name)
            .collect::<Vec<_>>()
            .join("_");
        let root = scratch_dir.join(name);
        Self {
            persist: root.join("persist"),
            temp: root.join("temp"),
            lock_file: root.join("lock"),
            root,
        }
    }

    /// Lock guarding the scratch tree against concurrent runs. Take the
    /// write guard before the first clone and hold it while the tree is in use.
    pub fn lock(&self) -> Result<RwLock<File>, GitError> {
        fs::create_dir_all(&self.root)?;
        Ok(RwLock::new(File::create(&self.lock_file)?))
    }
}

/// Remote exposing `refs/pull/*` of one repository
pub fn pull_remote_name(slug: &Slug) -> String {
    format!("pull/{}/{}", slug.owner, slug.repo)
}

/// Local ref holding the head of a pull request after `fetch_all`
pub fn pull_head_ref(id: &PullId) -> String {
    format!(
        "refs/remotes/pull/{}/{}/{}/head",
        id.slug.owner, id.slug.repo, id.number
    )
}

pub struct ScratchRepository {
    layout: ScratchLayout,
    repos: Vec<Slug>,
    repo: Repository,
}

impl ScratchRepository {
    /// Open the persistent clone, cloning and configuring it on first use
    pub fn open_or_clone(
        scratch_dir: &Path,
        repos: &[Slug],
        clone_base_url: &str,
    ) -> Result<Self, GitError> {
        let layout = ScratchLayout::new(scratch_dir, repos);
        fs::create_dir_all(&layout.root)?;
        fs::create_dir_all(&layout.temp)?;

        let repo = if layout.persist.is_dir() {
            Repository::open(&layout.persist)?
        } else {
            Self::init_clone(&layout.persist, repos, clone_base_url)?
        };

        Ok(Self {
            layout,
            repos: repos.to_vec(),
            repo,
        })
    }

    fn init_clone(
        persist: &Path,
        repos: &[Slug],
        clone_base_url: &str,
    ) -> Result<Repository, GitError> {
        let Some(first) = repos.first() else {
            return Err(GitError::NoRepositories);
        };
        let origin_url = remote_url(clone_base_url, first);
        info!(url = %origin_url, dir = %persist.display(), "Cloning repository");
        let repo = Repository::clone(&origin_url, persist)?;

        info!("Setting git metadata");
        for slug in repos {
            let url = remote_url(clone_base_url, slug);
            let refspec = format!(
                "+refs/pull/*:refs/remotes/pull/{}/{}/*",
                slug.owner, slug.repo
            );
            repo.remote_with_fetch(&pull_remote_name(slug), &url, &refspec)?;
        }
        {
            let mut config = repo.config()?;
            config.set_bool("fetch.showForcedUpdates", false)?;
            config.set_str("user.email", "no@ne.nl")?;
            config.set_str("user.name", "none")?;
            config.set_i32("gc.auto", 0)?;
        }
        Ok(repo)
    }

    pub fn layout(&self) -> &ScratchLayout {
        &self.layout
    }

    /// Refuse to run on a persistent tree with local modifications
    pub fn ensure_clean(&self) -> Result<(), GitError> {
        let entries = dirty_entries(&self.repo)?;
        if entries > 0 {
            return Err(GitError::DirtyWorkTree {
                path: self.layout.persist.clone(),
                entries,
            });
        }
        Ok(())
    }

    /// Fetch origin and every pull request remote
    pub fn fetch_all(&self) -> Result<(), GitError> {
        let repos: Vec<String> = self.repos.iter().map(Slug::to_string).collect();
        info!(repos = ?repos, "Fetching diffs");
        self.fetch("origin", &[])?;
        for slug in &self.repos {
            self.fetch(&pull_remote_name(slug), &[])?;
        }
        Ok(())
    }

    /// Fetch the target branch from origin and return its tip
    pub fn fetch_target(&self, branch: &str) -> Result<String, GitError> {
        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        self.fetch("origin", &[refspec.as_str()])?;
        let tip = self
            .repo
            .revparse_single(&format!("refs/remotes/origin/{branch}"))
            .map_err(|_| GitError::RevisionNotFound(format!("origin/{branch}")))?
            .peel_to_commit()?
            .id()
            .to_string();
        debug!(branch, tip = %tip, "Fetched target branch");
        Ok(tip)
    }

    /// Head commit of a pull request as fetched locally
    pub fn pull_head(&self, id: &PullId) -> Result<String, GitError> {
        let reference = pull_head_ref(id);
        let commit = self
            .repo
            .revparse_single(&reference)
            .map_err(|_| GitError::RevisionNotFound(reference.clone()))?
            .peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn fetch(&self, remote: &str, refspecs: &[&str]) -> Result<(), GitError> {
        let mut remote = self.repo.find_remote(remote)?;
        let mut opts = FetchOptions::new();
        remote.fetch(refspecs, Some(&mut opts), None)?;
        Ok(())
    }

    /// Copy the repository metadata into a fresh temporary directory and
    /// check out `rev` there. The copy is removed when dropped.
    pub fn disposable_workspace(&self, rev: &str) -> Result<DisposableWorkspace, GitError> {
        let dir = TempDir::new_in(&self.layout.temp)?;
        copy_dir(&self.layout.persist.join(".git"), &dir.path().join(".git"))?;
        let workspace = Git2Workspace::open(dir.path())?;
        workspace.checkout(rev)?;
        let entries = dirty_entries(workspace.repository())?;
        if entries > 0 {
            return Err(GitError::DirtyWorkTree {
                path: dir.path().to_path_buf(),
                entries,
            });
        }
        debug!(dir = %dir.path().display(), rev, "Prepared disposable workspace");
        Ok(DisposableWorkspace { workspace, dir })
    }
}

/// A throwaway working tree; the directory is deleted on drop
pub struct DisposableWorkspace {
    workspace: Git2Workspace,
    dir: TempDir,
}

impl DisposableWorkspace {
    pub fn workspace(&self) -> &Git2Workspace {
        &self.workspace
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn remote_url(base: &str, slug: &Slug) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), slug.owner, slug.repo)
}

fn copy_dir(from: &Path, to: &Path) -> Result<(), GitError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| GitError::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| GitError::Io(std::io::Error::other(e)))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
