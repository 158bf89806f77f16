// Shared fixtures: small git histories built directly with git2
#![allow(dead_code)]

use git2::{Oid, Repository, Signature};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const BASE_FILE: &str = "line 1\nline 2\nline 3\n";

/// Commit `files` (path, content) on top of `parent` without touching any
/// working tree
pub fn commit_files(
    repo: &Repository,
    parent: Option<Oid>,
    files: &[(&str, &str)],
    message: &str,
) -> Oid {
    let sig = Signature::now("fixture", "fixture@example.com").unwrap();
    let parent_commit = parent.map(|p| repo.find_commit(p).unwrap());
    let parent_tree = parent_commit.as_ref().map(|c| c.tree().unwrap());
    let mut builder = repo.treebuilder(parent_tree.as_ref()).unwrap();
    for (path, content) in files {
        let blob = repo.blob(content.as_bytes()).unwrap();
        builder.insert(path, blob, 0o100644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();
    let parents: Vec<&git2::Commit> = parent_commit.iter().collect();
    repo.commit(None, &sig, &sig, message, &tree, &parents).unwrap()
}

/// History shared by the scenario tests: `main` plus pull requests 10 and 20
/// editing the same line, and 30 touching an unrelated file
pub struct Scenario {
    pub main: Oid,
    pub heads: Vec<(u64, Oid)>,
}

impl Scenario {
    pub fn build(repo: &Repository) -> Self {
        let main = commit_files(
            repo,
            None,
            &[("a.txt", BASE_FILE), ("b.txt", "unrelated\n")],
            "Initial commit",
        );
        let ten = commit_files(
            repo,
            Some(main),
            &[("a.txt", "line 1\nten\nline 3\n")],
            "Change line 2 to ten",
        );
        let twenty = commit_files(
            repo,
            Some(main),
            &[("a.txt", "line 1\ntwenty\nline 3\n")],
            "Change line 2 to twenty",
        );
        let thirty = commit_files(repo, Some(main), &[("c.txt", "new file\n")], "Add c.txt");
        Self {
            main,
            heads: vec![(10, ten), (20, twenty), (30, thirty)],
        }
    }

    pub fn head(&self, number: u64) -> Oid {
        self.heads
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, oid)| *oid)
            .unwrap()
    }
}

/// A non-bare repository with the scenario history and nothing checked out
pub fn scenario_workspace() -> (TempDir, Scenario) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let scenario = Scenario::build(&repo);
    (dir, scenario)
}

/// Bare "forge" repositories under one root, laid out as `<root>/<owner>/<repo>`
/// so the root can stand in for https://github.com
pub struct Upstream {
    pub root: TempDir,
}

impl Upstream {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn base_url(&self) -> String {
        self.root.path().display().to_string()
    }

    pub fn path(&self, owner: &str, repo: &str) -> PathBuf {
        self.root.path().join(owner).join(repo)
    }

    /// Create `owner/repo` with the scenario history, `main` as HEAD and every
    /// pull request exposed as `refs/pull/<n>/head`
    pub fn create_scenario(&self, owner: &str, repo: &str) -> Scenario {
        let repo = Repository::init_bare(self.path(owner, repo)).unwrap();
        let scenario = Scenario::build(&repo);
        repo.reference("refs/heads/main", scenario.main, true, "main").unwrap();
        repo.set_head("refs/heads/main").unwrap();
        for (number, head) in &scenario.heads {
            repo.reference(&format!("refs/pull/{number}/head"), *head, true, "pull")
                .unwrap();
        }
        scenario
    }

    pub fn open(&self, owner: &str, repo: &str) -> Repository {
        Repository::open_bare(self.path(owner, repo)).unwrap()
    }
}

pub fn write_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}
