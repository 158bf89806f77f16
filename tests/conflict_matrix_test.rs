mod common;

use std::cell::RefCell;
use std::collections::HashSet;

use pullwarden::annotation::{AnnotationSynchronizer, Marker, SyncOutcome};
use pullwarden::conflicts::ConflictEngine;
use pullwarden::git::{Git2Workspace, GitError, MergeOutcome, MergeStrategy, MergeWorkspace};
use pullwarden::github::mocks::{change_set, InMemoryGitHub};
use pullwarden::github::{ChangeSet, MergeState, PullId, Slug};

use common::{scenario_workspace, Scenario};

fn slug() -> Slug {
    Slug::new("owner", "repo")
}

fn scenario_pulls(scenario: &Scenario, numbers: &[u64]) -> Vec<ChangeSet> {
    numbers
        .iter()
        .map(|&n| {
            let mut pull = change_set(&slug(), n, "main", MergeState::Mergeable);
            pull.head_sha = scenario.head(n).to_string();
            pull
        })
        .collect()
}

fn id(number: u64) -> PullId {
    PullId::new(slug(), number)
}

#[test]
fn test_three_pull_scenario_matrix() {
    let (dir, scenario) = scenario_workspace();
    let workspace = Git2Workspace::open(dir.path()).unwrap();
    let pulls = scenario_pulls(&scenario, &[10, 20, 30]);

    let engine = ConflictEngine::new(&workspace, MergeStrategy::Ort);
    let matrix = engine.compute(&scenario.main.to_string(), &pulls).unwrap();

    assert_eq!(matrix.conflicts_of(&id(10)).unwrap(), &[id(20)]);
    assert_eq!(matrix.conflicts_of(&id(20)).unwrap(), &[id(10)]);
    assert!(matrix.conflicts_of(&id(30)).unwrap().is_empty());
    assert!(matrix.skipped().is_empty());
    assert!(workspace.is_clean().unwrap());
}

#[test]
fn test_resolve_strategy_finds_the_same_conflicts() {
    let (dir, scenario) = scenario_workspace();
    let workspace = Git2Workspace::open(dir.path()).unwrap();
    let pulls = scenario_pulls(&scenario, &[10, 20, 30]);

    let engine = ConflictEngine::new(&workspace, MergeStrategy::Resolve);
    let matrix = engine.compute(&scenario.main.to_string(), &pulls).unwrap();

    assert_eq!(matrix.conflicts_of(&id(10)).unwrap(), &[id(20)]);
    assert!(matrix.conflicts_of(&id(30)).unwrap().is_empty());
}

#[test]
fn test_trial_merges_leave_bases_intact() {
    let (dir, scenario) = scenario_workspace();
    let workspace = Git2Workspace::open(dir.path()).unwrap();
    let pulls = scenario_pulls(&scenario, &[10, 30]);
    let engine = ConflictEngine::new(&workspace, MergeStrategy::Ort);

    let (prepared, skipped) = engine
        .prepare_bases(&scenario.main.to_string(), &pulls)
        .unwrap();

    assert!(skipped.is_empty());
    // both pulls are direct children of main, so their bases are fast-forwards
    assert_eq!(prepared[0].merge_base, scenario.head(10).to_string());
    assert_eq!(prepared[1].merge_base, scenario.head(30).to_string());

    let conflicts = engine.conflicts_for(&prepared[0], &prepared).unwrap();
    assert!(conflicts.is_empty());
    let merged = workspace.head().unwrap();
    assert_ne!(merged, prepared[0].merge_base);
    assert!(std::fs::read_to_string(dir.path().join("c.txt")).is_ok());
}

#[tokio::test]
async fn test_synchronizer_publishes_scenario_and_flips_on_rerun() {
    let (dir, scenario) = scenario_workspace();
    let workspace = Git2Workspace::open(dir.path()).unwrap();
    let github = InMemoryGitHub::new();
    let main = scenario.main.to_string();

    let pulls = scenario_pulls(&scenario, &[10, 20, 30]);
    let engine = ConflictEngine::new(&workspace, MergeStrategy::Ort);
    let sync = AnnotationSynchronizer::new(&github, false);
    let (prepared, _) = engine.prepare_bases(&main, &pulls).unwrap();
    for subject in &prepared {
        let conflicts = engine.conflicts_for(subject, &prepared).unwrap();
        sync.sync_conflicts(&subject.change_set.id, &conflicts)
            .await
            .unwrap();
    }

    let ten = github.comments(&id(10));
    assert_eq!(ten.len(), 1);
    assert!(ten[0].body.contains("[#20](https://github.com/owner/repo/pull/20)"));
    assert!(github.comments(&id(20))[0].body.contains("[#10]"));
    assert!(github.comments(&id(30)).is_empty());
    assert_eq!(github.writes().len(), 2);

    // #20 got closed; #10 is now free of conflicts
    github.clear_writes();
    let pulls = scenario_pulls(&scenario, &[10, 30]);
    let (prepared, _) = engine.prepare_bases(&main, &pulls).unwrap();
    let mut outcomes = Vec::new();
    for subject in &prepared {
        let conflicts = engine.conflicts_for(subject, &prepared).unwrap();
        outcomes.push(
            sync.sync_conflicts(&subject.change_set.id, &conflicts)
                .await
                .unwrap(),
        );
    }

    assert_eq!(outcomes, vec![SyncOutcome::Updated, SyncOutcome::Suppressed]);
    let ten = github.comments(&id(10));
    assert_eq!(ten.len(), 1);
    assert!(Marker::Metadata.owns(&ten[0].body));
    assert!(ten[0].body.ends_with("\n### Conflicts\nNo conflicts as of last run."));
}

/// Merge workspace following a script: merging `rev` onto the base of `owner`
/// fails when (owner, rev) is listed
struct ScriptedWorkspace {
    head: RefCell<String>,
    failing: HashSet<(String, String)>,
    aborts: RefCell<usize>,
}

impl ScriptedWorkspace {
    fn new(failing: &[(&str, &str)]) -> Self {
        Self {
            head: RefCell::new(String::new()),
            failing: failing
                .iter()
                .map(|(a, b)| (format!("base-{a}"), b.to_string()))
                .collect(),
            aborts: RefCell::new(0),
        }
    }
}

impl MergeWorkspace for ScriptedWorkspace {
    fn rev_parse(&self, rev: &str) -> Result<String, GitError> {
        Ok(rev.to_string())
    }

    fn head(&self) -> Result<String, GitError> {
        Ok(self.head.borrow().clone())
    }

    fn checkout(&self, rev: &str) -> Result<(), GitError> {
        *self.head.borrow_mut() = rev.to_string();
        Ok(())
    }

    fn merge(
        &self,
        rev: &str,
        _strategy: MergeStrategy,
        _message: &str,
    ) -> Result<MergeOutcome, GitError> {
        let head = self.head.borrow().clone();
        if head == "tip" {
            let base = format!("base-{rev}");
            *self.head.borrow_mut() = base.clone();
            return Ok(MergeOutcome::Merged { commit: base });
        }
        if self.failing.contains(&(head.clone(), rev.to_string())) {
            return Ok(MergeOutcome::Conflicted {
                paths: vec!["src/net.cpp".to_string()],
            });
        }
        let merged = format!("{head}+{rev}");
        *self.head.borrow_mut() = merged.clone();
        Ok(MergeOutcome::Merged { commit: merged })
    }

    fn abort_merge(&self) -> Result<(), GitError> {
        *self.aborts.borrow_mut() += 1;
        Ok(())
    }

    fn is_clean(&self) -> Result<bool, GitError> {
        Ok(true)
    }
}

#[test]
fn test_asymmetric_conflicts_are_recorded_as_found() {
    let mut pulls = Vec::new();
    for (number, head) in [(1, "head-a"), (2, "head-b"), (3, "head-c")] {
        let mut pull = change_set(&slug(), number, "main", MergeState::Mergeable);
        pull.head_sha = head.to_string();
        pulls.push(pull);
    }
    // B fails on A's base, A merges fine on B's base
    let workspace = ScriptedWorkspace::new(&[("head-a", "head-b")]);

    let engine = ConflictEngine::new(&workspace, MergeStrategy::Ort);
    let matrix = engine.compute("tip", &pulls).unwrap();

    assert_eq!(matrix.conflicts_of(&id(1)).unwrap(), &[id(2)]);
    assert!(matrix.conflicts_of(&id(2)).unwrap().is_empty());
    assert!(matrix.conflicts_of(&id(3)).unwrap().is_empty());
    assert_eq!(matrix.asymmetric_pairs(), vec![(id(1), id(2))]);
    assert_eq!(*workspace.aborts.borrow(), 1);
}
