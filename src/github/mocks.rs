// In-memory GitHub implementation for tests - no network, every write recorded.
// Lookups of entities that were never inserted panic, like an unexpected mock call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use super::client::GitHubOps;
use super::errors::GitHubError;
use super::types::{ChangeSet, IssueComment, MergeState, PullId, PullReview, Slug};

/// A write the bots performed against the forge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedWrite {
    CreateComment { pull: PullId, body: String },
    UpdateComment { comment_id: u64, body: String },
    DeleteComment { comment_id: u64 },
    AddLabel { pull: PullId, label: String },
    RemoveLabel { pull: PullId, label: String },
    LockConversation { slug: Slug, number: u64 },
}

#[derive(Debug, Default)]
struct State {
    default_branches: HashMap<Slug, String>,
    pulls: BTreeMap<PullId, ChangeSet>,
    /// Mergeable states handed out by successive `get_pull` calls before the
    /// stored state is reported
    pending_states: HashMap<PullId, VecDeque<MergeState>>,
    comments: BTreeMap<PullId, Vec<IssueComment>>,
    reviews: BTreeMap<PullId, Vec<PullReview>>,
    search_results: HashMap<String, Vec<u64>>,
    next_comment_id: u64,
    writes: Vec<RecordedWrite>,
    get_pull_calls: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryGitHub {
    state: Mutex<State>,
}

impl InMemoryGitHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_comment_id: 1000,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_default_branch(&self, slug: &Slug, branch: &str) {
        self.state()
            .default_branches
            .insert(slug.clone(), branch.to_string());
    }

    pub fn insert_pull(&self, pull: ChangeSet) {
        self.state().pulls.insert(pull.id.clone(), pull);
    }

    pub fn close_pull(&self, id: &PullId) {
        if let Some(pull) = self.state().pulls.get_mut(id) {
            pull.open = false;
        }
    }

    /// Report `states` from the next `get_pull` calls, one per call
    pub fn queue_merge_states(&self, id: &PullId, states: Vec<MergeState>) {
        self.state()
            .pending_states
            .insert(id.clone(), states.into_iter().collect());
    }

    pub fn insert_comment(&self, pull: &PullId, body: &str) -> u64 {
        self.insert_comment_by(pull, "pullwarden", body, None)
    }

    pub fn insert_comment_by(
        &self,
        pull: &PullId,
        author: &str,
        body: &str,
        updated_at: Option<DateTime<Utc>>,
    ) -> u64 {
        let mut state = self.state();
        state.next_comment_id += 1;
        let id = state.next_comment_id;
        state
            .comments
            .entry(pull.clone())
            .or_default()
            .push(IssueComment {
                id,
                body: body.to_string(),
                author: author.to_string(),
                html_url: format!(
                    "https://github.com/{}/pull/{}#issuecomment-{id}",
                    pull.slug, pull.number
                ),
                updated_at,
            });
        id
    }

    pub fn insert_review(&self, pull: &PullId, review: PullReview) {
        self.state()
            .reviews
            .entry(pull.clone())
            .or_default()
            .push(review);
    }

    pub fn set_search_result(&self, query: &str, numbers: Vec<u64>) {
        self.state()
            .search_results
            .insert(query.to_string(), numbers);
    }

    pub fn comments(&self, pull: &PullId) -> Vec<IssueComment> {
        self.state().comments.get(pull).cloned().unwrap_or_default()
    }

    pub fn labels(&self, pull: &PullId) -> Vec<String> {
        self.state()
            .pulls
            .get(pull)
            .map(|p| p.labels.clone())
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    pub fn get_pull_calls(&self) -> usize {
        self.state().get_pull_calls
    }
}

#[async_trait]
impl GitHubOps for InMemoryGitHub {
    async fn default_branch(&self, slug: &Slug) -> Result<String, GitHubError> {
        match self.state().default_branches.get(slug) {
            Some(branch) => Ok(branch.clone()),
            None => panic!("no default branch configured for {slug}"),
        }
    }

    async fn list_open_pulls(
        &self,
        slug: &Slug,
        base: Option<&str>,
    ) -> Result<Vec<ChangeSet>, GitHubError> {
        Ok(self
            .state()
            .pulls
            .values()
            .filter(|p| &p.id.slug == slug && p.open)
            .filter(|p| base.map_or(true, |b| p.base_ref == b))
            .map(|p| ChangeSet {
                merge_state: MergeState::Unknown,
                ..p.clone()
            })
            .collect())
    }

    async fn get_pull(&self, id: &PullId) -> Result<ChangeSet, GitHubError> {
        let mut state = self.state();
        state.get_pull_calls += 1;
        let queued = state
            .pending_states
            .get_mut(id)
            .and_then(|q| q.pop_front());
        let Some(mut pull) = state.pulls.get(id).cloned() else {
            panic!("pull request {id} is not in the in-memory forge");
        };
        if let Some(merge_state) = queued {
            pull.merge_state = merge_state;
        }
        Ok(pull)
    }

    async fn list_comments(&self, id: &PullId) -> Result<Vec<IssueComment>, GitHubError> {
        Ok(self.comments(id))
    }

    async fn list_reviews(&self, id: &PullId) -> Result<Vec<PullReview>, GitHubError> {
        Ok(self.state().reviews.get(id).cloned().unwrap_or_default())
    }

    async fn create_comment(&self, id: &PullId, body: &str) -> Result<IssueComment, GitHubError> {
        let comment_id = self.insert_comment(id, body);
        self.state().writes.push(RecordedWrite::CreateComment {
            pull: id.clone(),
            body: body.to_string(),
        });
        let created = self
            .comments(id)
            .into_iter()
            .find(|c| c.id == comment_id);
        Ok(created.unwrap_or_else(|| panic!("comment {comment_id} vanished")))
    }

    async fn update_comment(
        &self,
        _slug: &Slug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        let mut state = self.state();
        let Some(comment) = state
            .comments
            .values_mut()
            .flat_map(|c| c.iter_mut())
            .find(|c| c.id == comment_id)
        else {
            panic!("comment {comment_id} is not in the in-memory forge");
        };
        comment.body = body.to_string();
        state.writes.push(RecordedWrite::UpdateComment {
            comment_id,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn delete_comment(&self, _slug: &Slug, comment_id: u64) -> Result<(), GitHubError> {
        let mut state = self.state();
        for comments in state.comments.values_mut() {
            comments.retain(|c| c.id != comment_id);
        }
        state
            .writes
            .push(RecordedWrite::DeleteComment { comment_id });
        Ok(())
    }

    async fn add_label(&self, id: &PullId, label: &str) -> Result<(), GitHubError> {
        let mut state = self.state();
        if let Some(pull) = state.pulls.get_mut(id) {
            if !pull.has_label(label) {
                pull.labels.push(label.to_string());
            }
        }
        state.writes.push(RecordedWrite::AddLabel {
            pull: id.clone(),
            label: label.to_string(),
        });
        Ok(())
    }

    async fn remove_label(&self, id: &PullId, label: &str) -> Result<(), GitHubError> {
        let mut state = self.state();
        if let Some(pull) = state.pulls.get_mut(id) {
            pull.labels.retain(|l| l != label);
        }
        state.writes.push(RecordedWrite::RemoveLabel {
            pull: id.clone(),
            label: label.to_string(),
        });
        Ok(())
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<u64>, GitHubError> {
        Ok(self
            .state()
            .search_results
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn lock_conversation(&self, slug: &Slug, number: u64) -> Result<(), GitHubError> {
        self.state().writes.push(RecordedWrite::LockConversation {
            slug: slug.clone(),
            number,
        });
        Ok(())
    }
}

/// Open change-set fixture with sensible defaults
pub fn change_set(slug: &Slug, number: u64, base: &str, merge_state: MergeState) -> ChangeSet {
    ChangeSet {
        id: PullId::new(slug.clone(), number),
        base_ref: base.to_string(),
        head_sha: format!("{number:040x}"),
        merge_state,
        title: format!("Pull request {number}"),
        author: "contributor".to_string(),
        html_url: format!("https://github.com/{slug}/pull/{number}"),
        draft: false,
        open: true,
        merged: false,
        labels: Vec::new(),
        updated_at: None,
    }
}
