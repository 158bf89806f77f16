use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::GitHubError;

/// Repository slug on GitHub. Format: owner/repo
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slug {
    pub owner: String,
    pub repo: String,
}

impl Slug {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Directory-safe form used for scratch paths: owner_repo
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.owner, self.repo)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for Slug {
    type Err = GitHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(GitHubError::InvalidIdentifier(format!(
                "'{s}' is not a repo slug, expected owner/repo"
            ))),
        }
    }
}

/// Repo-qualified pull request number. Format: owner/repo/number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PullId {
    pub slug: Slug,
    pub number: u64,
}

impl PullId {
    pub fn new(slug: Slug, number: u64) -> Self {
        Self { slug, number }
    }
}

impl fmt::Display for PullId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.slug, self.number)
    }
}

impl FromStr for PullId {
    type Err = GitHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            GitHubError::InvalidIdentifier(format!(
                "'{s}' is not a pull id, expected owner/repo/number"
            ))
        };
        let (slug, number) = s.rsplit_once('/').ok_or_else(invalid)?;
        let slug: Slug = slug.parse().map_err(|_| invalid())?;
        let number = number.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self::new(slug, number))
    }
}

/// Forge-computed mergeability of a change-set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeState {
    Unknown,
    Mergeable,
    Conflicted,
}

impl MergeState {
    pub fn from_flag(mergeable: Option<bool>) -> Self {
        match mergeable {
            None => MergeState::Unknown,
            Some(true) => MergeState::Mergeable,
            Some(false) => MergeState::Conflicted,
        }
    }

    pub fn is_resolved(&self) -> bool {
        *self != MergeState::Unknown
    }
}

/// An open pull request as seen by the bots
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub id: PullId,
    pub base_ref: String,
    pub head_sha: String,
    pub merge_state: MergeState,
    pub title: String,
    pub author: String,
    pub html_url: String,
    pub draft: bool,
    pub open: bool,
    pub merged: bool,
    pub labels: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChangeSet {
    pub fn from_record(slug: &Slug, record: PullRecord) -> Self {
        Self {
            id: PullId::new(slug.clone(), record.number),
            base_ref: record.base.ref_name,
            head_sha: record.head.sha,
            merge_state: MergeState::from_flag(record.mergeable),
            title: record.title.unwrap_or_default(),
            author: record.user.map(|u| u.login).unwrap_or_default(),
            html_url: record.html_url.unwrap_or_default(),
            draft: record.draft.unwrap_or(false),
            open: record.state == "open",
            merged: record.merged.unwrap_or(false),
            labels: record.labels.into_iter().map(|l| l.name).collect(),
            updated_at: record.updated_at,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A comment on the conversation tab of a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    pub author: String,
    pub html_url: String,
    /// Last edit, or creation when never edited
    pub updated_at: Option<DateTime<Utc>>,
}

/// A submitted review of a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReview {
    pub author: String,
    pub html_url: String,
    pub body: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

// Wire records for the REST routes used by `GitHubClient`. Only the fields the
// bots read are declared so that fixtures and GitHub Enterprise payloads stay
// easy to satisfy.

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PullRecord {
    pub number: u64,
    pub title: Option<String>,
    pub state: String,
    pub draft: Option<bool>,
    pub merged: Option<bool>,
    pub mergeable: Option<bool>,
    pub html_url: Option<String>,
    pub user: Option<UserRecord>,
    pub head: RefRecord,
    pub base: RefRecord,
    #[serde(default)]
    pub labels: Vec<LabelRecord>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserRecord {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefRecord {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelRecord {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommentRecord {
    pub id: u64,
    pub body: Option<String>,
    pub user: Option<UserRecord>,
    pub html_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<CommentRecord> for IssueComment {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.id,
            body: record.body.unwrap_or_default(),
            author: record.user.map(|u| u.login).unwrap_or_default(),
            html_url: record.html_url.unwrap_or_default(),
            updated_at: record.updated_at.or(record.created_at),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReviewRecord {
    pub user: Option<UserRecord>,
    pub body: Option<String>,
    pub html_url: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<ReviewRecord> for PullReview {
    fn from(record: ReviewRecord) -> Self {
        Self {
            author: record.user.map(|u| u.login).unwrap_or_default(),
            html_url: record.html_url.unwrap_or_default(),
            body: record.body.unwrap_or_default(),
            submitted_at: record.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoRecord {
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchItemRecord {
    pub number: u64,
}
