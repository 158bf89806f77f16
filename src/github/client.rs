use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::Serialize;
use tracing::debug;

use super::errors::GitHubError;
use super::types::{
    ChangeSet, CommentRecord, IssueComment, LabelRecord, PullId, PullRecord, PullReview,
    RepoRecord, ReviewRecord, SearchItemRecord, Slug,
};

const PER_PAGE: u8 = 100;

/// Trait for GitHub operations to enable testing with mocks
#[async_trait]
pub trait GitHubOps: Send + Sync {
    async fn default_branch(&self, slug: &Slug) -> Result<String, GitHubError>;
    /// Open pull requests, optionally restricted to one target branch.
    /// Mergeability is not reported by the list route and comes back unknown.
    async fn list_open_pulls(
        &self,
        slug: &Slug,
        base: Option<&str>,
    ) -> Result<Vec<ChangeSet>, GitHubError>;
    async fn get_pull(&self, id: &PullId) -> Result<ChangeSet, GitHubError>;
    async fn list_comments(&self, id: &PullId) -> Result<Vec<IssueComment>, GitHubError>;
    async fn list_reviews(&self, id: &PullId) -> Result<Vec<PullReview>, GitHubError>;
    async fn create_comment(&self, id: &PullId, body: &str) -> Result<IssueComment, GitHubError>;
    async fn update_comment(
        &self,
        slug: &Slug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), GitHubError>;
    async fn delete_comment(&self, slug: &Slug, comment_id: u64) -> Result<(), GitHubError>;
    async fn add_label(&self, id: &PullId, label: &str) -> Result<(), GitHubError>;
    async fn remove_label(&self, id: &PullId, label: &str) -> Result<(), GitHubError>;
    /// Issue and pull request search; returns the matching numbers
    async fn search_issues(&self, query: &str) -> Result<Vec<u64>, GitHubError>;
    /// Lock the conversation of an issue or pull request
    async fn lock_conversation(&self, slug: &Slug, number: u64) -> Result<(), GitHubError>;
}

#[derive(Serialize)]
struct ListPullsParams<'a> {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<&'a str>,
    per_page: u8,
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    per_page: u8,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: [&'a str; 1],
}

/// octocrab-backed implementation talking to the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Build a client for api.github.com. Without a token requests are anonymous.
    pub fn new(token: Option<String>) -> Result<Self, GitHubError> {
        Self::with_base_url(token, None)
    }

    /// Build a client for a custom API root (GitHub Enterprise or a mock server)
    pub fn with_base_url(
        token: Option<String>,
        base_url: Option<&str>,
    ) -> Result<Self, GitHubError> {
        let mut builder = Octocrab::builder();
        if let Some(url) = base_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| GitHubError::InvalidBaseUrl {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            builder = builder.personal_token(token);
        }
        Ok(Self {
            octocrab: builder.build()?,
        })
    }

    fn repo_route(slug: &Slug, rest: &str) -> String {
        format!("/repos/{}/{}{}", slug.owner, slug.repo, rest)
    }
}

#[async_trait]
impl GitHubOps for GitHubClient {
    async fn default_branch(&self, slug: &Slug) -> Result<String, GitHubError> {
        let repo: RepoRecord = self
            .octocrab
            .get(Self::repo_route(slug, ""), None::<&()>)
            .await?;
        Ok(repo.default_branch)
    }

    async fn list_open_pulls(
        &self,
        slug: &Slug,
        base: Option<&str>,
    ) -> Result<Vec<ChangeSet>, GitHubError> {
        let params = ListPullsParams {
            state: "open",
            base,
            per_page: PER_PAGE,
        };
        let first: Page<PullRecord> = self
            .octocrab
            .get(Self::repo_route(slug, "/pulls"), Some(&params))
            .await?;
        let records = self.octocrab.all_pages(first).await?;
        debug!(slug = %slug, count = records.len(), "Listed open pull requests");
        Ok(records
            .into_iter()
            .map(|r| ChangeSet::from_record(slug, r))
            .collect())
    }

    async fn get_pull(&self, id: &PullId) -> Result<ChangeSet, GitHubError> {
        let record: PullRecord = self
            .octocrab
            .get(
                Self::repo_route(&id.slug, &format!("/pulls/{}", id.number)),
                None::<&()>,
            )
            .await?;
        Ok(ChangeSet::from_record(&id.slug, record))
    }

    async fn list_comments(&self, id: &PullId) -> Result<Vec<IssueComment>, GitHubError> {
        let first: Page<CommentRecord> = self
            .octocrab
            .get(
                Self::repo_route(&id.slug, &format!("/issues/{}/comments", id.number)),
                Some(&PageParams { per_page: PER_PAGE }),
            )
            .await?;
        let records = self.octocrab.all_pages(first).await?;
        Ok(records.into_iter().map(IssueComment::from).collect())
    }

    async fn list_reviews(&self, id: &PullId) -> Result<Vec<PullReview>, GitHubError> {
        let first: Page<ReviewRecord> = self
            .octocrab
            .get(
                Self::repo_route(&id.slug, &format!("/pulls/{}/reviews", id.number)),
                Some(&PageParams { per_page: PER_PAGE }),
            )
            .await?;
        let records = self.octocrab.all_pages(first).await?;
        Ok(records.into_iter().map(PullReview::from).collect())
    }

    async fn create_comment(&self, id: &PullId, body: &str) -> Result<IssueComment, GitHubError> {
        let record: CommentRecord = self
            .octocrab
            .post(
                Self::repo_route(&id.slug, &format!("/issues/{}/comments", id.number)),
                Some(&CommentBody { body }),
            )
            .await?;
        Ok(record.into())
    }

    async fn update_comment(
        &self,
        slug: &Slug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        let _: CommentRecord = self
            .octocrab
            .patch(
                Self::repo_route(slug, &format!("/issues/comments/{comment_id}")),
                Some(&CommentBody { body }),
            )
            .await?;
        Ok(())
    }

    async fn delete_comment(&self, slug: &Slug, comment_id: u64) -> Result<(), GitHubError> {
        self.octocrab
            .issues(&slug.owner, &slug.repo)
            .delete_comment(octocrab::models::CommentId(comment_id))
            .await?;
        Ok(())
    }

    async fn add_label(&self, id: &PullId, label: &str) -> Result<(), GitHubError> {
        let _: Vec<LabelRecord> = self
            .octocrab
            .post(
                Self::repo_route(&id.slug, &format!("/issues/{}/labels", id.number)),
                Some(&LabelsBody { labels: [label] }),
            )
            .await?;
        Ok(())
    }

    async fn remove_label(&self, id: &PullId, label: &str) -> Result<(), GitHubError> {
        let route = Self::repo_route(
            &id.slug,
            &format!(
                "/issues/{}/labels/{}",
                id.number,
                urlencoding::encode(label)
            ),
        );
        let _: Vec<LabelRecord> = self.octocrab.delete(route, None::<&()>).await?;
        Ok(())
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<u64>, GitHubError> {
        let first: Page<SearchItemRecord> = self
            .octocrab
            .get(
                "/search/issues",
                Some(&SearchParams {
                    q: query,
                    per_page: PER_PAGE,
                }),
            )
            .await?;
        let items = self.octocrab.all_pages(first).await?;
        Ok(items.into_iter().map(|i| i.number).collect())
    }

    async fn lock_conversation(&self, slug: &Slug, number: u64) -> Result<(), GitHubError> {
        self.octocrab
            .issues(&slug.owner, &slug.repo)
            .lock(number, None)
            .await?;
        Ok(())
    }
}
