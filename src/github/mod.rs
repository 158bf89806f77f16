pub mod client;
pub mod errors;
#[cfg(any(test, feature = "testing"))]
pub mod mocks;
pub mod retry;
pub mod types;

pub use client::{GitHubClient, GitHubOps};
pub use errors::GitHubError;
pub use retry::RetryConfig;
pub use types::{ChangeSet, IssueComment, MergeState, PullId, PullReview, Slug};
