use octocrab::Error as OctocrabError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    ApiError(#[from] OctocrabError),

    #[error("invalid GitHub API base url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("{0}")]
    InvalidIdentifier(String),

    #[error("mergeable state still unknown after {attempts} attempts for: {pending}")]
    MergeableUnresolved { attempts: u32, pending: String },
}

