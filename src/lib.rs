// pullwarden - maintenance bots for GitHub pull requests
// This exposes the core components for testing and integration

pub mod annotation;
pub mod cli;
pub mod config;
pub mod conflicts;
pub mod git;
pub mod github;
pub mod inventory;
pub mod telemetry;
pub mod triage;

// Re-export key types for easy access
pub use annotation::{AnnotationSynchronizer, Marker, MetadataComment, SyncOutcome};
pub use config::PullwardenConfig;
pub use conflicts::{ConflictEngine, ConflictMatrix};
pub use git::{
    Git2Workspace, GitError, MergeOutcome, MergeStrategy, MergeWorkspace, ScratchRepository,
};
pub use github::{ChangeSet, GitHubClient, GitHubError, GitHubOps, MergeState, PullId, Slug};
pub use inventory::ChangeSetInventory;
pub use telemetry::{create_run_span, generate_run_id, init_telemetry, LogFormat};
