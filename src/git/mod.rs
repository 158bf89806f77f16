//! Git operations module
//!
//! Trial merges run against the `MergeWorkspace` trait so the conflict engine
//! can be exercised against libgit2 or against a scripted fake.

pub mod operations;
pub mod scratch;

pub use operations::{Git2Workspace, GitError, MergeOutcome, MergeStrategy, MergeWorkspace};
pub use scratch::{DisposableWorkspace, ScratchLayout, ScratchRepository};
