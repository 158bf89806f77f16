//! Bot-owned metadata comments on pull requests

pub mod metadata;
pub mod sync;

pub use metadata::{Marker, MetadataComment};
pub use sync::{AnnotationSynchronizer, SyncOutcome};
