//! Label, review and reminder bots driven by the forge's own state

pub mod lock;
pub mod rebase;
pub mod reviews;
pub mod stale;

pub use lock::{lock_query, ConversationLocker};
pub use rebase::{rebase_action, RebaseAction, RebaseLabeler, RebaseSummary};
pub use reviews::{latest_reviews, parse_review, reviews_section, AckType, ReviewSummarizer};
pub use stale::{cutoff_date, stale_query, still_stale, StaleReminder};
