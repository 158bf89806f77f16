//! Reviews section of the metadata comment
//!
//! Every comment and review on a pull request is scanned for an ACK-style
//! verdict. The latest verdict of each reviewer is tabulated; an ACK naming a
//! commit other than the current head is reported as stale.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::annotation::{AnnotationSynchronizer, Marker, SyncOutcome};
use crate::config::ReviewsConfig;
use crate::github::{ChangeSet, GitHubError, GitHubOps, IssueComment, PullReview};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AckType {
    Ack,
    ConceptAck,
    ConceptNack,
    ApproachAck,
    ApproachNack,
    /// An ACK whose commit is no longer the head of the pull request
    StaleAck,
}

impl AckType {
    /// Row order of the summary table
    pub const TABLE_ORDER: [AckType; 6] = [
        AckType::Ack,
        AckType::ConceptNack,
        AckType::ConceptAck,
        AckType::ApproachAck,
        AckType::ApproachNack,
        AckType::StaleAck,
    ];

    fn requires_commit(self) -> bool {
        matches!(self, AckType::Ack)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AckType::Ack => "ACK",
            AckType::ConceptAck => "Concept ACK",
            AckType::ConceptNack => "Concept NACK",
            AckType::ApproachAck => "Approach ACK",
            AckType::ApproachNack => "Approach NACK",
            AckType::StaleAck => "Stale ACK",
        }
    }
}

// Tried in order at every word. Hyphenated spellings are split into the spaced
// form before matching.
const ACK_PATTERNS: &[(&str, AckType)] = &[
    ("code review ack", AckType::Ack),
    ("cr ack", AckType::Ack),
    ("crack", AckType::Ack),
    ("concept ack", AckType::ConceptAck),
    ("conceptack", AckType::ConceptAck),
    ("concept nack", AckType::ConceptNack),
    ("conceptnack", AckType::ConceptNack),
    ("approach ack", AckType::ApproachAck),
    ("approachack", AckType::ApproachAck),
    ("approach nack", AckType::ApproachNack),
    ("approachnack", AckType::ApproachNack),
    ("ack", AckType::Ack),
    ("utack", AckType::Ack),
    ("tack", AckType::Ack),
    ("nack", AckType::ConceptNack),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckCommit {
    pub ack_type: AckType,
    pub commit: Option<String>,
}

fn is_commit_hash(word: &str) -> bool {
    word.len() >= 6 && word.chars().all(|c| c.is_ascii_hexdigit())
}

/// "reack" counts as "ack"; "review" is left alone
fn strip_re(word: &str) -> &str {
    if word == "review" {
        word
    } else {
        word.trim_start_matches("re")
    }
}

/// First verdict in a comment body. Quoted lines are ignored and a plain ACK
/// only counts when followed by a commit hash.
pub fn parse_review(body: &str) -> Option<AckCommit> {
    let lowered = body.to_lowercase();
    let words: Vec<&str> = lowered
        .lines()
        .filter(|line| !line.starts_with('>'))
        .flat_map(|line| line.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation()))
        .filter(|word| !word.is_empty())
        .collect();

    for pos in 0..words.len() {
        for &(pattern, ack_type) in ACK_PATTERNS {
            let pattern_words: Vec<&str> = pattern.split_whitespace().collect();
            let needed = pattern_words.len() + usize::from(ack_type.requires_commit());
            if needed > words.len() - pos {
                continue;
            }
            let matches = pattern_words
                .iter()
                .zip(&words[pos..])
                .all(|(expected, word)| *expected == strip_re(word));
            if !matches {
                continue;
            }
            let commit = words
                .get(pos + pattern_words.len())
                .filter(|word| is_commit_hash(word))
                .map(|word| word.to_string());
            if ack_type.requires_commit() && commit.is_none() {
                continue;
            }
            return Some(AckCommit { ack_type, commit });
        }
    }
    None
}

/// A comment or review body with its author and time
#[derive(Debug, Clone)]
pub struct ReviewText {
    pub author: String,
    pub url: String,
    pub body: String,
    pub date: DateTime<Utc>,
}

impl From<IssueComment> for ReviewText {
    fn from(comment: IssueComment) -> Self {
        Self {
            author: comment.author,
            url: comment.html_url,
            body: comment.body,
            date: comment.updated_at.unwrap_or_default(),
        }
    }
}

impl ReviewText {
    /// Pending reviews have no submission time and are not counted
    pub fn from_review(review: PullReview) -> Option<Self> {
        Some(Self {
            date: review.submitted_at?,
            author: review.author,
            url: review.html_url,
            body: review.body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub user: String,
    pub ack_type: AckType,
    pub url: String,
    pub date: DateTime<Utc>,
}

/// The most recent verdict of every reviewer, ordered by user
pub fn latest_reviews(
    texts: impl IntoIterator<Item = ReviewText>,
    head_sha: &str,
) -> Vec<Review> {
    let mut latest: BTreeMap<String, Review> = BTreeMap::new();
    for text in texts {
        let Some(ack) = parse_review(&text.body) else {
            continue;
        };
        let at_head = ack
            .commit
            .as_deref()
            .is_some_and(|commit| head_sha.starts_with(commit));
        let ack_type = if ack.ack_type == AckType::Ack && !at_head {
            AckType::StaleAck
        } else {
            ack.ack_type
        };
        let review = Review {
            user: text.author,
            ack_type,
            url: text.url,
            date: text.date,
        };
        match latest.get(&review.user) {
            Some(newer) if newer.date > review.date => {}
            _ => {
                latest.insert(review.user.clone(), review);
            }
        }
    }
    latest.into_values().collect()
}

pub fn reviews_section(reviews: &[Review], guideline_url: &str) -> String {
    let mut body = format!(
        "\n### Reviews\nSee [the guideline]({guideline_url}) for information on the review \
         process.\n"
    );
    if reviews.is_empty() {
        body.push_str("A summary of reviews will appear here.\n");
        return body;
    }

    body.push_str("| Type | Count | Reviewers |\n");
    body.push_str("| ---- | ----- | --------- |\n");
    for ack_type in AckType::TABLE_ORDER {
        let mut users: Vec<(&str, &str)> = reviews
            .iter()
            .filter(|r| r.ack_type == ack_type)
            .map(|r| (r.user.as_str(), r.url.as_str()))
            .collect();
        if users.is_empty() {
            continue;
        }
        users.sort();
        let links = users
            .iter()
            .map(|(user, url)| format!("[{user}]({url})"))
            .collect::<Vec<_>>()
            .join(", ");
        body.push_str(&format!(
            "| {} | {} | {} |\n",
            ack_type.as_str(),
            users.len(),
            links
        ));
    }
    body.push('\n');
    body
}

/// Keeps the reviews section of each pull request's metadata comment current
pub struct ReviewSummarizer<'a, G: GitHubOps + ?Sized> {
    github: &'a G,
    config: &'a ReviewsConfig,
    dry_run: bool,
}

impl<'a, G: GitHubOps + ?Sized> ReviewSummarizer<'a, G> {
    pub fn new(github: &'a G, config: &'a ReviewsConfig, dry_run: bool) -> Self {
        Self {
            github,
            config,
            dry_run,
        }
    }

    pub async fn run(&self, pull: &ChangeSet) -> Result<SyncOutcome, GitHubError> {
        let comments = self.github.list_comments(&pull.id).await?;
        let reviews = self.github.list_reviews(&pull.id).await?;
        // the metadata comment quotes verdicts itself
        let texts = comments
            .into_iter()
            .filter(|c| !Marker::Metadata.owns(&c.body))
            .map(ReviewText::from)
            .chain(reviews.into_iter().filter_map(ReviewText::from_review));
        let summary = latest_reviews(texts, &pull.head_sha);
        debug!(pull = %pull.id, reviewers = summary.len(), "Collected reviews");

        let body = reviews_section(&summary, &self.config.guideline_url);
        AnnotationSynchronizer::new(self.github, self.dry_run)
            .sync_section(&pull.id, Marker::Reviews, &body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::mocks::{change_set, InMemoryGitHub};
    use crate::github::{MergeState, Slug};
    use crate::MetadataComment;
    use chrono::TimeZone;

    const HASH: &str = "1234567890123456789012345678901234567890";

    fn ack(ack_type: AckType, commit: Option<&str>) -> Option<AckCommit> {
        Some(AckCommit {
            ack_type,
            commit: commit.map(str::to_string),
        })
    }

    #[test]
    fn test_parse_review() {
        let hash = |prefix: &str| format!("{prefix} {HASH}");
        let cases: Vec<(String, Option<AckCommit>)> = vec![
            ("ACK".into(), None),
            ("ACK invalid".into(), None),
            ("tACK".into(), None),
            ("crACK".into(), None),
            ("> Concept ACK".into(), None),
            (hash("ACK"), ack(AckType::Ack, Some(HASH))),
            (format!("ACK {HASH} invalid"), ack(AckType::Ack, Some(HASH))),
            (format!("ACK {HASH}\nNACK {HASH}"), ack(AckType::Ack, Some(HASH))),
            (hash("tACK"), ack(AckType::Ack, Some(HASH))),
            (hash("crACK"), ack(AckType::Ack, Some(HASH))),
            ("Code Review ACK 123456".into(), ack(AckType::Ack, Some("123456"))),
            ("re-ACK 123456".into(), ack(AckType::Ack, Some("123456"))),
            ("Concept ACK".into(), ack(AckType::ConceptAck, None)),
            (hash("Concept ACK"), ack(AckType::ConceptAck, Some(HASH))),
            ("Approach ACK".into(), ack(AckType::ApproachAck, None)),
            ("Concept NACK".into(), ack(AckType::ConceptNack, None)),
            ("nack this change!".into(), ack(AckType::ConceptNack, None)),
            ("This is a Concept ACK for me!".into(), ack(AckType::ConceptAck, None)),
        ];

        for (body, expected) in cases {
            assert_eq!(parse_review(&body), expected, "body: {body}");
        }
    }

    fn text(author: &str, body: &str, day: u32) -> ReviewText {
        ReviewText {
            author: author.to_string(),
            url: format!("https://github.com/o/r/pull/1#{author}-{day}"),
            body: body.to_string(),
            date: Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_latest_verdict_wins_and_old_acks_go_stale() {
        let head = "abcdef0123456789";
        let reviews = latest_reviews(
            vec![
                text("alice", "Concept ACK", 1),
                text("alice", "ACK abcdef0", 3),
                text("bob", "ACK 999999a", 2),
                text("carol", "looks good", 4),
                text("dave", "NACK", 5),
                text("dave", "Concept ACK", 1),
            ],
            head,
        );

        let summary: Vec<(&str, AckType)> = reviews
            .iter()
            .map(|r| (r.user.as_str(), r.ack_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("alice", AckType::Ack),
                ("bob", AckType::StaleAck),
                ("dave", AckType::ConceptNack),
            ]
        );
    }

    #[test]
    fn test_section_layout() {
        let url = "https://example.org/guide";
        assert_eq!(
            reviews_section(&[], url),
            concat!(
                "\n### Reviews\n",
                "See [the guideline](https://example.org/guide) for information on the review ",
                "process.\n",
                "A summary of reviews will appear here.\n"
            )
        );

        let reviews = latest_reviews(
            vec![
                text("zed", "Concept ACK", 1),
                text("amy", "Concept ACK", 1),
                text("bob", "ACK abcdef0", 1),
            ],
            "abcdef0",
        );
        let section = reviews_section(&reviews, url);
        assert!(section.ends_with(concat!(
            "| Type | Count | Reviewers |\n",
            "| ---- | ----- | --------- |\n",
            "| ACK | 1 | [bob](https://github.com/o/r/pull/1#bob-1) |\n",
            "| Concept ACK | 2 | [amy](https://github.com/o/r/pull/1#amy-1), ",
            "[zed](https://github.com/o/r/pull/1#zed-1) |\n",
            "\n"
        )));
    }

    #[tokio::test]
    async fn test_summarizer_writes_reviews_section_once() {
        let github = InMemoryGitHub::new();
        let slug = Slug::new("o", "r");
        let mut pull = change_set(&slug, 1, "main", MergeState::Mergeable);
        pull.head_sha = "abcdef0123".to_string();
        let day = |d| Some(Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap());
        github.insert_comment_by(&pull.id, "alice", "Concept ACK", day(1));
        github.insert_review(
            &pull.id,
            PullReview {
                author: "bob".to_string(),
                html_url: "https://github.com/o/r/pull/1#pullrequestreview-9".to_string(),
                body: "ACK abcdef0".to_string(),
                submitted_at: day(2),
            },
        );
        github.insert_review(
            &pull.id,
            PullReview {
                author: "carol".to_string(),
                html_url: String::new(),
                body: "ACK abcdef0".to_string(),
                submitted_at: None,
            },
        );
        let config = ReviewsConfig::default();
        let summarizer = ReviewSummarizer::new(&github, &config, false);

        assert_eq!(summarizer.run(&pull).await.unwrap(), SyncOutcome::Created);
        // the published table must not be read back as a verdict
        assert_eq!(summarizer.run(&pull).await.unwrap(), SyncOutcome::Unchanged);

        let metadata = MetadataComment::from_comments(&github.comments(&pull.id));
        let section = metadata.section(Marker::Reviews).unwrap();
        assert!(section.contains("| ACK | 1 | [bob]"));
        assert!(section.contains("| Concept ACK | 1 | [alice]"));
        assert!(!section.contains("carol"));
        assert_eq!(github.writes().len(), 1);
        assert!(!metadata.has_section(Marker::Conflicts));
    }
}
