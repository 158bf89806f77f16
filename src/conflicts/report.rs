use std::fmt::Write as _;

use super::engine::ConflictMatrix;
use crate::github::{ChangeSet, PullId};

const NO_CONFLICTS: &str = "No conflicts as of last run.";
const CONFLICTS_INTRO: &str = "Reviewers, this pull request conflicts with the following ones:\n";
const CONFLICTS_OUTRO: &str = "\n\nIf you consider this pull request important, please also \
                               help to review the conflicting pull requests. Ideally, start \
                               with the one that should be merged first.";

/// Body of the conflicts section of `subject`'s metadata comment
pub fn conflicts_section(subject: &PullId, conflicts: &[&ChangeSet]) -> String {
    let mut text = String::from("\n### Conflicts\n");
    if conflicts.is_empty() {
        text.push_str(NO_CONFLICTS);
        return text;
    }
    text.push_str(CONFLICTS_INTRO);
    for pull in conflicts {
        let _ = write!(
            text,
            "\n* [{reference}]({url}) ({title} by {login})",
            reference = reference(subject, &pull.id),
            url = pull.html_url,
            title = pull.title.trim(),
            login = pull.author,
        );
    }
    text.push_str(CONFLICTS_OUTRO);
    text
}

/// `#n` within the same repository, `owner/repo#n` across repositories
fn reference(subject: &PullId, other: &PullId) -> String {
    if subject.slug == other.slug {
        format!("#{}", other.number)
    } else {
        format!("{}#{}", other.slug, other.number)
    }
}

/// Plain-text overview of a full matrix, one row per change-set
pub fn summary_table(matrix: &ConflictMatrix) -> String {
    let mut out = String::new();
    let width = matrix
        .rows()
        .map(|(id, _)| id.to_string().len())
        .max()
        .unwrap_or(0)
        .max("pull".len());
    let _ = writeln!(out, "{:<width$}  {:>9}  conflicts with", "pull", "conflicts");
    for (id, conflicts) in matrix.rows() {
        let others = conflicts
            .iter()
            .map(|c| reference(id, c))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            "{:<width$}  {:>9}  {}",
            id.to_string(),
            conflicts.len(),
            others
        );
    }
    for id in matrix.skipped() {
        let _ = writeln!(
            out,
            "{:<width$}  {:>9}  skipped, does not merge onto target",
            id.to_string(),
            "-"
        );
    }
    out
}
