//! Multi-section metadata comment
//!
//! Every pull request carries at most one metadata comment. It starts with
//! the root marker and a fixed description, followed by independent sections.
//! Each section starts with its own invisible HTML-comment marker and runs
//! until the next marker. Sections are always serialized in ascending marker
//! order, so the rendered text only depends on the section contents.

use std::collections::BTreeMap;

use crate::github::IssueComment;

const DESCRIPTION: &str = "The following sections might be updated with supplementary metadata \
                           relevant to reviewers and maintainers.";

/// Length of `<!--` + 32 hex digits + `-->`
const MARKER_LEN: usize = 39;

/// Invisible markers identifying bot-owned comments and sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Leading marker of the metadata comment itself
    Metadata,
    Conflicts,
    Coverage,
    Reviews,
    /// Standalone comment posted together with the rebase label
    NeedsRebase,
    /// Standalone reminder on long-inactive rebase candidates
    InactiveRebase,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::Metadata => "<!--e57a25ab6845829454e8d69fc972939a-->",
            Marker::Conflicts => "<!--174a7506f384e20aa4161008e828411d-->",
            Marker::Coverage => "<!--2502f1a698b3751726fa55edcda76cd3-->",
            Marker::Reviews => "<!--021abf342d371248e50ceaed478a90ca-->",
            Marker::NeedsRebase => "<!--cf906140f33d8803c4a75a2196329ecb-->",
            Marker::InactiveRebase => "<!--13523179cfe9479db18ec6c5d236f789-->",
        }
    }

    /// True if `body` is a comment owned by this marker
    pub fn owns(&self, body: &str) -> bool {
        body.starts_with(self.as_str())
    }
}

/// Parsed metadata comment: the remote comment id, if it exists yet, and the
/// sections keyed by their marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataComment {
    pub comment_id: Option<u64>,
    sections: BTreeMap<String, String>,
}

impl MetadataComment {
    /// Parse `body` as a metadata comment. Returns `None` if the body does not
    /// start with the root marker.
    pub fn parse(comment_id: Option<u64>, body: &str) -> Option<Self> {
        if !Marker::Metadata.owns(body) {
            return None;
        }
        let sections = split_sections(body)
            .into_iter()
            .filter(|(marker, _)| *marker != Marker::Metadata.as_str())
            .map(|(marker, text)| (marker.to_string(), text.to_string()))
            .collect();
        Some(Self {
            comment_id,
            sections,
        })
    }

    /// The first metadata comment among `comments`, or an empty one
    pub fn from_comments(comments: &[IssueComment]) -> Self {
        comments
            .iter()
            .find_map(|c| Self::parse(Some(c.id), &c.body))
            .unwrap_or_default()
    }

    pub fn section(&self, marker: Marker) -> Option<&str> {
        self.sections.get(marker.as_str()).map(String::as_str)
    }

    pub fn has_section(&self, marker: Marker) -> bool {
        self.sections.contains_key(marker.as_str())
    }

    /// Set the body of one section. Returns false when it already had exactly
    /// this body, in which case nothing needs to be written.
    pub fn update(&mut self, marker: Marker, body: &str) -> bool {
        if self.section(marker) == Some(body) {
            return false;
        }
        self.sections
            .insert(marker.as_str().to_string(), body.to_string());
        true
    }

    pub fn render(&self) -> String {
        let mut text = format!("{}\n\n{DESCRIPTION}\n\n", Marker::Metadata.as_str());
        for (marker, body) in &self.sections {
            text.push_str(marker);
            text.push_str(body);
        }
        text
    }
}

fn marker_at(text: &str, at: usize) -> Option<&str> {
    let candidate = text.get(at..at + MARKER_LEN)?;
    let hex = candidate.strip_prefix("<!--")?.strip_suffix("-->")?;
    hex.bytes()
        .all(|b| b.is_ascii_hexdigit())
        .then_some(candidate)
}

/// Split into (marker, body) pairs. Plain HTML comments that are not markers
/// stay part of the surrounding body.
fn split_sections(text: &str) -> Vec<(&str, &str)> {
    let starts: Vec<usize> = text
        .match_indices("<!--")
        .map(|(i, _)| i)
        .filter(|&i| marker_at(text, i).is_some())
        .collect();
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(text.len());
            (
                &text[start..start + MARKER_LEN],
                &text[start + MARKER_LEN..end],
            )
        })
        .collect()
}
