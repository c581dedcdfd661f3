//! Derived history paths and watched-collection matching

use revisor_store::path;

use crate::entry::VersionId;

const HISTORY_SUFFIX: &str = "_history";
const VERSIONS_COLLECTION: &str = "versions_history";

/// Maps document paths to their history locations
///
/// `users/u1/notes/n1` under root `history/database` has history path
/// `history/database/users_history/u1/notes_history/n1`. The ordered log is the
/// `versions_history` collection below it and the backup slot is the history
/// path itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPaths {
    root: String,
}

impl HistoryPaths {
    /// Create paths rooted at a document path
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into().trim_matches('/').to_string(),
        }
    }

    /// History root
    pub fn root(&self) -> &str {
        &self.root
    }

    /// History path of a document
    pub fn history_path(&self, doc_path: &str) -> String {
        let derived: Vec<String> = path::segments(doc_path)
            .into_iter()
            .enumerate()
            .map(|(index, segment)| {
                if index % 2 == 0 {
                    format!("{}{}", segment, HISTORY_SUFFIX)
                } else {
                    segment.to_string()
                }
            })
            .collect();
        path::join(&self.root, &derived.join("/"))
    }

    /// Collection holding the ordered log
    pub fn versions_path(&self, doc_path: &str) -> String {
        path::join(&self.history_path(doc_path), VERSIONS_COLLECTION)
    }

    /// Path of one log entry
    pub fn entry_path(&self, doc_path: &str, id: &VersionId) -> String {
        path::join(&self.versions_path(doc_path), &id.to_string())
    }

    /// Path of the backup slot
    pub fn backup_path(&self, doc_path: &str) -> String {
        self.history_path(doc_path)
    }

    /// Whether a path lies strictly below the history root
    pub fn is_history_path(&self, candidate: &str) -> bool {
        let root = path::segments(&self.root);
        let candidate = path::segments(candidate);
        candidate.len() > root.len() && candidate[..root.len()] == root[..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

/// Watched document pattern such as `users/{uid}/notes/{noteId}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPattern {
    segments: Vec<Segment>,
}

impl WatchPattern {
    /// Parse a pattern; `{name}` segments match any single segment
    pub fn parse(pattern: &str) -> Self {
        let segments = path::segments(pattern)
            .into_iter()
            .map(|segment| {
                if segment.starts_with('{') && segment.ends_with('}') {
                    Segment::Wildcard
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Whether a document path matches
    pub fn matches(&self, doc_path: &str) -> bool {
        let candidate = path::segments(doc_path);
        candidate.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(candidate)
                .all(|(expected, actual)| match expected {
                    Segment::Wildcard => true,
                    Segment::Literal(literal) => literal == actual,
                })
    }
}
