//! Slash-separated store paths
//!
//! Segments alternate collection / document, so a document path always has an
//! even number of segments and a collection path an odd number.

/// Non-empty segments of a path
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Whether the path addresses a document
pub fn is_document_path(path: &str) -> bool {
    let count = segments(path).len();
    count > 0 && count % 2 == 0
}

/// Whether the path addresses a collection
pub fn is_collection_path(path: &str) -> bool {
    segments(path).len() % 2 == 1
}

/// Last segment (the document id for document paths)
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("")
}

/// Parent path, `None` for single-segment paths
pub fn parent(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
}

/// Join two path fragments with exactly one separator
pub fn join(base: &str, child: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        child.trim_start_matches('/')
    )
}
