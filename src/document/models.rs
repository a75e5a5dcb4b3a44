//! Core data structures for document analysis results
//!
//! These types are what the library hands back to callers (CLI, HTTP/UI
//! glue); they derive serde so a caller can emit JSON without reshaping.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Classification of an extracted hyperlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// Resolved through the relationship manifest (web URL, mailto, file).
    External,
    /// Points at a bookmark inside the same document; no relationship entry.
    InternalAnchor,
    /// Carries a relationship ID with no matching manifest entry.
    Broken,
}

/// One hyperlink extracted from a document. Derived data, recomputed on
/// every extraction; never cached across edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperlink {
    /// Visible run text, possibly empty.
    pub text: String,
    /// Resolved target: URL for external links, bookmark name for internal
    /// anchors, `None` when broken.
    pub url: Option<String>,
    pub kind: LinkKind,
    /// Relationship ID the link resolved through, when it had one.
    pub rel_id: Option<String>,
    pub source_path: PathBuf,
}

/// Which side of a hyperlink a link search/replace applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkTarget {
    /// Visible link text only.
    Text,
    /// Relationship target URL only; the body tree is not touched.
    Url,
    /// Either side; each matching side is rewritten independently.
    Both,
}

/// Literal substring matching versus caller-supplied regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Literal,
    Pattern,
}

/// Context captured around a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    /// Human-oriented location hint, e.g. `paragraph 3` or `link rId4 url`.
    pub location: String,
}

/// Per-document outcome of one find or replace operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub file_path: PathBuf,
    pub match_count: usize,
    pub snippets: Vec<Snippet>,
    pub was_modified: bool,
    /// Set when a backup was created before persisting.
    pub backup_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl MatchResult {
    pub(crate) fn empty(path: &Path) -> Self {
        Self {
            file_path: path.to_path_buf(),
            match_count: 0,
            snippets: Vec::new(),
            was_modified: false,
            backup_path: None,
            error: None,
        }
    }

    /// A per-file failure folded into the result stream instead of aborting
    /// a batch.
    pub fn from_error(path: &Path, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(path)
        }
    }
}

/// Track-changes status derived from one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackChangesStatus {
    /// Any revision marker present in the body. Markers present means
    /// unaccepted by definition of the format.
    pub has_unaccepted_revisions: bool,
    pub revision_count: usize,
    /// Whether `word/settings.xml` turns revision tracking on for future
    /// edits. Independent of whether markers exist yet.
    pub tracking_enabled: bool,
}
