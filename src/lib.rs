//! docxgrep: search, audit, and rewrite .docx packages
//!
//! This library opens Word documents as zip packages, extracts hyperlinks
//! and track-changes status, runs find/replace across run boundaries in
//! body text and hyperlinks, and builds cross-document dependency graphs.
//! Mutation is backup-first and all-or-nothing per file; untouched package
//! parts round-trip byte-identical.

pub mod backup;
pub mod bulk;
pub mod document;
pub mod error;
pub mod graph;
pub mod ops;
pub mod package;
pub mod scan;

// Re-export commonly used types
pub use bulk::{BulkOptions, CancelFlag, Operation, run_bulk, run_single};
pub use document::{
    Document, Hyperlink, LinkKind, LinkTarget, MatchMode, MatchResult, Snippet,
    TrackChangesStatus,
};
pub use error::{DocxError, Result};
pub use graph::{DependencyEdge, DependencyGraph, DependencyNode, build_dependency_graph};
pub use ops::{DocumentAnalysis, LinkReport, WriteOptions};
