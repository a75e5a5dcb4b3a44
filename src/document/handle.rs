//! Document handle: one file path coupled with its parsed parts
//!
//! The unit of operation for everything above the package layer. Mutating
//! operations edit the in-memory trees and mark the affected part dirty;
//! nothing reaches disk until `save`/`save_as`, and only dirty parts are
//! re-serialized so untouched parts round-trip byte-identical.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::package::archive::{DOCUMENT_PART, DocxPackage, RELS_PART, SETTINGS_PART};
use crate::package::rels::Relationships;
use crate::package::xml::{Element, XmlPart};

use super::link_replace;
use super::links;
use super::models::{Hyperlink, LinkTarget, MatchMode, MatchResult, TrackChangesStatus};
use super::replace;
use super::revisions;

pub struct Document {
    package: DocxPackage,
    body: XmlPart,
    rels: Relationships,
    body_dirty: bool,
    rels_dirty: bool,
}

impl Document {
    /// Open and parse a document package. The relationship manifest is
    /// optional; a missing one reads as empty (every rId then resolves as
    /// broken).
    pub fn open(path: &Path) -> Result<Self> {
        let package = DocxPackage::open(path)?;
        let body = XmlPart::parse(package.read_part(DOCUMENT_PART)?, DOCUMENT_PART)?;
        let rels = match package.part(RELS_PART) {
            Some(bytes) => Relationships::parse(bytes, RELS_PART)?,
            None => Relationships::default(),
        };
        debug!(path = %path.display(), rels = rels.len(), "opened document");
        Ok(Self {
            package,
            body,
            rels,
            body_dirty: false,
            rels_dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.package.path()
    }

    pub fn is_dirty(&self) -> bool {
        self.body_dirty || self.rels_dirty
    }

    fn body_root(&self) -> Option<&Element> {
        self.body.root()
    }

    /// Extract all hyperlinks in document order. Recomputed on every call;
    /// never cached across edits.
    pub fn links(&self) -> Vec<Hyperlink> {
        match self.body_root() {
            Some(root) => links::extract(root, &self.rels, self.path()),
            None => Vec::new(),
        }
    }

    /// Revision-marker census plus the settings-part tracking flag.
    pub fn track_changes(&self) -> TrackChangesStatus {
        match self.body_root() {
            Some(root) => revisions::status(root, self.package.part(SETTINGS_PART)),
            None => TrackChangesStatus {
                has_unaccepted_revisions: false,
                revision_count: 0,
                tracking_enabled: false,
            },
        }
    }

    /// Literal substring search across run boundaries. No mutation.
    pub fn find_text(&self, query: &str, case_sensitive: bool) -> Result<MatchResult> {
        self.find_text_with(query, case_sensitive, MatchMode::Literal)
    }

    /// Search with an explicit match mode (`Pattern` takes a regex).
    pub fn find_text_with(
        &self,
        query: &str,
        case_sensitive: bool,
        mode: MatchMode,
    ) -> Result<MatchResult> {
        let matcher = replace::build_matcher(query, case_sensitive, mode)?;
        let mut result = MatchResult::empty(self.path());
        if let Some(root) = self.body_root() {
            let (count, snippets) = replace::find_in_body(root, &matcher);
            result.match_count = count;
            result.snippets = snippets;
        }
        Ok(result)
    }

    /// Replace matching text in memory. The caller persists explicitly via
    /// `save`; `was_modified` reports whether anything changed.
    pub fn replace_text(
        &mut self,
        query: &str,
        replacement: &str,
        case_sensitive: bool,
    ) -> Result<MatchResult> {
        self.replace_text_with(query, replacement, case_sensitive, MatchMode::Literal)
    }

    pub fn replace_text_with(
        &mut self,
        query: &str,
        replacement: &str,
        case_sensitive: bool,
        mode: MatchMode,
    ) -> Result<MatchResult> {
        let matcher = replace::build_matcher(query, case_sensitive, mode)?;
        let mut result = MatchResult::empty(self.path());
        if let Some(root) = self.body.root_mut() {
            let (count, snippets) = replace::replace_in_body(root, &matcher, replacement);
            result.match_count = count;
            result.snippets = snippets;
            if count > 0 {
                result.was_modified = true;
                self.body_dirty = true;
            }
        }
        Ok(result)
    }

    /// Search hyperlink text and/or URLs. Link matching is always
    /// case-insensitive literal.
    pub fn find_links(&self, query: &str, target: LinkTarget) -> Result<MatchResult> {
        let matcher = replace::build_matcher(query, false, MatchMode::Literal)?;
        let mut result = MatchResult::empty(self.path());
        // The link pass takes mutable trees; with no replacement it never
        // writes, so search runs on throwaway clones of the handles.
        let mut body = self.body.clone();
        let mut rels = self.rels.clone();
        if let Some(root) = body.root_mut() {
            let outcome = link_replace::process(root, &mut rels, &matcher, None, target);
            result.match_count = outcome.match_count;
            result.snippets = outcome.snippets;
        }
        Ok(result)
    }

    /// Replace within hyperlink text and/or URLs in memory.
    pub fn replace_links(
        &mut self,
        query: &str,
        replacement: &str,
        target: LinkTarget,
    ) -> Result<MatchResult> {
        let matcher = replace::build_matcher(query, false, MatchMode::Literal)?;
        let mut result = MatchResult::empty(self.path());
        if let Some(root) = self.body.root_mut() {
            let outcome =
                link_replace::process(root, &mut self.rels, &matcher, Some(replacement), target);
            result.match_count = outcome.match_count;
            result.snippets = outcome.snippets;
            if outcome.body_changed {
                self.body_dirty = true;
            }
            if outcome.rels_changed {
                self.rels_dirty = true;
            }
            result.was_modified = outcome.body_changed || outcome.rels_changed;
        }
        Ok(result)
    }

    /// Persist in place. Serializes only dirty parts, then writes the whole
    /// archive through a temp file with atomic promotion.
    pub fn save(&mut self) -> Result<()> {
        let dest = self.path().to_path_buf();
        self.save_as(&dest)
    }

    pub fn save_as(&mut self, dest: &Path) -> Result<()> {
        if self.body_dirty {
            self.package.write_part(DOCUMENT_PART, self.body.to_bytes());
        }
        if self.rels_dirty {
            self.package.write_part(RELS_PART, self.rels.to_bytes());
        }
        self.package.save(dest)?;
        debug!(path = %dest.display(), "saved document");
        self.body_dirty = false;
        self.rels_dirty = false;
        Ok(())
    }
}
