//! Single-document operations
//!
//! Thin wrappers that open one file, run one operation, and persist when a
//! replace changed something. Unlike the bulk orchestrator these surface
//! errors to the caller directly; there is no batch to keep alive.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backup::{BackupManager, default_backup_root};
use crate::document::{
    Document, Hyperlink, LinkTarget, MatchMode, MatchResult, TrackChangesStatus,
};
use crate::error::Result;
use crate::scan::scan;

/// Write-side knobs for single-file replace operations.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub backup: bool,
    /// Defaults to `default_backup_root` of the file's directory.
    pub backup_root: Option<PathBuf>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            backup: true,
            backup_root: None,
        }
    }
}

/// Everything extracted from one document in a single pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub path: PathBuf,
    pub links: Vec<Hyperlink>,
    pub track_changes: TrackChangesStatus,
}

/// Link extraction outcome for one file in a tree walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkReport {
    pub path: PathBuf,
    pub links: Vec<Hyperlink>,
    pub error: Option<String>,
}

pub fn analyze(path: &Path) -> Result<DocumentAnalysis> {
    let doc = Document::open(path)?;
    Ok(DocumentAnalysis {
        path: path.to_path_buf(),
        links: doc.links(),
        track_changes: doc.track_changes(),
    })
}

pub fn extract_links(path: &Path) -> Result<Vec<Hyperlink>> {
    Ok(Document::open(path)?.links())
}

pub fn track_changes_status(path: &Path) -> Result<TrackChangesStatus> {
    Ok(Document::open(path)?.track_changes())
}

/// Extract links from every document under `root`. Unreadable files are
/// reported in place rather than dropped.
pub fn collect_links(root: &Path) -> Vec<LinkReport> {
    scan(root)
        .into_iter()
        .map(|path| match Document::open(&path) {
            Ok(doc) => LinkReport {
                links: doc.links(),
                path,
                error: None,
            },
            Err(err) => LinkReport {
                path,
                links: Vec::new(),
                error: Some(err.to_string()),
            },
        })
        .collect()
}

pub fn find_text(
    path: &Path,
    query: &str,
    case_sensitive: bool,
    mode: MatchMode,
) -> Result<MatchResult> {
    Document::open(path)?.find_text_with(query, case_sensitive, mode)
}

pub fn replace_text(
    path: &Path,
    query: &str,
    replacement: &str,
    case_sensitive: bool,
    options: &WriteOptions,
) -> Result<MatchResult> {
    let mut doc = Document::open(path)?;
    let result = doc.replace_text(query, replacement, case_sensitive)?;
    persist(&mut doc, result, options)
}

pub fn find_links(path: &Path, query: &str, target: LinkTarget) -> Result<MatchResult> {
    Document::open(path)?.find_links(query, target)
}

pub fn replace_links(
    path: &Path,
    query: &str,
    replacement: &str,
    target: LinkTarget,
    options: &WriteOptions,
) -> Result<MatchResult> {
    let mut doc = Document::open(path)?;
    let result = doc.replace_links(query, replacement, target)?;
    persist(&mut doc, result, options)
}

/// Backup-then-write for a single file; a zero-match replace touches
/// nothing on disk.
fn persist(doc: &mut Document, mut result: MatchResult, options: &WriteOptions) -> Result<MatchResult> {
    if !result.was_modified {
        return Ok(result);
    }
    if options.backup {
        let parent = doc.path().parent().unwrap_or(Path::new(".")).to_path_buf();
        let root = options
            .backup_root
            .clone()
            .unwrap_or_else(|| default_backup_root(&parent));
        let manager = BackupManager::new(root, Some(parent.join("bulk_found")));
        let record = manager.backup(doc.path(), None)?;
        result.backup_path = Some(record.backup_path);
    }
    doc.save()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_docx(path: &Path, document_xml: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", opts).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    const BODY: &str = "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
        <w:body><w:p><w:ins><w:r><w:t>draft wording</w:t></w:r></w:ins></w:p></w:body></w:document>";

    #[test]
    fn analyze_reports_revisions_and_links_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.docx");
        write_docx(&path, BODY);

        let analysis = analyze(&path).unwrap();
        assert!(analysis.links.is_empty());
        assert!(analysis.track_changes.has_unaccepted_revisions);
        assert_eq!(analysis.track_changes.revision_count, 1);
    }

    #[test]
    fn replace_backs_up_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.docx");
        write_docx(&path, BODY);
        let original = std::fs::read(&path).unwrap();

        let options = WriteOptions {
            backup: true,
            backup_root: Some(dir.path().join("backups")),
        };
        let result = replace_text(&path, "draft", "final", false, &options).unwrap();
        assert!(result.was_modified);
        let backup = result.backup_path.unwrap();
        assert_eq!(std::fs::read(backup).unwrap(), original, "backup is the pre-image");
        assert_ne!(std::fs::read(&path).unwrap(), original);
    }

    #[test]
    fn collect_links_keeps_unreadable_files_in_the_report() {
        let dir = tempfile::tempdir().unwrap();
        write_docx(&dir.path().join("ok.docx"), BODY);
        std::fs::write(dir.path().join("bad.docx"), b"junk").unwrap();

        let mut reports = collect_links(dir.path());
        reports.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(reports.len(), 2);
        assert!(reports[0].error.is_some(), "bad.docx carries its error");
        assert!(reports[1].error.is_none());
    }
}
