//! Directory enumeration
//!
//! Recursively lists the `.docx` files under a root, skipping Word's `~$`
//! lock artifacts and any excluded subtrees (typically the backup roots,
//! so saved pre-images are never scanned as inputs). Unreadable
//! directories are skipped rather than failing the walk.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// All document files under `root`, in walk order.
pub fn scan(root: &Path) -> Vec<PathBuf> {
    scan_excluding(root, &[])
}

pub fn scan_excluding(root: &Path, exclude: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(false).into_iter();
    for entry in walker.filter_entry(|e| !exclude.iter().any(|excluded| e.path() == excluded)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_document(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files
}

fn is_document(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
    let is_lock_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("~$"));
    has_extension && !is_lock_file
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_documents_recursively() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.docx"));
        touch(&dir.path().join("sub/b.DOCX"));
        touch(&dir.path().join("sub/deep/c.docx"));
        touch(&dir.path().join("notes.txt"));

        let mut found = scan(dir.path());
        found.sort();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.docx", "b.DOCX", "c.docx"]);
    }

    #[test]
    fn skips_lock_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("real.docx"));
        touch(&dir.path().join("~$real.docx"));

        let found = scan(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("real.docx"));
    }

    #[test]
    fn excluded_subtree_is_not_scanned() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("keep.docx"));
        touch(&dir.path().join("bulk_found/skip.docx"));

        let excluded = vec![dir.path().join("bulk_found")];
        let found = scan_excluding(dir.path(), &excluded);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("keep.docx"));
    }
}
