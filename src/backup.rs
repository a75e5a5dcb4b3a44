//! Backup manager
//!
//! Before any in-place mutation the original file is copied under a backup
//! root. The preferred root falls back to a secondary location when it
//! cannot be created; if neither is usable the write is off (callers treat
//! `BackupFailed` as fatal for that file). Within one run a destination
//! name is never reused: collisions get a numeric suffix, reserved under a
//! lock so concurrent workers cannot race to the same name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DocxError, Result};

/// Record of one completed backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub created_at: SystemTime,
}

/// The default preferred root: `bulk_found` on the desktop when one
/// exists, otherwise `bulk_found` under the scanned directory.
pub fn default_backup_root(scan_root: &Path) -> PathBuf {
    match dirs::desktop_dir() {
        Some(desktop) if desktop.is_dir() => desktop.join("bulk_found"),
        _ => scan_root.join("bulk_found"),
    }
}

pub struct BackupManager {
    preferred: PathBuf,
    fallback: Option<PathBuf>,
    /// Chosen lazily on first use so a find-only run never creates
    /// directories.
    root: OnceCell<PathBuf>,
    reserved: Mutex<HashSet<PathBuf>>,
}

impl BackupManager {
    pub fn new(preferred: PathBuf, fallback: Option<PathBuf>) -> Self {
        Self {
            preferred,
            fallback,
            root: OnceCell::new(),
            reserved: Mutex::new(HashSet::new()),
        }
    }

    /// The root actually in use, once a backup has been made.
    pub fn active_root(&self) -> Option<&Path> {
        self.root.get().map(PathBuf::as_path)
    }

    /// Copy `path` into the backup root before mutation. `relative` places
    /// the copy under the scan-relative subpath so one run over a tree
    /// keeps its shape.
    pub fn backup(&self, path: &Path, relative: Option<&Path>) -> Result<BackupRecord> {
        let root = self.root.get_or_try_init(|| self.select_root())?;
        let sub = match relative {
            Some(rel) => rel.to_path_buf(),
            None => PathBuf::from(path.file_name().ok_or_else(|| {
                DocxError::BackupFailed(format!("no file name in {}", path.display()))
            })?),
        };
        let candidate = root.join(&sub);
        if let Some(parent) = candidate.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DocxError::BackupFailed(format!("{}: {e}", parent.display())))?;
        }
        let destination = self.reserve(candidate);
        std::fs::copy(path, &destination)
            .map_err(|e| DocxError::BackupFailed(format!("{}: {e}", destination.display())))?;
        debug!(from = %path.display(), to = %destination.display(), "backup created");
        Ok(BackupRecord {
            original_path: path.to_path_buf(),
            backup_path: destination,
            created_at: SystemTime::now(),
        })
    }

    fn select_root(&self) -> Result<PathBuf> {
        for root in std::iter::once(&self.preferred).chain(self.fallback.iter()) {
            if std::fs::create_dir_all(root).is_ok() && is_writable(root) {
                return Ok(root.clone());
            }
        }
        Err(DocxError::BackupFailed(format!(
            "no writable backup location (tried {}{})",
            self.preferred.display(),
            self.fallback
                .as_ref()
                .map(|f| format!(", {}", f.display()))
                .unwrap_or_default(),
        )))
    }

    /// First free suffixed variant of `candidate`, claimed for this run.
    fn reserve(&self, candidate: PathBuf) -> PathBuf {
        let mut reserved = match self.reserved.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !reserved.contains(&candidate) && !candidate.exists() {
            reserved.insert(candidate.clone());
            return candidate;
        }
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = candidate
            .extension()
            .map(|s| s.to_string_lossy().into_owned());
        let mut n = 1u64;
        loop {
            let name = match &extension {
                Some(ext) => format!("{stem}.{n}.{ext}"),
                None => format!("{stem}.{n}"),
            };
            let next = candidate.with_file_name(name);
            if !reserved.contains(&next) && !next.exists() {
                reserved.insert(next.clone());
                return next;
            }
            n += 1;
        }
    }
}

fn is_writable(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}
