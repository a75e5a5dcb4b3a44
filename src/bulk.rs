//! Bulk find/replace orchestration
//!
//! Runs one operation across every document under a root. Per-file work is
//! strictly sequential (open, match, backup, save) while files fan out over
//! a bounded blocking pool. A file either completes fully or is reported
//! failed with its original bytes intact; one bad file never aborts the
//! batch. Replace runs back up each file before its first write, and only
//! files with at least one match are ever written.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::backup::{BackupManager, default_backup_root};
use crate::document::{Document, LinkTarget, MatchMode, MatchResult};
use crate::error::Result;
use crate::scan::scan_excluding;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// One operation applied uniformly to every file in a run.
#[derive(Debug, Clone)]
pub enum Operation {
    FindText {
        query: String,
        case_sensitive: bool,
        mode: MatchMode,
    },
    ReplaceText {
        query: String,
        replacement: String,
        case_sensitive: bool,
    },
    FindLinks {
        query: String,
        target: LinkTarget,
    },
    ReplaceLinks {
        query: String,
        replacement: String,
        target: LinkTarget,
    },
}

impl Operation {
    pub fn is_replace(&self) -> bool {
        matches!(
            self,
            Operation::ReplaceText { .. } | Operation::ReplaceLinks { .. }
        )
    }

    /// Reject empty queries and bad patterns before any file is opened.
    pub fn validate(&self) -> Result<()> {
        let (query, case_sensitive, mode) = match self {
            Operation::FindText {
                query,
                case_sensitive,
                mode,
            } => (query, *case_sensitive, *mode),
            Operation::ReplaceText {
                query,
                case_sensitive,
                ..
            } => (query, *case_sensitive, MatchMode::Literal),
            Operation::FindLinks { query, .. } | Operation::ReplaceLinks { query, .. } => {
                (query, false, MatchMode::Literal)
            }
        };
        crate::document::replace::build_matcher(query, case_sensitive, mode).map(|_| ())
    }

    fn apply(&self, doc: &mut Document) -> Result<MatchResult> {
        match self {
            Operation::FindText {
                query,
                case_sensitive,
                mode,
            } => doc.find_text_with(query, *case_sensitive, *mode),
            Operation::ReplaceText {
                query,
                replacement,
                case_sensitive,
            } => doc.replace_text(query, replacement, *case_sensitive),
            Operation::FindLinks { query, target } => doc.find_links(query, *target),
            Operation::ReplaceLinks {
                query,
                replacement,
                target,
            } => doc.replace_links(query, replacement, *target),
        }
    }
}

/// Cooperative stop signal shared between an orchestrator and its caller.
/// Cancelling stops new files from starting; in-flight files complete.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct BulkOptions {
    /// Upper bound on files processed at once.
    pub concurrency: usize,
    /// Back up each file before writing it. Ignored for find operations.
    pub backup: bool,
    /// Where backups go; defaults to `default_backup_root(root)`.
    pub backup_root: Option<PathBuf>,
    pub cancel: CancelFlag,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            backup: true,
            backup_root: None,
            cancel: CancelFlag::new(),
        }
    }
}

/// Run one operation against a single file. Input-validation errors aside,
/// failures are folded into the returned `MatchResult` rather than raised.
pub fn run_single(
    path: &Path,
    op: &Operation,
    backup: Option<(&BackupManager, Option<&Path>)>,
) -> MatchResult {
    match try_run(path, op, backup) {
        Ok(result) => result,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "document failed");
            MatchResult::from_error(path, err.to_string())
        }
    }
}

fn try_run(
    path: &Path,
    op: &Operation,
    backup: Option<(&BackupManager, Option<&Path>)>,
) -> Result<MatchResult> {
    let mut doc = Document::open(path)?;
    let mut result = op.apply(&mut doc)?;
    // Persist only when the operation actually changed something; a
    // zero-match file keeps its bytes and mtime.
    if op.is_replace() && result.was_modified {
        if let Some((manager, relative)) = backup {
            let record = manager.backup(path, relative)?;
            result.backup_path = Some(record.backup_path);
        }
        doc.save()?;
        debug!(path = %path.display(), matches = result.match_count, "document rewritten");
    }
    Ok(result)
}

/// Scan `root` and apply `op` to every document found, bounded by
/// `options.concurrency`. Returns one `MatchResult` per file processed,
/// success or failure, in no particular order.
pub async fn run_bulk(
    root: &Path,
    op: Operation,
    options: BulkOptions,
) -> Result<Vec<MatchResult>> {
    op.validate()?;

    let backing_up = op.is_replace() && options.backup;
    let preferred = options
        .backup_root
        .clone()
        .unwrap_or_else(|| default_backup_root(root));
    let fallback = root.join("bulk_found");
    // Backups must never be scanned back in as inputs.
    let exclude = vec![preferred.clone(), fallback.clone()];
    let manager =
        backing_up.then(|| Arc::new(BackupManager::new(preferred, Some(fallback))));

    let files = scan_excluding(root, &exclude);
    info!(root = %root.display(), files = files.len(), "bulk run starting");

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut workers = JoinSet::new();
    for path in files {
        if options.cancel.is_cancelled() {
            info!("bulk run cancelled; draining in-flight files");
            break;
        }
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let op = op.clone();
        let manager = manager.clone();
        let relative = path.strip_prefix(root).ok().map(Path::to_path_buf);
        workers.spawn_blocking(move || {
            let _permit = permit;
            let backup = manager.as_deref().map(|m| (m, relative.as_deref()));
            run_single(&path, &op, backup)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => warn!(error = %err, "worker task failed"),
        }
    }
    Ok(results)
}
