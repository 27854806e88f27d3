//! Moving or deleting a retired world directory.
//!
//! Backups try an ordered list of strategies, falling through to the next one
//! only when the previous failed:
//! 1. [`AtomicRename`] - a single `rename` of the directory
//! 2. [`EntryWiseMove`] - rename each top-level entry, then remove the source
//! 3. [`CopyThenDelete`] - recursive copy (skipping the lock file), then delete
//!
//! Deletion walks the tree and removes entries deepest-first, best effort.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File the host keeps open while a world is loaded; never copied.
pub const LOCK_FILE_NAME: &str = "session.lock";

pub trait RetireStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn retire(&self, source: &Path, target: &Path) -> io::Result<()>;
}

fn is_lock_file(name: &OsStr) -> bool {
    name.to_str()
        .map(|n| n.eq_ignore_ascii_case(LOCK_FILE_NAME))
        .unwrap_or(false)
}

// =============================================================================
// Strategies
// =============================================================================

pub struct AtomicRename;

impl RetireStrategy for AtomicRename {
    fn name(&self) -> &'static str {
        "atomic_rename"
    }

    fn retire(&self, source: &Path, target: &Path) -> io::Result<()> {
        fs::rename(source, target)
    }
}

/// Not atomic: a failure part way leaves entries split between both sides,
/// which the next strategy then merges.
pub struct EntryWiseMove;

impl RetireStrategy for EntryWiseMove {
    fn name(&self) -> &'static str {
        "entry_move"
    }

    fn retire(&self, source: &Path, target: &Path) -> io::Result<()> {
        fs::create_dir_all(target)?;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            fs::rename(entry.path(), target.join(entry.file_name()))?;
        }
        fs::remove_dir(source)
    }
}

pub struct CopyThenDelete;

impl RetireStrategy for CopyThenDelete {
    fn name(&self) -> &'static str {
        "copy_then_delete"
    }

    fn retire(&self, source: &Path, target: &Path) -> io::Result<()> {
        let mut copied = CopyReport::default();
        copy_tree(source, target, &mut copied)?;
        tracing::info!(
            source = %source.display(),
            target = %target.display(),
            files = copied.files,
            skipped = copied.skipped,
            failed = copied.failed,
            "Copied retired world"
        );

        let deleted = delete_tree(source);
        if !deleted.failures.is_empty() {
            tracing::warn!(
                source = %source.display(),
                failures = deleted.failures.len(),
                "Source not fully removed after copy"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    pub files: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Copy `source` into `target`. Only failing to create or list the top-level
/// directories is an error; per-entry failures are logged and counted.
pub fn copy_tree(source: &Path, target: &Path, report: &mut CopyReport) -> io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %source.display(), error = %e, "Could not read directory entry");
                report.failed += 1;
                continue;
            }
        };
        let name = entry.file_name();
        let src = entry.path();
        let dst = target.join(&name);

        if is_lock_file(&name) {
            tracing::warn!(file = %src.display(), "Skipping lock file");
            report.skipped += 1;
            continue;
        }

        let is_dir = match entry.file_type() {
            Ok(file_type) => file_type.is_dir(),
            Err(e) => {
                tracing::warn!(file = %src.display(), error = %e, "Could not stat entry");
                report.failed += 1;
                continue;
            }
        };

        if is_dir {
            if let Err(e) = copy_tree(&src, &dst, report) {
                tracing::warn!(dir = %src.display(), error = %e, "Could not copy directory");
                report.failed += 1;
            }
        } else {
            match fs::copy(&src, &dst) {
                Ok(_) => report.files += 1,
                Err(e) => {
                    tracing::warn!(file = %src.display(), error = %e, "Could not copy file");
                    report.failed += 1;
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Delete
// =============================================================================

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub removed: usize,
    pub failures: Vec<(PathBuf, io::Error)>,
}

/// Remove `root` and everything below it, children before parents.
///
/// Entries that vanish concurrently are ignored; other failures are logged and
/// collected while the walk continues. Symlinks are removed, never followed.
pub fn delete_tree(root: &Path) -> DeleteReport {
    let mut paths = Vec::new();
    collect_paths(root, &mut paths);
    paths.sort_by(|a, b| b.0.cmp(&a.0));

    let mut report = DeleteReport::default();
    for (path, is_dir) in paths {
        let result = if is_dir {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => report.removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not delete");
                report.failures.push((path, e));
            }
        }
    }
    report
}

fn collect_paths(path: &Path, out: &mut Vec<(PathBuf, bool)>) {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    let is_dir = meta.is_dir();
    out.push((path.to_path_buf(), is_dir));
    if is_dir {
        match fs::read_dir(path) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    collect_paths(&entry.path(), out);
                }
            }
            Err(e) => tracing::warn!(dir = %path.display(), error = %e, "Could not list directory"),
        }
    }
}

// =============================================================================
// Chain
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("all {} retire strategies failed", .attempts.len())]
pub struct RetireChainError {
    pub attempts: Vec<(&'static str, io::Error)>,
}

pub struct RetirementChain {
    strategies: Vec<Box<dyn RetireStrategy>>,
}

impl RetirementChain {
    pub fn new(strategies: Vec<Box<dyn RetireStrategy>>) -> Self {
        Self { strategies }
    }

    /// Rename, then entry-wise move, then copy and delete.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(AtomicRename),
            Box::new(EntryWiseMove),
            Box::new(CopyThenDelete),
        ])
    }

    /// Returns the name of the strategy that succeeded.
    pub fn run(&self, source: &Path, target: &Path) -> Result<&'static str, RetireChainError> {
        let mut attempts = Vec::new();
        for strategy in &self.strategies {
            match strategy.retire(source, target) {
                Ok(()) => return Ok(strategy.name()),
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        source = %source.display(),
                        error = %e,
                        "Retire strategy failed, trying next"
                    );
                    attempts.push((strategy.name(), e));
                }
            }
        }
        Err(RetireChainError { attempts })
    }
}

impl Default for RetirementChain {
    fn default() -> Self {
        Self::standard()
    }
}
