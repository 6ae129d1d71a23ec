//! Dated, versioned session directories.
//!
//! One run writes into exactly one `<root>/YYYYMMDD-NN` directory. `NN` is one
//! past the highest suffix already present for that date, so numbers are never
//! reused even when earlier ones were deleted.

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::core::error::{ClipseqError, Phase};

/// `chrono` format of the per-date prefix.
pub const SESSION_DATE_FORMAT: &str = "%Y%m%d-";

/// Prefix shared by every session directory of `date`.
pub fn session_prefix(date: NaiveDate) -> String {
    date.format(SESSION_DATE_FORMAT).to_string()
}

/// Trailing run of ASCII digits after `prefix`, if any.
fn trailing_seq(name: &str, prefix: &str) -> Option<u64> {
    let rest = name.strip_prefix(prefix)?;
    let digits_at = rest
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    rest[digits_at..].parse().ok()
}

/// Highest existing sequence number for `prefix` under `root` (0 if none).
/// A missing root counts as empty.
pub fn max_existing_seq(root: &Path, prefix: &str) -> Result<u64> {
    if !root.exists() {
        return Ok(0);
    }

    let mut max_seq = 0;
    let entries = fs::read_dir(root).map_err(|e| ClipseqError::io(Phase::Scan, root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ClipseqError::io(Phase::Scan, root, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| ClipseqError::io(Phase::Scan, entry.path(), e))?
            .is_dir();
        if !is_dir {
            continue;
        }
        if let Some(seq) = trailing_seq(&entry.file_name().to_string_lossy(), prefix) {
            max_seq = max_seq.max(seq);
        }
    }
    Ok(max_seq)
}

/// Path of the next session directory for `date` under `root`.
pub fn next_session_path(root: &Path, date: NaiveDate) -> Result<PathBuf> {
    let prefix = session_prefix(date);
    let highest = max_existing_seq(root, &prefix)?;
    let seq = highest.checked_add(1).ok_or_else(|| {
        anyhow::anyhow!(
            "no session number left after {prefix}{highest} in {}",
            root.display()
        )
    })?;
    Ok(root.join(format!("{prefix}{seq:02}")))
}

/// Lazily allocated session directory, memoized for the rest of the run.
#[derive(Debug)]
pub struct SessionDir {
    root: PathBuf,
    date: NaiveDate,
    dry_run: bool,
    path: OnceCell<PathBuf>,
}

impl SessionDir {
    pub fn new(root: impl Into<PathBuf>, date: NaiveDate, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            date,
            dry_run,
            path: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The allocated directory, if anything has asked for it yet.
    pub fn allocated(&self) -> Option<&Path> {
        self.path.get().map(PathBuf::as_path)
    }

    /// Allocate (and create, unless dry-run) on first call; afterwards return
    /// the same path without rescanning.
    pub fn resolve(&self) -> Result<&Path> {
        if let Some(path) = self.path.get() {
            return Ok(path);
        }

        let path = next_session_path(&self.root, self.date)?;
        if !self.dry_run {
            fs::create_dir_all(&path).map_err(|e| ClipseqError::io(Phase::Mkdir, &path, e))?;
        }
        info!(dir = %path.display(), dry_run = self.dry_run, "session directory allocated");

        Ok(self.path.get_or_init(|| path))
    }
}
