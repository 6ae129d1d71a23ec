//! File records: path + modification time (+ optional digest) per input file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::{ClipseqError, Phase};
use crate::infra::hash::stream_blake3;
use crate::infra::walk::FileWalker;

/// One input file as seen at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
    /// `blake3:<hex>` when hashing is enabled; never used for grouping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, modified_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            modified_at,
            content_hash: None,
        }
    }

    /// Stat `path` (and hash it when asked).
    pub fn from_path(path: &Path, hash_contents: bool) -> Result<Self> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| ClipseqError::io(Phase::Stat, path, e))?;

        let content_hash = if hash_contents {
            Some(stream_blake3(path)?)
        } else {
            None
        };

        Ok(Self {
            path: path.to_path_buf(),
            modified_at: DateTime::<Utc>::from(modified),
            content_hash,
        })
    }
}

/// Lists and stats every regular file under an input root.
pub struct MetadataProvider {
    walker: FileWalker,
    hash_contents: bool,
    exclude: Option<PathBuf>,
}

impl MetadataProvider {
    pub fn new(walker: FileWalker, hash_contents: bool) -> Self {
        Self {
            walker,
            hash_contents,
            exclude: None,
        }
    }

    /// Skip everything below `dir` (the output root when it sits inside the input).
    pub fn excluding(mut self, dir: Option<PathBuf>) -> Self {
        self.exclude = dir;
        self
    }

    /// Records for every file below `root`, in walk order.
    /// Fails with `InputNotFound` before touching anything else.
    pub fn collect(&self, root: &Path, progress: &ProgressBar) -> Result<Vec<FileRecord>> {
        if !root.is_dir() {
            return Err(ClipseqError::InputNotFound {
                path: root.to_path_buf(),
            }
            .into());
        }

        info!(root = %root.display(), "scanning input");
        let mut files = self.walker.walk_files(root)?;
        if let Some(excluded) = &self.exclude {
            let before = files.len();
            files.retain(|p| !p.starts_with(excluded));
            debug!(skipped = before - files.len(), dir = %excluded.display(), "excluded output tree");
        }
        info!(files = files.len(), "scan complete");

        progress.set_length(files.len() as u64);
        progress.set_message("reading file metadata");

        let mut records = Vec::with_capacity(files.len());
        for path in &files {
            records.push(FileRecord::from_path(path, self.hash_contents)?);
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(records)
    }
}
