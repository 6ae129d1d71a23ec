//! Domain error taxonomy.
//!
//! Application code returns `anyhow::Result`; these variants are the failures
//! a caller may want to match on (via `downcast_ref`) or map to exit codes.

use std::fmt;
use std::path::PathBuf;

/// Run phase in which a filesystem operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Stat,
    Hash,
    Mkdir,
    Copy,
    Remove,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Scan => "scan",
            Phase::Stat => "stat",
            Phase::Hash => "hash",
            Phase::Mkdir => "mkdir",
            Phase::Copy => "copy",
            Phase::Remove => "remove",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClipseqError {
    /// Input root missing or not a directory; raised before any other work
    #[error("input directory not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Filesystem failure; always fatal
    #[error("{phase} failed for {}", path.display())]
    Io {
        phase: Phase,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Segmentation walk reached a state it can never legally be in
    #[error("segmentation invariant violated for .{extension} at index {index}: {detail}")]
    Segmentation {
        extension: String,
        index: usize,
        detail: String,
    },

    /// External transcoder could not be run or exited non-zero
    #[error("transcoder failed for fragment group {group}: {status}")]
    Transcoder { group: String, status: String },
}

impl ClipseqError {
    pub fn io(phase: Phase, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClipseqError::Io {
            phase,
            path: path.into(),
            source,
        }
    }
}
