//! **clipseq** - sort camera dumps into dated session folders
//!
//! Bursts of stills and split recordings are grouped into clips by how evenly
//! spaced their modification times are, then copied into a fresh
//! `YYYYMMDD-NN` session directory.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - scan, classify, segment, materialize
pub mod core {
    /// Error taxonomy shared by every phase
    pub mod error;
    pub use error::{ClipseqError, Phase};

    /// File records (path, mtime, optional digest) from a recursive scan
    pub mod metadata;
    pub use metadata::{FileRecord, MetadataProvider};

    /// Extension buckets and sequence/single capability classes
    pub mod classify;
    pub use classify::{Capability, Classifier, ExtensionGroups};

    /// Gap-consistency clip segmentation
    pub mod segment;
    pub use segment::{Clip, SegmentMode, segment};

    /// Dated, versioned session directory allocation
    pub mod session;
    pub use session::SessionDir;

    /// Clip layout and copying
    pub mod materialize;
    pub use materialize::{ClipOutcome, MaterializeOptions, Materializer};

    /// `build` command: the full run
    pub mod build;
    pub use build::{BuildReport, RunContext, execute, run as build_run};

    /// `concat` command: join split video fragments
    pub mod concat;
    pub use concat::run as concat_run;
}

/// Infrastructure - configuration, walking, hashing
pub mod infra {
    /// Layered configuration (defaults, file, CLIPSEQ_* env)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Recursive walker with extra ignore globs
    pub mod walk;
    pub use walk::FileWalker;

    /// blake3 content digests
    pub mod hash;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{build_run, concat_run};
pub use infra::{Config, FileWalker, load_config};
