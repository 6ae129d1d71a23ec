//! Filepath: src/infra/walk.rs
//! Recursive file walker for camera dumps.
//! - Lists every regular file below the root, hidden files included
//! - `.gitignore`/`.ignore` files are NOT honoured (a card is not a repo)
//! - Extra ignore globs (early directory prune + late file filter)
//! - Optional symlink following
//! - Deterministic ordering for stable tests/CI
//!
//! Backed by ripgrep's `ignore` crate and `globset`.
//! Unlike a best-effort listing, entries that fail to read abort the walk:
//! a silently missing frame would shift every later clip boundary.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

use crate::core::error::{ClipseqError, Phase};

/// Walker with optional extra ignore globs.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Follow symbolic links; default false
    follow_symlinks: bool,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g., "**/.DS_Store",
    /// "**/*.THM"). Patterns match on paths relative to the walk root.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            follow_symlinks: false,
        })
    }

    /// (Optional) Follow or skip symbolic links (default false).
    pub fn with_follow_symlinks(
        mut self,
        follow: bool,
    ) -> Self
    {
        self.follow_symlinks = follow;
        self
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // Dotfiles are listed like any other file.
        b.hidden(false);

        // No ignore files of any kind
        b.ignore(false);
        b.parents(false);
        b.git_ignore(false);
        b.git_global(false);
        b.git_exclude(false);

        b.follow_links(self.follow_symlinks);

        // Early directory pruning, matched on the path relative to root.
        let extra = self
            .ignore_patterns
            .clone();
        let base = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            if !is_dir
            {
                return true;
            }
            let rel = ent
                .path()
                .strip_prefix(&base)
                .unwrap_or(ent.path());
            rel.as_os_str()
                .is_empty()
                || !extra.is_match(rel)
        });

        b
    }

    /// Traverse files under `root`, honouring the extra globs.
    /// Returns a **sorted** list of file paths for determinism.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Result<Vec<PathBuf>>
    {
        let root_path = root.as_ref();
        let mut out = Vec::new();

        for res in self
            .build_walk(root_path)
            .build()
        {
            let entry = res.map_err(|err| {
                let msg = err.to_string();
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other(msg));
                ClipseqError::io(Phase::Scan, root_path, source)
            })?;

            // Keep only regular files
            if !entry
                .file_type()
                .is_some_and(|ft| ft.is_file())
            {
                continue;
            }

            let abs = entry.into_path();
            let rel = abs
                .strip_prefix(root_path)
                .unwrap_or(&abs);
            if self
                .ignore_patterns
                .is_match(rel)
            {
                continue;
            }
            out.push(abs);
        }

        // Deterministic order (stable CLI & tests)
        out.sort();

        Ok(out)
    }
}
