//! Copy clips into the session directory.
//!
//! Layout:
//! - multi-file clip of a sequence extension: `c{n}-seq-{k}/seq{000001..}.{ext}`
//! - everything else: `c{n}.{ext}` at the session root
//!
//! `n` comes from one counter for the whole run; it does not restart per
//! extension. Skipped first/last frames keep their slot in the numbering.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::core::classify::Classifier;
use crate::core::error::{ClipseqError, Phase};
use crate::core::metadata::FileRecord;
use crate::core::segment::Clip;
use crate::core::session::SessionDir;

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterializeOptions {
    pub skip_first: bool,
    pub skip_last: bool,
    pub dry_run: bool,
}

/// On-disk shape of a materialized clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    SequenceDir,
    SingleFile,
}

/// What happened to one clip.
#[derive(Debug, Clone, Serialize)]
pub struct ClipOutcome {
    pub number: usize,
    pub extension: String,
    pub members: usize,
    pub layout: Layout,
    pub target: PathBuf,
    pub copied: usize,
    pub skipped: usize,
    pub first_source: PathBuf,
}

/// `seq000042.jpg` for position 42 (1-based).
pub fn sequence_file_name(position: usize, ext: &str) -> String {
    format!("seq{position:06}.{ext}")
}

/// Directory name of a multi-file clip.
pub fn sequence_dir_name(number: usize, size: usize) -> String {
    format!("c{number}-seq-{size}")
}

pub struct Materializer<'a> {
    session: &'a SessionDir,
    classifier: &'a Classifier,
    options: MaterializeOptions,
    next_number: usize,
}

impl<'a> Materializer<'a> {
    pub fn new(
        session: &'a SessionDir,
        classifier: &'a Classifier,
        options: MaterializeOptions,
    ) -> Self {
        Self {
            session,
            classifier,
            options,
            next_number: 1,
        }
    }

    /// Number the next clip will get.
    pub fn next_number(&self) -> usize {
        self.next_number
    }

    /// Assign the next clip number to `members`.
    pub fn number(&mut self, extension: &str, members: Vec<FileRecord>) -> Clip {
        let clip = Clip {
            number: self.next_number,
            extension: extension.to_string(),
            members,
        };
        self.next_number += 1;
        clip
    }

    /// Number and write every group of one extension, in order.
    pub fn emit_all(
        &mut self,
        extension: &str,
        groups: Vec<Vec<FileRecord>>,
    ) -> Result<Vec<ClipOutcome>> {
        let mut outcomes = Vec::with_capacity(groups.len());
        for members in groups {
            let clip = self.number(extension, members);
            outcomes.push(self.materialize(&clip)?);
        }
        Ok(outcomes)
    }

    /// Write one clip under the session directory (allocated on first use).
    pub fn materialize(&self, clip: &Clip) -> Result<ClipOutcome> {
        let first = clip
            .members
            .first()
            .ok_or_else(|| anyhow::anyhow!("clip c{} has no members", clip.number))?;
        let session_dir = self.session.resolve()?;
        let ext = clip.extension.as_str();
        let size = clip.members.len();

        let outcome = if self.classifier.is_sequence(ext) && size > 1 {
            let dir = session_dir.join(sequence_dir_name(clip.number, size));
            if !self.options.dry_run {
                fs::create_dir_all(&dir).map_err(|e| ClipseqError::io(Phase::Mkdir, &dir, e))?;
            }

            let mut copied = 0;
            for (idx, record) in clip.members.iter().enumerate() {
                let position = idx + 1;
                if (position == 1 && self.options.skip_first)
                    || (position == size && self.options.skip_last)
                {
                    debug!(clip = clip.number, position, "skipped frame");
                    continue;
                }
                self.copy(&record.path, &dir.join(sequence_file_name(position, ext)))?;
                copied += 1;
            }

            ClipOutcome {
                number: clip.number,
                extension: ext.to_string(),
                members: size,
                layout: Layout::SequenceDir,
                target: dir,
                copied,
                skipped: size - copied,
                first_source: first.path.clone(),
            }
        } else {
            if size > 1 {
                anyhow::bail!(
                    "clip c{} of single-unit .{ext} has {size} members",
                    clip.number
                );
            }
            let target = session_dir.join(format!("c{}.{ext}", clip.number));
            self.copy(&first.path, &target)?;

            ClipOutcome {
                number: clip.number,
                extension: ext.to_string(),
                members: 1,
                layout: Layout::SingleFile,
                target,
                copied: 1,
                skipped: 0,
                first_source: first.path.clone(),
            }
        };

        debug!(
            clip = outcome.number,
            ext,
            members = outcome.members,
            copied = outcome.copied,
            target = %outcome.target.display(),
            "materialized clip"
        );
        Ok(outcome)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        fs::copy(from, to)
            .map_err(|e| ClipseqError::io(Phase::Copy, from, e))
            .with_context(|| format!("copy {} -> {}", from.display(), to.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::Config;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn sources(dir: &Path, stem: &str, ext: &str, n: usize) -> Result<Vec<FileRecord>> {
        let t = Utc.timestamp_opt(0, 0).unwrap();
        (0..n)
            .map(|i| {
                let p = dir.join(format!("{stem}{i}.{ext}"));
                fs::write(&p, format!("frame {i}"))?;
                Ok(FileRecord::new(p, t))
            })
            .collect()
    }

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(sequence_file_name(1, "jpg"), "seq000001.jpg");
        assert_eq!(sequence_file_name(123456, "dng"), "seq123456.dng");
        assert_eq!(sequence_dir_name(3, 12), "c3-seq-12");
    }

    #[test]
    fn sequence_clip_goes_into_numbered_dir() -> Result<()> {
        let tmp = TempDir::new()?;
        let session = SessionDir::new(tmp.path().join("out"), day(), false);
        let classifier = Classifier::from_config(&Config::default());
        let mut m = Materializer::new(&session, &classifier, MaterializeOptions::default());

        let members = sources(tmp.path(), "a", "jpg", 3)?;
        let outcomes = m.emit_all("jpg", vec![members])?;

        let dir = tmp.path().join("out/20261016-01/c1-seq-3");
        assert_eq!(outcomes[0].target, dir);
        assert_eq!(fs::read_to_string(dir.join("seq000001.jpg"))?, "frame 0");
        assert_eq!(fs::read_to_string(dir.join("seq000003.jpg"))?, "frame 2");
        assert_eq!(m.next_number(), 2);
        Ok(())
    }

    #[test]
    fn singletons_land_at_session_root() -> Result<()> {
        let tmp = TempDir::new()?;
        let session = SessionDir::new(tmp.path().join("out"), day(), false);
        let classifier = Classifier::from_config(&Config::default());
        let mut m = Materializer::new(&session, &classifier, MaterializeOptions::default());

        let jpg = sources(tmp.path(), "a", "jpg", 1)?;
        let mut mp4 = sources(tmp.path(), "v", "mp4", 2)?;
        m.emit_all("jpg", vec![jpg])?;
        let second = mp4.split_off(1);
        let outcomes = m.emit_all("mp4", vec![mp4, second])?;

        let root = tmp.path().join("out/20261016-01");
        assert!(root.join("c1.jpg").is_file());
        assert_eq!(outcomes[0].target, root.join("c2.mp4"));
        assert_eq!(fs::read_to_string(root.join("c3.mp4"))?, "frame 1");

        // single-unit files never share a clip
        let pair = sources(tmp.path(), "w", "mov", 2)?;
        assert!(m.emit_all("mov", vec![pair]).is_err());
        Ok(())
    }

    #[test]
    fn skip_first_and_last_keep_declared_size() -> Result<()> {
        let tmp = TempDir::new()?;
        let session = SessionDir::new(tmp.path().join("out"), day(), false);
        let classifier = Classifier::from_config(&Config::default());
        let options = MaterializeOptions { skip_first: true, skip_last: true, dry_run: false };
        let mut m = Materializer::new(&session, &classifier, options);

        let outcomes = m.emit_all(
            "jpg",
            vec![sources(tmp.path(), "a", "jpg", 4)?, sources(tmp.path(), "b", "jpg", 2)?],
        )?;

        let dir = tmp.path().join("out/20261016-01/c1-seq-4");
        let mut names: Vec<_> = fs::read_dir(&dir)?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().to_string()))
            .collect::<std::io::Result<_>>()?;
        names.sort();
        assert_eq!(names, vec!["seq000002.jpg", "seq000003.jpg"]);
        assert_eq!((outcomes[0].copied, outcomes[0].skipped), (2, 2));

        // size 2 with both skips copies nothing but the dir still says 2
        assert!(tmp.path().join("out/20261016-01/c2-seq-2").is_dir());
        assert_eq!(outcomes[1].copied, 0);
        Ok(())
    }

    #[test]
    fn skips_do_not_apply_to_single_frame_clips() -> Result<()> {
        let tmp = TempDir::new()?;
        let session = SessionDir::new(tmp.path().join("out"), day(), false);
        let classifier = Classifier::from_config(&Config::default());
        let options = MaterializeOptions { skip_first: true, skip_last: true, dry_run: false };
        let mut m = Materializer::new(&session, &classifier, options);

        let outcomes = m.emit_all("jpg", vec![sources(tmp.path(), "lone", "jpg", 1)?])?;

        let root = tmp.path().join("out/20261016-01");
        assert_eq!(outcomes[0].layout, Layout::SingleFile);
        assert_eq!((outcomes[0].copied, outcomes[0].skipped), (1, 0));
        assert_eq!(fs::read_to_string(root.join("c1.jpg"))?, "frame 0");
        assert!(!root.join("c1-seq-1").exists());
        Ok(())
    }

    #[test]
    fn dry_run_touches_nothing() -> Result<()> {
        let tmp = TempDir::new()?;
        let session = SessionDir::new(tmp.path().join("out"), day(), true);
        let classifier = Classifier::from_config(&Config::default());
        let options = MaterializeOptions { dry_run: true, ..Default::default() };
        let mut m = Materializer::new(&session, &classifier, options);

        let outcomes = m.emit_all("jpg", vec![sources(tmp.path(), "a", "jpg", 3)?])?;
        assert_eq!(outcomes[0].copied, 3);
        assert!(!tmp.path().join("out").exists());
        Ok(())
    }

    #[test]
    fn missing_source_fails_with_copy_phase() -> Result<()> {
        let tmp = TempDir::new()?;
        let session = SessionDir::new(tmp.path().join("out"), day(), false);
        let classifier = Classifier::from_config(&Config::default());
        let mut m = Materializer::new(&session, &classifier, MaterializeOptions::default());

        let ghost = FileRecord::new(tmp.path().join("gone.mp4"), Utc.timestamp_opt(0, 0).unwrap());
        let err = m.emit_all("mp4", vec![vec![ghost]]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClipseqError>(),
            Some(ClipseqError::Io { phase: Phase::Copy, .. })
        ));
        Ok(())
    }
}
