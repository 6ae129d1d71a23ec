//! Shared test utilities for integration tests
//!
//! Camera-dump fixtures with controlled modification times.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use assert_fs::prelude::*;
use chrono::NaiveDate;
use clipseq::cli::AppContext;
use clipseq::infra::Config;

/// Fixed session date so directory names are predictable.
pub fn day() -> NaiveDate
{
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

/// Quiet, colorless context.
pub fn app(dry_run: bool) -> AppContext
{
    AppContext {
        quiet: true,
        no_color: true,
        dry_run,
    }
}

/// Defaults pointed at `input` and `output`.
pub fn config_for(
    input: &Path,
    output: &Path,
) -> Config
{
    Config {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        ..Config::default()
    }
}

/// Write `rel` (its own path as content) with mtime `1.7e9 + millis/1000` seconds.
pub fn shot(
    tmp: &assert_fs::TempDir,
    rel: &str,
    millis: u64,
) -> PathBuf
{
    let child = tmp.child(rel);
    child
        .write_str(rel)
        .expect("write fixture");

    let when = SystemTime::UNIX_EPOCH
        + Duration::from_secs(1_700_000_000)
        + Duration::from_millis(millis);
    File::options()
        .write(true)
        .open(child.path())
        .and_then(|f| f.set_modified(when))
        .expect("set mtime");

    child
        .path()
        .to_path_buf()
}

/// A card dump: two jpg bursts (1s spacing, 4 then 3 frames), two mp4s
/// and a stray text file.
pub fn make_card() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    for (i, secs) in [0, 1, 2, 3, 10, 11, 12]
        .into_iter()
        .enumerate()
    {
        shot(&tmp, &format!("DCIM/IMG_{:04}.JPG", i + 1), secs * 1000);
    }
    shot(&tmp, "DCIM/MVI_0001.MP4", 100_000);
    shot(&tmp, "DCIM/MVI_0002.MP4", 200_000);
    shot(&tmp, "DCIM/notes.txt", 5_000);
    tmp
}

/// Sorted file names directly under `dir`.
pub fn names_in(dir: &Path) -> Vec<String>
{
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| {
            e.expect("dir entry")
                .file_name()
                .to_string_lossy()
                .to_string()
        })
        .collect();
    names.sort();
    names
}
