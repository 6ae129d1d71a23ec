//! `clipseq concat`: join split video fragments with an external transcoder.
//!
//! Action cameras split long recordings into files like `GX010042.MP4`,
//! `GX020042.MP4`, ... where the trailing digits are the recording id. Files
//! sharing an id are concatenated losslessly (`-c copy`) into one output.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use regex::Regex;
use tracing::{debug, info};

use crate::cli::{AppContext, ConcatArgs};
use crate::core::classify::extension_of;
use crate::core::error::{ClipseqError, Phase};
use crate::core::session::SessionDir;
use crate::infra::config::{ConcatConfig, Config, expand_path};

/// Fragments of one recording, in path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentGroup {
    pub id: String,
    pub members: Vec<PathBuf>,
}

/// Regular files directly inside `folder` with extension `ext` (any case).
pub fn files_with_extension(folder: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let entries = fs::read_dir(folder).map_err(|e| ClipseqError::io(Phase::Scan, folder, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ClipseqError::io(Phase::Scan, folder, e))?;
        let path = entry.path();
        if path.is_file() && extension_of(&path).as_deref() == Some(ext) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Group files by capture group 1 of `pattern` on the file name.
/// Non-matching files are left out. Groups are ordered by numeric id.
pub fn group_fragments(files: &[PathBuf], pattern: &Regex) -> Vec<FragmentGroup> {
    let mut by_id: BTreeMap<(u64, String), Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        let Some(id) = pattern
            .captures(&name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        else {
            debug!(file = %name, "not a fragment");
            continue;
        };
        let numeric = id.parse().unwrap_or(u64::MAX);
        by_id.entry((numeric, id)).or_default().push(path.clone());
    }

    by_id
        .into_iter()
        .map(|((_, id), mut members)| {
            members.sort();
            FragmentGroup { id, members }
        })
        .collect()
}

/// Body of a concat-demuxer list file.
pub fn concat_list(members: &[PathBuf]) -> String {
    let mut out = String::new();
    for path in members {
        let quoted = path.to_string_lossy().replace('\'', r"'\''");
        out.push_str(&format!("file '{quoted}'\n"));
    }
    out
}

/// Transcoder arguments joining the files named in `list` into `output`.
pub fn transcoder_args(settings: &ConcatConfig, list: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if let Some(scale) = settings.time_scale {
        args.push("-itsscale".into());
        args.push(scale.to_string().into());
    }
    for a in ["-f", "concat", "-safe", "0", "-i"] {
        args.push(a.into());
    }
    args.push(list.as_os_str().to_owned());
    args.push("-c".into());
    args.push("copy".into());
    args.push(output.as_os_str().to_owned());
    args
}

/// Output file name for a group.
pub fn output_name(settings: &ConcatConfig, id: &str) -> String {
    format!("{}{}.MP4", settings.output_name_prefix, id)
}

/// Delete sidecars of extension `ext` in `folder`; returns what was (or would be) removed.
pub fn remove_sidecars(folder: &Path, ext: &str, dry_run: bool) -> Result<Vec<PathBuf>> {
    let files = files_with_extension(folder, ext)?;
    if !dry_run {
        for f in &files {
            fs::remove_file(f).map_err(|e| ClipseqError::io(Phase::Remove, f, e))?;
        }
    }
    Ok(files)
}

fn transcode(settings: &ConcatConfig, group: &FragmentGroup, folder: &Path) -> Result<PathBuf> {
    let mut list = tempfile::Builder::new()
        .prefix(&format!("list-{}-", group.id))
        .suffix(".txt")
        .tempfile_in(folder)
        .with_context(|| format!("create concat list in {}", folder.display()))?;
    list.write_all(concat_list(&group.members).as_bytes())
        .context("write concat list")?;
    list.flush().context("flush concat list")?;

    let output = folder.join(output_name(settings, &group.id));
    let args = transcoder_args(settings, list.path(), &output);
    info!(group = %group.id, fragments = group.members.len(), output = %output.display(), "transcoding");

    let status = Command::new(&settings.transcoder)
        .args(&args)
        .status()
        .map_err(|e| ClipseqError::Transcoder {
            group: group.id.clone(),
            status: format!("could not start {}: {e}", settings.transcoder),
        })?;
    if !status.success() {
        return Err(ClipseqError::Transcoder {
            group: group.id.clone(),
            status: status.to_string(),
        }
        .into());
    }
    Ok(output)
}

pub fn run(args: ConcatArgs, ctx: &AppContext, config: &Config) -> Result<()> {
    let mut settings = config.concat.clone();
    if let Some(t) = args.transcoder {
        settings.transcoder = t;
    }
    settings.remove_thumbnails &= !args.keep_thumbnails;
    settings.remove_low_res &= !args.keep_low_res;

    let folder = expand_path(&args.folder)?;
    if !folder.is_dir() {
        return Err(ClipseqError::InputNotFound { path: folder }.into());
    }
    // List entries are resolved against the list file's directory, so they must be absolute.
    let folder = dunce::canonicalize(&folder)
        .with_context(|| format!("canonicalize {}", folder.display()))?;
    let pattern = Regex::new(&settings.fragment_pattern)
        .with_context(|| format!("invalid fragment_pattern {:?}", settings.fragment_pattern))?;

    let session = match &args.to {
        Some(root) => Some(SessionDir::new(
            expand_path(root)?,
            Local::now().date_naive(),
            ctx.dry_run,
        )),
        None => None,
    };

    let groups = group_fragments(&files_with_extension(&folder, "mp4")?, &pattern);
    info!(folder = %folder.display(), groups = groups.len(), "fragment groups");

    for group in &groups {
        if ctx.dry_run {
            if !ctx.quiet {
                let line = format!(
                    "DRY RUN: Would join {} fragments into {}",
                    group.members.len(),
                    folder.join(output_name(&settings, &group.id)).display()
                );
                println!("{}", if ctx.no_color { line } else { line.yellow().to_string() });
                for m in &group.members {
                    println!("  {}", m.display());
                }
            }
            continue;
        }

        let output = transcode(&settings, group, &folder)?;
        if let Some(session) = &session {
            let dir = session.resolve()?;
            let name = output
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("output has no file name: {}", output.display()))?;
            let target = dir.join(name);
            fs::copy(&output, &target)
                .map_err(|e| ClipseqError::io(Phase::Copy, &output, e))
                .with_context(|| format!("copy {} -> {}", output.display(), target.display()))?;
            info!(target = %target.display(), "copied joined file");
        }
        if !ctx.quiet {
            let mark = if ctx.no_color {
                "✓".to_string()
            } else {
                "✓".green().to_string()
            };
            println!("{mark} {}", output.display());
        }
    }

    let mut sidecars = Vec::new();
    if settings.remove_thumbnails {
        sidecars.extend(remove_sidecars(&folder, "thm", ctx.dry_run)?);
    }
    if settings.remove_low_res {
        sidecars.extend(remove_sidecars(&folder, "lrv", ctx.dry_run)?);
    }
    if !sidecars.is_empty() && !ctx.quiet {
        let verb = if ctx.dry_run { "Would remove" } else { "Removed" };
        println!("{verb} {} sidecar files", sidecars.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pattern() -> Regex {
        Regex::new(&ConcatConfig::default().fragment_pattern).unwrap()
    }

    #[test]
    fn fragments_group_by_trailing_id() {
        let files: Vec<PathBuf> = [
            "/c/GX020117.MP4",
            "/c/GX010117.MP4",
            "/c/GX010009.MP4",
            "/c/GOPR0001.MP4",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let groups = group_fragments(&files, &pattern());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, "0009");
        assert_eq!(groups[1].id, "0117");
        assert_eq!(
            groups[1].members,
            vec![PathBuf::from("/c/GX010117.MP4"), PathBuf::from("/c/GX020117.MP4")]
        );
    }

    #[test]
    fn list_quotes_paths() {
        let body = concat_list(&[PathBuf::from("/a/GX01.MP4"), PathBuf::from("/it's/GX02.MP4")]);
        assert_eq!(body, "file '/a/GX01.MP4'\nfile '/it'\\''s/GX02.MP4'\n");
    }

    #[test]
    fn args_include_optional_time_scale() {
        let mut settings = ConcatConfig::default();
        let args = transcoder_args(&settings, Path::new("l.txt"), Path::new("o.MP4"));
        assert_eq!(args[0], OsString::from("-itsscale"));
        assert_eq!(args.last(), Some(&OsString::from("o.MP4")));

        settings.time_scale = None;
        let args = transcoder_args(&settings, Path::new("l.txt"), Path::new("o.MP4"));
        let joined: Vec<_> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(
            joined,
            vec!["-f", "concat", "-safe", "0", "-i", "l.txt", "-c", "copy", "o.MP4"]
        );
        assert_eq!(output_name(&settings, "0117"), "GXA0117.MP4");
    }

    #[test]
    fn sidecar_removal_is_case_insensitive_and_respects_dry_run() -> Result<()> {
        let tmp = TempDir::new()?;
        for f in ["GX010001.THM", "gx010002.thm", "GL010001.LRV", "GX010001.MP4"] {
            fs::write(tmp.path().join(f), b"x")?;
        }

        let planned = remove_sidecars(tmp.path(), "thm", true)?;
        assert_eq!(planned.len(), 2);
        assert!(tmp.path().join("GX010001.THM").exists());

        remove_sidecars(tmp.path(), "thm", false)?;
        assert!(!tmp.path().join("GX010001.THM").exists());
        assert!(!tmp.path().join("gx010002.thm").exists());
        assert!(tmp.path().join("GL010001.LRV").exists());
        assert!(tmp.path().join("GX010001.MP4").exists());
        Ok(())
    }
}
