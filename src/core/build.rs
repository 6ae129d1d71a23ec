//! `clipseq build`: scan → classify → segment → materialize.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};
use tracing::info;

use crate::cli::{AppContext, BuildArgs};
use crate::core::classify::{Capability, Classifier};
use crate::core::error::ClipseqError;
use crate::core::materialize::{ClipOutcome, Layout, MaterializeOptions, Materializer};
use crate::core::metadata::MetadataProvider;
use crate::core::segment::{SegmentMode, segment};
use crate::core::session::SessionDir;
use crate::infra::config::{Config, expand_path};
use crate::infra::walk::FileWalker;

/// Per-run state, built once and passed by reference.
pub struct RunContext<'a> {
    pub app: &'a AppContext,
    pub config: Config,
    pub classifier: Classifier,
    pub session: SessionDir,
}

impl<'a> RunContext<'a> {
    pub fn new(app: &'a AppContext, config: Config, date: NaiveDate) -> Self {
        let classifier = Classifier::from_config(&config);
        let session = SessionDir::new(config.output_dir.clone(), date, app.dry_run);
        Self {
            app,
            config,
            classifier,
            session,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionSummary {
    pub capability: Capability,
    pub files: usize,
    pub clips: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub session_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub files_seen: usize,
    pub files_kept: usize,
    pub extensions: IndexMap<String, ExtensionSummary>,
    pub clips: Vec<ClipOutcome>,
}

/// Fold CLI flags over the loaded config and expand user paths.
pub fn effective_config(config: &Config, args: &BuildArgs) -> Result<Config> {
    let mut cfg = config.clone();
    if let Some(input) = &args.input {
        cfg.input_dir = input.clone();
    }
    if let Some(output) = &args.output {
        cfg.output_dir = output.clone();
    }
    if !args.extensions.is_empty() {
        cfg.extensions = args.extensions.clone();
    }
    if let Some(threshold) = args.span_threshold {
        cfg.span_threshold = threshold;
    }
    cfg.one_sequence_per_extension |= args.one_sequence;
    cfg.skip_first |= args.skip_first;
    cfg.skip_last |= args.skip_last;
    cfg.hash_contents |= args.hash;

    cfg.input_dir = expand_path(&cfg.input_dir)?;
    cfg.output_dir = expand_path(&cfg.output_dir)?;
    cfg.validate()?;
    Ok(cfg)
}

fn progress_bar(ctx: &AppContext) -> ProgressBar {
    if ctx.quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Run the whole pipeline against `run`.
pub fn execute(run: &RunContext) -> Result<BuildReport> {
    let cfg = &run.config;
    let input = &cfg.input_dir;
    if !input.is_dir() {
        return Err(ClipseqError::InputNotFound {
            path: input.clone(),
        }
        .into());
    }

    // Canonical roots so an output tree nested in the input is not re-ingested.
    let input = dunce::canonicalize(input)
        .with_context(|| format!("canonicalize {}", input.display()))?;
    let output_inside_input = if cfg.output_dir.exists() {
        let out = dunce::canonicalize(&cfg.output_dir)
            .with_context(|| format!("canonicalize {}", cfg.output_dir.display()))?;
        out.starts_with(&input).then_some(out)
    } else {
        None
    };

    let walker = FileWalker::new(&cfg.ignore_patterns)?.with_follow_symlinks(cfg.follow_symlinks);
    let provider =
        MetadataProvider::new(walker, cfg.hash_contents).excluding(output_inside_input);
    let records = provider.collect(&input, &progress_bar(run.app))?;
    let files_seen = records.len();

    let groups = run.classifier.group(records);
    let files_kept = groups.values().map(Vec::len).sum();
    info!(files_seen, files_kept, extensions = groups.len(), "classified");

    let options = MaterializeOptions {
        skip_first: cfg.skip_first,
        skip_last: cfg.skip_last,
        dry_run: run.app.dry_run,
    };
    let mut materializer = Materializer::new(&run.session, &run.classifier, options);

    let mut extensions = IndexMap::new();
    let mut clips = Vec::new();
    let pb = progress_bar(run.app);
    pb.set_length(files_kept as u64);

    for (ext, list) in groups {
        let capability = run
            .classifier
            .capability(&ext)
            .ok_or_else(|| anyhow::anyhow!("extension .{ext} is outside the allow-set"))?;
        let files = list.len();
        let mode =
            SegmentMode::select(capability, cfg.one_sequence_per_extension, cfg.span_threshold);
        let clip_members = segment(&ext, list, mode)?;
        info!(
            ext = %ext,
            files,
            clips = clip_members.len(),
            first_clip = materializer.next_number(),
            "processing extension"
        );

        pb.set_message(format!("copying .{ext}"));
        let outcomes = materializer.emit_all(&ext, clip_members)?;
        pb.inc(files as u64);

        extensions.insert(
            ext,
            ExtensionSummary {
                capability,
                files,
                clips: outcomes.len(),
            },
        );
        clips.extend(outcomes);
    }
    pb.finish_and_clear();

    Ok(BuildReport {
        session_dir: run.session.allocated().map(PathBuf::from),
        dry_run: run.app.dry_run,
        files_seen,
        files_kept,
        extensions,
        clips,
    })
}

pub fn run(args: BuildArgs, ctx: &AppContext, config: &Config) -> Result<()> {
    let cfg = effective_config(config, &args)?;
    let run = RunContext::new(ctx, cfg, Local::now().date_naive());
    let report = execute(&run)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize build report")?
        );
        return Ok(());
    }

    if !ctx.quiet {
        print_summary(&report, ctx);
    }
    Ok(())
}

#[derive(Tabled)]
struct PlanRow {
    clip: String,
    ext: String,
    files: usize,
    copies: usize,
    target: String,
    #[tabled(rename = "first source")]
    first: String,
}

fn plan_table(report: &BuildReport) -> String {
    let rows = report.clips.iter().map(|c| PlanRow {
        clip: match c.layout {
            Layout::SequenceDir => format!("c{} (seq)", c.number),
            Layout::SingleFile => format!("c{}", c.number),
        },
        ext: c.extension.clone(),
        files: c.members,
        copies: c.copied,
        target: c.target.display().to_string(),
        first: c.first_source.display().to_string(),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

fn print_summary(report: &BuildReport, ctx: &AppContext) {
    let dir = report
        .session_dir
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "(nothing to write)".to_string());

    if report.dry_run {
        let heading = format!("DRY RUN: Would write {} clips into {}", report.clips.len(), dir);
        if ctx.no_color {
            println!("{heading}");
        } else {
            println!("{}", heading.yellow());
        }
        if !report.clips.is_empty() {
            println!("{}", plan_table(report));
        }
        return;
    }

    let mark = if ctx.no_color {
        "✓".to_string()
    } else {
        "✓".green().to_string()
    };
    println!(
        "{} {} clips from {} files into {}",
        mark,
        report.clips.len(),
        report.files_kept,
        dir
    );
    for (ext, summary) in &report.extensions {
        println!(
            "  .{:<5} {:<9} {:>6} files {:>5} clips",
            ext,
            match summary.capability {
                Capability::Sequence => "sequence",
                Capability::Single => "single",
            },
            summary.files,
            summary.clips
        );
    }
    let ignored = report.files_seen - report.files_kept;
    if ignored > 0 {
        println!("  {ignored} files ignored (extension not selected)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() -> Result<()> {
        let config = Config::default();
        let args = BuildArgs {
            input: Some(PathBuf::from("/cards/a")),
            extensions: vec!["dng".into()],
            span_threshold: Some(2.0),
            skip_last: true,
            ..Default::default()
        };
        let cfg = effective_config(&config, &args)?;
        assert_eq!(cfg.input_dir, PathBuf::from("/cards/a"));
        assert_eq!(cfg.output_dir, PathBuf::from("clipseq-out"));
        assert_eq!(cfg.extensions, vec!["dng".to_string()]);
        assert_eq!(cfg.span_threshold, 2.0);
        assert!(cfg.skip_last && !cfg.skip_first);
        Ok(())
    }

    #[test]
    fn negative_threshold_rejected() {
        let args = BuildArgs { span_threshold: Some(-1.0), ..Default::default() };
        assert!(effective_config(&Config::default(), &args).is_err());
    }

    #[test]
    fn invalid_threshold_in_loaded_config_rejected_without_flag() {
        let config = Config { span_threshold: -1.0, ..Config::default() };
        assert!(effective_config(&config, &BuildArgs::default()).is_err());

        let config = Config { span_threshold: f64::NAN, ..Config::default() };
        assert!(effective_config(&config, &BuildArgs::default()).is_err());

        // a valid flag repairs a bad file value
        let args = BuildArgs { span_threshold: Some(3.0), ..Default::default() };
        let config = Config { span_threshold: -1.0, ..Config::default() };
        assert!(effective_config(&config, &args).is_ok());
    }
}
