use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "clipseq")]
#[command(
    about = "Sort camera dumps into dated session folders, grouping bursts and split clips by capture timing"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without touching the filesystem
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Config file to use instead of ./clipseq.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Group camera files into clips and copy them into a new session directory
    Build(BuildArgs),

    /// Losslessly join split video fragments that share a group id
    Concat(ConcatArgs),

    /// Initialize a clipseq.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug, Default)]
pub struct BuildArgs {
    /// Directory to scan for camera files
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Root directory for dated session directories
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only process these extensions (repeatable, e.g. --ext jpg --ext mp4)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Max difference between consecutive gaps (seconds) inside one clip
    #[arg(long, value_name = "SECS")]
    pub span_threshold: Option<f64>,

    /// Put every file of a sequence extension into a single clip
    #[arg(long)]
    pub one_sequence: bool,

    /// Do not copy the first frame of multi-file clips
    #[arg(long)]
    pub skip_first: bool,

    /// Do not copy the last frame of multi-file clips
    #[arg(long)]
    pub skip_last: bool,

    /// Compute blake3 digests of input files (reported only)
    #[arg(long)]
    pub hash: bool,

    /// Emit the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ConcatArgs {
    /// Folder holding the split fragments
    pub folder: PathBuf,

    /// Copy joined files into a new session directory under this root
    #[arg(long, value_name = "ROOT")]
    pub to: Option<PathBuf>,

    /// Keep *.THM thumbnails
    #[arg(long)]
    pub keep_thumbnails: bool,

    /// Keep *.LRV low-resolution proxies
    #[arg(long)]
    pub keep_low_res: bool,

    /// Transcoder executable (default from config: ffmpeg)
    #[arg(long)]
    pub transcoder: Option<String>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
