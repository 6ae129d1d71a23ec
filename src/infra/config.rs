use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::segment::DEFAULT_SPAN_THRESHOLD;

/// Config files probed in the working directory, first hit wins.
pub const CONFIG_FILE_NAMES: [&str; 4] =
    ["clipseq.toml", "clipseq.yaml", "clipseq.json", ".clipseq.toml"];

/// Environment prefix; nested keys use `__` (e.g. `CLIPSEQ_CONCAT__TRANSCODER`).
pub const ENV_PREFIX: &str = "CLIPSEQ";

/// Keys whose environment values are split on `,`.
const LIST_KEYS: [&str; 4] = [
    "extensions",
    "sequence_extensions",
    "single_extensions",
    "ignore_patterns",
];

/// Every recognised option. Resolved once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned for camera files
    pub input_dir: PathBuf,

    /// Root under which dated session directories are allocated
    pub output_dir: PathBuf,

    /// Narrow processing to these extensions (empty = every known extension)
    pub extensions: Vec<String>,

    /// Extensions that may be merged into multi-file clips
    pub sequence_extensions: Vec<String>,

    /// Extensions always materialized one file per clip
    pub single_extensions: Vec<String>,

    /// Max tolerated difference between consecutive gaps, in seconds
    pub span_threshold: f64,

    /// Collapse every file of a sequence extension into one clip
    pub one_sequence_per_extension: bool,

    /// Leave out the first frame of multi-file clips
    pub skip_first: bool,

    /// Leave out the last frame of multi-file clips
    pub skip_last: bool,

    /// Compute blake3 digests of every input file
    pub hash_contents: bool,

    /// Follow symlinks while walking the input
    pub follow_symlinks: bool,

    /// Extra globs (relative to the input root) excluded from the walk
    pub ignore_patterns: Vec<String>,

    /// Fragment concatenation settings
    pub concat: ConcatConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatConfig {
    /// Regex applied to file names; capture group 1 is the fragment group id
    pub fragment_pattern: String,

    /// Transcoder executable
    pub transcoder: String,

    /// Input timestamp scale passed as `-itsscale` (omitted when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_scale: Option<f64>,

    /// Delete `*.THM` thumbnails after concatenating
    pub remove_thumbnails: bool,

    /// Delete `*.LRV` low-resolution proxies after concatenating
    pub remove_low_res: bool,

    /// Output file name prefix, followed by the group id
    pub output_name_prefix: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("clipseq-out"),
            extensions: Vec::new(),
            sequence_extensions: strings(&["jpg", "jpeg", "png", "dng", "ori", "orf"]),
            single_extensions: strings(&["mov", "mp4", "lrv"]),
            span_threshold: DEFAULT_SPAN_THRESHOLD,
            one_sequence_per_extension: false,
            skip_first: false,
            skip_last: false,
            hash_contents: false,
            follow_symlinks: false,
            ignore_patterns: strings(&["**/.DS_Store", "**/Thumbs.db"]),
            concat: ConcatConfig::default(),
        }
    }
}

impl Default for ConcatConfig {
    fn default() -> Self {
        Self {
            fragment_pattern: r"GX\d\d(\d+)\.".to_string(),
            transcoder: "ffmpeg".to_string(),
            time_scale: Some(0.4166666666666667),
            remove_thumbnails: true,
            remove_low_res: true,
            output_name_prefix: "GXA".to_string(),
        }
    }
}

impl Config {
    /// Reject values the pipeline cannot run with, whichever layer set them.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.span_threshold.is_finite() && self.span_threshold >= 0.0,
            "span_threshold must be a non-negative number of seconds, got {}",
            self.span_threshold
        );
        Ok(())
    }
}

/// Expand `~` and `$VAR` in a user-supplied path.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {}", path.display()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// First config file present in `dir`, in `CONFIG_FILE_NAMES` order.
pub fn discover_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Load configuration: defaults, then a config file (explicit or discovered
/// in the working directory), then `CLIPSEQ_*` environment variables.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let file = match explicit {
        Some(p) => Some(expand_path(p)?),
        None => discover_config_file(Path::new(".")),
    };
    build_config(file.as_deref(), None)
}

/// Merge the layers. `env` replaces the process environment when given.
pub fn build_config(
    file: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<Config> {
    let defaults =
        config::Config::try_from(&Config::default()).context("Failed to seed config defaults")?;
    let mut builder = config::Config::builder().add_source(defaults);

    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let mut environment = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    for key in LIST_KEYS {
        environment = environment.with_list_parse_key(key);
    }
    builder = builder.add_source(environment.source(env));

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;
    parsed.validate()?;

    Ok(parsed)
}

pub fn init(args: InitArgs, ctx: &AppContext) -> Result<()> {
    let config_path = args.path.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run {
        if !ctx.quiet {
            println!("DRY RUN: Would write {}:\n{}", config_path.display(), toml_string);
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        let mut map = config::Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        map
    }

    #[test]
    fn defaults_survive_empty_layers() -> Result<()> {
        let cfg = build_config(None, Some(env(&[])))?;
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.span_threshold, 5.0);
        assert!(cfg.sequence_extensions.contains(&"orf".to_string()));
        assert!(cfg.single_extensions.contains(&"lrv".to_string()));
        Ok(())
    }

    #[test]
    fn file_overrides_defaults_and_env_overrides_file() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("clipseq.toml");
        std::fs::write(
            &path,
            "span_threshold = 2.0\nskip_first = true\n\n[concat]\ntranscoder = \"/opt/ffmpeg\"\n",
        )?;

        let cfg = build_config(Some(&path), Some(env(&[])))?;
        assert_eq!(cfg.span_threshold, 2.0);
        assert!(cfg.skip_first);
        assert_eq!(cfg.concat.transcoder, "/opt/ffmpeg");
        // untouched keys keep their defaults
        assert_eq!(cfg.concat.output_name_prefix, "GXA");
        assert!(!cfg.skip_last);

        let cfg = build_config(
            Some(&path),
            Some(env(&[
                ("CLIPSEQ_SPAN_THRESHOLD", "7.5"),
                ("CLIPSEQ_EXTENSIONS", "jpg,mp4"),
                ("CLIPSEQ_CONCAT__REMOVE_LOW_RES", "false"),
                ("UNRELATED_SPAN_THRESHOLD", "1.0"),
            ])),
        )?;
        assert_eq!(cfg.span_threshold, 7.5);
        assert_eq!(cfg.extensions, vec!["jpg".to_string(), "mp4".to_string()]);
        assert!(!cfg.concat.remove_low_res);
        assert!(cfg.skip_first);
        Ok(())
    }

    #[test]
    fn bad_threshold_from_any_layer_is_rejected() -> Result<()> {
        let err = build_config(None, Some(env(&[("CLIPSEQ_SPAN_THRESHOLD", "-1")])));
        assert!(err.is_err());
        let err = build_config(None, Some(env(&[("CLIPSEQ_SPAN_THRESHOLD", "NaN")])));
        assert!(err.is_err());

        let tmp = TempDir::new()?;
        let path = tmp.path().join("clipseq.toml");
        std::fs::write(&path, "span_threshold = -0.5\n")?;
        assert!(build_config(Some(&path), Some(env(&[]))).is_err());

        // zero is a legal (strict) threshold
        let cfg = build_config(None, Some(env(&[("CLIPSEQ_SPAN_THRESHOLD", "0")])))?;
        assert_eq!(cfg.span_threshold, 0.0);
        Ok(())
    }

    #[test]
    fn discovery_prefers_first_name() -> Result<()> {
        let tmp = TempDir::new()?;
        assert_eq!(discover_config_file(tmp.path()), None);

        std::fs::write(tmp.path().join(".clipseq.toml"), "")?;
        std::fs::write(tmp.path().join("clipseq.toml"), "")?;
        assert_eq!(
            discover_config_file(tmp.path()),
            Some(tmp.path().join("clipseq.toml"))
        );
        Ok(())
    }

    #[test]
    fn init_writes_parseable_defaults_once() -> Result<()> {
        let tmp = TempDir::new()?;
        let ctx = AppContext { quiet: true, no_color: true, dry_run: false };
        let args = || InitArgs { path: tmp.path().to_path_buf(), force: false };

        init(args(), &ctx)?;
        let written = tmp.path().join("clipseq.toml");
        let cfg = build_config(Some(&written), Some(env(&[])))?;
        assert_eq!(cfg, Config::default());

        assert!(init(args(), &ctx).is_err());
        init(InitArgs { path: tmp.path().to_path_buf(), force: true }, &ctx)?;
        Ok(())
    }
}
