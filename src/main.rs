use anyhow::Result;
use clap::Parser;
use clipseq::cli::{AppContext, Cli, Commands};
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

/// Logs go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(quiet: bool, no_color: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.no_color);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Build(args) => clipseq::build_run(args, &ctx, &clipseq::load_config(config_file)?),
        Commands::Concat(args) => {
            clipseq::concat_run(args, &ctx, &clipseq::load_config(config_file)?)
        }
        Commands::Init(args) => clipseq::infra::config_init(args, &ctx),
        Commands::Completions(args) => clipseq::completion::run(args, &ctx),
    }
}
