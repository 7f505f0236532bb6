use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sighting_graphs::Config;

#[derive(Parser, Debug)]
#[command(
    name = "sighting-graphs",
    about = "Render per-year sighting-rate bar charts from a survey spreadsheet"
)]
struct Cli {
    /// Settings file (TOML).
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory the PNG is written to; created when missing.
    #[arg(long, default_value = "graphs")]
    output_dir: PathBuf,

    /// Use this sheet instead of the configured one.
    #[arg(long)]
    sheet: Option<String>,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(sheet) = cli.sheet {
        config = config.with_sheet(sheet);
    }
    info!(
        spreadsheet = %config.source.spreadsheet.display(),
        sheet = %config.source.sheet_name,
        "starting"
    );

    let path = sighting_graphs::run(&config, &cli.output_dir).with_context(|| {
        format!(
            "graphing sheet '{}' of {}",
            config.source.sheet_name,
            config.source.spreadsheet.display()
        )
    })?;

    println!("Image successfully saved to {}", path.display());
    Ok(())
}
