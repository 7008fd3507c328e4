use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use marblewalk::Config;

#[derive(Parser)]
#[command(name = "marblewalk", about = "Walk around a model on a marble floor")]
struct Cli {
    /// TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to load (OBJ or STL), overriding the config
    #[arg(long)]
    model: Option<PathBuf>,

    /// Floor texture image, overriding the config
    #[arg(long)]
    floor_texture: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,marblewalk=debug,wgpu_hal=off,wgpu_core=off,wgpu=off,naga=off"
    } else {
        "info,marblewalk=info,wgpu_hal=off,wgpu_core=off,wgpu=off,naga=off"
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .try_init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(model) = cli.model {
        config = config.model(model);
    }
    if let Some(texture) = cli.floor_texture {
        config = config.floor_texture(texture);
    }
    config.validate().context("invalid config")?;

    marblewalk::run(config).context("viewer stopped")?;
    Ok(())
}
