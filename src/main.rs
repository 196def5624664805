//! CLI entry point for the IAGOS flight downloader.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use iagos_envri::config::load_file_config;
use iagos_envri::{
    ClientConfig, DeviceFlow, FlightDownloader, HttpClient, ManualTokenSource, TokenSource,
    load_default_file_config,
};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = resolve_config(&args)?;
    debug!(?config, "configuration resolved");

    let client = HttpClient::from_config(&config).context("Failed to initialise HTTP client")?;

    let token_source: Box<dyn TokenSource> = if args.oauth {
        info!("This demonstrates ENVRI-ID token acquisition and introspection by AERIS SSO");
        Box::new(
            DeviceFlow::new(client.clone(), &config)
                .with_notice(|authorization| eprintln!("\n{}\n", authorization.instructions())),
        )
    } else {
        Box::new(ManualTokenSource::stdin())
    };

    let downloader = FlightDownloader::new(client, &config);
    let outcome = downloader
        .download(&args.flight, &config.output_dir, token_source.as_ref())
        .await
        .with_context(|| format!("Failed to download flight {}", args.flight))?;

    // Rejections by the resource server are reported, not raised.
    println!("{outcome}");
    Ok(())
}

fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let file_config = match &args.config {
        Some(path) => Some(load_file_config(path)?),
        None => {
            let loaded = load_default_file_config()?;
            if let (Some(path), Some(_)) = (&loaded.path, &loaded.config) {
                debug!(path = %path.display(), "loaded config file");
            }
            loaded.config
        }
    };

    let config = match &file_config {
        Some(file_config) => ClientConfig::default().with_file_config(file_config),
        None => ClientConfig::default(),
    };
    let config = args.apply_overrides(config);
    config.validate()?;
    Ok(config)
}
