use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::{
    app::App,
    config::{self, ArtConfig, Config, HttpConfig},
    http::server::ArtServer,
    ingest::{decoder::decode, framer::Framer},
};

#[derive(Parser)]
#[command(name = "shairport-notifier")]
#[command(version = "0.1")]
#[command(about = "Announces the track playing on a shairport-sync receiver")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the metadata stream and announce tracks
    Run {
        /// Metadata pipe or file to read instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Print every decoded metadata item, without announcing anything
    Decode {
        /// Metadata pipe or file to read instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Only run the http server hosting cover art
    Serve,
}

fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.to_string_lossy()))?,
        )),
        None => Box::new(io::stdin().lock()),
    })
}

fn art_server(cfg: &Config) -> Option<ArtServer> {
    match (&cfg.art, &cfg.http) {
        (Some(ArtConfig::Local { dir, .. }), Some(http)) => {
            Some(ArtServer::new(dir.clone(), HttpConfig::clone(http)))
        }
        _ => None,
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    match &cli.command {
        Commands::Run { input } => {
            let cfg = config::Config::load(&cli.config.to_string_lossy())?;

            if let Some(server) = art_server(&cfg) {
                std::thread::Builder::new()
                    .name("art-http".into())
                    .spawn(move || server.run())
                    .context("failed to start art server")?;
            } else if cfg.http.is_some() {
                log::warn!("[http] is set but art is not stored locally, not serving art");
            }

            let app = App::from_config(&cfg)?;
            let report = app.run(open_input(input.as_deref())?)?;
            log::info!(
                "done: {} records, {} routed, {} ignored, {} unroutable, {} malformed",
                report.records,
                report.routed,
                report.ignored,
                report.unroutable,
                report.malformed
            );
        }

        Commands::Decode { input } => {
            for raw in Framer::new(open_input(input.as_deref())?) {
                match raw.and_then(|raw| decode(&raw)) {
                    Ok(record) => println!("{record}"),
                    Err(e) => log::error!("{e}"),
                }
            }
        }

        Commands::Serve => {
            let cfg = config::Config::load(&cli.config.to_string_lossy())?;
            let Some(server) = art_server(&cfg) else {
                bail!("serve needs [http] and a local [art] store in the config");
            };
            println!(
                "Art server running at http://{}:{}",
                server.config.bind_addr, server.config.port
            );
            server.run();
        }
    }

    Ok(())
}
