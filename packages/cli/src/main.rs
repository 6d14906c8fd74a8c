#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census sector resolution from the command line.
//!
//! ```text
//! sector_map resolve-address "Rua Direita, Campos"
//! sector_map resolve-coords -22.9711 -43.1822
//! sector_map batch --kind coordinates pontos.csv [--output setores.csv]
//! ```
//!
//! Results are written as CSV to stdout (or `--output`). `--offline`
//! skips the external geocoder and sector mesh services.
//!
//! Uses `indicatif-log-bridge` (via [`sector_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod csv_io;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use sector_map_cli_utils::IndicatifProgress;
use sector_map_geocoder::service_registry;
use sector_map_geography::reference::ReferenceDataset;
use sector_map_resolver::{EngineConfig, ResolutionRequest, ResolutionResult, Resolver};
use sector_map_resolver_models::QueryKind;

#[derive(Parser)]
#[command(name = "sector_map", about = "Resolve census sectors in Rio de Janeiro state")]
struct Cli {
    /// Skip the external geocoder and sector mesh services
    #[arg(long, global = true)]
    offline: bool,

    /// Engine config file (overrides `SECTOR_MAP_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one free-text address
    ResolveAddress {
        /// Address text
        text: String,
    },
    /// Resolve one latitude/longitude pair
    ResolveCoords {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Resolve every row of a CSV file
    Batch {
        /// Column layout of the input file
        #[arg(long, value_enum)]
        kind: BatchKind,
        /// Input CSV (`id,endereco` or `id,latitude,longitude`)
        input: PathBuf,
        /// Output CSV path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BatchKind {
    Address,
    Coordinates,
}

impl From<BatchKind> for QueryKind {
    fn from(kind: BatchKind) -> Self {
        match kind {
            BatchKind::Address => Self::Address,
            BatchKind::Coordinates => Self::Coordinates,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let multi = sector_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let dataset = Arc::new(ReferenceDataset::embedded()?);

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::from_env()?,
    };

    let resolver = if cli.offline {
        config.pacing_ms = 0;
        Resolver::offline(dataset)
    } else {
        Resolver::new(
            dataset,
            service_registry::build_geocoder()?,
            service_registry::build_sector_lookup()?,
        )
    };

    let resolved = match cli.command {
        Commands::ResolveAddress { text } => {
            resolve_one(&resolver, &ResolutionRequest::address(text)).await?
        }
        Commands::ResolveCoords {
            latitude,
            longitude,
        } => {
            resolve_one(
                &resolver,
                &ResolutionRequest::coordinates(latitude, longitude),
            )
            .await?
        }
        Commands::Batch {
            kind,
            input,
            output,
        } => {
            let requests = csv_io::read_requests(File::open(&input)?, kind.into())?;
            log::info!("Read {} rows from {}", requests.len(), input.display());

            let progress = IndicatifProgress::batch_bar(&multi, "Resolving sectors");
            let results = resolver
                .resolve_batch(&requests, &config, Some(&progress))
                .await?;

            let failed = results.iter().filter(|r| !r.is_success()).count();

            match output {
                Some(path) => {
                    csv_io::write_results(File::create(&path)?, &results)?;
                    log::info!("Wrote {} rows to {}", results.len(), path.display());
                }
                None => write_stdout(&results)?,
            }

            if failed > 0 {
                log::warn!("{failed} of {} rows failed", results.len());
            }
            true
        }
    };

    Ok(if resolved {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Resolves one request and prints it. Returns whether it resolved.
#[allow(clippy::future_not_send)]
async fn resolve_one(
    resolver: &Resolver,
    request: &ResolutionRequest,
) -> Result<bool, Box<dyn std::error::Error>> {
    let result = resolver.resolve(request).await;
    write_stdout(std::slice::from_ref(&result))?;

    if let Some(failure) = &result.failure {
        eprintln!("{}", failure.message);
    }

    Ok(result.is_success())
}

fn write_stdout(results: &[ResolutionResult]) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout().lock();
    csv_io::write_results(&mut stdout, results)?;
    stdout.flush()?;
    Ok(())
}
