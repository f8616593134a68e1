pub mod config;
pub mod csv_loader;
pub mod error;
pub mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use common::error::Error as ArbSolverError;
use csv_loader::{CsvLoader, Snapshot};
use error::Error;
use fx_arb_core::{ArbitrageEngine, build_graph_with_policy};

/// Detect currency arbitrage and best conversion rates in a rate snapshot.
#[derive(Parser, Debug)]
#[command(name = "fx-arb", version, about)]
struct Args {
    /// CSV of directed rates with columns `from,to,rate`
    #[arg(long, required_unless_present = "quotes", conflicts_with = "quotes")]
    rates: Option<PathBuf>,

    /// CSV of quotes against one base currency with columns `currency,rate`
    #[arg(long)]
    quotes: Option<PathBuf>,

    /// Base currency of the quotes file (overrides the config file)
    #[arg(long)]
    base: Option<String>,

    /// Currency to search from (not needed for a plain `--global` scan)
    #[arg(long, required_unless_present = "global")]
    source: Option<String>,

    /// Currency to convert into when no arbitrage is found
    #[arg(long, requires = "source")]
    target: Option<String>,

    /// Search every component instead of only loops reachable from the source
    #[arg(long)]
    global: bool,

    /// Configuration file (defaults to crates/executor/Config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "query failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let config = config::load_config(args.config.as_deref())?;

    let snapshot = load_snapshot(&args, &config)?;
    let graph = build_graph_with_policy(
        snapshot.currencies.as_slice(),
        &snapshot.rates,
        config.engine,
    )?;
    info!(
        currencies = graph.num_nodes(),
        edges = graph.num_edges(),
        "rate graph ready"
    );

    let engine = ArbitrageEngine::default();
    let arbitrages = match (args.global, args.source.as_deref()) {
        (true, _) => engine.detect_global(&graph)?,
        (false, Some(source)) => engine.detect(&graph, source)?,
        (false, None) => return Err(Error::ConfigLoadError("--source is required".to_string())),
    };
    println!("{}", report::render_arbitrage(&arbitrages));

    let (Some(source), Some(target)) = (args.source.as_deref(), args.target.as_deref()) else {
        return Ok(());
    };

    match engine.best_conversion(&graph, source, target) {
        Ok(conversion) => println!("{}", report::render_conversion(&conversion)),
        Err(ArbSolverError::NoPathFound { from, to }) => {
            let reason = match (arbitrages.is_empty(), args.global) {
                (true, _) => "target unreachable",
                (false, false) => "arbitrage present",
                (false, true) => "target unreachable or arbitrage reachable from source",
            };
            println!("No path found from {} to {} ({}).", from, to, reason);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn load_snapshot(args: &Args, config: &config::Config) -> Result<Snapshot, Error> {
    match (&args.rates, &args.quotes) {
        (Some(path), _) => CsvLoader::new(path).load_rates(),
        (None, Some(path)) => {
            let base = args.base.as_deref().unwrap_or(&config.query.base);
            CsvLoader::new(path).load_quotes(base)
        }
        (None, None) => Err(Error::ConfigLoadError(
            "either --rates or --quotes is required".to_string(),
        )),
    }
}
