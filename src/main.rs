use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use a3s_fleet::{
    Coordinator, EventBusFactory, FleetConfig, MemoryEventBus, NatsEventBusFactory, Result,
    SharedEventBus,
};

#[derive(Parser)]
#[command(
    name = "a3s-fleet",
    about = "a3s-fleet: simulate a fleet of providers publishing their location"
)]
struct Cli {
    /// Path to the fleet config
    #[arg(short, long, default_value = "fleet.hcl")]
    file: PathBuf,

    /// Number of providers (overrides fleet.providers)
    #[arg(short = 'n', long)]
    providers: Option<usize>,

    /// Publish to an in-memory bus instead of NATS
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many milliseconds instead of waiting for Enter
    #[arg(long)]
    run_for: Option<u64>,

    /// Log level (overrides fleet.log_level)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = FleetConfig::load(&cli.file);
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.fleet.log_level.clone()))
        .unwrap_or_else(|| "info".into());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "[a3s-fleet]".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: FleetConfig) -> Result<()> {
    let pool_size = cli.providers.unwrap_or(config.fleet.providers);

    let factory: Arc<dyn EventBusFactory> = if cli.dry_run {
        Arc::new(SharedEventBus::new(MemoryEventBus::new(10_000)))
    } else {
        Arc::new(NatsEventBusFactory::new(config.nats.clone()))
    };

    let coordinator = Coordinator::spawn(config.coordinator_config());

    tracing::info!(pool_size, dry_run = cli.dry_run, "Starting publishing...");
    let started = Instant::now();

    coordinator.start(pool_size, factory).await?;

    match cli.run_for {
        Some(ms) => println!(
            "{} {} providers publishing for {}ms (Ctrl-C to stop early)",
            "→".cyan(),
            pool_size,
            ms
        ),
        None => println!(
            "{} {} providers publishing, press Enter or Ctrl-C to stop",
            "→".cyan(),
            pool_size
        ),
    }

    wait_for_stop(cli.run_for).await?;

    tracing::info!("Stopping publishing...");
    let report = coordinator.stop_report().await?;
    let elapsed = started.elapsed();
    coordinator.shutdown().await?;

    println!(
        "{} Published {} events in {}ms",
        "✓".green(),
        report.events_published,
        elapsed.as_millis()
    );
    if report.publish_failures > 0 {
        println!(
            "  {} {} publishes failed",
            "!".yellow(),
            report.publish_failures
        );
    }
    if report.missing > 0 {
        println!(
            "  {} {} providers did not report",
            "!".yellow(),
            report.missing
        );
    }

    Ok(())
}

async fn wait_for_stop(run_for: Option<u64>) -> Result<()> {
    match run_for {
        Some(ms) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                res = tokio::signal::ctrl_c() => res?,
            }
        }
        None => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            tokio::select! {
                line = lines.next_line() => { line?; }
                res = tokio::signal::ctrl_c() => res?,
            }
        }
    }
    Ok(())
}
