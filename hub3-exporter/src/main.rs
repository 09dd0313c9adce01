//! Prometheus exporter for Hub3 cable modems.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use hub3_exporter::config::LogFormat;
use hub3_exporter::{ExporterConfig, HttpServer, ScrapeCollector};
use hub3_modem::{ChannelAggregator, Compatibility, ModemClient};

/// Prometheus exporter for Hub3 cable modems.
#[derive(Parser, Debug)]
#[command(name = "hub3-exporter")]
#[command(about = "Export Hub3 cable modem DOCSIS channel metrics to Prometheus")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Modem IP address or base URL (overrides config).
    #[arg(long)]
    modem_ip: Option<String>,

    /// Scrape timeout in milliseconds (overrides config).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Path to expose metrics on (overrides config).
    #[arg(long)]
    metrics_path: Option<String>,

    /// Output compatibility mode: legacy or corrected (overrides config).
    #[arg(long)]
    compatibility: Option<Compatibility>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut ExporterConfig) {
        if let Some(address) = self.modem_ip {
            config.modem.address = address;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.modem.timeout_ms = timeout_ms;
        }
        if let Some(listen) = self.listen {
            config.prometheus.listen = listen;
        }
        if let Some(path) = self.metrics_path {
            config.prometheus.path = path;
        }
        if let Some(compatibility) = self.compatibility {
            config.modem.compatibility = compatibility;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };
    args.apply(&mut config);
    config.validate()?;

    // Initialize logging
    let log_level = config.logging.level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("hub3_exporter={}", log_level).parse()?)
        .add_directive(format!("hub3_modem={}", log_level).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        modem = %config.modem.address,
        timeout_ms = config.modem.timeout_ms,
        compatibility = config.modem.compatibility.as_str(),
        "Starting Hub3 exporter"
    );

    // Create the aggregator and collector
    let client = ModemClient::new(&config.modem.address, config.modem.timeout())?;
    let aggregator = Arc::new(ChannelAggregator::new(
        client,
        config.modem.compatibility,
    ));
    let collector = Arc::new(ScrapeCollector::new(
        aggregator.clone(),
        &config.prometheus,
    ));

    // Parse listen address
    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(collector, listen_addr, config.prometheus.path.clone());
    let mut http_task = tokio::spawn(async move { http_server.run(shutdown_rx).await });

    // Wait for shutdown signal, or for the server to stop on its own
    tokio::select! {
        result = &mut http_task => {
            return match result {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("HTTP server task failed: {}", e)),
            };
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    // Print final stats
    let stats = aggregator.stats();
    info!(
        cycles = stats.cycles,
        failed_cycles = stats.failed_cycles,
        entries_applied = stats.entries_applied,
        channels_discovered = stats.channels_discovered,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

/// Resolve when the process receives SIGTERM.
async fn terminate() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
