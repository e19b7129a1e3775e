mod context;
mod enrich;
mod synth;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use netward_api::ApiState;
use netward_core::NetwardConfig;

use context::PipelineContext;
use synth::SyntheticTraffic;

#[derive(Parser, Debug)]
#[command(name = "netward", version, about = "Netward — Preemptive Network Defense Pipeline")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "netward.toml")]
    config: String,

    /// Log level (overrides config file)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Generate a default config file and exit
    #[arg(long)]
    generate_config: bool,

    /// Dry-run: load config, validate, print report, exit
    #[arg(long)]
    dry_run: bool,

    /// Enforcement API bind address (overrides config file)
    #[arg(long)]
    bind: Option<String>,

    /// Data directory (overrides config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Issue real firewall commands instead of logging them
    #[arg(long)]
    live: bool,

    /// Feed the pipeline synthetic traffic
    #[arg(long)]
    synthetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Generate Config ──────────────────────────────────────────────
    if cli.generate_config {
        let config = NetwardConfig::default();
        config.save(&cli.config)?;
        println!("Default configuration written to {}", cli.config);
        return Ok(());
    }

    // ── Load Config ──────────────────────────────────────────────────
    let mut config = NetwardConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: {}, using defaults", e);
        NetwardConfig::default()
    });
    if let Some(ref dir) = cli.data_dir {
        config.general.data_dir = dir.clone();
    }
    if let Some(ref bind) = cli.bind {
        config.api.bind = bind.clone();
    }

    let log_level = cli.log_level.as_deref().unwrap_or(&config.general.log_level);

    // ── Tracing ──────────────────────────────────────────────────────
    let level = match log_level {
        "trace" => Level::TRACE, "debug" => Level::DEBUG,
        "warn" => Level::WARN, "error" => Level::ERROR, _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Netward v{}", env!("CARGO_PKG_VERSION"));
    info!(data_dir = %config.general.data_dir, "Data directory");

    let live = cli.live || config.response.live_enforcement;
    let pipeline = Arc::new(PipelineContext::new(&config, live)?);

    // ── Dry Run ──────────────────────────────────────────────────────
    if cli.dry_run {
        info!(
            blocked = pipeline.blocklist.len(),
            outcomes = pipeline.outcome_log.len(),
            thresholds = ?pipeline.rolling.estimator.thresholds(),
            "State report"
        );
        info!("Dry-run complete. Configuration valid.");
        return Ok(());
    }

    // ── Enforcement API ──────────────────────────────────────────────
    let api_state = Arc::new(ApiState {
        engine: pipeline.engine.clone(),
        gate: pipeline.gate,
    });
    let bind = config.api.bind.clone();
    tokio::spawn(async move {
        if let Err(e) = netward_api::serve(&bind, api_state).await {
            error!(error = %e, "Enforcement API failed");
        }
    });
    info!(bind = %config.api.bind, "Enforcement API started");

    // ── Auto-Expiry ──────────────────────────────────────────────────
    let _expiry_handle = pipeline.expiry.clone().start(config.expiry.sweep_interval_secs);
    info!(
        interval = config.expiry.sweep_interval_secs,
        "Auto-expiry scheduler started"
    );

    // ── Synthetic Traffic ────────────────────────────────────────────
    if cli.synthetic {
        let producer = pipeline.clone();
        let interval = config.capture.tick_interval_secs;
        tokio::spawn(async move {
            let traffic = SyntheticTraffic::new();
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
            loop {
                ticker.tick().await;
                let now_ms = chrono::Utc::now().timestamp_millis();
                producer.submit(traffic.next_batch(now_ms));
            }
        });
        info!("Synthetic traffic generator started");
    }

    // ── Pipeline ─────────────────────────────────────────────────────
    let _tick_handle = pipeline.clone().start(config.capture.tick_interval_secs);
    info!(
        interval = config.capture.tick_interval_secs,
        "Pipeline tick loop started"
    );

    info!("Netward running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down Netward...");

    // ── Graceful Shutdown ────────────────────────────────────────────
    pipeline.stop();
    pipeline.expiry.stop();
    info!(
        ticks = pipeline.ticks_completed(),
        decisions = pipeline.engine.decisions(),
        failures = pipeline.engine.failures(),
        sweeps = pipeline.expiry.sweeps_completed(),
        reversals = pipeline.expiry.reversals_issued(),
        blocked = pipeline.blocklist.len(),
        events_published = pipeline.bus.total_published(),
        "Shutdown complete"
    );

    Ok(())
}
