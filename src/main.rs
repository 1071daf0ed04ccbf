//! `devdeck` — embedded dev console for event-bus applications.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use devdeck::assets::StaticFiles;
use devdeck::bus::EventBus;
use devdeck::cli::{Cli, Settings};
use devdeck::console::{ConsoleConfig, ConsoleService};
use devdeck::error::{ExitCode, Result};
use devdeck::host::{Heartbeat, Host, ProcStats, Service};
use devdeck::http::bridge::{BridgeConfig, HttpBridge};
use devdeck::observability::{LogForwarder, init_logging};
use devdeck::observability::metrics::init_metrics;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::resolve(&cli)?;

    let bus = Arc::new(EventBus::new());
    if !cli.quiet {
        init_logging(cli.log_format.into(), cli.verbose, Some(Arc::clone(&bus)));
    }
    init_metrics(settings.metrics_port)?;

    // A failing asset directory aborts startup.
    let assets = match settings.assets_dir.as_deref() {
        Some(dir) => StaticFiles::from_dir(dir)?,
        None => StaticFiles::embedded(),
    };

    let host = Host::new(Arc::clone(&bus), Arc::new(ProcStats::new()));
    host.install(Arc::new(LogForwarder))?;
    host.install(Arc::new(Heartbeat::new(settings.heartbeat_interval)))?;

    let cancel = CancellationToken::new();
    let bridge = HttpBridge::bind(
        Arc::clone(&bus),
        BridgeConfig {
            bind_addr: settings.bind.clone(),
            ..BridgeConfig::default()
        },
        cancel.clone(),
    )
    .await?;
    let console_url = format!("http://{}/dev-console{}", bridge.local_addr(), settings.ui_path);
    host.install(bridge as Arc<dyn Service>)?;

    let console = ConsoleService::new(
        ConsoleConfig::new(settings.ui_path, settings.max_events, settings.max_logs),
        assets,
    );
    host.install(console as Arc<dyn Service>)?;

    info!(url = %console_url, "dev console ready");

    shutdown_signal().await;
    eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
    tokio::spawn(async {
        let _ = tokio::signal::ctrl_c().await;
        std::process::exit(ExitCode::INTERRUPTED);
    });

    host.shutdown();
    cancel.cancel();
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
