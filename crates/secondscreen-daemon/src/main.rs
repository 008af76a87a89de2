//! `SecondScreen` Daemon
//!
//! Hosts the presentation manager over an NDJSON method channel on
//! stdin/stdout, backed by the simulated platform.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;

use secondscreen_core::config::{self, Config};
use secondscreen_daemon::manager::{ManagerConfig, PresentationManager};
use secondscreen_daemon::platform::HostContext;
use secondscreen_daemon::platform::sim::SimulatedPlatform;
use secondscreen_daemon::server::{self, MethodHandler};

#[derive(Parser, Debug)]
#[command(name = "secondscreen-daemon")]
#[command(version, about = "SecondScreen daemon - secondary display presentation manager")]
struct Args {
    /// Load this config file instead of the global/project hierarchy.
    #[arg(long, env = "SECONDSCREEN_CONFIG")]
    config: Option<PathBuf>,

    /// Project directory searched for `.secondscreen/settings.json`.
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Log level filter for the daemon (e.g. "info", "debug", "warn").
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// External displays the simulated platform starts with.
    #[arg(long)]
    displays: Option<u32>,
}

impl Args {
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = config::load_config_file(path)?;
                config::apply_overrides(&mut config, |key| std::env::var(key).ok());
                config
            }
            None => {
                let project_dir = match &self.project_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir()?,
                };
                config::load_config(Some(&project_dir))?
            }
        };
        if let Some(level) = &self.log_level {
            config.daemon.log_level.clone_from(level);
        }
        if self.log_json {
            config.daemon.log_json = true;
        }
        if let Some(displays) = self.displays {
            config.daemon.simulated_displays = displays;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.resolve_config()?;

    let log_filter =
        secondscreen_core::tracing_init::filter_for(env!("CARGO_PKG_NAME"), &config.daemon.log_level);
    secondscreen_core::tracing_init::init_tracing(&log_filter, config.daemon.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        displays = config.daemon.simulated_displays,
        entrypoint = %config.presentation.entrypoint,
        "Starting secondscreen-daemon"
    );

    let sim = SimulatedPlatform::with_external_displays(config.daemon.simulated_displays);
    let (manager, notifications) =
        PresentationManager::new(sim.platform(), ManagerConfig::from(&config.presentation));
    let manager = Arc::new(manager);

    let (outbound_tx, outbound_rx) = mpsc::channel(config.presentation.notification_capacity.max(1));
    let handler = MethodHandler::new(Arc::clone(&manager), outbound_tx);
    let forwarder = handler.forward_notifications(notifications);

    let host = HostContext::new(format!("host-{}", uuid::Uuid::new_v4()));
    manager.attach_host(host).await;

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let sigterm_future = sigterm.recv();
    #[cfg(not(unix))]
    let sigterm_future = std::future::pending::<Option<()>>();

    info!("Method channel ready on stdio");

    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C shutdown signal"),
            _ = sigterm_future => info!("Received SIGTERM shutdown signal"),
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let served = server::run(&handler, stdin, stdout, outbound_rx, shutdown).await;
    forwarder.abort();
    served?;

    info!("Daemon stopped");
    Ok(())
}
