//! Connector hub daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   connector-hub.toml ──▶ config::loader ──▶ lifecycle::startup
//!          │                                        │
//!          │ (notify)                               ▼
//!          └──▶ config::watcher ──▶ reload ──▶ ConnectorRegistry ──▶ Connector ──▶ remote services
//!                                                   │   ▲
//!                                       health tick │   │ status events
//!                                                   ▼   │
//!                                      admin API ◀──┴───┴──▶ logs / metrics
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use connector_hub::admin::{setup_admin_router, AdminState};
use connector_hub::config::loader::load_config;
use connector_hub::config::watcher::ConfigWatcher;
use connector_hub::lifecycle::signals::wait_for_shutdown_signal;
use connector_hub::lifecycle::startup::{apply_reload, register_services};
use connector_hub::observability::{logging, metrics};
use connector_hub::{ConnectorRegistry, ConnectorValidator, Shutdown};

#[derive(Parser)]
#[command(name = "connector-hub")]
#[command(about = "Supervises connectors to remote services", long_about = None)]
struct Args {
    /// Path to the hub configuration file.
    #[arg(short, long, default_value = "connector-hub.toml")]
    config: PathBuf,

    /// Do not reload the configuration when the file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        services = config.services.len(),
        "connector-hub starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = ConnectorRegistry::new();
    registry.subscribe(|service_id, status| {
        tracing::info!(service_id = %service_id, status = %status, "Service status changed");
    });
    register_services(&registry, &config).await;

    let shutdown = Shutdown::new();

    if config.admin.enabled {
        let state = AdminState::new(
            registry.clone(),
            Arc::new(ConnectorValidator::new()),
            &config.admin.api_key,
        );
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let server = axum::serve(listener, setup_admin_router(state))
                .with_graceful_shutdown(async move { stop.recv().await });
            if let Err(e) = server.await {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    // The watcher stops when dropped; keep it for the life of the daemon.
    let _watcher = if args.no_watch {
        None
    } else {
        let (watcher, mut updates) = ConfigWatcher::new(&args.config);
        let registry = registry.clone();
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(new_config) = updates.recv() => {
                        apply_reload(&registry, &new_config).await;
                    }
                    _ = stop.recv() => break,
                }
            }
        });
        match watcher.run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                None
            }
        }
    };

    wait_for_shutdown_signal().await;
    tracing::info!("Shutting down");

    shutdown.trigger();
    registry.stop_all_connectors();

    tracing::info!("Shutdown complete");
    Ok(())
}
