// swcache - versioned multi-strategy offline cache controller
// Author: kelexine (https://github.com/kelexine)

use anyhow::{bail, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use swcache::cache::{CacheStorage, DiskStorage, MemoryStorage};
use swcache::cli::Args;
use swcache::config::{AppConfig, StorageBackend};
use swcache::platform::HttpPlatform;
use swcache::server::create_router;
use swcache::utils::logging;
use swcache::worker::{RegisterOutcome, Registration};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting swcache v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Open cache storage
    let storage: Arc<dyn CacheStorage> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory cache storage");
            Arc::new(MemoryStorage::new())
        }
        StorageBackend::Disk => {
            info!("Using disk cache storage at {}", config.storage.path);
            Arc::new(DiskStorage::new(&config.storage.path))
        }
    };

    // Phase 4: Register the configured generation
    let scope = config.scope_url()?;
    let platform = Arc::new(HttpPlatform::new(&config.upstream, storage)?);
    let registration = Arc::new(Registration::new(platform, scope.clone()));

    info!("Registering generation {} for {}", config.worker.version, scope);
    match registration.register(config.worker.clone()).await {
        Ok(RegisterOutcome::Activated { version, report }) => {
            info!(
                "Generation {} active ({} stale partition(s) removed)",
                version,
                report.deleted.len()
            );
        }
        Ok(outcome) => info!("Registration outcome: {:?}", outcome),
        Err(e) if args.install_only => bail!("install failed: {}", e),
        Err(e) => {
            // Serve pass-through; POST /__sw/update retries
            error!("Install failed, passing requests through: {}", e);
        }
    }

    if args.install_only {
        info!("Install complete, exiting");
        return Ok(());
    }

    // Phase 5: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(config, args.config, registration)?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
