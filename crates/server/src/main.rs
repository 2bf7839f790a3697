use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use episodic_core::{
    load_config, validate_config, AcquisitionContext, AcquisitionOrchestrator, EpisodeStore,
    FeedSource, HttpPayloadFetcher, MetadataLookup, PayloadFetcher, QBittorrentClient,
    RssFeedSource, ShowRegistry, SqliteEpisodeStore, TmdbLookup, TorrentClient,
    TransmissionClient,
};
use episodic_core::config::TorrentClientBackend;

use episodic_server::{create_router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("EPISODIC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Resolve shows; invalid ones are reported but do not stop the daemon
    let shows = Arc::new(ShowRegistry::from_config(&config));
    for invalid in shows.invalid() {
        error!(show = %invalid.key, reason = %invalid.reason, "Invalid show configuration");
    }
    if shows.shows().next().is_none() {
        warn!("No valid shows configured; discovery passes will do nothing");
    }
    info!("{} show(s) configured", shows.len());

    // Create SQLite episode store
    let store: Arc<dyn EpisodeStore> = Arc::new(
        SqliteEpisodeStore::new(&config.database.path)
            .context("Failed to create episode store")?,
    );
    info!("Episode store initialized");

    // Feed source
    let feed: Arc<dyn FeedSource> =
        Arc::new(RssFeedSource::new(&config.feed).context("Failed to create feed source")?);
    info!("Feed source: {}", config.feed.url_template);

    // Metadata lookup
    let tmdb_config = config
        .metadata
        .as_ref()
        .and_then(|m| m.tmdb.as_ref())
        .ok_or_else(|| anyhow!("A [metadata.tmdb] section is required"))?;
    let metadata: Arc<dyn MetadataLookup> =
        Arc::new(TmdbLookup::new(tmdb_config).context("Failed to create TMDB lookup")?);
    info!("Initialized TMDB metadata lookup");

    // Payload fetcher
    let payloads: Arc<dyn PayloadFetcher> = Arc::new(
        HttpPayloadFetcher::new(config.payload.timeout_secs)
            .context("Failed to create payload fetcher")?,
    );

    // Torrent client
    let tc_config = config
        .torrent_client
        .as_ref()
        .ok_or_else(|| anyhow!("A [torrent_client] section is required"))?;
    let torrent_client: Arc<dyn TorrentClient> = match tc_config.backend {
        TorrentClientBackend::Transmission => {
            let tr_config = tc_config.transmission.as_ref().ok_or_else(|| {
                anyhow!("Transmission backend selected but no transmission config provided")
            })?;
            info!("Initializing Transmission client at {}", tr_config.url);
            Arc::new(
                TransmissionClient::new(tr_config.clone())
                    .context("Failed to create Transmission client")?,
            )
        }
        TorrentClientBackend::QBittorrent => {
            let qbit_config = tc_config.qbittorrent.as_ref().ok_or_else(|| {
                anyhow!("qBittorrent backend selected but no qbittorrent config provided")
            })?;
            info!("Initializing qBittorrent client at {}", qbit_config.url);
            Arc::new(
                QBittorrentClient::new(qbit_config.clone())
                    .context("Failed to create qBittorrent client")?,
            )
        }
    };

    // Acquisition context shared by every pass
    let mut ctx = AcquisitionContext::new(
        store,
        Arc::clone(&shows),
        feed,
        metadata,
        payloads,
        torrent_client,
    )
    .with_cleanup_retry(config.orchestrator.cleanup_retry());
    if let Some(dir) = tc_config.download_path() {
        ctx = ctx.with_download_dir(dir);
    }

    let orchestrator = Arc::new(AcquisitionOrchestrator::new(
        config.orchestrator.clone(),
        Arc::new(ctx),
    ));

    if config.orchestrator.enabled {
        orchestrator.start().await;
        info!(
            monitor_interval_secs = config.orchestrator.monitor_interval_secs,
            discovery_interval_secs = config.orchestrator.discovery_interval_secs,
            "Acquisition orchestrator started"
        );
    } else {
        info!("Orchestrator disabled in config; passes run only on demand");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the orchestrator between passes
    info!("Stopping orchestrator...");
    orchestrator.stop().await;
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
