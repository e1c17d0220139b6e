//! API server entry point.

use api::config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::{InMemoryOutboxStore, OutboxStore, PostgresOutboxStore};
use relay::RelayConfig;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Runs the HTTP server and the outbox relay until shutdown.
///
/// Orders and stock always live in memory; only the outbox is durable when
/// `O` is PostgreSQL. After a restart the outbox can therefore hold rows for
/// orders the process no longer knows. Relaying them is still correct since
/// the events carry everything subscribers need.
async fn serve<O: OutboxStore + Clone + 'static>(
    config: Config,
    relay_config: RelayConfig,
    outbox: O,
    metrics_handle: PrometheusHandle,
) {
    // Application state and relay
    let state = api::create_default_state(outbox.clone(), &relay_config).await;
    let (shutdown_tx, shutdown_rx) = relay::shutdown_channel();
    let relay = api::spawn_relay(outbox, api::create_event_bus(), &relay_config, shutdown_rx);

    // HTTP server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Let the relay finish its current pass
    let _ = shutdown_tx.send(true);
    if let Err(err) = relay.await {
        tracing::error!(error = %err, "outbox runner task failed");
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let relay_config = RelayConfig::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the outbox store and run
    match config.database_url.clone() {
        Some(database_url) => {
            let outbox = PostgresOutboxStore::connect(&database_url)
                .await
                .expect("failed to connect to PostgreSQL");
            outbox
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL outbox");
            serve(config, relay_config, outbox, metrics_handle).await;
        }
        None => {
            tracing::info!("using in-memory outbox");
            serve(config, relay_config, InMemoryOutboxStore::new(), metrics_handle).await;
        }
    }
}
