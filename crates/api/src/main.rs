use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use farmchain_api::config::ServerConfig;
use farmchain_api::router::build_app_router;
use farmchain_api::state::AppState;
use farmchain_core::clock::SystemClock;
use farmchain_db::{PgCropStore, PgFarmerDirectory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmchain_api=debug,farmchain_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = farmchain_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    farmchain_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    farmchain_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be a valid IP address"),
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    tracing::info!(
        policy = ?config.services.transition_policy,
        crop_types = config.services.taxonomy.crop_types().len(),
        regions = config.services.taxonomy.regions().len(),
        "Service settings loaded",
    );

    let state = AppState::new(
        Arc::new(PgCropStore::new(pool.clone())),
        Arc::new(PgFarmerDirectory::new(pool.clone())),
        Arc::new(SystemClock),
        config,
        Some(pool.clone()),
    );
    let app = build_app_router(state);

    tracing::info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    let drain = async {
        server.await.expect("Server error");
    };
    tokio::pin!(drain);

    // Serve until a signal arrives, then give in-flight requests the
    // configured drain window.
    tokio::select! {
        () = &mut drain => {}
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!("Drain window elapsed, closing remaining connections");
        }
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
