use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_converter::config::AppConfig;
use image_converter::http;
use image_converter::infra::{db::Db, store::PgConversionStore, uploads::UploadsDir};
use image_converter::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let addr = config.http_addr()?;

    // The directory must exist before the first request can write to it.
    let uploads = UploadsDir::ensure(config.uploads_dir.clone()).await?;

    // Store readiness is checked in the background; requests that arrive
    // before it is reachable fail on their own.
    let db = Db::connect_lazy(&config)?;
    tokio::spawn(prepare_store(db.clone()));

    let state = AppState {
        store: Arc::new(PgConversionStore::new(db)),
        uploads,
        upload_max_bytes: config.upload_max_bytes,
        cors_allowed_origins: config.cors_allowed_origins.clone(),
    };

    let app: Router = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn prepare_store(db: Db) {
    match db.ensure_schema().await {
        Ok(()) => tracing::info!("connected to database"),
        Err(err) => tracing::error!(error = ?err, "database connection error"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
