use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

mod error;
mod handlers;
mod logic;
mod registry;
mod state;
mod storage;

use crate::handlers::{api_router, ping_handler};
use crate::registry::{flush_registry, load_registry};
use crate::state::AppState;
use crate::storage::{FileStorage, S3Storage, S3StorageConfig, Storage};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding plots.bin when no S3 bucket is configured.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Directory served for everything outside /api (the client bundle).
    #[arg(long)]
    public_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 5)]
    flush_interval_secs: u64,
    #[arg(long)]
    s3_bucket: Option<String>,
    #[arg(long)]
    s3_prefix: Option<String>,
    #[arg(long)]
    s3_region: Option<String>,
    #[arg(long)]
    s3_endpoint_url: Option<String>,
    #[arg(long)]
    s3_force_path_style: bool,
}

async fn open_storage(args: &Args) -> Arc<dyn Storage> {
    if let Some(bucket) = args.s3_bucket.clone() {
        let mut config = S3StorageConfig::new(bucket);
        config.prefix = args.s3_prefix.clone();
        config.region = args.s3_region.clone();
        config.endpoint_url = args.s3_endpoint_url.clone();
        config.force_path_style = args.s3_force_path_style;
        config.access_key_id = std::env::var("PLOTMAP_S3_ACCESS_KEY_ID").ok();
        config.secret_access_key = std::env::var("PLOTMAP_S3_SECRET_ACCESS_KEY").ok();
        tracing::info!(bucket = %config.bucket, prefix = ?config.prefix, "using s3 plot storage");
        return Arc::new(S3Storage::new(config).await);
    }
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data"));
    tracing::info!(data_dir = %data_dir.display(), "using file plot storage");
    Arc::new(FileStorage::new(data_dir))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let args = Args::parse();
    let storage = open_storage(&args).await;
    let registry = load_registry(storage.as_ref())
        .await
        .context("refusing to start over unreadable plot storage")?;
    let state = AppState::new(registry, storage);
    let backup_state = state.clone();

    let public_dir = args
        .public_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));

    let app = Router::new()
        .route("/ping", get(ping_handler))
        .nest("/api", api_router())
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let flush_interval = Duration::from_secs(args.flush_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(flush_interval);
        loop {
            interval.tick().await;
            flush_registry(&backup_state).await;
        }
    });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("plotmap running at http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    // Waits for an in-flight periodic flush through the flush lock.
    flush_registry(&state).await;
    Ok(())
}
