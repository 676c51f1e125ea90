use anyhow::Result;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing_subscriber::EnvFilter;

mod backend;
mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use backend::{
    SessionApi,
    disk_blobs::DiskBlobStore,
    local_sessions::{AdminAccount, LocalSessions},
    sqlite_documents::SqliteDocumentStore,
};
use services::{
    gallery_service::GalleryService,
    session_gate::{GateTimings, SessionGate},
};

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting gallery-admin with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?,
    );

    // --- Migrations (always applied; --migrate exits afterwards) ---
    let documents = Arc::new(SqliteDocumentStore::new(db.clone()));
    documents.migrate().await?;
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize backend + services ---
    let blob_files = Arc::new(DiskBlobStore::new(
        cfg.storage_dir.clone(),
        cfg.public_base_url.clone(),
    ));
    let local_sessions = Arc::new(LocalSessions::new(
        AdminAccount {
            identifier: cfg.admin_identifier.clone(),
            secret: cfg.admin_secret.clone(),
        },
        cfg.session_ttl(),
    ));
    let sessions: Arc<dyn SessionApi> = local_sessions.clone();
    let gallery = GalleryService::new(documents, blob_files.clone(), cfg.caption_policy);

    let gate = SessionGate::new(gallery.clone(), GateTimings::default());
    let _subscription = gate.attach(sessions.on_state_change());
    let sweeper = spawn_session_sweeper(local_sessions, cfg.session_ttl());

    let state = routes::routes::AppState {
        gallery,
        sessions,
        gate,
        blob_files,
        orders_email: cfg.orders_email.as_str().into(),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes(state, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}

/// Periodically drop expired sessions so an abandoned sign-in still ends
/// in the login view.
fn spawn_session_sweeper(sessions: Arc<LocalSessions>, ttl: Duration) -> JoinHandle<()> {
    let period = ttl.min(SESSION_SWEEP_PERIOD);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            sessions.prune_expired().await;
        }
    })
}
