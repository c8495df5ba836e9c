use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use filesearch_backend::config;
use filesearch_backend::orchestrator::Orchestrator;
use filesearch_backend::store::{self, FileStore};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filesearch_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    config::init_config().map_err(|e| anyhow::anyhow!(e))?;
    let app_config = config::config();
    tracing::info!(
        "Server will listen on {}:{}",
        app_config.server.host,
        app_config.server.port
    );

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());

    let pool = SqlitePool::connect(&database_url).await?;

    store::run_migrations(&pool).await?;

    let orchestrator = Orchestrator::new(FileStore::new(pool));

    // Rebuild the index from persisted records in the background; the
    // status endpoint reports progress while it runs.
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.load_on_startup().await {
                tracing::error!("failed to load persisted files: {}", e);
            }
        });
    }

    let state = Arc::new(AppState { orchestrator });

    let app = Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/api/files/upload", post(api::files::upload_files))
        .route("/api/files", get(api::files::list_files))
        .route("/api/files/:id", delete(api::files::delete_file))
        .route("/api/search", post(api::search::search))
        .route("/api/search/suggest", get(api::search::suggest))
        .route("/api/search/status", get(api::search::status))
        .layer(DefaultBodyLimit::max(app_config.upload.max_size_bytes + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
