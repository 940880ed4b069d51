use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

mod config;
mod db;
mod error;
mod handlers;
mod models;

use crate::config::Config;
use crate::db::{InventoryStore, PgInventoryStore};

/// Shared application state. Cheap to clone: the store sits behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
}

impl AppState {
    pub fn new(store: impl InventoryStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,inventory_service=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("{}", "*".repeat(70));
    info!("{:*^70}", "  I N V E N T O R Y   S E R V I C E  ");
    info!("{}", "*".repeat(70));

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;
    info!("Database connection pool established.");

    info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations complete.");

    let state = AppState::new(PgInventoryStore::new(pool));
    let app = build_router(state, &config.static_dir);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Service initialized! Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Service stopped.");
    Ok(())
}

/// Inventory endpoints, mounted both at the root and under `/api`.
///
/// The first segment after `/inventory` is always named `id`: it is either a
/// product id or, on the single-segment route, a listing filter token.
fn inventory_routes() -> Router<AppState> {
    use handlers::inventory::*;

    Router::new()
        .route("/inventory", get(list_inventory).post(create_inventory))
        .route("/inventory/:id", get(list_inventory_by_token))
        .route(
            "/inventory/:id/:condition",
            get(get_inventory)
                .put(update_inventory)
                .delete(delete_inventory),
        )
        .route(
            "/inventory/:id/:condition/active",
            put(enable_updates).delete(disable_updates),
        )
}

fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        // ── Admin page & health ─────────────────────────────────────────────
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .nest_service("/static", ServeDir::new(static_dir))

        // ── Inventory ───────────────────────────────────────────────────────
        .merge(inventory_routes())
        .nest("/api", inventory_routes())

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received, draining connections...");
}
