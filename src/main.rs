use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod catalog;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod services;
mod store;

use catalog::{Catalog, PgCatalog};
use database::PoolManager;
use services::OrgService;
use store::{PgStoreClient, StoreClient};

/// Shared handles, built once at startup and injected into every handler.
/// The lifecycle service receives its catalog and store at construction;
/// nothing here is a process-wide singleton.
#[derive(Clone)]
struct AppState {
    service: Arc<OrgService>,
    catalog: Arc<dyn Catalog>,
    pools: Arc<PoolManager>,
}

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = crate::config::config();
    tracing::info!("Starting Organization API in {:?} mode", config.environment);

    // Pools connect lazily on first use, so startup succeeds with the
    // database down; /health reports the actual state.
    let pools = Arc::new(PoolManager::new());
    let catalog: Arc<dyn Catalog> = Arc::new(PgCatalog::new(pools.clone()));
    let store: Arc<dyn StoreClient> = Arc::new(PgStoreClient::new(pools.clone()));
    let service = Arc::new(OrgService::new(catalog.clone(), store));

    let app = app(AppState { service, catalog, pools });

    // Allow tests or deployments to override port via env
    let port = std::env::var("ORG_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Organization API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    // Lifecycle operations that mutate an existing organization require a
    // bearer token; creation and lookup are public, as is admin login.
    let protected = Router::new()
        .route("/org/update", put(handlers::org::org_update))
        .route("/org/delete", delete(handlers::org::org_delete))
        .route_layer(axum::middleware::from_fn(middleware::jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Organization lifecycle
        .route("/org/create", post(handlers::org::org_create))
        .route("/org/get", get(handlers::org::org_get))
        // Admin accounts
        .route("/admin/create", post(handlers::admin::admin_create))
        .route("/admin/login", post(handlers::admin::admin_login))
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Organization API (Rust)",
            "version": version,
            "description": "Multi-tenant organization management with per-organization database isolation",
            "endpoints": {
                "home": "/ (public)",
                "org": "/org/create, /org/get (public); /org/update, /org/delete (bearer token)",
                "admin": "/admin/create, /admin/login (public)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.pools.health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
