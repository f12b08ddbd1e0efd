use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use tradebook_api::config;
use tradebook_api::crypto::{
    EnvelopeKeyManager, FieldCipher, GoogleKmsService, KeyService, LocalKeyService,
};
use tradebook_api::database::manager;
use tradebook_api::handlers;
use tradebook_api::middleware::{auth_middleware, webhook_middleware};
use tradebook_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, TRADEBOOK_DB_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradebook_api=info,tower_http=info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting Tradebook API in {:?} mode", config.environment);

    let keys = Arc::new(build_key_manager(config)?);
    let pool = manager::connect_pool(&config.database).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState { pool, keys };
    let app = app(state);

    let port = std::env::var("TRADEBOOK_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Tradebook API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Pick the key service from configuration: Cloud KMS when a key resource is
/// configured, otherwise a local master key wrapping DEKs in-process.
fn build_key_manager(config: &config::AppConfig) -> anyhow::Result<EnvelopeKeyManager> {
    let service: Arc<dyn KeyService> = match &config.encryption.kms_key_name {
        Some(key_name) if !key_name.is_empty() => {
            tracing::info!(key = %key_name, "Using Cloud KMS key service");
            let token = config
                .encryption
                .kms_access_token
                .clone()
                .unwrap_or_default();
            Arc::new(GoogleKmsService::new(key_name.clone(), token))
        }
        _ => {
            tracing::info!("Using local master-key service");
            let key = config.master_key()?;
            Arc::new(LocalKeyService::new(FieldCipher::new(&key)?))
        }
    };
    Ok(EnvelopeKeyManager::new(service))
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(webhook_routes())
        .merge(api_routes())
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Identity-provider webhooks, gated by a shared secret header.
fn webhook_routes() -> Router<AppState> {
    use handlers::user;

    Router::new()
        .route("/user", post(user::upsert).patch(user::upsert))
        .route("/user/:user_id", delete(user::delete))
        .layer(axum::middleware::from_fn(webhook_middleware))
}

/// Bearer-token routes. Every handler runs its queries inside a transaction
/// bound to the caller's user id.
fn api_routes() -> Router<AppState> {
    use handlers::{trade, tradebook};

    Router::new()
        .route("/tradebook", post(tradebook::create))
        .route("/tradebooks", get(tradebook::list).delete(tradebook::delete_all))
        .route(
            "/tradebook/:tradebook_id",
            get(tradebook::get)
                .patch(tradebook::update)
                .delete(tradebook::delete),
        )
        .route("/tradebook/:tradebook_id/member", put(tradebook::add_member))
        .route(
            "/trade/:tradebook_id",
            post(trade::create).get(trade::list).delete(trade::delete_all),
        )
        .route("/trade/:tradebook_id/:trade_id", patch(trade::update))
        .layer(axum::middleware::from_fn(auth_middleware))
}

fn build_cors_layer() -> CorsLayer {
    let security = &config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<axum::http::HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Tradebook API",
            "version": version,
            "description": "Encrypted trading-journal backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "user": "/user[/:user_id] (webhook secret)",
                "tradebook": "/tradebook[/:tradebook_id] (bearer token)",
                "tradebooks": "/tradebooks (bearer token)",
                "trade": "/trade/:tradebook_id[/:trade_id] (bearer token)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match manager::health_check(&state.pool).await {
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
