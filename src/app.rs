use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde_json::{Value, json};
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::DatabaseConfig;
use crate::core::CRUDResource;
use crate::entities::{Contact, OrderLine, Property, PurchaseOrder, Unit};
use crate::routes::crud_router;

pub const API_PREFIX: &str = "/api/v1";

/// Open the connection pool.
///
/// # Errors
/// The database cannot be reached.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    // Every pooled connection to `sqlite::memory:` would be its own database
    let max_connections = if config.url.contains(":memory:") {
        1
    } else {
        config.max_connections
    };

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    tracing::info!(max_connections, "Connected to database");
    Ok(db)
}

async fn health(State(db): State<DatabaseConnection>) -> (StatusCode, Json<Value>) {
    match db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable"})),
            )
        }
    }
}

fn resource<T: CRUDResource>(router: Router<DatabaseConnection>) -> Router<DatabaseConnection> {
    router.nest(&format!("/{}", T::RESOURCE_NAME_PLURAL), crud_router::<T>())
}

/// The full HTTP application: every resource under [`API_PREFIX`] plus `/health`.
pub fn build_router(db: DatabaseConnection) -> Router {
    let mut api = Router::new();
    api = resource::<Contact>(api);
    api = resource::<Property>(api);
    api = resource::<Unit>(api);
    api = resource::<PurchaseOrder>(api);
    api = resource::<OrderLine>(api);

    Router::new()
        .nest(API_PREFIX, api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(db)
}
