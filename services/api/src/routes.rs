//! API service routes
//!
//! Every resource is mounted under `/api/v1/<resource>`. Reads are public
//! and writes go through [`auth_middleware`](crate::middleware::auth_middleware),
//! except sending a message, registering and recovering a password.

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use common::document::{Collection, Document};
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::ServerConfig,
    error::{ApiError, ApiResult},
    response::Envelope,
    state::AppState,
};

pub mod experience;
pub mod message;
pub mod project;
pub mod skill;
pub mod software_application;
pub mod timeline;
pub mod user;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/user", user::router(state.clone()))
        .nest("/message", message::router(state.clone()))
        .nest("/project", project::router(state.clone()))
        .nest("/skill", skill::router(state.clone()))
        .nest(
            "/software_application",
            software_application::router(state.clone()),
        )
        .nest("/timeline", timeline::router(state.clone()))
        .nest("/experience", experience::router(state.clone()));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Envelope> {
    let database = state.store.health_check().await?;
    let status = if database { "ok" } else { "degraded" };

    Envelope::ok()
        .with("status", &status)?
        .with("database", &database)?
        .with("service", &"portfolio-api")
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Internal(anyhow::anyhow!("Handler panicked: {}", detail)).into_response()
}

/// A document by identifier, or `NotFound` naming its kind
pub(crate) async fn load<T: Document>(
    collection: &Collection<T>,
    id: Uuid,
    kind: &'static str,
) -> ApiResult<T> {
    collection.find_by_id(id).await?.ok_or(ApiError::NotFound(kind))
}

/// Overwrite an existing document, mapping a vanished one to `NotFound`
pub(crate) async fn save<T: Document>(
    collection: &Collection<T>,
    document: &T,
    kind: &'static str,
) -> ApiResult<()> {
    if collection.replace(document).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound(kind))
    }
}

/// Delete a document, mapping a vanished one to `NotFound`
pub(crate) async fn remove<T: Document>(
    collection: &Collection<T>,
    id: Uuid,
    kind: &'static str,
) -> ApiResult<()> {
    if collection.delete(id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound(kind))
    }
}
