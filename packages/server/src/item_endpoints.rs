//! Item endpoints
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /api/items/:id?lang=` - Resolve an item by node id
//! - `GET /api/items?uri=&lang=` - Resolve an item by canonical URI
//!
//! `lang` is optional and defaults to the master language. Items that do not
//! exist or are not public are reported as `404 ITEM_NOT_FOUND`.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use registry_core::ItemRepresentation;
use serde::{Deserialize, Serialize};

use crate::{AppState, HttpError};

#[derive(Debug, Deserialize)]
pub struct LanguageQuery {
    lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UriQuery {
    uri: Option<String>,
    lang: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:3001/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Resolve an item by node id
///
/// ```bash
/// curl "http://localhost:3001/api/items/1f0c...?lang=fr"
/// ```
async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LanguageQuery>,
) -> Result<Json<ItemRepresentation>, HttpError> {
    state
        .service
        .get_item_by_id(&id, params.lang.as_deref())
        .await?
        .map(Json)
        .ok_or_else(|| HttpError::item_not_found(&id))
}

/// Resolve an item by canonical URI
///
/// ```bash
/// curl "http://localhost:3001/api/items?uri=http%3A%2F%2Fex%2Fr%2Fcodelist%2Fa&lang=fr"
/// ```
async fn get_item_by_uri(
    State(state): State<AppState>,
    Query(params): Query<UriQuery>,
) -> Result<Json<ItemRepresentation>, HttpError> {
    let uri = params
        .uri
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| HttpError::new("Missing 'uri' query parameter", "INVALID_INPUT"))?;

    state
        .service
        .get_item_by_uri(&uri, params.lang.as_deref())
        .await?
        .map(Json)
        .ok_or_else(|| HttpError::item_not_found(&uri))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/items", get(get_item_by_uri))
        .route("/api/items/:id", get(get_item))
        .with_state(state)
}
