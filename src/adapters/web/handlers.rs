//! Service endpoints: root redirect, health check, API docs.

use askama::Template;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

use super::dto::HealthBody;
use super::templates::DocsTemplate;
use super::{AppState, WebError, run_blocking};

pub const DOCS_PATH: &str = "/api/docs/";
pub const SCHEMA_PATH: &str = "/api/schema/";

/// 302 to the docs page.
pub async fn root() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, DOCS_PATH)])
}

#[utoipa::path(
    get,
    path = "/api/health/",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable", body = HealthBody),
        (status = 503, description = "Store unreachable", body = HealthBody)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store.clone();
    match run_blocking(move || store.ping()).await {
        Ok(()) => Json(HealthBody { healthy: true }).into_response(),
        Err(err) => {
            tracing::warn!(status = %err.status, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthBody { healthy: false }),
            )
                .into_response()
        }
    }
}

pub async fn docs() -> Result<Html<String>, WebError> {
    let page = DocsTemplate {
        title: "cointrack API",
        schema_url: SCHEMA_PATH,
    };
    page.render().map(Html).map_err(WebError::internal)
}

pub async fn not_found() -> WebError {
    WebError::not_found()
}
