//! Read-only holdings endpoints.

use axum::{
    Json,
    extract::{OriginalUri, Path, State},
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::dto::{HoldingBody, HoldingPage};
use super::pagination::{PageParams, envelope};
use super::{ApiQuery, AppState, WebError, parse_id, run_blocking};

#[utoipa::path(
    get,
    path = "/api/portfolio/holdings/",
    tag = "holdings",
    security(("token" = [])),
    params(
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("page_size" = Option<u32>, Query, description = "Results per page")
    ),
    responses(
        (status = 200, description = "Own holdings, largest first", body = HoldingPage),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_holdings(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    OriginalUri(uri): OriginalUri,
    ApiQuery(paging): ApiQuery<PageParams>,
) -> Result<Json<HoldingPage>, WebError> {
    let request = paging.request(&state.pagination)?;
    let store = state.store.clone();
    let page = run_blocking(move || store.list_holdings(me.id, request)).await?;
    Ok(Json(envelope(page, &uri)?))
}

#[utoipa::path(
    get,
    path = "/api/portfolio/holdings/{id}/",
    tag = "holdings",
    security(("token" = [])),
    params(("id" = i64, Path, description = "Holding id")),
    responses(
        (status = 200, description = "Own holding", body = HoldingBody),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn retrieve_holding(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<HoldingBody>, WebError> {
    let id = parse_id(&id)?;
    let store = state.store.clone();
    run_blocking(move || store.get_holding(me.id, id))
        .await?
        .map(|holding| Json(holding.into()))
        .ok_or_else(WebError::not_found)
}
