//! Transaction endpoints. Every route is scoped to the authenticated user.

use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;

use crate::domain::portfolio;

use super::auth::AuthUser;
use super::dto::{TransactionBody, TransactionPage, TransactionRequest};
use super::pagination::{PageParams, envelope};
use super::{ApiJson, ApiQuery, AppState, WebError, parse_id, run_blocking};

#[utoipa::path(
    get,
    path = "/api/portfolio/transaction/",
    tag = "transaction",
    security(("token" = [])),
    params(
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("page_size" = Option<u32>, Query, description = "Results per page")
    ),
    responses(
        (status = 200, description = "Own transactions, newest first", body = TransactionPage),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    OriginalUri(uri): OriginalUri,
    ApiQuery(paging): ApiQuery<PageParams>,
) -> Result<Json<TransactionPage>, WebError> {
    let request = paging.request(&state.pagination)?;
    let store = state.store.clone();
    let page = run_blocking(move || store.list_transactions(me.id, request)).await?;
    Ok(Json(envelope(page, &uri)?))
}

#[utoipa::path(
    post,
    path = "/api/portfolio/transaction/",
    tag = "transaction",
    security(("token" = [])),
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Recorded; holdings updated", body = TransactionBody),
        (status = 400, description = "Validation failed or holdings would go negative"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    ApiJson(body): ApiJson<TransactionRequest>,
) -> Result<(StatusCode, Json<TransactionBody>), WebError> {
    let patch = body.into_patch().map_err(WebError::fields)?;
    let store = state.store.clone();
    let created = run_blocking(move || {
        portfolio::record_transaction(store.as_ref(), me.id, patch, Utc::now())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/portfolio/transaction/{id}/",
    tag = "transaction",
    security(("token" = [])),
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Own transaction", body = TransactionBody),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn retrieve_transaction(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TransactionBody>, WebError> {
    let id = parse_id(&id)?;
    let store = state.store.clone();
    run_blocking(move || store.get_transaction(me.id, id))
        .await?
        .map(|tx| Json(tx.into()))
        .ok_or_else(WebError::not_found)
}

#[utoipa::path(
    put,
    path = "/api/portfolio/transaction/{id}/",
    tag = "transaction",
    security(("token" = [])),
    params(("id" = i64, Path, description = "Transaction id")),
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Replaced; holdings updated", body = TransactionBody),
        (status = 400, description = "Validation failed or holdings would go negative"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    me: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TransactionRequest>,
) -> Result<Json<TransactionBody>, WebError> {
    revise(state, me, id, body, false).await
}

#[utoipa::path(
    patch,
    path = "/api/portfolio/transaction/{id}/",
    tag = "transaction",
    security(("token" = [])),
    params(("id" = i64, Path, description = "Transaction id")),
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Updated; holdings updated", body = TransactionBody),
        (status = 400, description = "Validation failed or holdings would go negative"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn partial_update_transaction(
    State(state): State<Arc<AppState>>,
    me: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TransactionRequest>,
) -> Result<Json<TransactionBody>, WebError> {
    revise(state, me, id, body, true).await
}

async fn revise(
    state: Arc<AppState>,
    AuthUser(me): AuthUser,
    id: String,
    body: TransactionRequest,
    partial: bool,
) -> Result<Json<TransactionBody>, WebError> {
    let id = parse_id(&id)?;
    let patch = body.into_patch().map_err(WebError::fields)?;
    let store = state.store.clone();
    let updated = run_blocking(move || {
        portfolio::revise_transaction(store.as_ref(), me.id, id, patch, partial, Utc::now())
    })
    .await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/portfolio/transaction/{id}/",
    tag = "transaction",
    security(("token" = [])),
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 204, description = "Deleted; holdings updated"),
        (status = 400, description = "Holdings would go negative"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn destroy_transaction(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, WebError> {
    let id = parse_id(&id)?;
    let store = state.store.clone();
    run_blocking(move || portfolio::remove_transaction(store.as_ref(), me.id, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
