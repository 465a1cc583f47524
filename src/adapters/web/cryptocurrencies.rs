//! Cryptocurrency catalog endpoints. Anyone may read; only superusers write.

use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::cryptocurrency::{Cryptocurrency, normalize_symbol, validate_name};
use crate::domain::error::{FieldError, PortfolioError};

use super::auth::{MaybeUser, Superuser};
use super::dto::{CryptocurrencyBody, CryptocurrencyPage, CryptocurrencyRequest, required};
use super::pagination::{PageParams, envelope};
use super::{ApiJson, ApiQuery, AppState, WebError, run_blocking};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/portfolio/cryptocurrency/",
    tag = "cryptocurrency",
    params(
        ("query" = Option<String>, Query, description = "Case-insensitive substring of the name"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("page_size" = Option<u32>, Query, description = "Results per page")
    ),
    responses(
        (status = 200, description = "Catalog page in symbol order", body = CryptocurrencyPage),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_cryptocurrencies(
    State(state): State<Arc<AppState>>,
    _viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
    ApiQuery(paging): ApiQuery<PageParams>,
    ApiQuery(search): ApiQuery<SearchParams>,
) -> Result<Json<CryptocurrencyPage>, WebError> {
    let request = paging.request(&state.pagination)?;
    let filter = search
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let store = state.store.clone();
    let page =
        run_blocking(move || store.list_cryptocurrencies(filter.as_deref(), request)).await?;
    Ok(Json(envelope(page, &uri)?))
}

#[utoipa::path(
    post,
    path = "/api/portfolio/cryptocurrency/",
    tag = "cryptocurrency",
    security(("token" = [])),
    request_body = CryptocurrencyRequest,
    responses(
        (status = 201, description = "Added to the catalog", body = CryptocurrencyBody),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a superuser")
    )
)]
pub async fn create_cryptocurrency(
    State(state): State<Arc<AppState>>,
    Superuser(admin): Superuser,
    ApiJson(body): ApiJson<CryptocurrencyRequest>,
) -> Result<(StatusCode, Json<CryptocurrencyBody>), WebError> {
    let mut missing = Vec::new();
    let symbol = required("symbol", body.symbol, &mut missing);
    let name = required("name", body.name, &mut missing);
    if !missing.is_empty() {
        return Err(WebError::fields(missing));
    }

    let store = state.store.clone();
    let created = run_blocking(move || {
        let crypto = Cryptocurrency::new(&symbol, &name)?;
        store.create_cryptocurrency(&crypto)?;
        tracing::info!(symbol = %crypto.symbol, by = admin.id, "added cryptocurrency");
        Ok(crypto)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/portfolio/cryptocurrency/{symbol}/",
    tag = "cryptocurrency",
    params(("symbol" = String, Path, description = "Ticker symbol")),
    responses(
        (status = 200, description = "Catalog entry", body = CryptocurrencyBody),
        (status = 404, description = "Not found")
    )
)]
pub async fn retrieve_cryptocurrency(
    State(state): State<Arc<AppState>>,
    _viewer: MaybeUser,
    Path(symbol): Path<String>,
) -> Result<Json<CryptocurrencyBody>, WebError> {
    let symbol = normalize_symbol(&symbol).map_err(|_| WebError::not_found())?;
    let store = state.store.clone();
    run_blocking(move || store.get_cryptocurrency(&symbol))
        .await?
        .map(|crypto| Json(crypto.into()))
        .ok_or_else(WebError::not_found)
}

#[utoipa::path(
    put,
    path = "/api/portfolio/cryptocurrency/{symbol}/",
    tag = "cryptocurrency",
    security(("token" = [])),
    params(("symbol" = String, Path, description = "Ticker symbol")),
    request_body = CryptocurrencyRequest,
    responses(
        (status = 200, description = "Renamed", body = CryptocurrencyBody),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_cryptocurrency(
    State(state): State<Arc<AppState>>,
    admin: Superuser,
    Path(symbol): Path<String>,
    ApiJson(body): ApiJson<CryptocurrencyRequest>,
) -> Result<Json<CryptocurrencyBody>, WebError> {
    rename(state, admin, symbol, body, false).await
}

#[utoipa::path(
    patch,
    path = "/api/portfolio/cryptocurrency/{symbol}/",
    tag = "cryptocurrency",
    security(("token" = [])),
    params(("symbol" = String, Path, description = "Ticker symbol")),
    request_body = CryptocurrencyRequest,
    responses(
        (status = 200, description = "Renamed", body = CryptocurrencyBody),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "Not found")
    )
)]
pub async fn partial_update_cryptocurrency(
    State(state): State<Arc<AppState>>,
    admin: Superuser,
    Path(symbol): Path<String>,
    ApiJson(body): ApiJson<CryptocurrencyRequest>,
) -> Result<Json<CryptocurrencyBody>, WebError> {
    rename(state, admin, symbol, body, true).await
}

/// The symbol is the key and cannot change; only the name is writable.
async fn rename(
    state: Arc<AppState>,
    Superuser(admin): Superuser,
    symbol: String,
    body: CryptocurrencyRequest,
    partial: bool,
) -> Result<Json<CryptocurrencyBody>, WebError> {
    let symbol = normalize_symbol(&symbol).map_err(|_| WebError::not_found())?;

    let mut errors = Vec::new();
    if let Some(requested) = body.symbol.as_deref() {
        if normalize_symbol(requested).ok().as_deref() != Some(symbol.as_str()) {
            errors.push(FieldError::new("symbol", "Symbol cannot be changed."));
        }
    }
    let name = match body.name.as_deref().map(validate_name) {
        Some(Ok(name)) => Some(name),
        Some(Err(e)) => {
            errors.push(e);
            None
        }
        None if !partial => {
            errors.push(FieldError::new("name", "This field is required."));
            None
        }
        None => None,
    };
    if !errors.is_empty() {
        return Err(WebError::fields(errors));
    }

    let store = state.store.clone();
    let crypto = run_blocking(move || match name {
        Some(name) => {
            let renamed = store.rename_cryptocurrency(&symbol, &name)?;
            tracing::info!(symbol = %renamed.symbol, by = admin.id, "renamed cryptocurrency");
            Ok(renamed)
        }
        None => store
            .get_cryptocurrency(&symbol)?
            .ok_or_else(|| PortfolioError::not_found("cryptocurrency", &symbol)),
    })
    .await?;
    Ok(Json(crypto.into()))
}

#[utoipa::path(
    delete,
    path = "/api/portfolio/cryptocurrency/{symbol}/",
    tag = "cryptocurrency",
    security(("token" = [])),
    params(("symbol" = String, Path, description = "Ticker symbol")),
    responses(
        (status = 204, description = "Removed along with its transactions and holdings"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "Not found")
    )
)]
pub async fn destroy_cryptocurrency(
    State(state): State<Arc<AppState>>,
    Superuser(admin): Superuser,
    Path(symbol): Path<String>,
) -> Result<StatusCode, WebError> {
    let symbol = normalize_symbol(&symbol).map_err(|_| WebError::not_found())?;
    let store = state.store.clone();
    run_blocking(move || {
        store.delete_cryptocurrency(&symbol)?;
        tracing::info!(symbol = %symbol, by = admin.id, "removed cryptocurrency");
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
