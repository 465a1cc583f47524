//! Web server adapter: the JSON API over axum.

pub mod auth;
pub mod dto;
mod cryptocurrencies;
mod error;
mod handlers;
mod holdings;
pub mod openapi;
pub mod pagination;
mod templates;
mod transactions;
mod users;

pub use error::WebError;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    routing::get,
    routing::post,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::domain::error::PortfolioError;
use crate::domain::page::PaginationSettings;
use crate::ports::store_port::PortfolioStore;

pub struct AppState {
    pub store: Arc<dyn PortfolioStore>,
    pub pagination: PaginationSettings,
}

/// `Json` whose rejections render as API errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(WebError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejections render as API errors.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(WebError))]
pub struct ApiQuery<T>(pub T);

/// Runs a store call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, WebError>
where
    F: FnOnce() -> Result<T, PortfolioError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(WebError::internal)?
        .map_err(WebError::from)
}

/// Numeric path ids; anything else cannot name a row.
pub(crate) fn parse_id(raw: &str) -> Result<i64, WebError> {
    raw.parse().map_err(|_| WebError::not_found())
}

pub fn build_router(state: AppState) -> Router {
    let openapi = openapi::ApiDoc::openapi();

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health/", get(handlers::health))
        .route(
            handlers::SCHEMA_PATH,
            get(move || async move { Json(openapi) }),
        )
        .route(handlers::DOCS_PATH, get(handlers::docs))
        .route("/api/user/create/", post(users::create_user))
        .route("/api/user/token/", post(users::create_token))
        .route(
            "/api/user/me/",
            get(users::retrieve_me)
                .put(users::update_me)
                .patch(users::partial_update_me),
        )
        .route(
            "/api/portfolio/cryptocurrency/",
            get(cryptocurrencies::list_cryptocurrencies)
                .post(cryptocurrencies::create_cryptocurrency),
        )
        .route(
            "/api/portfolio/cryptocurrency/{symbol}/",
            get(cryptocurrencies::retrieve_cryptocurrency)
                .put(cryptocurrencies::update_cryptocurrency)
                .patch(cryptocurrencies::partial_update_cryptocurrency)
                .delete(cryptocurrencies::destroy_cryptocurrency),
        )
        .route(
            "/api/portfolio/transaction/",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/api/portfolio/transaction/{id}/",
            get(transactions::retrieve_transaction)
                .put(transactions::update_transaction)
                .patch(transactions::partial_update_transaction)
                .delete(transactions::destroy_transaction),
        )
        .route("/api/portfolio/holdings/", get(holdings::list_holdings))
        .route("/api/portfolio/holdings/{id}/", get(holdings::retrieve_holding))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
