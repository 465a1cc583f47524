//! Account endpoints under `/api/user/`.

use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use crate::domain::error::PortfolioError;
use crate::domain::user::{self, Role};

use super::auth::AuthUser;
use super::dto::{
    CredentialsRequest, ProfileRequest, RegisterRequest, TokenBody, UserBody, required,
};
use super::{ApiJson, AppState, WebError, run_blocking};

#[utoipa::path(
    post,
    path = "/api/user/create/",
    tag = "user",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserBody),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserBody>), WebError> {
    let mut missing = Vec::new();
    let email = required("email", body.email, &mut missing);
    let password = required("password", body.password, &mut missing);
    if !missing.is_empty() {
        return Err(WebError::fields(missing));
    }
    let name = body.name.unwrap_or_default();

    let store = state.store.clone();
    let created = run_blocking(move || {
        user::register(store.as_ref(), &email, &password, &name, Role::Regular)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    post,
    path = "/api/user/token/",
    tag = "user",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "API token for the account", body = TokenBody),
        (status = 400, description = "Unable to authenticate with provided credentials")
    )
)]
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Json<TokenBody>, WebError> {
    let mut missing = Vec::new();
    let email = required("email", body.email, &mut missing);
    let password = required("password", body.password, &mut missing);
    if !missing.is_empty() {
        return Err(WebError::fields(missing));
    }

    let store = state.store.clone();
    let token = run_blocking(move || user::issue_token(store.as_ref(), &email, &password)).await?;
    Ok(Json(TokenBody { token }))
}

#[utoipa::path(
    get,
    path = "/api/user/me/",
    tag = "user",
    security(("token" = [])),
    responses(
        (status = 200, description = "The authenticated user", body = UserBody),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn retrieve_me(AuthUser(me): AuthUser) -> Json<UserBody> {
    Json(me.into())
}

#[utoipa::path(
    put,
    path = "/api/user/me/",
    tag = "user",
    security(("token" = [])),
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile replaced", body = UserBody),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> Result<Json<UserBody>, WebError> {
    save_profile(state, me, body, false).await
}

#[utoipa::path(
    patch,
    path = "/api/user/me/",
    tag = "user",
    security(("token" = [])),
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserBody),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn partial_update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(me): AuthUser,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> Result<Json<UserBody>, WebError> {
    save_profile(state, me, body, true).await
}

async fn save_profile(
    state: Arc<AppState>,
    me: user::User,
    body: ProfileRequest,
    partial: bool,
) -> Result<Json<UserBody>, WebError> {
    let store = state.store.clone();
    let updated = run_blocking(move || -> Result<_, PortfolioError> {
        let updated = user::update_profile(store.as_ref(), &me, body.into(), partial)?;
        tracing::info!(user_id = updated.id, partial, "updated profile");
        Ok(updated)
    })
    .await?;
    Ok(Json(updated.into()))
}
