//! Token authentication extractors.
//!
//! Clients send `Authorization: Token <key>`. A request without that scheme is
//! anonymous; a request with it must carry a valid key for an active user.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::domain::user::User;

use super::{AppState, WebError, run_blocking};

const KEYWORD: &str = "token";

/// The authenticated user, or anonymous.
pub struct MaybeUser(pub Option<User>);

/// An authenticated user; anonymous requests are rejected with 401.
pub struct AuthUser(pub User);

/// A superuser. Anonymous requests get 401, other users 403.
pub struct Superuser(pub User);

/// Extracts the key from a token `Authorization` header. `Ok(None)` means the
/// header is absent or uses another scheme.
fn token_key(parts: &Parts) -> Result<Option<String>, WebError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let Ok(value) = value.to_str() else {
        return Err(WebError::unauthorized(
            "Invalid token header. Token string should not contain invalid characters.",
        ));
    };
    let mut words = value.split_whitespace();
    match words.next() {
        Some(keyword) if keyword.eq_ignore_ascii_case(KEYWORD) => {}
        _ => return Ok(None),
    }
    let key = words.next().ok_or_else(|| {
        WebError::unauthorized("Invalid token header. No credentials provided.")
    })?;
    if words.next().is_some() {
        return Err(WebError::unauthorized(
            "Invalid token header. Token string should not contain spaces.",
        ));
    }
    Ok(Some(key.to_string()))
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(key) = token_key(parts)? else {
            return Ok(MaybeUser(None));
        };
        let store = state.store.clone();
        match run_blocking(move || store.user_for_token(&key)).await? {
            Some(user) if user.is_active => Ok(MaybeUser(Some(user))),
            Some(_) => Err(WebError::unauthorized("User inactive or deleted.")),
            None => Err(WebError::unauthorized("Invalid token.")),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(AuthUser(user)),
            MaybeUser(None) => Err(WebError::not_authenticated()),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Superuser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.is_superuser {
            Ok(Superuser(user))
        } else {
            Err(WebError::forbidden())
        }
    }
}
