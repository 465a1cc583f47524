//! HTTP error responses for web adapter.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use crate::domain::error::{FieldError, PortfolioError};

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub body: Value,
    challenge: bool,
}

impl WebError {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            challenge: false,
        }
    }

    pub fn detail(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "detail": message.into() }))
    }

    /// 401 with a `WWW-Authenticate: Token` challenge.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            challenge: true,
            ..Self::detail(StatusCode::UNAUTHORIZED, message)
        }
    }

    pub fn not_authenticated() -> Self {
        Self::unauthorized("Authentication credentials were not provided.")
    }

    pub fn forbidden() -> Self {
        Self::detail(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
        )
    }

    pub fn not_found() -> Self {
        Self::detail(StatusCode::NOT_FOUND, "Not found.")
    }

    pub fn invalid_page() -> Self {
        Self::detail(StatusCode::NOT_FOUND, "Invalid page.")
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        tracing::error!(error = %message, "internal server error");
        Self::detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
    }

    /// `{"field": ["message", ...]}`, one key per field.
    pub fn fields(errors: Vec<FieldError>) -> Self {
        let mut body = Map::new();
        for error in errors {
            let messages = body
                .entry(error.field)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = messages {
                list.push(Value::String(error.message));
            }
        }
        Self::new(StatusCode::BAD_REQUEST, Value::Object(body))
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            json!({ "non_field_errors": [message.into()] }),
        )
    }
}

impl From<PortfolioError> for WebError {
    fn from(err: PortfolioError) -> Self {
        match err {
            PortfolioError::Validation(errors) => Self::fields(errors),
            PortfolioError::AlreadyExists { entity, field } => Self::fields(vec![FieldError::new(
                field,
                format!("{entity} with this {field} already exists."),
            )]),
            PortfolioError::NegativeHoldings(message)
            | PortfolioError::HoldingsTooLarge(message) => Self::non_field(message),
            PortfolioError::InvalidCredentials => {
                Self::non_field(PortfolioError::InvalidCredentials.to_string())
            }
            PortfolioError::NotFound { .. } => Self::not_found(),
            other => Self::internal(other),
        }
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::detail(status, rejection.body_text())
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        Self::detail(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if self.challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
        }
        response
    }
}
