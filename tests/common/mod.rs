#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use cointrack::adapters::sqlite_adapter::SqliteAdapter;
use cointrack::adapters::web::{AppState, build_router};
use cointrack::domain::cryptocurrency::Cryptocurrency;
use cointrack::domain::page::PaginationSettings;
use cointrack::domain::user::{self, Role, User};
use cointrack::ports::store_port::PortfolioStore;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "testpass123";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn PortfolioStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_pagination(PaginationSettings::default())
    }

    pub fn with_pagination(pagination: PaginationSettings) -> Self {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        let store: Arc<dyn PortfolioStore> = Arc::new(adapter);
        let router = build_router(AppState {
            store: store.clone(),
            pagination,
        });
        Self { router, store }
    }

    pub fn user(&self, email: &str) -> User {
        user::register(self.store.as_ref(), email, PASSWORD, "Test Name", Role::Regular).unwrap()
    }

    pub fn superuser(&self, email: &str) -> User {
        user::register(self.store.as_ref(), email, PASSWORD, "", Role::Superuser).unwrap()
    }

    pub fn token(&self, email: &str) -> String {
        user::issue_token(self.store.as_ref(), email, PASSWORD).unwrap()
    }

    /// Registers a regular user and returns their token.
    pub fn login(&self, email: &str) -> String {
        self.user(email);
        self.token(email)
    }

    pub fn login_superuser(&self, email: &str) -> String {
        self.superuser(email);
        self.token(email)
    }

    pub fn crypto(&self, symbol: &str, name: &str) {
        self.store
            .create_cryptocurrency(&Cryptocurrency::new(symbol, name).unwrap())
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::PUT, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
