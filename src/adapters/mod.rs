//! Concrete adapter implementations for ports.

pub mod catalog_import;
pub mod file_config_adapter;
#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;

use std::sync::Arc;

use crate::domain::error::PortfolioError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::PortfolioStore;

/// Opens the store named by `[database] backend` (default `sqlite`).
pub fn open_store(config: &dyn ConfigPort) -> Result<Arc<dyn PortfolioStore>, PortfolioError> {
    let backend = config
        .get_string("database", "backend")
        .unwrap_or_else(|| "sqlite".to_string());

    match backend.to_lowercase().as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(sqlite_adapter::SqliteAdapter::from_config(config)?)),
        #[cfg(feature = "postgres")]
        "postgres" => Ok(Arc::new(postgres_adapter::PostgresAdapter::from_config(
            config,
        )?)),
        other => Err(PortfolioError::ConfigInvalid {
            section: "database".into(),
            key: "backend".into(),
            reason: format!("unsupported backend '{other}'"),
        }),
    }
}

/// `%term%` for a LIKE match, with the term's own wildcards escaped by `\`.
#[cfg_attr(not(any(feature = "sqlite", feature = "postgres")), allow(dead_code))]
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
