//! Cryptocurrency catalog entries.

use crate::domain::error::{FieldError, PortfolioError};

pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_NAME_LEN: usize = 100;

/// A catalog entry. The symbol is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cryptocurrency {
    pub symbol: String,
    pub name: String,
}

impl Cryptocurrency {
    /// Validates and normalizes a new catalog entry.
    pub fn new(symbol: &str, name: &str) -> Result<Self, PortfolioError> {
        let mut errors = Vec::new();
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => {
                errors.push(e);
                String::new()
            }
        };
        let name = match validate_name(name) {
            Ok(n) => n,
            Err(e) => {
                errors.push(e);
                String::new()
            }
        };
        if !errors.is_empty() {
            return Err(PortfolioError::Validation(errors));
        }
        Ok(Self { symbol, name })
    }
}

/// Trims and upper-cases a ticker symbol.
pub fn normalize_symbol(raw: &str) -> Result<String, FieldError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(FieldError::new("symbol", "This field may not be blank."));
    }
    if symbol.chars().count() > MAX_SYMBOL_LEN {
        return Err(FieldError::new(
            "symbol",
            format!("Ensure this field has no more than {MAX_SYMBOL_LEN} characters."),
        ));
    }
    Ok(symbol)
}

pub fn validate_name(raw: &str) -> Result<String, FieldError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FieldError::new("name", "This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(FieldError::new(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        ));
    }
    Ok(name.to_string())
}
