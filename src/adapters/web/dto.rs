//! Request and response bodies of the JSON API.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::domain::cryptocurrency::Cryptocurrency;
use crate::domain::error::FieldError;
use crate::domain::holdings::Holding;
use crate::domain::transaction::{Transaction, TransactionPatch};
use crate::domain::user::{ProfilePatch, User};

const REQUIRED: &str = "This field is required.";

/// Takes a required field out of a request, recording it as missing.
pub(crate) fn required(
    field: &'static str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> String {
    value.unwrap_or_else(|| {
        errors.push(FieldError::new(field, REQUIRED));
        String::new()
    })
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

impl From<ProfileRequest> for ProfilePatch {
    fn from(req: ProfileRequest) -> Self {
        ProfilePatch {
            email: req.email,
            name: req.name,
            password: req.password,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserBody {
    pub email: String,
    pub name: String,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenBody {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CryptocurrencyRequest {
    pub symbol: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CryptocurrencyBody {
    pub symbol: String,
    pub name: String,
}

impl From<Cryptocurrency> for CryptocurrencyBody {
    fn from(crypto: Cryptocurrency) -> Self {
        Self {
            symbol: crypto.symbol,
            name: crypto.name,
        }
    }
}

/// Transaction fields as submitted. Amount and price may be JSON strings or
/// numbers.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TransactionRequest {
    pub crypto: Option<String>,
    #[schema(value_type = Option<String>, example = "2023-09-01T12:00:00Z")]
    pub date: Option<Value>,
    #[serde(rename = "type")]
    #[schema(example = "buy")]
    pub kind: Option<String>,
    #[schema(value_type = Option<String>, example = "1.5")]
    pub amount: Option<Value>,
    #[schema(value_type = Option<String>, example = "27000.00")]
    pub price: Option<Value>,
}

impl TransactionRequest {
    /// Parses the loosely typed fields; format errors are reported per field.
    pub fn into_patch(self) -> Result<TransactionPatch, Vec<FieldError>> {
        let mut errors = Vec::new();
        let date = parse_field(&mut errors, "date", self.date, parse_datetime);
        let amount = parse_field(&mut errors, "amount", self.amount, parse_decimal);
        let price = parse_field(&mut errors, "price", self.price, parse_decimal);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(TransactionPatch {
            crypto: self.crypto,
            date,
            kind: self.kind,
            amount,
            price,
        })
    }
}

fn parse_field<T>(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<Value>,
    parse: fn(&Value) -> Result<T, &'static str>,
) -> Option<T> {
    match value.as_ref().filter(|v| !v.is_null()).map(parse) {
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(message)) => {
            errors.push(FieldError::new(field, message));
            None
        }
        None => None,
    }
}

/// Parses without rounding; input `Decimal` cannot hold exactly is rejected.
fn parse_decimal(value: &Value) -> Result<Decimal, &'static str> {
    const INVALID: &str = "A valid number is required.";
    const TOO_PRECISE: &str = "Ensure that there are no more than 28 digits in total.";
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(INVALID),
    };
    match Decimal::from_str_exact(&raw) {
        Ok(parsed) => Ok(parsed),
        Err(_) if Decimal::from_str(&raw).is_ok() => Err(TOO_PRECISE),
        Err(_) => Decimal::from_scientific(&raw).map_err(|_| INVALID),
    }
}

/// RFC 3339, or a naive ISO 8601 timestamp taken as UTC.
fn parse_datetime(value: &Value) -> Result<DateTime<Utc>, &'static str> {
    const INVALID: &str = "Datetime has wrong format. Use one of these formats instead: \
                           YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";
    let Value::String(raw) = value else {
        return Err(INVALID);
    };
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or(INVALID)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionBody {
    pub id: i64,
    pub crypto: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    #[schema(example = "buy")]
    pub kind: String,
    #[schema(value_type = String, example = "1.50000")]
    pub amount: Decimal,
    #[schema(value_type = String, example = "27000.00000")]
    pub price: Decimal,
}

impl From<Transaction> for TransactionBody {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            crypto: tx.crypto,
            date: tx.date,
            kind: tx.kind.to_string(),
            amount: tx.amount,
            price: tx.price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HoldingBody {
    pub id: i64,
    pub crypto: String,
    #[schema(value_type = String, example = "6.50000")]
    pub amount: Decimal,
}

impl From<Holding> for HoldingBody {
    fn from(holding: Holding) -> Self {
        Self {
            id: holding.id,
            crypto: holding.crypto,
            amount: holding.amount,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthBody {
    pub healthy: bool,
}

/// Page-number pagination envelope.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    CryptocurrencyPage = Paginated<CryptocurrencyBody>,
    TransactionPage = Paginated<TransactionBody>,
    HoldingPage = Paginated<HoldingBody>
)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}
