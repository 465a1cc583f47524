//! Buy/sell transactions and their validation.
//!
//! Requests arrive as a [`TransactionPatch`] with every field optional. A patch
//! is resolved against an optional base transaction (for partial updates) into
//! a fully validated [`TransactionDraft`], which is what the store persists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::domain::cryptocurrency::normalize_symbol;
use crate::domain::error::{FieldError, PortfolioError};

/// Decimal places kept for amounts and prices.
pub const DECIMAL_PLACES: u32 = 5;
/// The most digits `Decimal` holds exactly at [`DECIMAL_PLACES`].
pub const AMOUNT_MAX_DIGITS: u32 = 28;
pub const PRICE_MAX_DIGITS: u32 = 20;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "buy",
            TransactionKind::Sell => "sell",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TransactionKind::Buy),
            "sell" => Ok(TransactionKind::Sell),
            _ => Err(FieldError::new("type", "Invalid transaction type.")),
        }
    }
}

/// A persisted transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub crypto: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub price: Decimal,
    pub date: DateTime<Utc>,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            TransactionKind::Buy => "bought",
            TransactionKind::Sell => "sold",
        };
        write!(
            f,
            "user {} {} {} {} at {}",
            self.user_id, verb, self.amount, self.crypto, self.price
        )
    }
}

/// A validated transaction ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub crypto: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub price: Decimal,
    pub date: DateTime<Utc>,
}

/// Raw transaction fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub crypto: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub kind: Option<String>,
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
}

impl TransactionPatch {
    /// Validates the patch. Fields missing from the patch are taken from
    /// `base`; with no base every field is required.
    pub fn resolve(
        self,
        base: Option<&Transaction>,
        now: DateTime<Utc>,
    ) -> Result<TransactionDraft, PortfolioError> {
        let mut errors = Vec::new();

        let crypto = collect(
            &mut errors,
            match self.crypto {
                Some(raw) => normalize_symbol(&raw).map_err(|e| FieldError::new("crypto", e.message)),
                None => base
                    .map(|b| b.crypto.clone())
                    .ok_or_else(|| FieldError::new("crypto", REQUIRED)),
            },
        );

        let date = collect(
            &mut errors,
            match self.date {
                Some(date) => validate_date(date, now),
                None => base
                    .map(|b| b.date)
                    .ok_or_else(|| FieldError::new("date", REQUIRED)),
            },
        );

        let kind = collect(
            &mut errors,
            match self.kind {
                Some(raw) => raw.parse::<TransactionKind>(),
                None => base
                    .map(|b| b.kind)
                    .ok_or_else(|| FieldError::new("type", REQUIRED)),
            },
        );

        let amount = collect(
            &mut errors,
            match self.amount {
                Some(value) => validate_decimal("amount", "Amount", value, AMOUNT_MAX_DIGITS),
                None => base
                    .map(|b| b.amount)
                    .ok_or_else(|| FieldError::new("amount", REQUIRED)),
            },
        );

        let price = collect(
            &mut errors,
            match self.price {
                Some(value) => validate_decimal("price", "Price", value, PRICE_MAX_DIGITS),
                None => base
                    .map(|b| b.price)
                    .ok_or_else(|| FieldError::new("price", REQUIRED)),
            },
        );

        match (crypto, date, kind, amount, price) {
            (Some(crypto), Some(date), Some(kind), Some(amount), Some(price)) if errors.is_empty() => {
                Ok(TransactionDraft {
                    crypto,
                    kind,
                    amount,
                    price,
                    date,
                })
            }
            _ => Err(PortfolioError::Validation(errors)),
        }
    }
}

fn collect<T>(errors: &mut Vec<FieldError>, result: Result<T, FieldError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

pub fn validate_date(date: DateTime<Utc>, now: DateTime<Utc>) -> Result<DateTime<Utc>, FieldError> {
    if date > now {
        return Err(FieldError::new("date", "Date cannot be in the future."));
    }
    Ok(date)
}

/// Checks sign, minimum, precision and magnitude, then rescales to
/// [`DECIMAL_PLACES`].
pub fn validate_decimal(
    field: &'static str,
    label: &str,
    value: Decimal,
    max_digits: u32,
) -> Result<Decimal, FieldError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FieldError::new(field, format!("{label} cannot be negative.")));
    }
    if value < Decimal::new(1, 2) {
        return Err(FieldError::new(
            field,
            "Ensure this value is greater than or equal to 0.01.",
        ));
    }
    if value.normalize().scale() > DECIMAL_PLACES {
        return Err(FieldError::new(
            field,
            format!("Ensure that there are no more than {DECIMAL_PLACES} decimal places."),
        ));
    }
    let whole_digits = max_digits - DECIMAL_PLACES;
    if value.trunc() >= Decimal::from_i128_with_scale(10_i128.pow(whole_digits), 0) {
        return Err(FieldError::new(
            field,
            format!("Ensure that there are no more than {whole_digits} digits before the decimal point."),
        ));
    }
    let mut scaled = value;
    scaled.rescale(DECIMAL_PLACES);
    if scaled.scale() != DECIMAL_PLACES {
        return Err(FieldError::new(
            field,
            format!("Ensure that there are no more than {max_digits} digits in total."),
        ));
    }
    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn full_patch() -> TransactionPatch {
        TransactionPatch {
            crypto: Some("btc".into()),
            date: Some(Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap()),
            kind: Some("buy".into()),
            amount: Some(dec!(1.0)),
            price: Some(dec!(100.0)),
        }
    }

    fn stored() -> Transaction {
        Transaction {
            id: 7,
            user_id: 1,
            crypto: "BTC".into(),
            kind: TransactionKind::Buy,
            amount: dec!(10.00000),
            price: dec!(100.00000),
            date: Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap(),
        }
    }

    fn fields_of(err: PortfolioError) -> Vec<(String, String)> {
        match err {
            PortfolioError::Validation(errors) => {
                errors.into_iter().map(|e| (e.field, e.message)).collect()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn full_patch_resolves_and_rescales() {
        let draft = full_patch().resolve(None, now()).unwrap();
        assert_eq!(draft.crypto, "BTC");
        assert_eq!(draft.kind, TransactionKind::Buy);
        assert_eq!(draft.amount.to_string(), "1.00000");
        assert_eq!(draft.price.to_string(), "100.00000");
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let patch = TransactionPatch {
            date: Some(Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let fields = fields_of(patch.resolve(None, now()).unwrap_err());
        let names: Vec<_> = fields.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(names, vec!["crypto", "type", "amount", "price"]);
        assert!(fields.iter().all(|(_, m)| m == REQUIRED));
    }

    #[test]
    fn partial_patch_keeps_base_fields() {
        let patch = TransactionPatch {
            kind: Some("sell".into()),
            ..Default::default()
        };
        let draft = patch.resolve(Some(&stored()), now()).unwrap();
        assert_eq!(draft.kind, TransactionKind::Sell);
        assert_eq!(draft.amount, dec!(10.00000));
        assert_eq!(draft.crypto, "BTC");
    }

    #[test]
    fn negative_amount_rejected() {
        let patch = TransactionPatch {
            amount: Some(dec!(-1.0)),
            ..full_patch()
        };
        let fields = fields_of(patch.resolve(None, now()).unwrap_err());
        assert_eq!(
            fields,
            vec![("amount".to_string(), "Amount cannot be negative.".to_string())]
        );
    }

    #[test]
    fn negative_price_rejected() {
        let patch = TransactionPatch {
            price: Some(dec!(-100.0)),
            ..full_patch()
        };
        let fields = fields_of(patch.resolve(None, now()).unwrap_err());
        assert_eq!(
            fields,
            vec![("price".to_string(), "Price cannot be negative.".to_string())]
        );
    }

    #[test]
    fn zero_amount_below_minimum() {
        let err = validate_decimal("amount", "Amount", dec!(0), AMOUNT_MAX_DIGITS).unwrap_err();
        assert_eq!(err.message, "Ensure this value is greater than or equal to 0.01.");
        assert!(validate_decimal("amount", "Amount", dec!(0.01), AMOUNT_MAX_DIGITS).is_ok());
    }

    #[test]
    fn too_many_decimal_places_rejected() {
        let err = validate_decimal("price", "Price", dec!(1.123456), PRICE_MAX_DIGITS).unwrap_err();
        assert!(err.message.contains("5 decimal places"));
        // trailing zeros do not count
        assert!(validate_decimal("price", "Price", dec!(1.1234500), PRICE_MAX_DIGITS).is_ok());
    }

    #[test]
    fn price_magnitude_limited_to_fifteen_whole_digits() {
        assert!(validate_decimal("price", "Price", dec!(999999999999999.5), PRICE_MAX_DIGITS).is_ok());
        let err =
            validate_decimal("price", "Price", dec!(1000000000000000), PRICE_MAX_DIGITS).unwrap_err();
        assert!(err.message.contains("15 digits"));
    }

    #[test]
    fn amount_limited_to_twenty_three_whole_digits() {
        let widest = dec!(99999999999999999999999.12345);
        let stored = validate_decimal("amount", "Amount", widest, AMOUNT_MAX_DIGITS).unwrap();
        assert_eq!(stored.to_string(), "99999999999999999999999.12345");

        let err = validate_decimal(
            "amount",
            "Amount",
            dec!(999999999999999999999999.1),
            AMOUNT_MAX_DIGITS,
        )
        .unwrap_err();
        assert_eq!(
            err.message,
            "Ensure that there are no more than 23 digits before the decimal point."
        );
    }

    #[test]
    fn future_date_rejected() {
        let patch = TransactionPatch {
            date: Some(now() + chrono::Duration::seconds(1)),
            ..full_patch()
        };
        let fields = fields_of(patch.resolve(None, now()).unwrap_err());
        assert_eq!(
            fields,
            vec![("date".to_string(), "Date cannot be in the future.".to_string())]
        );
    }

    #[test]
    fn unknown_type_rejected() {
        let patch = TransactionPatch {
            kind: Some("hold".into()),
            ..full_patch()
        };
        let fields = fields_of(patch.resolve(None, now()).unwrap_err());
        assert_eq!(
            fields,
            vec![("type".to_string(), "Invalid transaction type.".to_string())]
        );
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [TransactionKind::Buy, TransactionKind::Sell] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn display_reads_as_sentence() {
        assert_eq!(stored().to_string(), "user 1 bought 10.00000 BTC at 100.00000");
    }
}
