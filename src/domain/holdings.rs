//! Holdings: the per-(user, cryptocurrency) net position cache.
//!
//! A holding is never written directly. Every transaction write calls
//! [`recalculate`] for each pair it touched, inside the same unit of work,
//! and the write is abandoned if the pair would go negative.

use rust_decimal::Decimal;

use crate::domain::error::PortfolioError;
use crate::domain::transaction::{DECIMAL_PLACES, TransactionKind};
use crate::ports::ledger_port::HoldingsLedger;

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub id: i64,
    pub user_id: i64,
    pub crypto: String,
    pub amount: Decimal,
}

/// What kind of transaction write triggered a recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Write,
    Delete,
}

impl LedgerChange {
    pub fn rejection_message(&self) -> &'static str {
        match self {
            LedgerChange::Write => "Transaction would result in negative holdings.",
            LedgerChange::Delete => {
                "Deleting this 'buy' transaction would result in negative holdings."
            }
        }
    }
}

/// Whole digits a stored holding may carry.
pub const HOLDING_MAX_WHOLE_DIGITS: u32 = 15;

/// Sum of buy amounts minus sum of sell amounts. `None` on overflow.
pub fn net_amount(entries: &[(TransactionKind, Decimal)]) -> Option<Decimal> {
    let (bought, sold) = entries.iter().try_fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(b, s), (kind, amount)| match kind {
            TransactionKind::Buy => Some((b.checked_add(*amount)?, s)),
            TransactionKind::Sell => Some((b, s.checked_add(*amount)?)),
        },
    )?;
    bought.checked_sub(sold)
}

fn holding_limit() -> Decimal {
    Decimal::from_i128_with_scale(10_i128.pow(HOLDING_MAX_WHOLE_DIGITS), 0)
}

/// Recomputes the pair's holding from its full transaction history and
/// writes it back: removed at zero, rejected below zero or past
/// [`HOLDING_MAX_WHOLE_DIGITS`].
pub fn recalculate(
    ledger: &mut dyn HoldingsLedger,
    user_id: i64,
    crypto: &str,
    change: LedgerChange,
) -> Result<Decimal, PortfolioError> {
    let entries = ledger.pair_amounts(user_id, crypto)?;
    let too_large = || {
        tracing::warn!(user_id, crypto, "rejecting write: holdings too large");
        PortfolioError::HoldingsTooLarge(format!(
            "Transaction would result in holdings with more than \
             {HOLDING_MAX_WHOLE_DIGITS} digits before the decimal point."
        ))
    };
    let mut total = net_amount(&entries).ok_or_else(too_large)?;

    if total.is_sign_negative() && !total.is_zero() {
        tracing::warn!(user_id, crypto, %total, "rejecting write: negative holdings");
        return Err(PortfolioError::NegativeHoldings(
            change.rejection_message().to_string(),
        ));
    }
    if total >= holding_limit() {
        return Err(too_large());
    }

    if total.is_zero() {
        ledger.remove_holding(user_id, crypto)?;
    } else {
        total.rescale(DECIMAL_PLACES);
        ledger.store_holding(user_id, crypto, total)?;
    }
    Ok(total)
}

/// Pairs touched by moving a transaction from `before` to `after`.
pub fn affected_cryptos<'a>(before: Option<&'a str>, after: &'a str) -> Vec<&'a str> {
    match before {
        Some(old) if old != after => vec![old, after],
        _ => vec![after],
    }
}
