//! Holdings ledger port: the view of one open unit of work used by the
//! holdings-recalculation rule.

use crate::domain::error::PortfolioError;
use crate::domain::transaction::TransactionKind;
use rust_decimal::Decimal;

pub trait HoldingsLedger {
    /// Kind and amount of every transaction recorded for the pair.
    fn pair_amounts(
        &mut self,
        user_id: i64,
        crypto: &str,
    ) -> Result<Vec<(TransactionKind, Decimal)>, PortfolioError>;

    /// Inserts or overwrites the holding row for the pair.
    fn store_holding(
        &mut self,
        user_id: i64,
        crypto: &str,
        amount: Decimal,
    ) -> Result<(), PortfolioError>;

    fn remove_holding(&mut self, user_id: i64, crypto: &str) -> Result<(), PortfolioError>;
}
