//! Transaction write operations for a single user.
//!
//! These validate input and hand off to the store, which applies the write
//! and the holdings recalculation atomically.

use chrono::{DateTime, Utc};

use crate::domain::error::PortfolioError;
use crate::domain::transaction::{Transaction, TransactionDraft, TransactionPatch};
use crate::ports::store_port::PortfolioStore;

fn ensure_crypto_exists(
    store: &dyn PortfolioStore,
    draft: &TransactionDraft,
) -> Result<(), PortfolioError> {
    if store.get_cryptocurrency(&draft.crypto)?.is_none() {
        return Err(PortfolioError::field(
            "crypto",
            "Invalid crypto. This crypto does not exist.",
        ));
    }
    Ok(())
}

pub fn record_transaction(
    store: &dyn PortfolioStore,
    user_id: i64,
    patch: TransactionPatch,
    now: DateTime<Utc>,
) -> Result<Transaction, PortfolioError> {
    let draft = patch.resolve(None, now)?;
    ensure_crypto_exists(store, &draft)?;
    let transaction = store.create_transaction(user_id, &draft)?;
    tracing::info!(transaction_id = transaction.id, "{transaction}");
    Ok(transaction)
}

/// Full (`partial == false`) or partial update of one of the user's
/// transactions.
pub fn revise_transaction(
    store: &dyn PortfolioStore,
    user_id: i64,
    id: i64,
    patch: TransactionPatch,
    partial: bool,
    now: DateTime<Utc>,
) -> Result<Transaction, PortfolioError> {
    let existing = store
        .get_transaction(user_id, id)?
        .ok_or_else(|| PortfolioError::not_found("transaction", id))?;
    let base = partial.then_some(&existing);
    let draft = patch.resolve(base, now)?;
    ensure_crypto_exists(store, &draft)?;
    let transaction = store.update_transaction(user_id, id, &draft)?;
    tracing::info!(transaction_id = id, "updated: {transaction}");
    Ok(transaction)
}

pub fn remove_transaction(
    store: &dyn PortfolioStore,
    user_id: i64,
    id: i64,
) -> Result<(), PortfolioError> {
    store.delete_transaction(user_id, id)?;
    tracing::info!(user_id, transaction_id = id, "deleted transaction");
    Ok(())
}
