//! Persistence port trait.
//!
//! Transaction writes are atomic with the holdings they affect: an
//! implementation must run each of `create_transaction`, `update_transaction`
//! and `delete_transaction` in one database transaction and call
//! [`crate::domain::holdings::recalculate`] for every affected pair before
//! committing.

use crate::domain::cryptocurrency::Cryptocurrency;
use crate::domain::error::PortfolioError;
use crate::domain::holdings::Holding;
use crate::domain::page::{Page, PageRequest};
use crate::domain::transaction::{Transaction, TransactionDraft};
use crate::domain::user::{NewUser, User, UserChanges};

pub trait PortfolioStore: Send + Sync {
    /// Creates tables and indexes if they do not exist.
    fn initialize_schema(&self) -> Result<(), PortfolioError>;

    /// Cheap round trip used by health checks and `wait-for-db`.
    fn ping(&self) -> Result<(), PortfolioError>;

    fn create_user(&self, user: &NewUser) -> Result<User, PortfolioError>;
    fn find_user(&self, id: i64) -> Result<Option<User>, PortfolioError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, PortfolioError>;
    fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User, PortfolioError>;

    /// Returns the user's existing token, or stores `candidate` as a new one.
    fn token_for_user(&self, user_id: i64, candidate: &str) -> Result<String, PortfolioError>;
    fn user_for_token(&self, key: &str) -> Result<Option<User>, PortfolioError>;

    /// Symbol order; `name_filter` is a case-insensitive substring match.
    fn list_cryptocurrencies(
        &self,
        name_filter: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Cryptocurrency>, PortfolioError>;
    fn get_cryptocurrency(&self, symbol: &str) -> Result<Option<Cryptocurrency>, PortfolioError>;
    fn create_cryptocurrency(&self, crypto: &Cryptocurrency) -> Result<(), PortfolioError>;
    /// Returns false when the symbol already exists.
    fn insert_cryptocurrency_if_absent(
        &self,
        crypto: &Cryptocurrency,
    ) -> Result<bool, PortfolioError>;
    fn rename_cryptocurrency(
        &self,
        symbol: &str,
        name: &str,
    ) -> Result<Cryptocurrency, PortfolioError>;
    /// Cascades to transactions and holdings.
    fn delete_cryptocurrency(&self, symbol: &str) -> Result<(), PortfolioError>;

    /// Newest date first.
    fn list_transactions(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<Transaction>, PortfolioError>;
    fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>, PortfolioError>;
    fn create_transaction(
        &self,
        user_id: i64,
        draft: &TransactionDraft,
    ) -> Result<Transaction, PortfolioError>;
    fn update_transaction(
        &self,
        user_id: i64,
        id: i64,
        draft: &TransactionDraft,
    ) -> Result<Transaction, PortfolioError>;
    fn delete_transaction(&self, user_id: i64, id: i64) -> Result<(), PortfolioError>;

    /// Largest amount first.
    fn list_holdings(&self, user_id: i64, page: PageRequest)
    -> Result<Page<Holding>, PortfolioError>;
    fn get_holding(&self, user_id: i64, id: i64) -> Result<Option<Holding>, PortfolioError>;
}
