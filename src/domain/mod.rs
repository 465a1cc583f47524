//! Core domain types and logic.

pub mod credentials;
pub mod cryptocurrency;
pub mod error;
pub mod holdings;
pub mod page;
pub mod portfolio;
pub mod transaction;
pub mod user;
