//! Port traits implemented by adapters.

pub mod config_port;
pub mod ledger_port;
pub mod store_port;
