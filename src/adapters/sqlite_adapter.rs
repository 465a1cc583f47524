//! SQLite store adapter.
//!
//! Decimals are stored as TEXT at scale 5 and summed in Rust; timestamps are
//! fixed-width RFC 3339 strings so they sort lexically.

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::adapters::like_pattern;
use crate::domain::cryptocurrency::Cryptocurrency;
use crate::domain::error::PortfolioError;
use crate::domain::holdings::{self, Holding, LedgerChange};
use crate::domain::page::{Page, PageRequest};
use crate::domain::transaction::{Transaction, TransactionDraft, TransactionKind};
use crate::domain::user::{NewUser, User, UserChanges};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::HoldingsLedger;
use crate::ports::store_port::PortfolioStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_staff INTEGER NOT NULL DEFAULT 0,
    is_superuser INTEGER NOT NULL DEFAULT 0,
    date_joined TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS auth_tokens (
    key TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    created TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS cryptocurrencies (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    crypto TEXT NOT NULL REFERENCES cryptocurrencies(symbol) ON DELETE CASCADE,
    date TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('buy', 'sell')),
    amount TEXT NOT NULL,
    price TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_user_crypto ON transactions(user_id, crypto);
CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
CREATE TABLE IF NOT EXISTS user_coins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    crypto TEXT NOT NULL REFERENCES cryptocurrencies(symbol) ON DELETE CASCADE,
    amount TEXT NOT NULL,
    UNIQUE (user_id, crypto)
);";

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, date_joined";
const TRANSACTION_COLUMNS: &str = "id, user_id, crypto, kind, amount, price, date";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PortfolioError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| PortfolioError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path).with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(PortfolioError::database)?;

        tracing::info!(path = %db_path, pool_size, "opened sqlite store");
        Ok(Self { pool })
    }

    /// Single-connection in-memory store; every checkout sees the same database.
    pub fn in_memory() -> Result<Self, PortfolioError> {
        let manager = SqliteConnectionManager::memory().with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(PortfolioError::database)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PortfolioError> {
        self.pool.get().map_err(PortfolioError::database)
    }

    fn fetch_transaction(
        conn: &Connection,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Transaction>, PortfolioError> {
        conn.query_row(
            &format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?1 AND id = ?2"
            ),
            params![user_id, id],
            transaction_from_row,
        )
        .optional()
        .map_err(PortfolioError::query)
    }
}

fn configure_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn kind_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<TransactionKind> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        is_active: row.get(4)?,
        is_staff: row.get(5)?,
        is_superuser: row.get(6)?,
        date_joined: timestamp_at(row, 7)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        crypto: row.get(2)?,
        kind: kind_at(row, 3)?,
        amount: decimal_at(row, 4)?,
        price: decimal_at(row, 5)?,
        date: timestamp_at(row, 6)?,
    })
}

fn holding_from_row(row: &Row<'_>) -> rusqlite::Result<Holding> {
    Ok(Holding {
        id: row.get(0)?,
        user_id: row.get(1)?,
        crypto: row.get(2)?,
        amount: decimal_at(row, 3)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn page_param(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Holdings view over an open SQLite transaction.
struct SqliteLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteLedger<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl HoldingsLedger for SqliteLedger<'_> {
    fn pair_amounts(
        &mut self,
        user_id: i64,
        crypto: &str,
    ) -> Result<Vec<(TransactionKind, Decimal)>, PortfolioError> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, amount FROM transactions WHERE user_id = ?1 AND crypto = ?2")
            .map_err(PortfolioError::query)?;
        let rows = stmt
            .query_map(params![user_id, crypto], |row| {
                Ok((kind_at(row, 0)?, decimal_at(row, 1)?))
            })
            .map_err(PortfolioError::query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(PortfolioError::query)
    }

    fn store_holding(
        &mut self,
        user_id: i64,
        crypto: &str,
        amount: Decimal,
    ) -> Result<(), PortfolioError> {
        self.conn
            .execute(
                "INSERT INTO user_coins (user_id, crypto, amount) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, crypto) DO UPDATE SET amount = excluded.amount",
                params![user_id, crypto, amount.to_string()],
            )
            .map_err(PortfolioError::query)?;
        Ok(())
    }

    fn remove_holding(&mut self, user_id: i64, crypto: &str) -> Result<(), PortfolioError> {
        self.conn
            .execute(
                "DELETE FROM user_coins WHERE user_id = ?1 AND crypto = ?2",
                params![user_id, crypto],
            )
            .map_err(PortfolioError::query)?;
        Ok(())
    }
}

impl PortfolioStore for SqliteAdapter {
    fn initialize_schema(&self) -> Result<(), PortfolioError> {
        self.conn()?
            .execute_batch(SCHEMA)
            .map_err(PortfolioError::query)?;
        tracing::debug!("sqlite schema ready");
        Ok(())
    }

    fn ping(&self) -> Result<(), PortfolioError> {
        self.conn()?
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(PortfolioError::query)?;
        Ok(())
    }

    fn create_user(&self, user: &NewUser) -> Result<User, PortfolioError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser, date_joined)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)",
            params![
                user.email,
                user.name,
                user.password_hash,
                user.is_staff,
                user.is_superuser,
                format_timestamp(&Utc::now()),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                PortfolioError::AlreadyExists {
                    entity: "user",
                    field: "email",
                }
            } else {
                PortfolioError::query(e)
            }
        })?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.find_user(id)?
            .ok_or_else(|| PortfolioError::not_found("user", id))
    }

    fn find_user(&self, id: i64) -> Result<Option<User>, PortfolioError> {
        self.conn()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(PortfolioError::query)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, PortfolioError> {
        self.conn()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(PortfolioError::query)
    }

    fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User, PortfolioError> {
        self.conn()?
            .query_row(
                &format!(
                    "UPDATE users SET email = COALESCE(?1, email), name = COALESCE(?2, name),
                     password_hash = COALESCE(?3, password_hash)
                     WHERE id = ?4 RETURNING {USER_COLUMNS}"
                ),
                params![changes.email, changes.name, changes.password_hash, id],
                user_from_row,
            )
            .optional()
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    PortfolioError::AlreadyExists {
                        entity: "user",
                        field: "email",
                    }
                } else {
                    PortfolioError::query(e)
                }
            })?
            .ok_or_else(|| PortfolioError::not_found("user", id))
    }

    fn token_for_user(&self, user_id: i64, candidate: &str) -> Result<String, PortfolioError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO auth_tokens (key, user_id, created) VALUES (?1, ?2, ?3)",
            params![candidate, user_id, format_timestamp(&Utc::now())],
        )
        .map_err(PortfolioError::query)?;
        conn.query_row(
            "SELECT key FROM auth_tokens WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(PortfolioError::query)
    }

    fn user_for_token(&self, key: &str) -> Result<Option<User>, PortfolioError> {
        let columns = USER_COLUMNS
            .split(", ")
            .map(|c| format!("u.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn()?
            .query_row(
                &format!(
                    "SELECT {columns} FROM auth_tokens t JOIN users u ON u.id = t.user_id
                     WHERE t.key = ?1"
                ),
                params![key],
                user_from_row,
            )
            .optional()
            .map_err(PortfolioError::query)
    }

    fn list_cryptocurrencies(
        &self,
        name_filter: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Cryptocurrency>, PortfolioError> {
        let conn = self.conn()?;
        let pattern = like_pattern(name_filter.unwrap_or(""));

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM cryptocurrencies WHERE name LIKE ?1 ESCAPE '\\'",
                params![pattern],
                |row| row.get(0),
            )
            .map_err(PortfolioError::query)?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, name FROM cryptocurrencies WHERE name LIKE ?1 ESCAPE '\\'
                 ORDER BY symbol LIMIT ?2 OFFSET ?3",
            )
            .map_err(PortfolioError::query)?;
        let rows = stmt
            .query_map(
                params![pattern, page_param(page.limit()), page_param(page.offset())],
                |row| {
                    Ok(Cryptocurrency {
                        symbol: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .map_err(PortfolioError::query)?;

        Ok(Page {
            items: rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(PortfolioError::query)?,
            count: count as u64,
            request: page,
        })
    }

    fn get_cryptocurrency(&self, symbol: &str) -> Result<Option<Cryptocurrency>, PortfolioError> {
        self.conn()?
            .query_row(
                "SELECT symbol, name FROM cryptocurrencies WHERE symbol = ?1",
                params![symbol],
                |row| {
                    Ok(Cryptocurrency {
                        symbol: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(PortfolioError::query)
    }

    fn create_cryptocurrency(&self, crypto: &Cryptocurrency) -> Result<(), PortfolioError> {
        if self.insert_cryptocurrency_if_absent(crypto)? {
            Ok(())
        } else {
            Err(PortfolioError::AlreadyExists {
                entity: "cryptocurrency",
                field: "symbol",
            })
        }
    }

    fn insert_cryptocurrency_if_absent(
        &self,
        crypto: &Cryptocurrency,
    ) -> Result<bool, PortfolioError> {
        let inserted = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO cryptocurrencies (symbol, name) VALUES (?1, ?2)",
                params![crypto.symbol, crypto.name],
            )
            .map_err(PortfolioError::query)?;
        Ok(inserted == 1)
    }

    fn rename_cryptocurrency(
        &self,
        symbol: &str,
        name: &str,
    ) -> Result<Cryptocurrency, PortfolioError> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE cryptocurrencies SET name = ?1 WHERE symbol = ?2",
                params![name, symbol],
            )
            .map_err(PortfolioError::query)?;
        if updated == 0 {
            return Err(PortfolioError::not_found("cryptocurrency", symbol));
        }
        Ok(Cryptocurrency {
            symbol: symbol.to_string(),
            name: name.to_string(),
        })
    }

    fn delete_cryptocurrency(&self, symbol: &str) -> Result<(), PortfolioError> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM cryptocurrencies WHERE symbol = ?1",
                params![symbol],
            )
            .map_err(PortfolioError::query)?;
        if deleted == 0 {
            return Err(PortfolioError::not_found("cryptocurrency", symbol));
        }
        Ok(())
    }

    fn list_transactions(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<Transaction>, PortfolioError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(PortfolioError::query)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?1
                 ORDER BY date DESC, id DESC LIMIT ?2 OFFSET ?3"
            ))
            .map_err(PortfolioError::query)?;
        let rows = stmt
            .query_map(
                params![user_id, page_param(page.limit()), page_param(page.offset())],
                transaction_from_row,
            )
            .map_err(PortfolioError::query)?;

        Ok(Page {
            items: rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(PortfolioError::query)?,
            count: count as u64,
            request: page,
        })
    }

    fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>, PortfolioError> {
        let conn = self.conn()?;
        Self::fetch_transaction(&conn, user_id, id)
    }

    fn create_transaction(
        &self,
        user_id: i64,
        draft: &TransactionDraft,
    ) -> Result<Transaction, PortfolioError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(PortfolioError::query)?;

        tx.execute(
            "INSERT INTO transactions (user_id, crypto, date, kind, amount, price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                draft.crypto,
                format_timestamp(&draft.date),
                draft.kind.as_str(),
                draft.amount.to_string(),
                draft.price.to_string(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                PortfolioError::field("crypto", "Invalid crypto. This crypto does not exist.")
            } else {
                PortfolioError::query(e)
            }
        })?;
        let id = tx.last_insert_rowid();

        holdings::recalculate(
            &mut SqliteLedger::new(&tx),
            user_id,
            &draft.crypto,
            LedgerChange::Write,
        )?;
        tx.commit().map_err(PortfolioError::query)?;

        Ok(Transaction {
            id,
            user_id,
            crypto: draft.crypto.clone(),
            kind: draft.kind,
            amount: draft.amount,
            price: draft.price,
            date: draft.date,
        })
    }

    fn update_transaction(
        &self,
        user_id: i64,
        id: i64,
        draft: &TransactionDraft,
    ) -> Result<Transaction, PortfolioError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(PortfolioError::query)?;

        let existing = Self::fetch_transaction(&tx, user_id, id)?
            .ok_or_else(|| PortfolioError::not_found("transaction", id))?;

        tx.execute(
            "UPDATE transactions SET crypto = ?1, date = ?2, kind = ?3, amount = ?4, price = ?5
             WHERE id = ?6 AND user_id = ?7",
            params![
                draft.crypto,
                format_timestamp(&draft.date),
                draft.kind.as_str(),
                draft.amount.to_string(),
                draft.price.to_string(),
                id,
                user_id,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                PortfolioError::field("crypto", "Invalid crypto. This crypto does not exist.")
            } else {
                PortfolioError::query(e)
            }
        })?;

        let mut ledger = SqliteLedger::new(&tx);
        for crypto in holdings::affected_cryptos(Some(&existing.crypto), &draft.crypto) {
            holdings::recalculate(&mut ledger, user_id, crypto, LedgerChange::Write)?;
        }
        tx.commit().map_err(PortfolioError::query)?;

        Ok(Transaction {
            id,
            user_id,
            crypto: draft.crypto.clone(),
            kind: draft.kind,
            amount: draft.amount,
            price: draft.price,
            date: draft.date,
        })
    }

    fn delete_transaction(&self, user_id: i64, id: i64) -> Result<(), PortfolioError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(PortfolioError::query)?;

        let existing = Self::fetch_transaction(&tx, user_id, id)?
            .ok_or_else(|| PortfolioError::not_found("transaction", id))?;

        tx.execute(
            "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
        .map_err(PortfolioError::query)?;

        holdings::recalculate(
            &mut SqliteLedger::new(&tx),
            user_id,
            &existing.crypto,
            LedgerChange::Delete,
        )?;
        tx.commit().map_err(PortfolioError::query)
    }

    fn list_holdings(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<Holding>, PortfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, user_id, crypto, amount FROM user_coins WHERE user_id = ?1")
            .map_err(PortfolioError::query)?;
        let mut all = stmt
            .query_map(params![user_id], holding_from_row)
            .map_err(PortfolioError::query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(PortfolioError::query)?;

        // TEXT amounts do not sort numerically in SQL
        all.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.crypto.cmp(&b.crypto)));
        let count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(Page {
            items,
            count,
            request: page,
        })
    }

    fn get_holding(&self, user_id: i64, id: i64) -> Result<Option<Holding>, PortfolioError> {
        self.conn()?
            .query_row(
                "SELECT id, user_id, crypto, amount FROM user_coins WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
                holding_from_row,
            )
            .optional()
            .map_err(PortfolioError::query)
    }
}
