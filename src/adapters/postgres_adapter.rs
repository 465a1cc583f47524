//! PostgreSQL store adapter.

use chrono::Utc;
use postgres::error::SqlState;
use postgres::{IsolationLevel, NoTls, Row, Transaction as PgTransaction};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use rust_decimal::Decimal;

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
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    is_staff BOOLEAN NOT NULL DEFAULT FALSE,
    is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
    date_joined TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS auth_tokens (
    key VARCHAR(40) PRIMARY KEY,
    user_id BIGINT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    created TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS cryptocurrencies (
    symbol VARCHAR(10) PRIMARY KEY,
    name VARCHAR(100) NOT NULL
);
CREATE TABLE IF NOT EXISTS transactions (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    crypto VARCHAR(10) NOT NULL REFERENCES cryptocurrencies(symbol) ON DELETE CASCADE,
    date TIMESTAMPTZ NOT NULL,
    kind VARCHAR(4) NOT NULL CHECK (kind IN ('buy', 'sell')),
    amount NUMERIC(28, 5) NOT NULL,
    price NUMERIC(20, 5) NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_user_crypto ON transactions(user_id, crypto);
CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
CREATE TABLE IF NOT EXISTS user_coins (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    crypto VARCHAR(10) NOT NULL REFERENCES cryptocurrencies(symbol) ON DELETE CASCADE,
    amount NUMERIC(20, 5) NOT NULL,
    UNIQUE (user_id, crypto)
);";

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, date_joined";
const TRANSACTION_COLUMNS: &str = "id, user_id, crypto, kind, amount, price, date";

type PgConnection = PooledConnection<PostgresConnectionManager<NoTls>>;

pub struct PostgresAdapter {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresAdapter {
    /// Builds the pool without connecting; the first checkout does.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PortfolioError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .ok_or_else(|| PortfolioError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;
        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| PortfolioError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;

        let pool_size = config.get_int("postgres", "pool_size", 4).max(1) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder().max_size(pool_size).build_unchecked(manager);

        tracing::info!(pool_size, "configured postgres store");
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PgConnection, PortfolioError> {
        self.pool.get().map_err(PortfolioError::database)
    }

    fn begin(conn: &mut PgConnection) -> Result<PgTransaction<'_>, PortfolioError> {
        conn.build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .map_err(PortfolioError::query)
    }

    fn fetch_transaction(
        tx: &mut PgTransaction<'_>,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Transaction>, PortfolioError> {
        let row = tx
            .query_opt(
                &format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 AND id = $2"
                ),
                &[&user_id, &id],
            )
            .map_err(PortfolioError::query)?;
        row.as_ref().map(transaction_from_row).transpose()
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get(0),
        email: row.get(1),
        name: row.get(2),
        password_hash: row.get(3),
        is_active: row.get(4),
        is_staff: row.get(5),
        is_superuser: row.get(6),
        date_joined: row.get(7),
    }
}

fn transaction_from_row(row: &Row) -> Result<Transaction, PortfolioError> {
    let kind: String = row.get(3);
    Ok(Transaction {
        id: row.get(0),
        user_id: row.get(1),
        crypto: row.get(2),
        kind: kind.parse().map_err(PortfolioError::query)?,
        amount: row.get(4),
        price: row.get(5),
        date: row.get(6),
    })
}

fn holding_from_row(row: &Row) -> Holding {
    Holding {
        id: row.get(0),
        user_id: row.get(1),
        crypto: row.get(2),
        amount: row.get(3),
    }
}

fn crypto_from_row(row: &Row) -> Cryptocurrency {
    Cryptocurrency {
        symbol: row.get(0),
        name: row.get(1),
    }
}

fn has_state(err: &postgres::Error, state: &SqlState) -> bool {
    err.code() == Some(state)
}

fn unique_email(err: postgres::Error) -> PortfolioError {
    if has_state(&err, &SqlState::UNIQUE_VIOLATION) {
        PortfolioError::AlreadyExists {
            entity: "user",
            field: "email",
        }
    } else {
        PortfolioError::query(err)
    }
}

fn missing_crypto(err: postgres::Error) -> PortfolioError {
    if has_state(&err, &SqlState::FOREIGN_KEY_VIOLATION) {
        PortfolioError::field("crypto", "Invalid crypto. This crypto does not exist.")
    } else {
        PortfolioError::query(err)
    }
}

fn page_param(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Holdings view over an open PostgreSQL transaction.
struct PgLedger<'a, 't> {
    tx: &'a mut PgTransaction<'t>,
}

impl HoldingsLedger for PgLedger<'_, '_> {
    fn pair_amounts(
        &mut self,
        user_id: i64,
        crypto: &str,
    ) -> Result<Vec<(TransactionKind, Decimal)>, PortfolioError> {
        let rows = self
            .tx
            .query(
                "SELECT kind, amount FROM transactions WHERE user_id = $1 AND crypto = $2",
                &[&user_id, &crypto],
            )
            .map_err(PortfolioError::query)?;
        rows.iter()
            .map(|row| {
                let raw: String = row.get(0);
                let kind: TransactionKind = raw.parse().map_err(PortfolioError::query)?;
                Ok((kind, row.get::<_, Decimal>(1)))
            })
            .collect()
    }

    fn store_holding(
        &mut self,
        user_id: i64,
        crypto: &str,
        amount: Decimal,
    ) -> Result<(), PortfolioError> {
        self.tx
            .execute(
                "INSERT INTO user_coins (user_id, crypto, amount) VALUES ($1, $2, $3)
                 ON CONFLICT (user_id, crypto) DO UPDATE SET amount = EXCLUDED.amount",
                &[&user_id, &crypto, &amount],
            )
            .map_err(PortfolioError::query)?;
        Ok(())
    }

    fn remove_holding(&mut self, user_id: i64, crypto: &str) -> Result<(), PortfolioError> {
        self.tx
            .execute(
                "DELETE FROM user_coins WHERE user_id = $1 AND crypto = $2",
                &[&user_id, &crypto],
            )
            .map_err(PortfolioError::query)?;
        Ok(())
    }
}

impl PortfolioStore for PostgresAdapter {
    fn initialize_schema(&self) -> Result<(), PortfolioError> {
        self.conn()?
            .batch_execute(SCHEMA)
            .map_err(PortfolioError::query)?;
        tracing::debug!("postgres schema ready");
        Ok(())
    }

    fn ping(&self) -> Result<(), PortfolioError> {
        self.conn()?
            .simple_query("SELECT 1")
            .map_err(PortfolioError::query)?;
        Ok(())
    }

    fn create_user(&self, user: &NewUser) -> Result<User, PortfolioError> {
        let row = self
            .conn()?
            .query_one(
                &format!(
                    "INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser, date_joined)
                     VALUES ($1, $2, $3, TRUE, $4, $5, $6) RETURNING {USER_COLUMNS}"
                ),
                &[
                    &user.email,
                    &user.name,
                    &user.password_hash,
                    &user.is_staff,
                    &user.is_superuser,
                    &Utc::now(),
                ],
            )
            .map_err(unique_email)?;
        Ok(user_from_row(&row))
    }

    fn find_user(&self, id: i64) -> Result<Option<User>, PortfolioError> {
        let row = self
            .conn()?
            .query_opt(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"),
                &[&id],
            )
            .map_err(PortfolioError::query)?;
        Ok(row.as_ref().map(user_from_row))
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, PortfolioError> {
        let row = self
            .conn()?
            .query_opt(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"),
                &[&email],
            )
            .map_err(PortfolioError::query)?;
        Ok(row.as_ref().map(user_from_row))
    }

    fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User, PortfolioError> {
        let row = self
            .conn()?
            .query_opt(
                &format!(
                    "UPDATE users SET email = COALESCE($1, email), name = COALESCE($2, name),
                     password_hash = COALESCE($3, password_hash)
                     WHERE id = $4 RETURNING {USER_COLUMNS}"
                ),
                &[&changes.email, &changes.name, &changes.password_hash, &id],
            )
            .map_err(unique_email)?;
        row.as_ref()
            .map(user_from_row)
            .ok_or_else(|| PortfolioError::not_found("user", id))
    }

    fn token_for_user(&self, user_id: i64, candidate: &str) -> Result<String, PortfolioError> {
        let mut conn = self.conn()?;
        conn.execute(
            "INSERT INTO auth_tokens (key, user_id, created) VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO NOTHING",
            &[&candidate, &user_id, &Utc::now()],
        )
        .map_err(PortfolioError::query)?;
        let row = conn
            .query_one(
                "SELECT key FROM auth_tokens WHERE user_id = $1",
                &[&user_id],
            )
            .map_err(PortfolioError::query)?;
        Ok(row.get(0))
    }

    fn user_for_token(&self, key: &str) -> Result<Option<User>, PortfolioError> {
        let row = self
            .conn()?
            .query_opt(
                "SELECT u.id, u.email, u.name, u.password_hash, u.is_active, u.is_staff,
                        u.is_superuser, u.date_joined
                 FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = $1",
                &[&key],
            )
            .map_err(PortfolioError::query)?;
        Ok(row.as_ref().map(user_from_row))
    }

    fn list_cryptocurrencies(
        &self,
        name_filter: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Cryptocurrency>, PortfolioError> {
        let mut conn = self.conn()?;
        let pattern = like_pattern(name_filter.unwrap_or(""));

        let count: i64 = conn
            .query_one(
                "SELECT COUNT(*) FROM cryptocurrencies WHERE name ILIKE $1 ESCAPE '\\'",
                &[&pattern],
            )
            .map_err(PortfolioError::query)?
            .get(0);
        let rows = conn
            .query(
                "SELECT symbol, name FROM cryptocurrencies WHERE name ILIKE $1 ESCAPE '\\'
                 ORDER BY symbol LIMIT $2 OFFSET $3",
                &[&pattern, &page_param(page.limit()), &page_param(page.offset())],
            )
            .map_err(PortfolioError::query)?;

        Ok(Page {
            items: rows.iter().map(crypto_from_row).collect(),
            count: count as u64,
            request: page,
        })
    }

    fn get_cryptocurrency(&self, symbol: &str) -> Result<Option<Cryptocurrency>, PortfolioError> {
        let row = self
            .conn()?
            .query_opt(
                "SELECT symbol, name FROM cryptocurrencies WHERE symbol = $1",
                &[&symbol],
            )
            .map_err(PortfolioError::query)?;
        Ok(row.as_ref().map(crypto_from_row))
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
                "INSERT INTO cryptocurrencies (symbol, name) VALUES ($1, $2)
                 ON CONFLICT (symbol) DO NOTHING",
                &[&crypto.symbol, &crypto.name],
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
                "UPDATE cryptocurrencies SET name = $1 WHERE symbol = $2",
                &[&name, &symbol],
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
            .execute("DELETE FROM cryptocurrencies WHERE symbol = $1", &[&symbol])
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
        let mut conn = self.conn()?;
        let count: i64 = conn
            .query_one(
                "SELECT COUNT(*) FROM transactions WHERE user_id = $1",
                &[&user_id],
            )
            .map_err(PortfolioError::query)?
            .get(0);
        let rows = conn
            .query(
                &format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1
                     ORDER BY date DESC, id DESC LIMIT $2 OFFSET $3"
                ),
                &[&user_id, &page_param(page.limit()), &page_param(page.offset())],
            )
            .map_err(PortfolioError::query)?;

        Ok(Page {
            items: rows
                .iter()
                .map(transaction_from_row)
                .collect::<Result<Vec<_>, _>>()?,
            count: count as u64,
            request: page,
        })
    }

    fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>, PortfolioError> {
        let row = self
            .conn()?
            .query_opt(
                &format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 AND id = $2"
                ),
                &[&user_id, &id],
            )
            .map_err(PortfolioError::query)?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    fn create_transaction(
        &self,
        user_id: i64,
        draft: &TransactionDraft,
    ) -> Result<Transaction, PortfolioError> {
        let mut conn = self.conn()?;
        let mut tx = Self::begin(&mut conn)?;

        let row = tx
            .query_one(
                "INSERT INTO transactions (user_id, crypto, date, kind, amount, price)
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
                &[
                    &user_id,
                    &draft.crypto,
                    &draft.date,
                    &draft.kind.as_str(),
                    &draft.amount,
                    &draft.price,
                ],
            )
            .map_err(missing_crypto)?;
        let id: i64 = row.get(0);

        holdings::recalculate(
            &mut PgLedger { tx: &mut tx },
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
        let mut tx = Self::begin(&mut conn)?;

        let existing = Self::fetch_transaction(&mut tx, user_id, id)?
            .ok_or_else(|| PortfolioError::not_found("transaction", id))?;

        tx.execute(
            "UPDATE transactions SET crypto = $1, date = $2, kind = $3, amount = $4, price = $5
             WHERE id = $6 AND user_id = $7",
            &[
                &draft.crypto,
                &draft.date,
                &draft.kind.as_str(),
                &draft.amount,
                &draft.price,
                &id,
                &user_id,
            ],
        )
        .map_err(missing_crypto)?;

        let mut ledger = PgLedger { tx: &mut tx };
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
        let mut tx = Self::begin(&mut conn)?;

        let existing = Self::fetch_transaction(&mut tx, user_id, id)?
            .ok_or_else(|| PortfolioError::not_found("transaction", id))?;

        tx.execute(
            "DELETE FROM transactions WHERE id = $1 AND user_id = $2",
            &[&id, &user_id],
        )
        .map_err(PortfolioError::query)?;

        holdings::recalculate(
            &mut PgLedger { tx: &mut tx },
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
        let mut conn = self.conn()?;
        let count: i64 = conn
            .query_one(
                "SELECT COUNT(*) FROM user_coins WHERE user_id = $1",
                &[&user_id],
            )
            .map_err(PortfolioError::query)?
            .get(0);
        let rows = conn
            .query(
                "SELECT id, user_id, crypto, amount FROM user_coins WHERE user_id = $1
                 ORDER BY amount DESC, crypto LIMIT $2 OFFSET $3",
                &[&user_id, &page_param(page.limit()), &page_param(page.offset())],
            )
            .map_err(PortfolioError::query)?;

        Ok(Page {
            items: rows.iter().map(holding_from_row).collect(),
            count: count as u64,
            request: page,
        })
    }

    fn get_holding(&self, user_id: i64, id: i64) -> Result<Option<Holding>, PortfolioError> {
        let row = self
            .conn()?
            .query_opt(
                "SELECT id, user_id, crypto, amount FROM user_coins WHERE user_id = $1 AND id = $2",
                &[&user_id, &id],
            )
            .map_err(PortfolioError::query)?;
        Ok(row.as_ref().map(holding_from_row))
    }
}
