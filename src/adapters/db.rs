use rusqlite::{Connection, params};
use thiserror::Error;

use crate::domain::models::{AgentLogEntry, PaymentRecord};

pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATIONS: &[(u32, &str)] = &[
    (
        1,
        r#"
CREATE TABLE IF NOT EXISTS payments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    amount REAL NOT NULL,
    currency TEXT NOT NULL,
    tx_hash TEXT NOT NULL UNIQUE,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payments_timestamp_desc
ON payments (timestamp DESC);

CREATE TRIGGER IF NOT EXISTS payments_no_update
BEFORE UPDATE ON payments
BEGIN
    SELECT RAISE(ABORT, 'payments are append-only');
END;

CREATE TRIGGER IF NOT EXISTS payments_no_delete
BEFORE DELETE ON payments
BEGIN
    SELECT RAISE(ABORT, 'payments are append-only');
END;
"#,
    ),
    (
        2,
        r#"
CREATE TABLE IF NOT EXISTS agent_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    action TEXT NOT NULL,
    details TEXT NOT NULL
);
"#,
    ),
];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

pub fn insert_payment(connection: &Connection, payment: &PaymentRecord) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO payments (session_id, amount, currency, tx_hash, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            payment.session_id,
            payment.amount,
            payment.currency,
            payment.tx_hash,
            payment.timestamp,
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

/// Newest first.
pub fn list_payments(connection: &Connection) -> Result<Vec<PaymentRecord>, DbError> {
    let mut statement = connection.prepare(
        "SELECT session_id, amount, currency, tx_hash, timestamp
         FROM payments
         ORDER BY timestamp DESC, id DESC",
    )?;

    let rows = statement.query_map([], |row| {
        Ok(PaymentRecord {
            session_id: row.get(0)?,
            amount: row.get(1)?,
            currency: row.get(2)?,
            tx_hash: row.get(3)?,
            timestamp: row.get(4)?,
        })
    })?;

    let mut payments = Vec::new();
    for row in rows {
        payments.push(row?);
    }

    Ok(payments)
}

pub fn count_payments(connection: &Connection) -> Result<i64, DbError> {
    let count = connection.query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))?;
    Ok(count)
}

pub fn payment_exists(connection: &Connection, tx_hash: &str) -> Result<bool, DbError> {
    let exists = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM payments WHERE tx_hash = ?1)",
        params![tx_hash],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn insert_agent_log(connection: &Connection, entry: &AgentLogEntry) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO agent_logs (timestamp, action, details) VALUES (?1, ?2, ?3)",
        params![entry.timestamp, entry.action, entry.details],
    )?;

    Ok(connection.last_insert_rowid())
}

/// Oldest first, matching the order the actions happened in.
pub fn list_agent_logs(connection: &Connection) -> Result<Vec<AgentLogEntry>, DbError> {
    let mut statement =
        connection.prepare("SELECT timestamp, action, details FROM agent_logs ORDER BY id ASC")?;

    let rows = statement.query_map([], |row| {
        Ok(AgentLogEntry {
            timestamp: row.get(0)?,
            action: row.get(1)?,
            details: row.get(2)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }

    Ok(entries)
}
