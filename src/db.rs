use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

pub const DB_FILE: &str = "cobranza.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pending_payments (
    id TEXT PRIMARY KEY,
    credit_number TEXT NOT NULL,
    cycle TEXT NOT NULL,
    amount REAL NOT NULL,
    payment_type TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    client_name TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT 'pending',
    latitude REAL,
    longitude REAL,
    photo_uri TEXT
);

CREATE INDEX IF NOT EXISTS idx_pending_credit ON pending_payments(credit_number);

CREATE TABLE IF NOT EXISTS portfolio_accounts (
    credit_number TEXT PRIMARY KEY,
    client_name TEXT NOT NULL DEFAULT '',
    payment_day TEXT NOT NULL DEFAULT '',
    arrears_amount REAL NOT NULL DEFAULT 0,
    portfolio_type TEXT NOT NULL DEFAULT '',
    cycle TEXT NOT NULL DEFAULT '',
    installment_amount REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS portfolio_imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    record_count INTEGER,
    checksum TEXT,
    imported_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS payment_types (
    code TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    is_active INTEGER DEFAULT 1
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

// (code, description)
const DEFAULT_PAYMENT_TYPES: &[(&str, &str)] = &[
    ("PAGO", "Pago regular"),
    ("MORA", "Penalización por atraso"),
    ("ADELANTO", "Pago adelantado"),
    ("LIQUIDACION", "Liquidación del crédito"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM payment_types", [], |row| row.get(0))?;
    if count == 0 {
        for (code, description) in DEFAULT_PAYMENT_TYPES {
            conn.execute(
                "INSERT INTO payment_types (code, description) VALUES (?1, ?2)",
                rusqlite::params![code, description],
            )?;
        }
    }
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .optional()
        .ok()
        .flatten()
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
