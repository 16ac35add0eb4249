use rusqlite::Connection;

use crate::error::{CobranzaError, Result};
use crate::models::PaymentType;

pub fn list_payment_types(conn: &Connection, include_inactive: bool) -> Result<Vec<PaymentType>> {
    let sql = if include_inactive {
        "SELECT code, description, is_active FROM payment_types ORDER BY code"
    } else {
        "SELECT code, description, is_active FROM payment_types WHERE is_active = 1 ORDER BY code"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PaymentType {
                code: row.get(0)?,
                description: row.get(1)?,
                is_active: row.get::<_, i64>(2)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn active_codes(conn: &Connection) -> Result<Vec<String>> {
    Ok(list_payment_types(conn, false)?
        .into_iter()
        .map(|t| t.code)
        .collect())
}

/// Insert or update a payment type. Codes are stored uppercase.
pub fn add_payment_type(conn: &Connection, code: &str, description: &str) -> Result<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(CobranzaError::Other("Payment type code cannot be empty".to_string()));
    }
    conn.execute(
        "INSERT INTO payment_types (code, description, is_active) VALUES (?1, ?2, 1) \
         ON CONFLICT(code) DO UPDATE SET description = excluded.description, is_active = 1",
        rusqlite::params![code, description.trim()],
    )?;
    Ok(code)
}

pub fn deactivate_payment_type(conn: &Connection, code: &str) -> Result<()> {
    let code = code.trim().to_uppercase();
    let changed = conn.execute("UPDATE payment_types SET is_active = 0 WHERE code = ?1", [&code])?;
    if changed == 0 {
        return Err(CobranzaError::UnknownPaymentType(code));
    }
    Ok(())
}

pub fn describe(conn: &Connection, code: &str) -> Option<String> {
    conn.query_row(
        "SELECT description FROM payment_types WHERE code = ?1",
        [code],
        |r| r.get(0),
    )
    .ok()
}
