use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CobranzaError, Result};
use crate::models::ClientAccount;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> f64 {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    s.trim().parse().unwrap_or(0.0)
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

// Accepted column names per field, compared case-insensitively.
const CREDIT_KEYS: &[&str] = &["creditnumber", "credit_number", "credito", "numero_credito"];
const NAME_KEYS: &[&str] = &["name", "client_name", "clientname", "nombre", "cliente"];
const DAY_KEYS: &[&str] = &["paymentday", "payment_day", "dia_pago", "diapago"];
const ARREARS_KEYS: &[&str] = &["arrearsamount", "arrears_amount", "mora", "saldo_vencido"];
const TYPE_KEYS: &[&str] = &["portfoliotype", "portfolio_type", "tipo_cartera", "tipocartera"];
const CYCLE_KEYS: &[&str] = &["cycle", "ciclo"];
const INSTALLMENT_KEYS: &[&str] = &["installmentamount", "installment_amount", "cuota", "monto_cuota"];

/// One source row with lowercased keys.
type RawRecord = HashMap<String, String>;

fn pick(record: &RawRecord, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| record.get(*k))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn to_account(record: &RawRecord) -> Option<ClientAccount> {
    let credit_number = pick(record, CREDIT_KEYS);
    if credit_number.is_empty() {
        return None;
    }
    Some(ClientAccount {
        credit_number,
        client_name: pick(record, NAME_KEYS),
        payment_day: pick(record, DAY_KEYS),
        arrears_amount: parse_amount(&pick(record, ARREARS_KEYS)),
        portfolio_type: pick(record, TYPE_KEYS).to_uppercase(),
        cycle: pick(record, CYCLE_KEYS),
        installment_amount: parse_amount(&pick(record, INSTALLMENT_KEYS)),
    })
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortfolioFormat {
    Json,
    Csv,
}

impl PortfolioFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn detect(file_path: &Path) -> Option<Self> {
        file_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_key)
    }

    pub fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        match self {
            Self::Json => parse_json(file_path),
            Self::Csv => parse_csv(file_path),
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_json(file_path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(file_path)?;
    let root: Value = serde_json::from_str(&content)?;
    // API responses sometimes wrap the list.
    let items = match &root {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("data").or_else(|| map.get("cartera")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CobranzaError::Other(
                    "Expected a JSON array of accounts or an object with a `data` array".to_string(),
                ))
            }
        },
        _ => return Err(CobranzaError::Other("Expected a JSON array of accounts".to_string())),
    };

    let mut records: Vec<RawRecord> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            log::warn!("skipping portfolio entry {i}: not an object");
            continue;
        };
        let record: RawRecord = map
            .iter()
            .filter_map(|(k, v)| value_to_string(v).map(|s| (k.to_lowercase(), s)))
            .collect();
        records.push(record);
    }
    Ok(records)
}

fn parse_csv(file_path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_lowercase()).collect();

    let mut records: Vec<RawRecord> = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping portfolio row {}: {e}", i + 2);
                continue;
            }
        };
        records.push(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// import_portfolio
// ---------------------------------------------------------------------------

pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

/// Replace the cached portfolio with the contents of `file_path`.
pub fn import_portfolio(conn: &Connection, file_path: &Path, format_key: Option<&str>) -> Result<ImportResult> {
    let format = match format_key {
        Some(key) => PortfolioFormat::from_key(key).ok_or_else(|| CobranzaError::UnknownFormat(key.to_string()))?,
        None => PortfolioFormat::detect(file_path).ok_or_else(|| {
            CobranzaError::UnknownFormat(file_path.display().to_string())
        })?,
    };

    let checksum = compute_checksum(file_path)?;
    // Only the file currently loaded counts as a duplicate; an older export
    // must still be able to replace a newer one.
    let latest: Option<String> = conn
        .query_row(
            "SELECT checksum FROM portfolio_imports ORDER BY id DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?
        .flatten();
    if latest.as_deref() == Some(checksum.as_str()) {
        return Ok(ImportResult {
            imported: 0,
            skipped: 0,
            duplicate_file: true,
        });
    }

    let records = format.parse(file_path)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM portfolio_accounts", [])?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for (i, record) in records.iter().enumerate() {
        let Some(account) = to_account(record) else {
            log::warn!("skipping portfolio record {}: missing credit number", i + 1);
            skipped += 1;
            continue;
        };
        tx.execute(
            "INSERT OR REPLACE INTO portfolio_accounts \
             (credit_number, client_name, payment_day, arrears_amount, portfolio_type, cycle, installment_amount) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                account.credit_number,
                account.client_name,
                account.payment_day,
                account.arrears_amount,
                account.portfolio_type,
                account.cycle,
                account.installment_amount,
            ],
        )?;
        imported += 1;
    }
    tx.execute(
        "INSERT INTO portfolio_imports (filename, record_count, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            imported as i64,
            checksum,
        ],
    )?;
    tx.commit()?;

    log::info!("imported {imported} accounts ({}), skipped {skipped}", format.key());
    Ok(ImportResult {
        imported,
        skipped,
        duplicate_file: false,
    })
}

// ---------------------------------------------------------------------------
// Cached portfolio queries
// ---------------------------------------------------------------------------

fn row_to_account(row: &Row) -> rusqlite::Result<ClientAccount> {
    Ok(ClientAccount {
        credit_number: row.get(0)?,
        client_name: row.get(1)?,
        payment_day: row.get(2)?,
        arrears_amount: row.get(3)?,
        portfolio_type: row.get(4)?,
        cycle: row.get(5)?,
        installment_amount: row.get(6)?,
    })
}

const ACCOUNT_COLUMNS: &str = "SELECT credit_number, client_name, payment_day, arrears_amount, \
     portfolio_type, cycle, installment_amount FROM portfolio_accounts";

pub fn load_accounts(conn: &Connection) -> Result<Vec<ClientAccount>> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_COLUMNS} ORDER BY rowid"))?;
    let rows = stmt
        .query_map([], row_to_account)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_account(conn: &Connection, credit_number: &str) -> Result<Option<ClientAccount>> {
    let account = conn
        .query_row(
            &format!("{ACCOUNT_COLUMNS} WHERE credit_number = ?1"),
            [credit_number],
            row_to_account,
        )
        .optional()?;
    Ok(account)
}
