use thiserror::Error;

#[derive(Error, Debug)]
pub enum CobranzaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Pending store read failed: {0}")]
    StorageRead(#[source] rusqlite::Error),

    #[error("Pending store write failed: {0}")]
    StorageWrite(#[source] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payment: {0}")]
    Validation(String),

    #[error("Unknown credit: {0}")]
    UnknownCredit(String),

    #[error("Unknown payment type: {0}")]
    UnknownPaymentType(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CobranzaError>;
