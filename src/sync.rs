use std::path::Path;

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::PendingPayment;
use crate::pending::PendingStore;

/// Payload handed to the server when staged payments are submitted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBatch {
    pub agent: String,
    pub generated_at: String,
    pub payments: Vec<PendingPayment>,
}

pub fn build_batch(store: &PendingStore, agent: &str) -> Result<PaymentBatch> {
    Ok(PaymentBatch {
        agent: agent.to_string(),
        generated_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        payments: store.try_list_all()?,
    })
}

/// Write every staged payment to `path`. Returns how many were written.
pub fn export_batch(store: &PendingStore, agent: &str, path: &Path) -> Result<usize> {
    let batch = build_batch(store, agent)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&batch)?;
    std::fs::write(path, format!("{json}\n"))?;
    log::info!("exported {} pending payments to {}", batch.payments.len(), path.display());
    Ok(batch.payments.len())
}

/// The server accepted the batch at `path`: drop its payments from the store.
/// Payments already gone are skipped. Returns how many were removed.
pub fn acknowledge_batch(store: &PendingStore, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let batch: PaymentBatch = serde_json::from_str(&content)?;
    let removed = store.delete_many(batch.payments.iter().map(|p| p.id.as_str()))?;
    log::info!(
        "acknowledged batch from {}: {removed} of {} removed",
        batch.generated_at,
        batch.payments.len()
    );
    Ok(removed)
}
