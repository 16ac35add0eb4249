use chrono::{DateTime, Local, SecondsFormat};
use rusqlite::{Connection, Row};

use crate::error::{CobranzaError, Result};
use crate::models::{PaymentDraft, PaymentState, PendingPayment};

const SELECT_COLUMNS: &str = "SELECT id, credit_number, cycle, amount, payment_type, captured_at, \
     client_name, state, latitude, longitude, photo_uri FROM pending_payments";

pub fn payment_id(millis: i64, credit_number: &str) -> String {
    format!("{millis}_{credit_number}")
}

fn row_to_payment(row: &Row) -> rusqlite::Result<PendingPayment> {
    let raw_state: String = row.get(7)?;
    let state = PaymentState::parse(&raw_state).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(7, "state".to_string(), rusqlite::types::Type::Text)
    })?;
    Ok(PendingPayment {
        id: row.get(0)?,
        credit_number: row.get(1)?,
        cycle: row.get(2)?,
        amount: row.get(3)?,
        payment_type: row.get(4)?,
        captured_at: row.get(5)?,
        client_name: row.get(6)?,
        state,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        photo_uri: row.get(10)?,
    })
}

/// Local staging area for payments captured in the field.
///
/// Each record is its own row keyed by `id`, so a save or delete touches only
/// that row and cannot overwrite a concurrent append.
pub struct PendingStore<'a> {
    conn: &'a Connection,
}

impl<'a> PendingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All staged payments in capture order.
    pub fn try_list_all(&self) -> Result<Vec<PendingPayment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid"))
            .map_err(CobranzaError::StorageRead)?;
        let rows = stmt
            .query_map([], row_to_payment)
            .map_err(CobranzaError::StorageRead)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CobranzaError::StorageRead)?;
        Ok(rows)
    }

    /// Like [`try_list_all`](Self::try_list_all), but a failed read is logged
    /// and reported as an empty store.
    pub fn list_all(&self) -> Vec<PendingPayment> {
        self.try_list_all().unwrap_or_else(|e| {
            log::warn!("reading pending payments failed, treating store as empty: {e}");
            Vec::new()
        })
    }

    pub fn try_list_by_credit(&self, credit_number: &str) -> Result<Vec<PendingPayment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE credit_number = ?1 ORDER BY rowid"))
            .map_err(CobranzaError::StorageRead)?;
        let rows = stmt
            .query_map([credit_number], row_to_payment)
            .map_err(CobranzaError::StorageRead)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CobranzaError::StorageRead)?;
        Ok(rows)
    }

    pub fn list_by_credit(&self, credit_number: &str) -> Vec<PendingPayment> {
        self.try_list_by_credit(credit_number).unwrap_or_else(|e| {
            log::warn!("reading pending payments for {credit_number} failed: {e}");
            Vec::new()
        })
    }

    pub fn save(&self, draft: &PaymentDraft) -> Result<PendingPayment> {
        self.save_at(draft, Local::now())
    }

    /// Stage `draft` as captured at `now`. If another payment for the same
    /// credit already holds that millisecond, the id moves forward one
    /// millisecond at a time until it is free.
    pub fn save_at(&self, draft: &PaymentDraft, now: DateTime<Local>) -> Result<PendingPayment> {
        if !draft.amount.is_finite() || draft.amount <= 0.0 {
            return Err(CobranzaError::Validation(format!(
                "amount must be greater than zero (got {})",
                draft.amount
            )));
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(CobranzaError::StorageWrite)?;

        let mut millis = now.timestamp_millis();
        let id = loop {
            let candidate = payment_id(millis, &draft.credit_number);
            let taken = tx
                .prepare_cached("SELECT 1 FROM pending_payments WHERE id = ?1")
                .and_then(|mut stmt| stmt.exists([&candidate]))
                .map_err(CobranzaError::StorageWrite)?;
            if !taken {
                break candidate;
            }
            log::debug!("pending id {candidate} already taken, advancing");
            millis += 1;
        };

        let payment = PendingPayment {
            id,
            credit_number: draft.credit_number.clone(),
            cycle: draft.cycle.clone(),
            amount: draft.amount,
            payment_type: draft.payment_type.clone(),
            captured_at: now.to_rfc3339_opts(SecondsFormat::Millis, false),
            client_name: draft.client_name.clone(),
            state: PaymentState::Pending,
            latitude: draft.latitude,
            longitude: draft.longitude,
            photo_uri: draft.photo_uri.clone(),
        };

        tx.execute(
            "INSERT INTO pending_payments (id, credit_number, cycle, amount, payment_type, captured_at, \
             client_name, state, latitude, longitude, photo_uri) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                payment.id,
                payment.credit_number,
                payment.cycle,
                payment.amount,
                payment.payment_type,
                payment.captured_at,
                payment.client_name,
                payment.state.as_str(),
                payment.latitude,
                payment.longitude,
                payment.photo_uri,
            ],
        )
        .map_err(CobranzaError::StorageWrite)?;
        tx.commit().map_err(CobranzaError::StorageWrite)?;

        log::info!("staged payment {} for credit {}", payment.id, payment.credit_number);
        Ok(payment)
    }

    /// Remove one staged payment. Returns whether a row was removed; an
    /// unknown id is not an error.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM pending_payments WHERE id = ?1", [id])
            .map_err(CobranzaError::StorageWrite)?;
        if removed > 0 {
            log::info!("removed pending payment {id}");
        }
        Ok(removed > 0)
    }

    /// Remove a set of staged payments in one transaction: either every
    /// listed id that exists is removed, or none is. Returns how many rows
    /// went away.
    pub fn delete_many<'i>(&self, ids: impl IntoIterator<Item = &'i str>) -> Result<usize> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(CobranzaError::StorageWrite)?;
        let mut removed = 0usize;
        {
            let mut stmt = tx
                .prepare("DELETE FROM pending_payments WHERE id = ?1")
                .map_err(CobranzaError::StorageWrite)?;
            for id in ids {
                removed += stmt.execute([id]).map_err(CobranzaError::StorageWrite)?;
            }
        }
        tx.commit().map_err(CobranzaError::StorageWrite)?;
        log::info!("removed {removed} pending payments");
        Ok(removed)
    }

    pub fn clear_all(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM pending_payments", [])
            .map_err(CobranzaError::StorageWrite)?;
        log::info!("cleared {removed} pending payments");
        Ok(removed)
    }

    pub fn total_pending_for_credit(&self, credit_number: &str) -> f64 {
        self.list_by_credit(credit_number).iter().map(|p| p.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use chrono::TimeZone;

    fn draft(credit: &str, amount: f64) -> PaymentDraft {
        PaymentDraft {
            credit_number: credit.to_string(),
            cycle: "3".to_string(),
            amount,
            payment_type: "PAGO".to_string(),
            client_name: "María López".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_save_appends_one_record_with_generated_fields() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        store.save(&draft("100200", 150.0)).unwrap();
        let before = store.list_all().len();

        let mut d = draft("100300", 275.5);
        d.latitude = Some(19.43);
        d.longitude = Some(-99.13);
        d.photo_uri = Some("file:///evidencia/1.jpg".to_string());
        let saved = store.save(&d).unwrap();

        let all = store.list_all();
        assert_eq!(all.len(), before + 1);
        let stored = all.iter().find(|p| p.id == saved.id).unwrap();
        assert!(stored.id.ends_with("_100300"));
        assert!(!stored.captured_at.is_empty());
        assert_eq!(stored.state, PaymentState::Pending);
        assert_eq!(stored.credit_number, "100300");
        assert_eq!(stored.cycle, "3");
        assert_eq!(stored.amount, 275.5);
        assert_eq!(stored.payment_type, "PAGO");
        assert_eq!(stored.client_name, "María López");
        assert_eq!(stored.latitude, Some(19.43));
        assert_eq!(stored.longitude, Some(-99.13));
        assert_eq!(stored.photo_uri.as_deref(), Some("file:///evidencia/1.jpg"));
    }

    #[test]
    fn test_id_uses_capture_millis_and_credit() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        let now = Local.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let saved = store.save_at(&draft("555111", 10.0), now).unwrap();
        assert_eq!(saved.id, "1700000000123_555111");
        assert!(saved.captured_at.contains(".123"));
    }

    #[test]
    fn test_same_millisecond_saves_do_not_collide() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        let now = Local.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let first = store.save_at(&draft("555111", 10.0), now).unwrap();
        let second = store.save_at(&draft("555111", 20.0), now).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.id, "1700000000001_555111");
        assert_eq!(store.list_all().len(), 2);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        let keep = store.save(&draft("100200", 50.0)).unwrap();
        let gone = store.save(&draft("100300", 60.0)).unwrap();

        assert!(store.delete(&gone.id).unwrap());
        assert!(store.list_all().iter().all(|p| p.id != gone.id));

        assert!(!store.delete(&gone.id).unwrap());
        let remaining = store.list_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[test]
    fn test_delete_many_removes_only_listed_ids() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        let a = store.save(&draft("AAA111", 1.0)).unwrap();
        let b = store.save(&draft("BBB222", 2.0)).unwrap();
        let keep = store.save(&draft("CCC333", 3.0)).unwrap();

        let removed = store
            .delete_many([a.id.as_str(), "1700000000000_000000", b.id.as_str()])
            .unwrap();
        assert_eq!(removed, 2);
        let remaining = store.list_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
        assert_eq!(store.delete_many(std::iter::empty::<&str>()).unwrap(), 0);
    }

    #[test]
    fn test_delete_many_on_broken_store_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let conn = crate::db::get_connection(&dir.path().join("bare.db")).unwrap();
        let store = PendingStore::new(&conn);
        assert!(matches!(store.delete_many(["x_1"]), Err(CobranzaError::StorageWrite(_))));
    }

    #[test]
    fn test_save_rejects_non_positive_amounts() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        for amount in [0.0, -25.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                store.save(&draft("AAA111", amount)),
                Err(CobranzaError::Validation(_))
            ));
        }
        assert!(store.try_list_all().unwrap().is_empty());
    }

    #[test]
    fn test_list_by_credit_is_ordered_subset() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        let a1 = store.save(&draft("AAA111", 1.0)).unwrap();
        store.save(&draft("BBB222", 2.0)).unwrap();
        let a2 = store.save(&draft("AAA111", 3.0)).unwrap();
        store.save(&draft("AAA1110", 4.0)).unwrap();

        let subset = store.list_by_credit("AAA111");
        let ids: Vec<&str> = subset.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![a1.id.as_str(), a2.id.as_str()]);

        let expected: Vec<PendingPayment> = store
            .list_all()
            .into_iter()
            .filter(|p| p.credit_number == "AAA111")
            .collect();
        assert_eq!(subset, expected);
    }

    #[test]
    fn test_total_pending_for_credit() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        store.save(&draft("AAA111", 100.25)).unwrap();
        store.save(&draft("AAA111", 49.75)).unwrap();
        store.save(&draft("BBB222", 999.0)).unwrap();
        assert_eq!(store.total_pending_for_credit("AAA111"), 150.0);
        assert_eq!(store.total_pending_for_credit("ZZZ999"), 0.0);
    }

    #[test]
    fn test_clear_all_empties_store() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        store.save(&draft("AAA111", 1.0)).unwrap();
        store.save(&draft("BBB222", 2.0)).unwrap();
        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.list_all().is_empty());
        assert_eq!(store.clear_all().unwrap(), 0);
    }

    #[test]
    fn test_read_failure_is_empty_but_strict_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let conn = crate::db::get_connection(&dir.path().join("bare.db")).unwrap();
        let store = PendingStore::new(&conn);
        assert!(store.list_all().is_empty());
        assert_eq!(store.total_pending_for_credit("AAA111"), 0.0);
        assert!(matches!(store.try_list_all(), Err(CobranzaError::StorageRead(_))));
    }

    #[test]
    fn test_write_failure_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let conn = crate::db::get_connection(&dir.path().join("bare.db")).unwrap();
        let store = PendingStore::new(&conn);
        assert!(matches!(store.save(&draft("AAA111", 1.0)), Err(CobranzaError::StorageWrite(_))));
        assert!(matches!(store.clear_all(), Err(CobranzaError::StorageWrite(_))));
    }

    #[test]
    fn test_unknown_state_is_a_read_failure() {
        let (_dir, conn) = test_db();
        let store = PendingStore::new(&conn);
        store.save(&draft("AAA111", 1.0)).unwrap();
        conn.execute("UPDATE pending_payments SET state = 'sent'", []).unwrap();
        assert!(matches!(store.try_list_all(), Err(CobranzaError::StorageRead(_))));
        assert!(store.list_all().is_empty());
    }
}
