use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;

use crate::catalog;
use crate::error::Result;
use crate::importer::load_accounts;
use crate::models::{ClientAccount, PendingPayment};
use crate::pending::PendingStore;
use crate::portfolio::{is_current, weekday_rank};

pub struct TypeTotal {
    pub code: String,
    pub description: String,
    pub count: usize,
    pub total: f64,
}

pub struct CreditTotal {
    pub credit_number: String,
    pub client_name: String,
    pub count: usize,
    pub total: f64,
}

pub struct SettlementReport {
    pub date: NaiveDate,
    pub payments: Vec<PendingPayment>,
    pub total: f64,
    pub by_type: Vec<TypeTotal>,
    pub by_credit: Vec<CreditTotal>,
    /// Current-portfolio accounts whose payment day falls on `date`.
    pub expected: Vec<ClientAccount>,
    pub expected_total: f64,
    /// How many of `expected` have at least one payment captured on `date`.
    pub expected_collected: usize,
}

fn captured_on(payment: &PendingPayment, date: &str) -> bool {
    payment.captured_at.get(..10) == Some(date)
}

pub fn settlement_for(conn: &Connection, date: NaiveDate) -> Result<SettlementReport> {
    let day = date.format("%Y-%m-%d").to_string();
    let payments: Vec<PendingPayment> = PendingStore::new(conn)
        .try_list_all()?
        .into_iter()
        .filter(|p| captured_on(p, &day))
        .collect();
    let total: f64 = payments.iter().map(|p| p.amount).sum();

    let mut type_totals: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    let mut credit_totals: BTreeMap<&str, (&str, usize, f64)> = BTreeMap::new();
    for p in &payments {
        let t = type_totals.entry(p.payment_type.as_str()).or_insert((0, 0.0));
        t.0 += 1;
        t.1 += p.amount;
        let c = credit_totals
            .entry(p.credit_number.as_str())
            .or_insert((p.client_name.as_str(), 0, 0.0));
        c.1 += 1;
        c.2 += p.amount;
    }

    let mut by_type: Vec<TypeTotal> = type_totals
        .into_iter()
        .map(|(code, (count, total))| TypeTotal {
            code: code.to_string(),
            description: catalog::describe(conn, code).unwrap_or_default(),
            count,
            total,
        })
        .collect();
    by_type.sort_by(|a, b| b.total.total_cmp(&a.total));

    let by_credit: Vec<CreditTotal> = credit_totals
        .into_iter()
        .map(|(credit, (name, count, total))| CreditTotal {
            credit_number: credit.to_string(),
            client_name: name.to_string(),
            count,
            total,
        })
        .collect();

    let rank = date.weekday().number_from_monday() as u8;
    let expected: Vec<ClientAccount> = load_accounts(conn)?
        .into_iter()
        .filter(|a| is_current(a) && weekday_rank(&a.payment_day) == Some(rank))
        .collect();
    let expected_total = expected.iter().map(|a| a.installment_amount).sum();
    let paid: HashSet<&str> = payments.iter().map(|p| p.credit_number.as_str()).collect();
    let expected_collected = expected
        .iter()
        .filter(|a| paid.contains(a.credit_number.as_str()))
        .count();

    Ok(SettlementReport {
        date,
        payments,
        total,
        by_type,
        by_credit,
        expected,
        expected_total,
        expected_collected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::PaymentDraft;
    use chrono::{Local, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn stage(conn: &Connection, credit: &str, amount: f64, kind: &str, when: chrono::DateTime<Local>) {
        let draft = PaymentDraft {
            credit_number: credit.to_string(),
            cycle: "1".to_string(),
            amount,
            payment_type: kind.to_string(),
            client_name: format!("Cliente {credit}"),
            ..Default::default()
        };
        PendingStore::new(conn).save_at(&draft, when).unwrap();
    }

    fn add_account(conn: &Connection, credit: &str, day: &str, kind: &str, installment: f64) {
        conn.execute(
            "INSERT INTO portfolio_accounts (credit_number, client_name, payment_day, portfolio_type, installment_amount) \
             VALUES (?1, ?1, ?2, ?3, ?4)",
            rusqlite::params![credit, day, kind, installment],
        )
        .unwrap();
    }

    #[test]
    fn test_settlement_totals_only_that_day() {
        let (_dir, conn) = test_db();
        // 2025-03-03 is a Monday.
        stage(&conn, "100200", 100.0, "PAGO", at(2025, 3, 3, 9));
        stage(&conn, "100200", 20.0, "MORA", at(2025, 3, 3, 10));
        stage(&conn, "100300", 300.0, "PAGO", at(2025, 3, 3, 11));
        stage(&conn, "100300", 999.0, "PAGO", at(2025, 3, 4, 9));

        let report = settlement_for(&conn, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()).unwrap();
        assert_eq!(report.payments.len(), 3);
        assert_eq!(report.total, 420.0);

        assert_eq!(report.by_type[0].code, "PAGO");
        assert_eq!(report.by_type[0].count, 2);
        assert_eq!(report.by_type[0].total, 400.0);
        assert_eq!(report.by_type[0].description, "Pago regular");
        assert_eq!(report.by_type[1].code, "MORA");

        assert_eq!(report.by_credit.len(), 2);
        assert_eq!(report.by_credit[0].credit_number, "100200");
        assert_eq!(report.by_credit[0].total, 120.0);
        assert_eq!(report.by_credit[0].client_name, "Cliente 100200");
    }

    #[test]
    fn test_expected_collections_follow_weekday() {
        let (_dir, conn) = test_db();
        add_account(&conn, "100200", "Lunes", "VIGENTE", 500.0);
        add_account(&conn, "100300", "lunes", "VIGENTE", 250.0);
        add_account(&conn, "100400", "Martes", "VIGENTE", 900.0);
        add_account(&conn, "100500", "Lunes", "VENCIDA", 700.0);
        stage(&conn, "100300", 250.0, "PAGO", at(2025, 3, 3, 12));

        let report = settlement_for(&conn, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()).unwrap();
        assert_eq!(report.expected.len(), 2);
        assert_eq!(report.expected_total, 750.0);
        assert_eq!(report.expected_collected, 1);
    }

    #[test]
    fn test_empty_day() {
        let (_dir, conn) = test_db();
        let report = settlement_for(&conn, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).unwrap();
        assert!(report.payments.is_empty());
        assert_eq!(report.total, 0.0);
        assert!(report.by_type.is_empty());
        assert_eq!(report.expected_collected, 0);
    }
}
