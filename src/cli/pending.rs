use colored::Colorize;
use comfy_table::{Cell, Table};
use dialoguer::Confirm;

use crate::catalog::active_codes;
use crate::cli::open_db;
use crate::error::{CobranzaError, Result};
use crate::fmt::{money_with, short_timestamp};
use crate::importer::find_account;
use crate::models::PaymentDraft;
use crate::pending::PendingStore;
use crate::settings::load_settings;
use crate::validation::validate_draft;

pub struct AddArgs {
    pub credit: String,
    pub amount: f64,
    pub payment_type: String,
    pub cycle: Option<String>,
    pub client: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub photo: Option<String>,
}

pub fn add(args: AddArgs) -> Result<()> {
    let conn = open_db()?;
    let symbol = load_settings().currency_symbol;
    let credit = args.credit.trim().to_string();
    let known = find_account(&conn, &credit)?;

    let mut draft = PaymentDraft {
        credit_number: credit,
        cycle: args.cycle.unwrap_or_default(),
        amount: args.amount,
        payment_type: args.payment_type.trim().to_uppercase(),
        client_name: args.client.unwrap_or_default(),
        latitude: args.lat,
        longitude: args.lon,
        photo_uri: args.photo,
    };
    if let Some(account) = &known {
        if draft.cycle.is_empty() {
            draft.cycle = account.cycle.clone();
        }
        if draft.client_name.is_empty() {
            draft.client_name = account.client_name.clone();
        }
    } else {
        log::debug!("credit {} not in cached portfolio", draft.credit_number);
    }

    validate_draft(&draft, &active_codes(&conn)?)?;

    let store = PendingStore::new(&conn);
    let payment = store.save(&draft)?;
    println!(
        "Staged {} for {} ({})",
        money_with(&symbol, payment.amount).green(),
        payment.credit_number,
        payment.id
    );
    if known.is_none() {
        println!("{}", "Note: this credit is not in the cached portfolio.".yellow());
    }
    println!(
        "Pending for this credit: {}",
        money_with(&symbol, store.total_pending_for_credit(&payment.credit_number))
    );
    Ok(())
}

pub fn list(credit: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let symbol = load_settings().currency_symbol;
    let store = PendingStore::new(&conn);
    let payments = match credit {
        Some(c) => store.list_by_credit(c),
        None => store.list_all(),
    };
    if payments.is_empty() {
        println!("No pending payments.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Captured", "Credit", "Client", "Cycle", "Type", "Amount", "GPS"]);
    for p in &payments {
        let gps = match (p.latitude, p.longitude) {
            (Some(lat), Some(lon)) => format!("{lat:.5},{lon:.5}"),
            _ => String::new(),
        };
        table.add_row(vec![
            Cell::new(&p.id),
            Cell::new(short_timestamp(&p.captured_at)),
            Cell::new(&p.credit_number),
            Cell::new(&p.client_name),
            Cell::new(&p.cycle),
            Cell::new(&p.payment_type),
            Cell::new(money_with(&symbol, p.amount)),
            Cell::new(gps),
        ]);
    }
    let total: f64 = payments.iter().map(|p| p.amount).sum();
    println!("Pending payments\n{table}");
    println!("{} payments, {}", payments.len(), money_with(&symbol, total).bold());
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let conn = open_db()?;
    if PendingStore::new(&conn).delete(id)? {
        println!("Deleted pending payment {id}");
    } else {
        println!("No pending payment with ID {id}");
    }
    Ok(())
}

pub fn clear(yes: bool) -> Result<()> {
    let conn = open_db()?;
    let store = PendingStore::new(&conn);
    if !yes {
        // Unreadable rows still count as staged work; only a clean read can say "empty".
        let prompt = match store.try_list_all() {
            Ok(payments) if payments.is_empty() => {
                println!("No pending payments.");
                return Ok(());
            }
            Ok(payments) => format!("Remove all {} pending payments? They have not been submitted.", payments.len()),
            Err(e) => {
                log::warn!("pending store could not be read before clearing: {e}");
                "Remove all pending payments, including unreadable ones? They have not been submitted.".to_string()
            }
        };
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| CobranzaError::Other(e.to_string()))?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }
    let removed = store.clear_all()?;
    if removed == 0 {
        println!("No pending payments.");
    } else {
        println!("Removed {removed} pending payments.");
    }
    Ok(())
}

pub fn total(credit: &str) -> Result<()> {
    let conn = open_db()?;
    let symbol = load_settings().currency_symbol;
    let store = PendingStore::new(&conn);
    let count = store.list_by_credit(credit).len();
    println!(
        "{credit}: {} in {count} pending payments",
        money_with(&symbol, store.total_pending_for_credit(credit))
    );
    Ok(())
}
