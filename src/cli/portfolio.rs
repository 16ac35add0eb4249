use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{CobranzaError, Result};
use crate::fmt::{money_with, short_timestamp};
use crate::importer::{find_account, import_portfolio, load_accounts};
use crate::pending::PendingStore;
use crate::portfolio::{filter_accounts, group_accounts, SEARCH_MIN_CHARS};
use crate::settings::load_settings;

pub fn import(file: &str, format: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let result = import_portfolio(&conn, &PathBuf::from(file), format)?;

    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }
    println!("{} accounts imported, {} skipped", result.imported, result.skipped);
    Ok(())
}

pub fn list(search: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let symbol = load_settings().currency_symbol;
    let accounts = load_accounts(&conn)?;
    if accounts.is_empty() {
        println!("No portfolio loaded. Run `cobranza portfolio import <file>` first.");
        return Ok(());
    }

    let term = search.unwrap_or("");
    if !term.trim().is_empty() && term.trim().chars().count() < SEARCH_MIN_CHARS {
        println!(
            "{}",
            format!("Search needs at least {SEARCH_MIN_CHARS} characters; showing everything.").dimmed()
        );
    }
    let filtered = filter_accounts(&accounts, term);
    let groups = group_accounts(&filtered);
    if groups.is_empty() {
        println!("No accounts match.");
        return Ok(());
    }

    let store = PendingStore::new(&conn);
    for group in &groups {
        let heading = format!("{} ({})", group.day_key, group.count());
        if group.is_delinquent_bucket {
            let arrears = money_with(&symbol, group.total_arrears());
            println!("{} {}", heading.red().bold(), format!("arrears {arrears}").red());
        } else {
            println!("{}", heading.bold());
        }

        let mut table = Table::new();
        table.set_header(vec!["Credit", "Client", "Cycle", "Installment", "Arrears", "Pending"]);
        for client in &group.clients {
            let pending = store.total_pending_for_credit(&client.credit_number);
            table.add_row(vec![
                Cell::new(&client.credit_number),
                Cell::new(&client.client_name),
                Cell::new(&client.cycle),
                Cell::new(money_with(&symbol, client.installment_amount)),
                Cell::new(money_with(&symbol, client.arrears_amount)),
                Cell::new(if pending > 0.0 { money_with(&symbol, pending) } else { String::new() }),
            ]);
        }
        println!("{table}\n");
    }
    Ok(())
}

pub fn show(credit: &str) -> Result<()> {
    let conn = open_db()?;
    let symbol = load_settings().currency_symbol;
    let account = find_account(&conn, credit)?.ok_or_else(|| CobranzaError::UnknownCredit(credit.to_string()))?;

    println!("Credit:       {}", account.credit_number.bold());
    println!("Client:       {}", account.client_name);
    println!("Cycle:        {}", account.cycle);
    println!("Payment day:  {}", if account.payment_day.is_empty() { "(none)" } else { &account.payment_day });
    println!("Portfolio:    {}", account.portfolio_type);
    println!("Installment:  {}", money_with(&symbol, account.installment_amount));
    let arrears = money_with(&symbol, account.arrears_amount);
    if account.arrears_amount > 0.0 {
        println!("Arrears:      {}", arrears.red());
    } else {
        println!("Arrears:      {arrears}");
    }

    let store = PendingStore::new(&conn);
    let pending = store.list_by_credit(credit);
    if pending.is_empty() {
        println!("\nNo pending payments.");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Captured", "Type", "Amount"]);
    for p in &pending {
        table.add_row(vec![
            Cell::new(&p.id),
            Cell::new(short_timestamp(&p.captured_at)),
            Cell::new(&p.payment_type),
            Cell::new(money_with(&symbol, p.amount)),
        ]);
    }
    println!("\nPending payments\n{table}");
    println!(
        "Total pending: {}",
        money_with(&symbol, store.total_pending_for_credit(credit)).bold()
    );
    Ok(())
}
