use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{CobranzaError, Result};
use crate::fmt::money_with;
use crate::reports::settlement_for;
use crate::settings::load_settings;

fn parse_date_opt(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| CobranzaError::Other(format!("Invalid date '{raw}', expected YYYY-MM-DD"))),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub fn run(date: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let symbol = load_settings().currency_symbol;
    let report = settlement_for(&conn, parse_date_opt(date)?)?;

    println!("{}", format!("Settlement for {}", report.date.format("%Y-%m-%d (%A)")).bold());

    if report.payments.is_empty() {
        println!("No payments captured.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Type", "Description", "Count", "Amount"]);
        for t in &report.by_type {
            table.add_row(vec![
                Cell::new(&t.code),
                Cell::new(&t.description),
                Cell::new(t.count),
                Cell::new(money_with(&symbol, t.total)),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total".bold()),
            Cell::new(""),
            Cell::new(report.payments.len()),
            Cell::new(money_with(&symbol, report.total)),
        ]);
        println!("By payment type\n{table}");

        let mut ctable = Table::new();
        ctable.set_header(vec!["Credit", "Client", "Count", "Amount"]);
        for c in &report.by_credit {
            ctable.add_row(vec![
                Cell::new(&c.credit_number),
                Cell::new(&c.client_name),
                Cell::new(c.count),
                Cell::new(money_with(&symbol, c.total)),
            ]);
        }
        println!("\nBy credit\n{ctable}");
    }

    if !report.expected.is_empty() {
        println!(
            "\nScheduled today: {} accounts, {} in installments, {} with a payment captured",
            report.expected.len(),
            money_with(&symbol, report.expected_total),
            report.expected_collected
        );
        let missing = report.expected.len() - report.expected_collected;
        if missing > 0 {
            println!("{}", format!("{missing} scheduled accounts without a payment").yellow());
        }
    }
    Ok(())
}
