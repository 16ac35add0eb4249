use comfy_table::{Cell, Table};

use crate::catalog::{add_payment_type, deactivate_payment_type, list_payment_types};
use crate::cli::open_db;
use crate::error::Result;

pub fn list(all: bool) -> Result<()> {
    let conn = open_db()?;
    let types = list_payment_types(&conn, all)?;

    let mut table = Table::new();
    if all {
        table.set_header(vec!["Code", "Description", "Active"]);
    } else {
        table.set_header(vec!["Code", "Description"]);
    }
    for t in types {
        let mut row = vec![Cell::new(t.code), Cell::new(t.description)];
        if all {
            row.push(Cell::new(if t.is_active { "yes" } else { "no" }));
        }
        table.add_row(row);
    }
    println!("Payment types\n{table}");
    Ok(())
}

pub fn add(code: &str, description: &str) -> Result<()> {
    let conn = open_db()?;
    let code = add_payment_type(&conn, code, description)?;
    println!("Saved payment type {code}: {}", description.trim());
    Ok(())
}

pub fn disable(code: &str) -> Result<()> {
    let conn = open_db()?;
    deactivate_payment_type(&conn, code)?;
    println!("Disabled payment type {}", code.trim().to_uppercase());
    Ok(())
}
