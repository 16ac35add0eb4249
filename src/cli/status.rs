use crate::db::{get_connection, get_metadata, init_db, DB_FILE};
use crate::error::Result;
use crate::fmt::{format_bytes, money_with};
use crate::pending::PendingStore;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Agent:      {}", if settings.agent_name.is_empty() { "(not set)" } else { &settings.agent_name });
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `cobranza init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    let accounts: i64 = conn.query_row("SELECT count(*) FROM portfolio_accounts", [], |r| r.get(0))?;
    let last_import: Option<String> = conn
        .query_row(
            "SELECT imported_at FROM portfolio_imports ORDER BY id DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .ok();

    println!();
    println!("Portfolio:     {accounts} accounts");
    println!("Last import:   {}", last_import.as_deref().unwrap_or("(never)"));

    // A failed read is reported here instead of looking like an empty store.
    match PendingStore::new(&conn).try_list_all() {
        Ok(pending) => {
            let total: f64 = pending.iter().map(|p| p.amount).sum();
            println!("Pending:       {} ({})", pending.len(), money_with(&settings.currency_symbol, total));
        }
        Err(e) => println!("Pending:       unreadable ({e})"),
    }
    println!(
        "Last ack:      {}",
        get_metadata(&conn, "last_ack").as_deref().unwrap_or("(never)")
    );

    Ok(())
}
