use std::path::PathBuf;

use crate::cli::open_db;
use crate::db::set_metadata;
use crate::error::Result;
use crate::pending::PendingStore;
use crate::settings::load_settings;
use crate::sync::{acknowledge_batch, export_batch};

pub fn export(output: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            PathBuf::from(&settings.data_dir)
                .join("exports")
                .join(format!("lote-{stamp}.json"))
        }
    };

    let count = export_batch(&PendingStore::new(&conn), &settings.agent_name, &path)?;
    if count == 0 {
        println!("No pending payments; wrote an empty batch to {}", path.display());
    } else {
        println!("Exported {count} pending payments to {}", path.display());
        println!("After the server accepts it, run `cobranza sync ack {}`", path.display());
    }
    Ok(())
}

pub fn ack(file: &str) -> Result<()> {
    let conn = open_db()?;
    let removed = acknowledge_batch(&PendingStore::new(&conn), &PathBuf::from(file))?;
    set_metadata(&conn, "last_ack", &chrono::Local::now().format("%Y-%m-%d %H:%M").to_string())?;
    println!("Removed {removed} confirmed payments from the pending store.");
    Ok(())
}
