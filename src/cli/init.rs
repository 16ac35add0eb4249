use std::path::PathBuf;

use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, agent: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = agent {
        settings.agent_name = name.trim().to_string();
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("imports"))?;
    std::fs::create_dir_all(resolved.join("exports"))?;
    // Canonicalize now that the directory exists.
    settings.data_dir = shellexpand_path(&settings.data_dir);
    save_settings(&settings)?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;

    println!("Initialized cobranza at {}", resolved.display());
    if !settings.agent_name.is_empty() {
        println!("Agent: {}", settings.agent_name);
    }
    Ok(())
}
