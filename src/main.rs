mod catalog;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod pending;
mod portfolio;
mod reports;
mod settings;
mod sync;
mod validation;

use clap::{CommandFactory, Parser};

use cli::{CatalogCommands, Cli, Commands, PendingCommands, PortfolioCommands, SyncCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, agent } => cli::init::run(data_dir, agent),
        Commands::Load { path } => cli::load::run(&path),
        Commands::Status => cli::status::run(),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Portfolio { command } => match command {
            PortfolioCommands::Import { file, format } => cli::portfolio::import(&file, format.as_deref()),
            PortfolioCommands::List { search } => cli::portfolio::list(search.as_deref()),
            PortfolioCommands::Show { credit } => cli::portfolio::show(&credit),
        },
        Commands::Pending { command } => match command {
            PendingCommands::Add {
                credit,
                amount,
                payment_type,
                cycle,
                client,
                lat,
                lon,
                photo,
            } => cli::pending::add(cli::pending::AddArgs {
                credit,
                amount,
                payment_type,
                cycle,
                client,
                lat,
                lon,
                photo,
            }),
            PendingCommands::List { credit } => cli::pending::list(credit.as_deref()),
            PendingCommands::Delete { id } => cli::pending::delete(&id),
            PendingCommands::Clear { yes } => cli::pending::clear(yes),
            PendingCommands::Total { credit } => cli::pending::total(&credit),
        },
        Commands::Settlement { date } => cli::settlement::run(date.as_deref()),
        Commands::Sync { command } => match command {
            SyncCommands::Export { output } => cli::sync::export(output),
            SyncCommands::Ack { file } => cli::sync::ack(&file),
        },
        Commands::Catalog { command } => match command {
            CatalogCommands::List { all } => cli::catalog::list(all),
            CatalogCommands::Add { code, description } => cli::catalog::add(&code, &description),
            CatalogCommands::Disable { code } => cli::catalog::disable(&code),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "cobranza", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
