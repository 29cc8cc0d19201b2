mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod logging;
mod models;
mod ratelimit;
mod reports;
mod settings;
mod store;

use clap::Parser;

use cli::import::ImportOptions;
use cli::{AgenciesCommands, Cli, Commands};

fn main() {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Agencies { command } => match command {
            AgenciesCommands::Add { name, default } => cli::agencies::add(&name, default),
            AgenciesCommands::List => cli::agencies::list(),
        },
        Commands::Import {
            file,
            agency,
            content_type,
            dry_run,
            strict,
            json,
        } => cli::import::run(
            &file,
            &ImportOptions {
                agency: agency.as_deref(),
                content_type: content_type.as_deref(),
                dry_run,
                strict,
                json,
            },
        ),
        Commands::Template { output } => cli::template::run(output),
        Commands::Trips { agency } => cli::trips::run(agency.as_deref()),
        Commands::Report { agency, year } => cli::report::run(agency.as_deref(), year),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
