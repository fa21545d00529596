//! Awareness CLI
//!
//! Command-line access to a local design-awareness store

use std::path::PathBuf;

use awareness_core::logging_facility::{init, Profile};
use clap::{Parser, Subcommand};

mod commands;
mod context;

#[derive(Debug, Parser)]
#[command(name = "awareness")]
#[command(about = "Design awareness - local entity store and document import", long_about = None)]
struct Cli {
    /// SQLite database holding the entity store
    #[arg(long, global = true, env = "AWARENESS_DB", default_value = ".awareness/store.db")]
    db: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "AWARENESS_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List stored entity ids per collection
    Ls(commands::ls::LsArgs),
    /// Print the portable document of an entity
    Show(commands::show::ShowArgs),
    /// Write the portable document of an entity to a file
    Export(commands::export::ExportArgs),
    /// Import a portable document and print the import report
    Import(commands::import::ImportArgs),
    /// Close unterminated activity intervals of a realtime session
    Repair(commands::repair::RepairArgs),
    /// Recently opened projects
    Recent(commands::recent::RecentArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init(if cli.log_json {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match context::Context::open(&cli.db) {
        Ok(ctx) => match cli.command {
            Commands::Ls(args) => commands::ls::execute(args, &ctx).await,
            Commands::Show(args) => commands::show::execute(args, &ctx).await,
            Commands::Export(args) => commands::export::execute(args, &ctx).await,
            Commands::Import(args) => commands::import::execute(args, &ctx).await,
            Commands::Repair(args) => commands::repair::execute(args, &ctx).await,
            Commands::Recent(args) => commands::recent::execute(args, &ctx).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
