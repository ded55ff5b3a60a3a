//! nomi CLI - Log drinks from the terminal and sync them to a spreadsheet.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ConfigCommands, SettingsCommands, SyncCommands};
use crate::commands::add::run_add;
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::config::{run_config_clear_url, run_config_set_url, run_config_show};
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::list::{run_list, ListFilter};
use crate::commands::reset::run_reset;
use crate::commands::settings::{run_settings_reset, run_settings_show};
use crate::commands::stats::run_stats;
use crate::commands::sync::{
    run_sync, run_sync_full, run_sync_pull, run_sync_push, run_sync_status,
};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nomi=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path)?;
    let no_sync = cli.no_sync;

    match command {
        Commands::Add(args) => run_add(args, &db_path, no_sync).await?,
        Commands::List {
            date,
            from,
            to,
            deleted,
            limit,
            json,
        } => {
            let filter = ListFilter {
                date,
                from,
                to,
                include_deleted: deleted,
            };
            run_list(&filter, limit, json, &db_path).await?;
        }
        Commands::Edit { id, fields } => run_edit(&id, fields, &db_path, no_sync).await?,
        Commands::Delete { id } => run_delete(&id, &db_path, no_sync).await?,
        Commands::Stats { from, to, json } => {
            run_stats(from.as_deref(), to.as_deref(), json, &db_path).await?;
        }
        Commands::Sync { command } => match command.unwrap_or(SyncCommands::Run) {
            SyncCommands::Run => run_sync(&db_path).await?,
            SyncCommands::Push => run_sync_push(&db_path).await?,
            SyncCommands::Pull { full } => run_sync_pull(full, &db_path).await?,
            SyncCommands::Full => run_sync_full(&db_path).await?,
            SyncCommands::Status { json } => run_sync_status(json, &db_path).await?,
        },
        Commands::Config { command } => match command {
            ConfigCommands::SetUrl { url } => run_config_set_url(&url, &db_path).await?,
            ConfigCommands::ClearUrl => run_config_clear_url(&db_path).await?,
            ConfigCommands::Show => run_config_show(&db_path).await?,
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => run_settings_show(json, &db_path).await?,
            SettingsCommands::Reset => run_settings_reset(&db_path).await?,
        },
        Commands::Export { output } => run_export(output.as_deref(), &db_path).await?,
        Commands::Import { path } => run_import(&path, &db_path).await?,
        Commands::Reset { yes } => run_reset(yes, &db_path).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
