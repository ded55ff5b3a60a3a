use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "nomi")]
#[command(about = "Log drinks from the command line and sync them to your spreadsheet")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Skip the background sync that follows local changes
    #[arg(long, global = true)]
    pub no_sync: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a drink
    #[command(alias = "new")]
    Add(RecordArgs),
    /// List logged drinks
    List {
        /// Only this logical day (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", conflicts_with_all = ["from", "to"])]
        date: Option<String>,
        /// First day of the range (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Last day of the range (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
        /// Include soft-deleted records
        #[arg(long)]
        deleted: bool,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a logged drink
    Edit {
        /// Record ID or unique ID prefix
        id: String,
        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Delete a logged drink
    Delete {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Show intake totals
    Stats {
        /// First day of the range (defaults to 6 days before --to)
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Last day of the range (defaults to today)
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync with the remote spreadsheet
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Manage the sync endpoint
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show or reset synchronized settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Write a JSON backup of all records and settings
    Export {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Restore records and settings from a JSON backup
    Import {
        /// Backup file to read
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Delete all local records and reset presets and thresholds
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Record fields shared by `add` and `edit`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RecordArgs {
    /// Drink type id (see `nomi settings show`)
    #[arg(short = 't', long = "type", value_name = "ID")]
    pub drink_type: Option<String>,
    /// Amount in millilitres
    #[arg(short, long, value_name = "ML")]
    pub amount: Option<f64>,
    /// Alcohol by volume in percent
    #[arg(short, long, value_name = "PCT")]
    pub percentage: Option<f64>,
    /// Free-text name
    #[arg(short, long)]
    pub name: Option<String>,
    /// Logical day (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Push local changes, then pull remote changes since the last sync
    Run,
    /// Push unsynced records only
    Push,
    /// Pull records changed on the remote
    Pull {
        /// Pull every remote record instead of changes since the last sync
        #[arg(long)]
        full: bool,
    },
    /// Push and pull records and settings
    Full,
    /// Show sync configuration and pending changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set the remote script URL
    SetUrl {
        /// Deployed web app URL
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Forget the remote script URL and disable sync
    ClearUrl,
    /// Show the current configuration
    Show,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show presets, thresholds and drink types
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore every synchronized setting to its default
    Reset,
}
