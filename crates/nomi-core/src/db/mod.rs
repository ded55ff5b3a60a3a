//! Local record store for nomi-log

mod connection;
mod migrations;
mod record_repository;
mod settings_repository;

pub use connection::Database;
pub use record_repository::{
    LibSqlRecordRepository, MergeRule, PushedVersion, RecordRepository,
};
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository};
