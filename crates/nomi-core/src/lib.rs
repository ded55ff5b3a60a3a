//! nomi-core - Core library for nomi-log
//!
//! This crate contains the record and settings models, the local libSQL
//! store, and the engine that keeps the store in sync with a
//! spreadsheet-backed remote endpoint. Every nomi-log front-end builds on it.

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod stats;
pub mod sync;
pub mod util;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use models::{DrinkingRecord, RecordId};
pub use services::DatabaseService;
