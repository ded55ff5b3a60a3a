//! Services shared by every front-end.

mod database;

pub use database::DatabaseService;
