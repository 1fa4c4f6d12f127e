//! # scisci - Publication count backend
//!
//! Read-mostly query surface over paper and field-of-study counts.
//!
//! scisci provides:
//! - A static schema registry for the `papers`, `fields`, `venue` and
//!   `top_venue_google_scholar` tables
//! - A SQLite-backed store with a typed query builder
//! - A seed job that loads `{year, count}` snapshots from JSON
//! - Named query endpoints, cached or parameterized, served over HTTP

pub mod model;
pub mod storage;
pub mod seed;
pub mod endpoints;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{FieldCount, FieldTotal, PaperCount, VenueField, VenueYear, YearCount};
pub use storage::SqliteStore;
pub use endpoints::Endpoints;

/// Result type alias for scisci operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for scisci operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Data source error ({path}): {reason}")]
    DataSource { path: String, reason: String },

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
