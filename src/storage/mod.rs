//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - papers(venue, year, count)
//! - fields(field, year, count)
//! - venue(venue, year, count) keyed by (venue, year)
//! - top_venue_google_scholar(venue, field)

pub mod query;
pub mod schema;
pub mod sqlite;

pub use query::{Filter, Order, Select};
pub use schema::{Column, Table};
pub use sqlite::{DbStats, FromRow, SqliteStore};
