//! SQLite storage implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

use super::query::Select;
use super::schema::{self, Table};
use crate::model::{FieldCount, FieldTotal, PaperCount, VenueField, VenueYear, YearCount};
use crate::Result;

/// Conversion from a result row, by column name
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

impl FromRow for PaperCount {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PaperCount {
            venue: row.get("venue")?,
            year: row.get("year")?,
            count: row.get("count")?,
        })
    }
}

impl FromRow for FieldCount {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(FieldCount {
            field: row.get("field")?,
            year: row.get("year")?,
            count: row.get("count")?,
        })
    }
}

impl FromRow for VenueYear {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(VenueYear {
            venue: row.get("venue")?,
            year: row.get("year")?,
            count: row.get("count")?,
        })
    }
}

impl FromRow for VenueField {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(VenueField {
            venue: row.get("venue")?,
            field: row.get("field")?,
        })
    }
}

impl FromRow for YearCount {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(YearCount {
            year: row.get("year")?,
            count: row.get("count")?,
        })
    }
}

impl FromRow for FieldTotal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(FieldTotal {
            field: row.get("field")?,
            total_count: row.get("total_count")?,
        })
    }
}

/// SQLite-backed storage for the count tables.
///
/// Owns the only connection to the database file. The connection sits
/// behind a mutex so one store can be shared across request handlers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn();
        for stmt in schema::registry().statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Read Operations ==========

    /// Run a select and map every row with `f`
    pub fn select_map<T, F>(&self, select: &Select, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let stmt = select.build()?;
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "select");

        let conn = self.conn();
        let mut prepared = conn.prepare(&stmt.sql)?;
        let rows = prepared
            .query_map(params_from_iter(stmt.params.iter()), f)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    /// Run a select and convert each row into `T`
    pub fn select<T: FromRow>(&self, select: &Select) -> Result<Vec<T>> {
        self.select_map(select, T::from_row)
    }

    /// Count rows in a table
    pub fn table_count(&self, table: Table) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
        let count: i64 = self.conn().query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            papers: self.table_count(Table::Papers)?,
            fields: self.table_count(Table::Fields)?,
            venue: self.table_count(Table::Venue)?,
            top_venue_google_scholar: self.table_count(Table::TopVenueGoogleScholar)?,
        })
    }

    // ========== Write Operations ==========

    /// Create a table if it is absent
    pub fn ensure_table(&self, table: Table) -> Result<()> {
        self.conn().execute(table.def().create_sql, [])?;
        Ok(())
    }

    /// Delete every row of a table, returning how many were removed
    pub fn clear_table(&self, table: Table) -> Result<usize> {
        let sql = format!("DELETE FROM {}", table.as_str());
        let removed = self.conn().execute(&sql, [])?;
        Ok(removed)
    }

    /// Bulk insert paper counts in one transaction
    pub fn insert_papers(&self, rows: &[PaperCount]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO papers (venue, year, count) VALUES (?1, ?2, ?3)")?;
            for row in rows {
                stmt.execute(params![row.venue, row.year, row.count])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Bulk insert field counts in one transaction
    pub fn insert_fields(&self, rows: &[FieldCount]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO fields (field, year, count) VALUES (?1, ?2, ?3)")?;
            for row in rows {
                stmt.execute(params![row.field, row.year, row.count])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Insert or replace venue-year rows, keyed by (venue, year)
    pub fn upsert_venue_years(&self, rows: &[VenueYear]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO venue (venue, year, count) VALUES (?1, ?2, ?3)",
            )?;
            for row in rows {
                stmt.execute(params![row.venue, row.year, row.count])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Bulk insert venue/field memberships in one transaction
    pub fn insert_venue_fields(&self, rows: &[VenueField]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO top_venue_google_scholar (venue, field) VALUES (?1, ?2)",
            )?;
            for row in rows {
                stmt.execute(params![row.venue, row.field])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub papers: usize,
    pub fields: usize,
    pub venue: usize,
    pub top_venue_google_scholar: usize,
}

impl DbStats {
    /// (table, row count) pairs in schema order
    pub fn rows(&self) -> [(&'static str, usize); 4] {
        [
            (Table::Papers.as_str(), self.papers),
            (Table::Fields.as_str(), self.fields),
            (Table::Venue.as_str(), self.venue),
            (Table::TopVenueGoogleScholar.as_str(), self.top_venue_google_scholar),
        ]
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, count) in self.rows() {
            writeln!(f, "  {}: {}", table, count)?;
        }
        Ok(())
    }
}
