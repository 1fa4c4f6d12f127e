//! Database schema definitions
//!
//! Table and column names are a compatibility surface shared with the
//! frontend; do not rename them.

use crate::{Error, Result};
use std::str::FromStr;
use std::sync::OnceLock;

/// SQL to create the papers table
pub const CREATE_PAPERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS papers (
    venue TEXT NOT NULL,
    year INTEGER NOT NULL,
    count INTEGER NOT NULL
)
"#;

/// SQL to create the fields table
pub const CREATE_FIELDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fields (
    field TEXT NOT NULL,
    year INTEGER NOT NULL,
    count INTEGER NOT NULL
)
"#;

/// SQL to create the venue table
/// One row per (venue, year); count may be unknown
pub const CREATE_VENUE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS venue (
    venue TEXT NOT NULL,
    year INTEGER NOT NULL,
    count INTEGER,
    PRIMARY KEY (venue, year)
)
"#;

/// SQL to create the venue/field membership table
pub const CREATE_TOP_VENUE_GOOGLE_SCHOLAR_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS top_venue_google_scholar (
    venue TEXT NOT NULL,
    field TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_papers_venue_year ON papers(venue, year)",
    "CREATE INDEX IF NOT EXISTS idx_fields_field_year ON fields(field, year)",
    "CREATE INDEX IF NOT EXISTS idx_top_venue_field ON top_venue_google_scholar(field)",
];

/// A stored table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Papers,
    Fields,
    Venue,
    TopVenueGoogleScholar,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Papers => "papers",
            Table::Fields => "fields",
            Table::Venue => "venue",
            Table::TopVenueGoogleScholar => "top_venue_google_scholar",
        }
    }

    pub fn all() -> &'static [Table] {
        &[
            Table::Papers,
            Table::Fields,
            Table::Venue,
            Table::TopVenueGoogleScholar,
        ]
    }

    /// Schema definition of this table
    pub fn def(&self) -> &'static TableDef {
        registry().get(*self)
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Table::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown table: {}", s)))
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A column addressable in queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Venue,
    Field,
    Year,
    Count,
}

impl Column {
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Venue => "venue",
            Column::Field => "field",
            Column::Year => "year",
            Column::Count => "count",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of one table
#[derive(Debug)]
pub struct TableDef {
    pub table: Table,
    pub create_sql: &'static str,
    /// Columns in declaration order
    pub columns: &'static [Column],
    /// Composite primary key, empty when the table has none
    pub primary_key: &'static [Column],
}

impl TableDef {
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }
}

/// Process-wide schema, one definition per table name
#[derive(Debug)]
pub struct SchemaRegistry {
    tables: Vec<TableDef>,
}

impl SchemaRegistry {
    fn build() -> Self {
        Self {
            tables: vec![
                TableDef {
                    table: Table::Papers,
                    create_sql: CREATE_PAPERS_TABLE,
                    columns: &[Column::Venue, Column::Year, Column::Count],
                    primary_key: &[],
                },
                TableDef {
                    table: Table::Fields,
                    create_sql: CREATE_FIELDS_TABLE,
                    columns: &[Column::Field, Column::Year, Column::Count],
                    primary_key: &[],
                },
                TableDef {
                    table: Table::Venue,
                    create_sql: CREATE_VENUE_TABLE,
                    columns: &[Column::Venue, Column::Year, Column::Count],
                    primary_key: &[Column::Venue, Column::Year],
                },
                TableDef {
                    table: Table::TopVenueGoogleScholar,
                    create_sql: CREATE_TOP_VENUE_GOOGLE_SCHOLAR_TABLE,
                    columns: &[Column::Venue, Column::Field],
                    primary_key: &[],
                },
            ],
        }
    }

    pub fn get(&self, table: Table) -> &TableDef {
        // build() registers every variant of Table
        self.tables
            .iter()
            .find(|def| def.table == table)
            .unwrap_or_else(|| unreachable!("table {} missing from schema registry", table))
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// All schema creation statements
    pub fn statements(&self) -> Vec<&'static str> {
        let mut stmts: Vec<&'static str> = self.tables.iter().map(|def| def.create_sql).collect();
        stmts.extend(CREATE_INDEXES.iter().copied());
        stmts
    }
}

static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

/// The schema registry, built on first use
pub fn registry() -> &'static SchemaRegistry {
    REGISTRY.get_or_init(SchemaRegistry::build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_table() {
        for table in Table::all() {
            assert_eq!(registry().get(*table).table, *table);
        }
        assert_eq!(registry().tables().len(), Table::all().len());
    }

    #[test]
    fn test_venue_has_composite_key() {
        let def = Table::Venue.def();
        assert_eq!(def.primary_key, &[Column::Venue, Column::Year]);
        assert!(Table::Papers.def().primary_key.is_empty());
    }

    #[test]
    fn test_table_from_str() {
        assert_eq!("fields".parse::<Table>().unwrap(), Table::Fields);
        assert!("authors".parse::<Table>().is_err());
    }
}
