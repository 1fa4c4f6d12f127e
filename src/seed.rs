//! Seed/import jobs - load JSON count snapshots into the store
//!
//! The snapshot shape is `{ "data": [ { "year": 2020, "count": 5 }, ... ] }`.
//! Every entry is stamped with one fixed label (a venue or field name).
//!
//! Jobs are not safe to run concurrently with each other; they are meant to
//! be run standalone from the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{FieldCount, PaperCount, VenueField, VenueYear};
use crate::storage::{SqliteStore, Table};
use crate::{Error, Result};

/// One `{year, count}` entry of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeedEntry {
    pub year: i64,
    pub count: i64,
}

/// Parsed snapshot document
#[derive(Debug, Clone, Deserialize)]
pub struct SeedSource {
    pub data: Vec<SeedEntry>,
}

/// Table a labelled snapshot is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedTarget {
    /// `papers`, label is the venue
    Papers,
    /// `fields`, label is the field of study
    Fields,
}

impl SeedTarget {
    pub fn table(&self) -> Table {
        match self {
            SeedTarget::Papers => Table::Papers,
            SeedTarget::Fields => Table::Fields,
        }
    }
}

impl std::str::FromStr for SeedTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "papers" => Ok(SeedTarget::Papers),
            "fields" => Ok(SeedTarget::Fields),
            _ => Err(Error::Validation(format!("Unknown seed target: {}", s))),
        }
    }
}

/// Outcome of a seed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub table: &'static str,
    pub label: String,
    pub removed: usize,
    pub inserted: usize,
}

fn data_source_error(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::DataSource {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| data_source_error(path, e))?;
    serde_json::from_str(&contents).map_err(|e| data_source_error(path, e))
}

/// Read and parse a snapshot file
pub fn load_source(path: &Path) -> Result<SeedSource> {
    let source: SeedSource = read_json(path)?;
    if let Some(bad) = source.data.iter().find(|e| e.count < 0) {
        return Err(data_source_error(
            path,
            format!("negative count {} for year {}", bad.count, bad.year),
        ));
    }
    Ok(source)
}

/// Replace the contents of one table with a labelled snapshot.
#[derive(Debug, Clone)]
pub struct SeedJob {
    pub source: PathBuf,
    pub label: String,
    pub target: SeedTarget,
}

impl SeedJob {
    /// A job seeding `papers` with `label` as the venue
    pub fn new(source: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            label: label.into(),
            target: SeedTarget::Papers,
        }
    }

    pub fn with_target(mut self, target: SeedTarget) -> Self {
        self.target = target;
        self
    }

    /// Run the job.
    ///
    /// The source is parsed before anything is deleted, so a missing or
    /// malformed file leaves the table untouched.
    pub fn run(&self, store: &SqliteStore) -> Result<SeedReport> {
        let source = load_source(&self.source)?;
        let table = self.target.table();

        store.ensure_table(table)?;
        let removed = store.clear_table(table)?;

        let inserted = match self.target {
            SeedTarget::Papers => {
                let rows: Vec<PaperCount> = source
                    .data
                    .iter()
                    .map(|e| PaperCount::new(self.label.as_str(), e.year, e.count))
                    .collect();
                store.insert_papers(&rows)?
            }
            SeedTarget::Fields => {
                let rows: Vec<FieldCount> = source
                    .data
                    .iter()
                    .map(|e| FieldCount::new(self.label.as_str(), e.year, e.count))
                    .collect();
                store.insert_fields(&rows)?
            }
        };

        tracing::info!(
            table = table.as_str(),
            label = %self.label,
            removed,
            inserted,
            "Imported {} records",
            inserted
        );

        Ok(SeedReport {
            table: table.as_str(),
            label: self.label.clone(),
            removed,
            inserted,
        })
    }
}

/// Upsert a labelled snapshot into `venue` without clearing it.
///
/// Existing (venue, year) rows are replaced; other rows are kept.
pub fn sync_venue_years(store: &SqliteStore, path: &Path, venue: &str) -> Result<usize> {
    let source = load_source(path)?;
    store.ensure_table(Table::Venue)?;

    let rows: Vec<VenueYear> = source
        .data
        .iter()
        .map(|e| VenueYear::new(venue, e.year, Some(e.count)))
        .collect();
    let synced = store.upsert_venue_years(&rows)?;

    tracing::info!(venue, synced, "Synced {} venue-year records", synced);
    Ok(synced)
}

/// Replace `top_venue_google_scholar` with a JSON array of `{venue, field}`
pub fn import_memberships(store: &SqliteStore, path: &Path) -> Result<usize> {
    let rows: Vec<VenueField> = read_json(path)?;
    if let Some(bad) = rows.iter().find(|r| r.venue.is_empty() || r.field.is_empty()) {
        return Err(data_source_error(
            path,
            format!("empty venue or field in membership {:?}", bad),
        ));
    }

    store.ensure_table(Table::TopVenueGoogleScholar)?;
    store.clear_table(Table::TopVenueGoogleScholar)?;
    let inserted = store.insert_venue_fields(&rows)?;

    tracing::info!(inserted, "Imported {} venue memberships", inserted);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Column, Order, Select};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const NATURE: &str = r#"{"data":[{"year":2020,"count":5},{"year":2021,"count":7}]}"#;

    fn write_source(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn all_papers(store: &SqliteStore) -> Vec<PaperCount> {
        store
            .select(&Select::from(Table::Papers).order_by(Column::Year, Order::Asc))
            .unwrap()
    }

    #[test]
    fn test_seed_papers() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = write_source(NATURE);

        let report = SeedJob::new(file.path(), "Nature").run(&store).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.removed, 0);

        assert_eq!(
            all_papers(&store),
            vec![
                PaperCount::new("Nature", 2020, 5),
                PaperCount::new("Nature", 2021, 7),
            ]
        );
    }

    #[test]
    fn test_seeded_rows_served_by_endpoint() {
        let store = std::sync::Arc::new(SqliteStore::open_in_memory().unwrap());
        let file = write_source(NATURE);
        SeedJob::new(file.path(), "Nature").run(&store).unwrap();

        let endpoints = crate::Endpoints::new(store);
        let papers = endpoints.get_all_papers().unwrap();
        let years: Vec<i64> = papers.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2020, 2021]);
        assert!(papers.iter().all(|p| p.venue == "Nature"));
    }

    #[test]
    fn test_seed_twice_does_not_duplicate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = write_source(NATURE);
        let job = SeedJob::new(file.path(), "Nature");

        job.run(&store).unwrap();
        let first = all_papers(&store);
        let report = job.run(&store).unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(all_papers(&store), first);
    }

    #[test]
    fn test_seed_creates_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("local.db");
        let store = SqliteStore::open(&db_path).unwrap();

        // Another handle drops the table out from under the store
        let other = rusqlite::Connection::open(&db_path).unwrap();
        other.execute("DROP TABLE papers", []).unwrap();
        drop(other);

        let file = write_source(NATURE);
        let report = SeedJob::new(file.path(), "Nature").run(&store).unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(store.table_count(Table::Papers).unwrap(), 2);
    }

    #[test]
    fn test_seed_fields_target() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = write_source(NATURE);

        let report = SeedJob::new(file.path(), "Biology")
            .with_target(SeedTarget::Fields)
            .run(&store)
            .unwrap();
        assert_eq!(report.table, "fields");

        let rows: Vec<FieldCount> = store.select(&Select::from(Table::Fields)).unwrap();
        assert!(rows.iter().all(|r| r.field == "Biology"));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_file_is_data_source_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = SeedJob::new("does/not/exist.json", "Nature").run(&store).unwrap_err();
        assert!(matches!(err, Error::DataSource { .. }));
    }

    #[test]
    fn test_malformed_file_leaves_table_untouched() {
        let store = SqliteStore::open_in_memory().unwrap();
        let good = write_source(NATURE);
        SeedJob::new(good.path(), "Nature").run(&store).unwrap();

        let bad = write_source(r#"{"data":[{"year":"twenty","count":1}]}"#);
        let err = SeedJob::new(bad.path(), "Nature").run(&store).unwrap_err();
        assert!(matches!(err, Error::DataSource { .. }));
        assert_eq!(store.table_count(Table::Papers).unwrap(), 2);
    }

    #[test]
    fn test_negative_count_rejected() {
        let file = write_source(r#"{"data":[{"year":2020,"count":-1}]}"#);
        assert!(matches!(load_source(file.path()), Err(Error::DataSource { .. })));
    }

    #[test]
    fn test_sync_venue_years_upserts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = write_source(NATURE);
        sync_venue_years(&store, first.path(), "Nature").unwrap();

        let second = write_source(r#"{"data":[{"year":2021,"count":8},{"year":2022,"count":1}]}"#);
        sync_venue_years(&store, second.path(), "Nature").unwrap();

        let rows: Vec<VenueYear> = store
            .select(&Select::from(Table::Venue).order_by(Column::Year, Order::Asc))
            .unwrap();
        assert_eq!(
            rows,
            vec![
                VenueYear::new("Nature", 2020, Some(5)),
                VenueYear::new("Nature", 2021, Some(8)),
                VenueYear::new("Nature", 2022, Some(1)),
            ]
        );
    }

    #[test]
    fn test_import_memberships() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = write_source(
            r#"[{"venue":"Nature","field":"Biology"},{"venue":"Cell","field":"Biology"}]"#,
        );
        assert_eq!(import_memberships(&store, file.path()).unwrap(), 2);
        assert_eq!(import_memberships(&store, file.path()).unwrap(), 2);
        assert_eq!(store.table_count(Table::TopVenueGoogleScholar).unwrap(), 2);
    }
}
