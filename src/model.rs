//! Record types - rows of the four stored tables and their query projections
//!
//! Field-of-study labels are partitioned into two fixed sets:
//! - `Stem`: natural sciences, engineering, medicine
//! - `SocSci`: social sciences and humanities
//!
//! Labels in neither set still exist in the `fields` table; they are only
//! excluded from the partitioned views.

use serde::{Deserialize, Serialize};

/// Earliest year included in the field views and the per-field totals
pub const YEAR_FLOOR: i64 = 1950;

/// Latest year included in the partitioned field views
pub const YEAR_CEILING: i64 = 2024;

/// STEM field-of-study labels
pub const STEM_FIELDS: [&str; 11] = [
    "Agricultural and Food Sciences",
    "Biology",
    "Chemistry",
    "Computer Science",
    "Engineering",
    "Environmental Science",
    "Geology",
    "Materials Science",
    "Mathematics",
    "Medicine",
    "Physics",
];

/// Social science and humanities field-of-study labels
pub const SOC_SCI_FIELDS: [&str; 12] = [
    "Art",
    "Business",
    "Economics",
    "Education",
    "Geography",
    "History",
    "Law",
    "Linguistics",
    "Philosophy",
    "Political Science",
    "Psychology",
    "Sociology",
];

/// A named partition of the field-of-study labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPartition {
    Stem,
    SocSci,
}

impl FieldPartition {
    /// Labels belonging to this partition
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            FieldPartition::Stem => &STEM_FIELDS,
            FieldPartition::SocSci => &SOC_SCI_FIELDS,
        }
    }
}

/// Paper count for one venue in one year (`papers` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperCount {
    pub venue: String,
    pub year: i64,
    pub count: i64,
}

impl PaperCount {
    pub fn new(venue: impl Into<String>, year: i64, count: i64) -> Self {
        Self { venue: venue.into(), year, count }
    }
}

/// Paper count for one field of study in one year (`fields` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCount {
    pub field: String,
    pub year: i64,
    pub count: i64,
}

impl FieldCount {
    pub fn new(field: impl Into<String>, year: i64, count: i64) -> Self {
        Self { field: field.into(), year, count }
    }
}

/// Venue-year listing (`venue` table); at most one row per (venue, year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueYear {
    pub venue: String,
    pub year: i64,
    pub count: Option<i64>,
}

impl VenueYear {
    pub fn new(venue: impl Into<String>, year: i64, count: Option<i64>) -> Self {
        Self { venue: venue.into(), year, count }
    }
}

/// Venue to field membership (`top_venue_google_scholar` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueField {
    pub venue: String,
    pub field: String,
}

/// `(year, count)` projection returned by the filtered paper query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i64,
    pub count: i64,
}

/// Summed count for one field across all years from `YEAR_FLOOR` on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTotal {
    pub field: String,
    pub total_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_partitions_are_disjoint() {
        let stem: HashSet<_> = STEM_FIELDS.iter().collect();
        let soc: HashSet<_> = SOC_SCI_FIELDS.iter().collect();
        assert!(stem.is_disjoint(&soc));
        assert_eq!(stem.len(), 11);
        assert_eq!(soc.len(), 12);
    }

    #[test]
    fn test_partition_fields() {
        assert_eq!(FieldPartition::Stem.fields(), &STEM_FIELDS[..]);
        assert_eq!(FieldPartition::SocSci.fields(), &SOC_SCI_FIELDS[..]);
    }
}
