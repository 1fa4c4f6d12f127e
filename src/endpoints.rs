//! Query endpoints
//!
//! Each endpoint wraps exactly one query against the store:
//! - `getVenues`, `getAllPapers`, `getFieldsStem`, `getFieldsSocSci`,
//!   `getAllFieldsAgg`, `getCounts` take no arguments and are cached
//! - `getFilteredPapers` validates `{venue, minYear}` and is never cached
//!
//! Cached results are computed on first use and served until
//! [`Endpoints::clear_cache`] is called.

use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::model::{
    FieldCount, FieldPartition, FieldTotal, PaperCount, VenueYear, YearCount, YEAR_CEILING,
    YEAR_FLOOR,
};
use crate::storage::{Column, Filter, Order, Select, SqliteStore, Table};
use crate::{Error, Result};

/// Names of the endpoint surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointName {
    GetVenues,
    GetAllPapers,
    GetFilteredPapers,
    GetFieldsStem,
    GetFieldsSocSci,
    GetAllFieldsAgg,
    GetCounts,
}

impl EndpointName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointName::GetVenues => "getVenues",
            EndpointName::GetAllPapers => "getAllPapers",
            EndpointName::GetFilteredPapers => "getFilteredPapers",
            EndpointName::GetFieldsStem => "getFieldsStem",
            EndpointName::GetFieldsSocSci => "getFieldsSocSci",
            EndpointName::GetAllFieldsAgg => "getAllFieldsAgg",
            EndpointName::GetCounts => "getCounts",
        }
    }

    pub fn all() -> &'static [EndpointName] {
        &[
            EndpointName::GetVenues,
            EndpointName::GetAllPapers,
            EndpointName::GetFilteredPapers,
            EndpointName::GetFieldsStem,
            EndpointName::GetFieldsSocSci,
            EndpointName::GetAllFieldsAgg,
            EndpointName::GetCounts,
        ]
    }

    /// Zero-argument endpoints whose result is computed once
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, EndpointName::GetFilteredPapers)
    }
}

impl FromStr for EndpointName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EndpointName::all()
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownEndpoint(s.to_string()))
    }
}

impl std::fmt::Display for EndpointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated arguments of `getFilteredPapers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub venue: String,
    pub min_year: i64,
}

impl FilterParams {
    /// Validate raw `{venue, minYear}` arguments.
    ///
    /// `venue` must be a non-empty string and `minYear` any finite number.
    /// A fractional `minYear` is rounded up, since years are whole.
    pub fn parse(args: &Value) -> Result<Self> {
        let obj = args
            .as_object()
            .ok_or_else(|| Error::Validation("expected an object with venue and minYear".into()))?;

        let venue = match obj.get("venue") {
            Some(Value::String(v)) if v.is_empty() => {
                return Err(Error::Validation("venue must not be empty".into()));
            }
            Some(Value::String(v)) => v.clone(),
            Some(other) => {
                return Err(Error::Validation(format!("venue must be a string, got {}", other)));
            }
            None => return Err(Error::Validation("missing venue".into())),
        };

        let min_year = match obj.get("minYear") {
            Some(Value::Number(n)) => year_bound(n).ok_or_else(|| {
                Error::Validation(format!("minYear must be a finite number, got {}", n))
            })?,
            Some(other) => {
                return Err(Error::Validation(format!("minYear must be a number, got {}", other)));
            }
            None => return Err(Error::Validation("missing minYear".into())),
        };

        Ok(Self { venue, min_year })
    }
}

/// Smallest whole year satisfying `year >= n`, saturated to the i64 range
fn year_bound(n: &serde_json::Number) -> Option<i64> {
    if let Some(v) = n.as_i64() {
        return Some(v);
    }
    n.as_f64()
        .filter(|f| f.is_finite())
        .map(|f| f.ceil().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

/// Lazily computed, clearable result
struct Cached<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Cached<T> {
    fn new() -> Self {
        Self { slot: RwLock::new(None) }
    }

    fn get_or_try_init(&self, name: EndpointName, init: impl FnOnce() -> Result<T>) -> Result<Arc<T>> {
        if let Some(hit) = self.read().as_ref() {
            tracing::debug!(endpoint = %name, "cache hit");
            return Ok(Arc::clone(hit));
        }

        let mut slot = self.slot.write().unwrap_or_else(|p| p.into_inner());
        // Another caller may have filled it while we waited for the lock
        if let Some(hit) = slot.as_ref() {
            return Ok(Arc::clone(hit));
        }
        let value = Arc::new(init()?);
        *slot = Some(Arc::clone(&value));
        tracing::debug!(endpoint = %name, "cache filled");
        Ok(value)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<T>>> {
        self.slot.read().unwrap_or_else(|p| p.into_inner())
    }

    fn is_filled(&self) -> bool {
        self.read().is_some()
    }

    fn clear(&self) {
        *self.slot.write().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

/// The endpoint surface over one shared store.
pub struct Endpoints {
    store: Arc<SqliteStore>,
    venues: Cached<Vec<String>>,
    all_papers: Cached<Vec<PaperCount>>,
    fields_stem: Cached<Vec<FieldCount>>,
    fields_soc_sci: Cached<Vec<FieldCount>>,
    all_fields_agg: Cached<Vec<FieldTotal>>,
    counts: Cached<Vec<VenueYear>>,
}

impl Endpoints {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            store,
            venues: Cached::new(),
            all_papers: Cached::new(),
            fields_stem: Cached::new(),
            fields_soc_sci: Cached::new(),
            all_fields_agg: Cached::new(),
            counts: Cached::new(),
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Distinct venues in `papers`
    pub fn get_venues(&self) -> Result<Arc<Vec<String>>> {
        self.venues.get_or_try_init(EndpointName::GetVenues, || {
            self.store.select_map(
                &Select::from(Table::Papers).columns(&[Column::Venue]).distinct(),
                |row| row.get(0),
            )
        })
    }

    /// Every `papers` row, oldest year first
    pub fn get_all_papers(&self) -> Result<Arc<Vec<PaperCount>>> {
        self.all_papers.get_or_try_init(EndpointName::GetAllPapers, || {
            self.store
                .select(&Select::from(Table::Papers).order_by(Column::Year, Order::Asc))
        })
    }

    /// `(year, count)` for one venue from `min_year` on, oldest first
    pub fn get_filtered_papers(&self, params: &FilterParams) -> Result<Vec<YearCount>> {
        self.store.select(
            &Select::from(Table::Papers)
                .columns(&[Column::Year, Column::Count])
                .filter(Filter::equals(Column::Venue, params.venue.clone()))
                .filter(Filter::Gte(Column::Year, params.min_year))
                .order_by(Column::Year, Order::Asc),
        )
    }

    pub fn get_fields_stem(&self) -> Result<Arc<Vec<FieldCount>>> {
        self.fields_stem.get_or_try_init(EndpointName::GetFieldsStem, || {
            self.fields_in(FieldPartition::Stem)
        })
    }

    pub fn get_fields_soc_sci(&self) -> Result<Arc<Vec<FieldCount>>> {
        self.fields_soc_sci.get_or_try_init(EndpointName::GetFieldsSocSci, || {
            self.fields_in(FieldPartition::SocSci)
        })
    }

    fn fields_in(&self, partition: FieldPartition) -> Result<Vec<FieldCount>> {
        self.store.select(
            &Select::from(Table::Fields)
                .filter(Filter::in_list(Column::Field, partition.fields()))
                .filter(Filter::Between(Column::Year, YEAR_FLOOR, YEAR_CEILING))
                .order_by(Column::Year, Order::Asc),
        )
    }

    /// Summed count per field from `YEAR_FLOOR` on, for every field
    pub fn get_all_fields_agg(&self) -> Result<Arc<Vec<FieldTotal>>> {
        self.all_fields_agg.get_or_try_init(EndpointName::GetAllFieldsAgg, || {
            self.store.select(
                &Select::from(Table::Fields)
                    .filter(Filter::Gte(Column::Year, YEAR_FLOOR))
                    .sum_by(Column::Field, Column::Count, "total_count")
                    .order_by(Column::Field, Order::Asc),
            )
        })
    }

    /// Every `venue` row, newest year first
    pub fn get_counts(&self) -> Result<Arc<Vec<VenueYear>>> {
        self.counts.get_or_try_init(EndpointName::GetCounts, || {
            self.store
                .select(&Select::from(Table::Venue).order_by(Column::Year, Order::Desc))
        })
    }

    /// Evaluate every cacheable endpoint ahead of serving
    pub fn prerender(&self) -> Result<()> {
        for name in EndpointName::all().iter().filter(|n| n.is_cacheable()) {
            self.invoke_name(*name, &Value::Null)?;
        }
        tracing::info!("Prerendered {} endpoints", self.cached_count());
        Ok(())
    }

    /// Drop every cached result; the next call recomputes it
    pub fn clear_cache(&self) {
        self.venues.clear();
        self.all_papers.clear();
        self.fields_stem.clear();
        self.fields_soc_sci.clear();
        self.all_fields_agg.clear();
        self.counts.clear();
        tracing::info!("Endpoint cache cleared");
    }

    /// Number of endpoints currently served from cache
    pub fn cached_count(&self) -> usize {
        [
            self.venues.is_filled(),
            self.all_papers.is_filled(),
            self.fields_stem.is_filled(),
            self.fields_soc_sci.is_filled(),
            self.all_fields_agg.is_filled(),
            self.counts.is_filled(),
        ]
        .into_iter()
        .filter(|filled| *filled)
        .count()
    }

    /// Invoke an endpoint by name with raw JSON arguments
    pub fn invoke(&self, name: &str, args: &Value) -> Result<Value> {
        let name: EndpointName = name.parse()?;
        self.invoke_name(name, args)
    }

    pub fn invoke_name(&self, name: EndpointName, args: &Value) -> Result<Value> {
        let value = match name {
            EndpointName::GetVenues => serde_json::to_value(&*self.get_venues()?)?,
            EndpointName::GetAllPapers => serde_json::to_value(&*self.get_all_papers()?)?,
            EndpointName::GetFilteredPapers => {
                let params = FilterParams::parse(args)?;
                serde_json::to_value(self.get_filtered_papers(&params)?)?
            }
            EndpointName::GetFieldsStem => serde_json::to_value(&*self.get_fields_stem()?)?,
            EndpointName::GetFieldsSocSci => serde_json::to_value(&*self.get_fields_soc_sci()?)?,
            EndpointName::GetAllFieldsAgg => serde_json::to_value(&*self.get_all_fields_agg()?)?,
            EndpointName::GetCounts => serde_json::to_value(&*self.get_counts()?)?,
        };
        Ok(value)
    }
}
