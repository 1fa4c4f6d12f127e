use serde_json::Value;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::storage::DbStats;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Rows")]
    rows: usize,
}

/// Row counts per table
pub fn stats_table(stats: &DbStats) -> String {
    let rows: Vec<TableRow> = stats
        .rows()
        .into_iter()
        .map(|(table, rows)| TableRow { table: table.to_string(), rows })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Render an endpoint result as a table.
///
/// Arrays of objects get one column per key of the first object; arrays of
/// scalars get a single `value` column. Anything else is pretty-printed JSON.
pub fn records_table(value: &Value) -> String {
    let Some(items) = value.as_array() else {
        return serde_json::to_string_pretty(value).unwrap_or_default();
    };
    if items.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    match items[0].as_object() {
        Some(first) => {
            let keys: Vec<String> = first.keys().cloned().collect();
            builder.push_record(keys.clone());
            for item in items {
                builder.push_record(keys.iter().map(|k| cell(item.get(k))));
            }
        }
        None => {
            builder.push_record(["value".to_string()]);
            for item in items {
                builder.push_record([cell(Some(item))]);
            }
        }
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_table_objects() {
        let rendered = records_table(&json!([
            {"field": "Biology", "total_count": 12},
            {"field": "Physics", "total_count": null},
        ]));
        assert!(rendered.contains("total_count"));
        assert!(rendered.contains("Biology"));
        assert!(rendered.contains("12"));
    }

    #[test]
    fn test_records_table_scalars() {
        let rendered = records_table(&json!(["Nature", "Science"]));
        assert!(rendered.contains("value"));
        assert!(rendered.contains("Science"));
    }

    #[test]
    fn test_records_table_empty() {
        assert!(records_table(&json!([])).is_empty());
    }
}
