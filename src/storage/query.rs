//! Typed query builder over the declared schema
//!
//! A `Select` is rendered to SQL text plus positional parameters; values
//! are never interpolated into the SQL string.

use rusqlite::types::Value as SqlValue;

use super::schema::{Column, Table};
use crate::{Error, Result};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(Column, SqlValue),
    Gte(Column, i64),
    Lte(Column, i64),
    /// Inclusive on both ends
    Between(Column, i64, i64),
    In(Column, Vec<String>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn equals(column: Column, value: impl Into<SqlValue>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn in_list(column: Column, values: &[&str]) -> Self {
        Filter::In(column, values.iter().map(|v| v.to_string()).collect())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut parts) => {
                parts.push(other);
                Filter::Or(parts)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    fn columns(&self, out: &mut Vec<Column>) {
        match self {
            Filter::Eq(c, _)
            | Filter::Gte(c, _)
            | Filter::Lte(c, _)
            | Filter::Between(c, _, _)
            | Filter::In(c, _) => out.push(*c),
            Filter::And(parts) | Filter::Or(parts) => {
                for part in parts {
                    part.columns(out);
                }
            }
        }
    }

    fn render(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        match self {
            Filter::Eq(c, v) => {
                sql.push_str(&format!("{} = ?", c));
                params.push(v.clone());
            }
            Filter::Gte(c, v) => {
                sql.push_str(&format!("{} >= ?", c));
                params.push(SqlValue::Integer(*v));
            }
            Filter::Lte(c, v) => {
                sql.push_str(&format!("{} <= ?", c));
                params.push(SqlValue::Integer(*v));
            }
            Filter::Between(c, lo, hi) => {
                sql.push_str(&format!("{} BETWEEN ? AND ?", c));
                params.push(SqlValue::Integer(*lo));
                params.push(SqlValue::Integer(*hi));
            }
            // An empty list matches nothing
            Filter::In(_, values) if values.is_empty() => sql.push('0'),
            Filter::In(c, values) => {
                let marks = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{} IN ({})", c, marks));
                params.extend(values.iter().cloned().map(SqlValue::Text));
            }
            Filter::And(parts) => render_joined(parts, " AND ", "1", sql, params),
            Filter::Or(parts) => render_joined(parts, " OR ", "0", sql, params),
        }
    }
}

fn render_joined(
    parts: &[Filter],
    sep: &str,
    empty: &str,
    sql: &mut String,
    params: &mut Vec<SqlValue>,
) {
    if parts.is_empty() {
        sql.push_str(empty);
        return;
    }
    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(sep);
        }
        part.render(sql, params);
    }
    sql.push(')');
}

/// `SUM(sum) AS alias ... GROUP BY group`
#[derive(Debug, Clone, PartialEq)]
pub struct SumBy {
    pub group: Column,
    pub sum: Column,
    pub alias: &'static str,
}

/// A rendered statement ready to execute
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// SELECT builder
#[derive(Debug, Clone)]
pub struct Select {
    table: Table,
    columns: Option<Vec<Column>>,
    distinct: bool,
    filter: Option<Filter>,
    order: Option<(Column, Order)>,
    sum_by: Option<SumBy>,
}

impl Select {
    /// Full-row select over a table
    pub fn from(table: Table) -> Self {
        Self {
            table,
            columns: None,
            distinct: false,
            filter: None,
            order: None,
            sum_by: None,
        }
    }

    pub fn columns(mut self, columns: &[Column]) -> Self {
        self.columns = Some(columns.to_vec());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a predicate; repeated calls are ANDed together
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn order_by(mut self, column: Column, order: Order) -> Self {
        self.order = Some((column, order));
        self
    }

    /// Group by `group` and project `group, SUM(sum) AS alias`
    pub fn sum_by(mut self, group: Column, sum: Column, alias: &'static str) -> Self {
        self.sum_by = Some(SumBy { group, sum, alias });
        self
    }

    /// Render to SQL, checking every referenced column against the schema
    pub fn build(&self) -> Result<Statement> {
        self.check_columns()?;

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        let projection = match (&self.sum_by, &self.columns) {
            (Some(agg), _) => format!("{}, SUM({}) AS {}", agg.group, agg.sum, agg.alias),
            (None, Some(cols)) => join_columns(cols),
            (None, None) => join_columns(self.table.def().columns),
        };
        sql.push_str(&projection);
        sql.push_str(" FROM ");
        sql.push_str(self.table.as_str());

        let mut params = Vec::new();
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            filter.render(&mut sql, &mut params);
        }
        if let Some(agg) = &self.sum_by {
            sql.push_str(&format!(" GROUP BY {}", agg.group));
        }
        if let Some((column, order)) = &self.order {
            sql.push_str(&format!(" ORDER BY {} {}", column, order.as_sql()));
        }

        Ok(Statement { sql, params })
    }

    fn check_columns(&self) -> Result<()> {
        let mut referenced = Vec::new();
        if let Some(cols) = &self.columns {
            referenced.extend(cols.iter().copied());
        }
        if let Some(filter) = &self.filter {
            filter.columns(&mut referenced);
        }
        if let Some((column, _)) = &self.order {
            referenced.push(*column);
        }
        if let Some(agg) = &self.sum_by {
            referenced.push(agg.group);
            referenced.push(agg.sum);
        }

        let def = self.table.def();
        match referenced.into_iter().find(|c| !def.has_column(*c)) {
            Some(missing) => Err(Error::Validation(format!(
                "column {} does not exist on table {}",
                missing, self.table
            ))),
            None => Ok(()),
        }
    }
}

fn join_columns(columns: &[Column]) -> String {
    columns.iter().map(Column::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_row_ordered() {
        let stmt = Select::from(Table::Papers)
            .order_by(Column::Year, Order::Asc)
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT venue, year, count FROM papers ORDER BY year ASC");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_distinct_projection() {
        let stmt = Select::from(Table::Papers)
            .columns(&[Column::Venue])
            .distinct()
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT DISTINCT venue FROM papers");
    }

    #[test]
    fn test_filters_are_parameterized() {
        let stmt = Select::from(Table::Papers)
            .columns(&[Column::Year, Column::Count])
            .filter(Filter::equals(Column::Venue, "Nature".to_string()))
            .filter(Filter::Gte(Column::Year, 2000))
            .order_by(Column::Year, Order::Asc)
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT year, count FROM papers WHERE (venue = ? AND year >= ?) ORDER BY year ASC"
        );
        assert_eq!(
            stmt.params,
            vec![SqlValue::Text("Nature".into()), SqlValue::Integer(2000)]
        );
    }

    #[test]
    fn test_in_and_between() {
        let stmt = Select::from(Table::Fields)
            .filter(Filter::in_list(Column::Field, &["Biology", "Physics"]))
            .filter(Filter::Between(Column::Year, 1950, 2024))
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT field, year, count FROM fields WHERE (field IN (?, ?) AND year BETWEEN ? AND ?)"
        );
        assert_eq!(stmt.params.len(), 4);
    }

    #[test]
    fn test_or_and_empty_lists() {
        let stmt = Select::from(Table::Papers)
            .filter(Filter::Lte(Column::Year, 1900).or(Filter::In(Column::Venue, vec![])))
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT venue, year, count FROM papers WHERE (year <= ? OR 0)");

        let stmt = Select::from(Table::Papers).filter(Filter::And(vec![])).build().unwrap();
        assert!(stmt.sql.ends_with("WHERE 1"));
    }

    #[test]
    fn test_sum_by() {
        let stmt = Select::from(Table::Fields)
            .filter(Filter::Gte(Column::Year, 1950))
            .sum_by(Column::Field, Column::Count, "total_count")
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT field, SUM(count) AS total_count FROM fields WHERE year >= ? GROUP BY field"
        );
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = Select::from(Table::Papers)
            .columns(&[Column::Field])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
