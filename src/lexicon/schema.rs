//! Table schemas for the per-domain datasets.
//!
//! Schemas are fixed at deployment; the registry is the single source of
//! truth both for the Query Builder (column resolution) and the Query
//! Service (server-side re-validation).

use serde::{Deserialize, Serialize};

/// Semantic type of a column, as the builder needs to reason about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Integer column holding a calendar year.
    Year,
    /// Text column holding a `YYYY-MM-DD` date string; point-time filters
    /// become prefix matches.
    DateText,
    /// Wide-format column whose *name* is a year (EDGAR emissions tables);
    /// time filters select columns instead of rows.
    YearColumn,
}

impl ColumnType {
    /// SQL-facing type name, used by `describe_table`.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::DateText => "TEXT",
            ColumnType::Integer | ColumnType::Year => "INTEGER",
            ColumnType::Real | ColumnType::YearColumn => "REAL",
        }
    }
}

/// A column definition within a registered table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// An ordered table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Names of the wide-format year columns within an inclusive range,
    /// in ascending order.
    pub fn year_columns_in(&self, start: u16, end: u16) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.ty == ColumnType::YearColumn)
            .filter_map(|c| {
                c.name
                    .parse::<u16>()
                    .ok()
                    .filter(|y| (start..=end).contains(y))
                    .map(|_| c.name.clone())
            })
            .collect()
    }
}
