use std::collections::HashMap;

use anyhow::Result;

use crate::window::DateWindow;

mod queries;
mod sqlite;

pub use queries::{fetch_cases_window, fetch_ka_window, table_row_counts};
pub use sqlite::SqliteWarehouse;

/// A source that can answer window-parameterized SQL.
///
/// Statements use `?1` for the window start and `?2` for the window end.
pub trait Warehouse {
    fn query_window(&self, sql: &str, window: &DateWindow) -> Result<RawTable>;

    fn count_rows(&self, table: &str) -> Result<i64>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Rows exactly as the warehouse returned them, with upper-cased column names.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|column| column.trim().to_ascii_uppercase())
            .collect();
        let index = columns
            .iter()
            .enumerate()
            .map(|(position, column)| (column.clone(), position))
            .collect();
        Self {
            columns,
            index,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, mut row: Vec<RawValue>) {
        row.resize(self.columns.len(), RawValue::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_table_normalizes_column_names_and_pads_rows() {
        let mut table = RawTable::new(vec![" case_number".to_string(), "Region".to_string()]);
        table.push_row(vec![RawValue::Text("00001".to_string())]);

        assert_eq!(table.columns(), ["CASE_NUMBER", "REGION"]);
        assert_eq!(table.column_index("region"), Some(1));
        assert_eq!(table.column_index("missing"), None);
        assert_eq!(table.rows()[0][1], RawValue::Null);
        assert_eq!(table.len(), 1);
    }
}
