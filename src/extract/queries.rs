use anyhow::{Context, Result};
use tracing::info;

use super::{RawTable, Warehouse};
use crate::config::{WarehouseTables, ensure_identifier};
use crate::window::DateWindow;

fn ka_query(table: &str) -> String {
    format!(
        "SELECT * FROM {table} WHERE date(ARTICLE_FIRST_PUBLISHED_DATE) BETWEEN ?1 AND ?2"
    )
}

fn cases_query(table: &str) -> String {
    format!("SELECT * FROM {table} WHERE date(CLOSED_DATE) BETWEEN ?1 AND ?2")
}

pub fn fetch_ka_window(
    warehouse: &dyn Warehouse,
    tables: &WarehouseTables,
    window: &DateWindow,
) -> Result<RawTable> {
    ensure_identifier(&tables.articles)?;
    let table = warehouse
        .query_window(&ka_query(&tables.articles), window)
        .with_context(|| format!("failed to fetch articles from {}", tables.articles))?;
    info!(table = %tables.articles, window = %window, rows = table.len(), "fetched knowledge articles");
    Ok(table)
}

pub fn fetch_cases_window(
    warehouse: &dyn Warehouse,
    tables: &WarehouseTables,
    window: &DateWindow,
) -> Result<RawTable> {
    ensure_identifier(&tables.cases)?;
    let table = warehouse
        .query_window(&cases_query(&tables.cases), window)
        .with_context(|| format!("failed to fetch cases from {}", tables.cases))?;
    info!(table = %tables.cases, window = %window, rows = table.len(), "fetched support cases");
    Ok(table)
}

pub fn table_row_counts(
    warehouse: &dyn Warehouse,
    tables: &WarehouseTables,
) -> Result<Vec<(String, i64)>> {
    [&tables.articles, &tables.cases]
        .into_iter()
        .map(|table| Ok((table.clone(), warehouse.count_rows(table)?)))
        .collect()
}
