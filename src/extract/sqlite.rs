use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, params};
use tracing::debug;

use super::{RawTable, RawValue, Warehouse};
use crate::config::ensure_identifier;
use crate::window::DateWindow;

/// Warehouse snapshot stored as a local SQLite file.
pub struct SqliteWarehouse {
    connection: Connection,
}

impl SqliteWarehouse {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open warehouse {}", path.display()))?;
        Ok(Self { connection })
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }
}

impl Warehouse for SqliteWarehouse {
    fn query_window(&self, sql: &str, window: &DateWindow) -> Result<RawTable> {
        let mut statement = self
            .connection
            .prepare(sql)
            .with_context(|| format!("failed to prepare warehouse query: {}", sql.trim()))?;
        let columns = statement
            .column_names()
            .into_iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        let column_count = columns.len();
        let mut table = RawTable::new(columns);

        let mut rows = statement
            .query(params![window.start, window.end])
            .context("failed to execute warehouse query")?;
        while let Some(row) = rows.next().context("failed to read warehouse row")? {
            let mut values = Vec::with_capacity(column_count);
            for position in 0..column_count {
                let value = row
                    .get_ref(position)
                    .with_context(|| format!("failed to read column {position}"))?;
                values.push(raw_value(value));
            }
            table.push_row(values);
        }

        debug!(rows = table.len(), columns = column_count, "warehouse query returned");
        Ok(table)
    }

    fn count_rows(&self, table: &str) -> Result<i64> {
        ensure_identifier(table)?;
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("failed to count rows in {table}"))?;
        Ok(count)
    }
}

fn raw_value(value: ValueRef<'_>) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Integer(value) => RawValue::Integer(value),
        ValueRef::Real(value) => RawValue::Real(value),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            RawValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CASES_TABLE;
    use crate::test_support::write_fixture_snapshot;

    #[test]
    fn open_reads_snapshot_file_without_write_access() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warehouse.sqlite");
        write_fixture_snapshot(&path);

        let warehouse = SqliteWarehouse::open(&path).expect("open snapshot");
        assert_eq!(warehouse.count_rows(DEFAULT_CASES_TABLE).expect("count"), 13);

        let deleted = warehouse
            .connection
            .execute(&format!("DELETE FROM {DEFAULT_CASES_TABLE}"), []);
        assert!(deleted.is_err());
        assert_eq!(warehouse.count_rows(DEFAULT_CASES_TABLE).expect("count"), 13);
    }

    #[test]
    fn open_fails_for_missing_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SqliteWarehouse::open(&dir.path().join("absent.sqlite"))
            .err()
            .expect("missing snapshot should fail");
        assert!(format!("{err:#}").contains("failed to open warehouse"));
    }
}
