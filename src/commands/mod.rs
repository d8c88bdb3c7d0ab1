use anyhow::{Result, bail};
use chrono::Local;
use tracing::info;

use crate::cli::{WarehouseArgs, WindowArgs};
use crate::config::ReportConfig;
use crate::extract::SqliteWarehouse;
use crate::pipeline::RunWindows;

pub mod metrics;
pub mod report;
pub mod status;

fn open_warehouse(args: &WarehouseArgs) -> Result<(SqliteWarehouse, ReportConfig)> {
    if !args.warehouse_path.exists() {
        bail!("warehouse snapshot not found: {}", args.warehouse_path.display());
    }
    let config = ReportConfig::load(args.config.as_deref())?;
    let warehouse = SqliteWarehouse::open(&args.warehouse_path)?;
    info!(
        warehouse = %args.warehouse_path.display(),
        config = %args.config.as_ref().map(|path| path.display().to_string()).unwrap_or_else(|| "defaults".to_string()),
        "warehouse opened"
    );
    Ok((warehouse, config))
}

fn run_windows(args: &WindowArgs) -> Result<RunWindows> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    RunWindows::resolve(args.start, args.end, today, args.trend_months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_fixture_snapshot;

    #[test]
    fn open_warehouse_requires_existing_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut args = WarehouseArgs {
            warehouse_path: dir.path().join("absent.sqlite"),
            config: None,
        };
        let err = open_warehouse(&args).err().expect("missing snapshot should fail");
        assert!(err.to_string().contains("warehouse snapshot not found"));

        args.warehouse_path = dir.path().join("warehouse.sqlite");
        write_fixture_snapshot(&args.warehouse_path);
        let (_, config) = open_warehouse(&args).expect("open snapshot");
        assert_eq!(config.tables.cases, crate::config::DEFAULT_CASES_TABLE);
    }
}
