use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kcs-report",
    version,
    about = "Monthly KCS support-operations report from a warehouse snapshot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Report(ReportArgs),
    Metrics(MetricsArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WarehouseArgs {
    #[arg(long, env = "KCS_WAREHOUSE_PATH")]
    pub warehouse_path: PathBuf,

    /// JSON file overriding table names and business rules.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// First day of the report window (requires --end).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the report window, inclusive (requires --start).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Run date; defaults to the local date.
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Months of history in the trend charts, including the current one.
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub trend_months: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub warehouse: WarehouseArgs,

    #[command(flatten)]
    pub window: WindowArgs,

    #[arg(long, default_value = "reports")]
    pub output_dir: PathBuf,

    /// PDF file name inside the output directory.
    #[arg(long)]
    pub output_name: Option<String>,

    /// Also write every chart as SVG into this directory.
    #[arg(long)]
    pub chart_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub warehouse: WarehouseArgs,

    #[command(flatten)]
    pub window: WindowArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub warehouse: WarehouseArgs,

    #[arg(long, default_value = "reports")]
    pub output_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_args_parse_dates_and_defaults() {
        let cli = Cli::try_parse_from([
            "kcs-report",
            "report",
            "--warehouse-path",
            "snapshot.sqlite",
            "--start",
            "2026-09-01",
            "--end",
            "2026-09-30",
        ])
        .expect("parse");
        let Commands::Report(args) = cli.command else {
            panic!("expected report subcommand");
        };
        assert_eq!(args.window.start, NaiveDate::from_ymd_opt(2026, 9, 1));
        assert_eq!(args.window.trend_months, 6);
        assert_eq!(args.output_dir, PathBuf::from("reports"));
        assert!(args.chart_dir.is_none());
    }

    #[test]
    fn trend_months_is_bounded() {
        for value in ["0", "121", "2147483649"] {
            let parsed = Cli::try_parse_from([
                "kcs-report",
                "report",
                "--warehouse-path",
                "snapshot.sqlite",
                "--trend-months",
                value,
            ]);
            assert!(parsed.is_err(), "--trend-months {value} should be rejected");
        }
    }

    #[test]
    fn metrics_rejects_malformed_dates() {
        let parsed = Cli::try_parse_from([
            "kcs-report",
            "metrics",
            "--warehouse-path",
            "snapshot.sqlite",
            "--today",
            "18/10/2026",
        ]);
        assert!(parsed.is_err());
    }
}
