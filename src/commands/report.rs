use anyhow::Result;
use tracing::info;

use super::{open_warehouse, run_windows};
use crate::cli::ReportArgs;
use crate::pipeline::{PipelineOptions, run_pipeline};

pub fn run(args: ReportArgs) -> Result<()> {
    let (warehouse, config) = open_warehouse(&args.warehouse)?;
    let options = PipelineOptions {
        windows: run_windows(&args.window)?,
        output_dir: args.output_dir,
        output_name: args.output_name,
        chart_dir: args.chart_dir,
        warehouse_label: args.warehouse.warehouse_path.display().to_string(),
        command: "report".to_string(),
    };

    let outcome = run_pipeline(&warehouse, &config, &options)?;
    info!(
        run_id = %outcome.manifest.run_id,
        pdf = %outcome.pdf_path.display(),
        sha256 = %outcome.manifest.pdf_sha256,
        metrics = %outcome.metrics_path.display(),
        manifest = %outcome.manifest_path.display(),
        "report written"
    );
    Ok(())
}
