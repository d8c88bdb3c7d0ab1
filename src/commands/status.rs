use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::open_warehouse;
use crate::cli::StatusArgs;
use crate::extract::table_row_counts;
use crate::model::ReportRunManifest;
use crate::pipeline::MANIFEST_PREFIX;

pub fn run(args: StatusArgs) -> Result<()> {
    info!(output_dir = %args.output_dir.display(), "status requested");

    let (warehouse, config) = open_warehouse(&args.warehouse)?;
    for (table, rows) in table_row_counts(&warehouse, &config.tables)? {
        info!(table = %table, rows, "warehouse table");
    }

    match latest_manifest(&args.output_dir)? {
        Some(path) => {
            let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let manifest: ReportRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                updated_at = %manifest.updated_at,
                report_window = %format!("{}..{}", manifest.report_window_start, manifest.report_window_end),
                pdf = %manifest.paths.pdf_path,
                pdf_sha256 = %manifest.pdf_sha256,
                cases = manifest.counts.report_window_cases,
                figures = manifest.counts.figures,
                warnings = manifest.warnings.len(),
                "loaded latest run manifest"
            );
        }
        None => warn!(path = %args.output_dir.display(), "no run manifest found"),
    }

    Ok(())
}

/// Newest `report_run_*.json` in `dir`; the compact UTC timestamp in the name sorts by time.
fn latest_manifest(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        let is_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(MANIFEST_PREFIX) && name.ends_with(".json"));
        if is_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_manifest_picks_newest_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(latest_manifest(&dir.path().join("missing")).expect("missing dir"), None);

        for name in [
            "report_run_20260901T080000Z.json",
            "report_run_20261001T080000Z.json",
            "metrics.json",
            "report_run_20260915T080000Z.json",
        ] {
            fs::write(dir.path().join(name), "{}").expect("write");
        }
        assert_eq!(
            latest_manifest(dir.path()).expect("scan"),
            Some(dir.path().join("report_run_20261001T080000Z.json"))
        );
    }
}
