use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::extract::{Warehouse, fetch_cases_window, fetch_ka_window};
use crate::model::{ReportCounts, ReportPaths, ReportRunManifest};
use crate::report::{ReportFigure, export_report_pdf};
use crate::transform::{MetricSet, clean_articles, clean_cases, compute_metric_set};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};
use crate::visualize::{Chart, render_figures, write_svg};
use crate::window::{DateWindow, last_n_months_window, resolve_report_window};

const MANIFEST_VERSION: u32 = 1;
pub const MANIFEST_PREFIX: &str = "report_run_";

/// Dates a run is computed for.
#[derive(Debug, Clone, Copy)]
pub struct RunWindows {
    pub today: NaiveDate,
    pub report: DateWindow,
    pub trend: DateWindow,
    pub trend_months: u32,
}

impl RunWindows {
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        trend_months: u32,
    ) -> Result<Self> {
        Ok(Self {
            today,
            report: resolve_report_window(start, end, today)?,
            trend: last_n_months_window(today, trend_months)?,
            trend_months,
        })
    }

    /// Cases are fetched over the trend window, widened to cover an explicit report window.
    pub fn case_window(&self) -> DateWindow {
        DateWindow {
            start: self.report.start.min(self.trend.start),
            end: self.report.end.max(self.trend.end),
        }
    }
}

/// Metrics plus the row counts seen on the way.
#[derive(Debug, Clone)]
pub struct CollectedMetrics {
    pub metrics: MetricSet,
    pub raw_articles: usize,
    pub raw_cases: usize,
    pub clean_articles: usize,
    pub clean_cases: usize,
}

/// Fetch, clean and compute.
pub fn collect_metrics(
    warehouse: &dyn Warehouse,
    config: &ReportConfig,
    windows: &RunWindows,
) -> Result<CollectedMetrics> {
    let case_window = windows.case_window();
    info!(report = %windows.report, cases = %case_window, "extracting warehouse tables");

    let raw_articles = fetch_ka_window(warehouse, &config.tables, &windows.report)?;
    let raw_cases = fetch_cases_window(warehouse, &config.tables, &case_window)?;

    let articles = clean_articles(&raw_articles, windows.report)?;
    let cases = clean_cases(&raw_cases, case_window)?;

    let metrics = compute_metric_set(
        &articles,
        &cases,
        windows.report,
        windows.today,
        windows.trend_months,
        config,
    )?;

    Ok(CollectedMetrics {
        metrics,
        raw_articles: raw_articles.len(),
        raw_cases: raw_cases.len(),
        clean_articles: articles.len(),
        clean_cases: cases.len(),
    })
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub windows: RunWindows,
    pub output_dir: PathBuf,
    pub output_name: Option<String>,
    pub chart_dir: Option<PathBuf>,
    /// Recorded in the manifest; the warehouse itself is already open.
    pub warehouse_label: String,
    pub command: String,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub pdf_path: PathBuf,
    pub metrics_path: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: ReportRunManifest,
}

pub fn run_pipeline(
    warehouse: &dyn Warehouse,
    config: &ReportConfig,
    options: &PipelineOptions,
) -> Result<PipelineOutcome> {
    let started = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("report-{}", utc_compact_string(started));
    let windows = &options.windows;

    info!(
        run_id = %run_id,
        report_window = %windows.report,
        report_days = windows.report.days(),
        trend_window = %windows.trend,
        "starting report run"
    );

    let collected = collect_metrics(warehouse, config, windows)?;
    let figures = render_figures(&collected.metrics);
    info!(figures = figures.len(), "figures rendered");

    let mut warnings = Vec::new();
    for figure in &figures {
        if figure.chart.as_ref().is_some_and(Chart::is_placeholder) {
            warn!(figure = %figure.title, "figure has no data");
            warnings.push(format!("no data for figure: {}", figure.title));
        }
    }

    ensure_directory(&options.output_dir)?;
    let charts_written = match &options.chart_dir {
        Some(dir) => write_charts(&figures, dir)?,
        None => 0,
    };

    let file_name = options
        .output_name
        .clone()
        .unwrap_or_else(|| default_report_name(&windows.report));
    let pdf_path = options.output_dir.join(&file_name);
    let title_lines = vec![
        format!("Reporting window: {} to {}", windows.report.start, windows.report.end),
        format!(
            "Trend window: {} to {} ({} months)",
            windows.trend.start, windows.trend.end, windows.trend_months
        ),
        format!("Generated: {started_at}"),
    ];
    export_report_pdf(&figures, &title_lines, &pdf_path)?;

    let metrics_path = options.output_dir.join("metrics.json");
    write_json_pretty(&metrics_path, &collected.metrics)?;

    let pdf_sha256 = sha256_file(&pdf_path)?;
    let manifest = ReportRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        report_window_start: windows.report.start,
        report_window_end: windows.report.end,
        trend_window_start: windows.trend.start,
        trend_window_end: windows.trend.end,
        command: options.command.clone(),
        paths: ReportPaths {
            warehouse_path: options.warehouse_label.clone(),
            output_dir: options.output_dir.display().to_string(),
            pdf_path: pdf_path.display().to_string(),
            metrics_path: metrics_path.display().to_string(),
            chart_dir: options
                .chart_dir
                .as_ref()
                .map(|dir| dir.display().to_string()),
        },
        counts: ReportCounts {
            raw_articles: collected.raw_articles,
            raw_cases: collected.raw_cases,
            clean_articles: collected.clean_articles,
            clean_cases: collected.clean_cases,
            report_window_cases: collected.metrics.report_cases,
            figures: figures.len(),
            charts_written,
        },
        pdf_sha256,
        warnings,
    };

    let manifest_path = options
        .output_dir
        .join(format!("{MANIFEST_PREFIX}{}.json", utc_compact_string(started)));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        pdf = %pdf_path.display(),
        manifest = %manifest_path.display(),
        warnings = manifest.warnings.len(),
        "report run completed"
    );

    Ok(PipelineOutcome {
        pdf_path,
        metrics_path,
        manifest_path,
        manifest,
    })
}

pub fn default_report_name(window: &DateWindow) -> String {
    if window.start.format("%Y-%m").to_string() == window.end.format("%Y-%m").to_string() {
        format!("kcs_report_{}.pdf", window.start.format("%Y-%m"))
    } else {
        format!(
            "kcs_report_{}_{}.pdf",
            window.start.format("%Y%m%d"),
            window.end.format("%Y%m%d")
        )
    }
}

fn write_charts(figures: &[ReportFigure], dir: &Path) -> Result<usize> {
    ensure_directory(dir)?;
    let mut written = 0;
    for (index, figure) in figures.iter().enumerate() {
        let Some(chart) = &figure.chart else {
            continue;
        };
        let path = dir.join(format!("{:02}_{}.svg", index + 1, slug(&figure.title)));
        write_svg(chart, &path)
            .with_context(|| format!("failed to write chart for {}", figure.title))?;
        written += 1;
    }
    info!(dir = %dir.display(), charts = written, "charts written");
    Ok(written)
}

fn slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::{date, fixture_today, fixture_warehouse};

    fn options(output_dir: &Path, chart_dir: Option<PathBuf>) -> PipelineOptions {
        PipelineOptions {
            windows: RunWindows::resolve(None, None, fixture_today(), 6).expect("windows"),
            output_dir: output_dir.to_path_buf(),
            output_name: None,
            chart_dir,
            warehouse_label: ":memory:".to_string(),
            command: "report".to_string(),
        }
    }

    #[test]
    fn run_pipeline_writes_pdf_metrics_and_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("reports");
        let charts = dir.path().join("charts");
        let config = ReportConfig::default();

        let outcome = run_pipeline(&fixture_warehouse(), &config, &options(&out, Some(charts.clone())))
            .expect("pipeline");

        assert_eq!(outcome.pdf_path, out.join("kcs_report_2026-09.pdf"));
        assert!(fs::read(&outcome.pdf_path).expect("pdf").starts_with(b"%PDF-"));

        let manifest = &outcome.manifest;
        assert_eq!(manifest.status, "completed");
        assert_eq!(manifest.report_window_start, date(2026, 9, 1));
        assert_eq!(manifest.trend_window_start, date(2026, 5, 1));
        assert_eq!(manifest.counts.report_window_cases, 8);
        assert_eq!(manifest.counts.figures, 8);
        assert_eq!(manifest.counts.charts_written, 7);
        assert_eq!(
            manifest.pdf_sha256,
            sha256_file(&outcome.pdf_path).expect("digest")
        );
        assert!(
            outcome
                .manifest_path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(MANIFEST_PREFIX))
        );
        assert_eq!(fs::read_dir(&charts).expect("charts").count(), 7);
        assert!(charts.join("01_kcs_engagement.svg").exists());

        let metrics: serde_json::Value =
            serde_json::from_slice(&fs::read(&outcome.metrics_path).expect("metrics"))
                .expect("metrics json");
        assert_eq!(metrics["report_cases"], 8);
        assert_eq!(metrics["close_reason_ratio"], 0.571);
    }

    #[test]
    fn run_pipeline_records_placeholder_figures_as_warnings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = ReportConfig::default();
        config.coach_sizes.clear();

        let outcome = run_pipeline(&fixture_warehouse(), &config, &options(dir.path(), None))
            .expect("pipeline");
        assert!(
            outcome
                .manifest
                .warnings
                .contains(&"no data for figure: Articles Created per Coach by Region".to_string())
        );
        assert!(
            !outcome
                .manifest
                .warnings
                .iter()
                .any(|warning| warning.contains("per Employee"))
        );
    }

    #[test]
    fn run_pipeline_fails_without_cases_in_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut options = options(dir.path(), None);
        options.windows = RunWindows::resolve(
            Some(date(2025, 1, 1)),
            Some(date(2025, 1, 31)),
            fixture_today(),
            6,
        )
        .expect("windows");

        let err = run_pipeline(&fixture_warehouse(), &ReportConfig::default(), &options)
            .expect_err("no data in January 2025");
        assert!(format!("{err:#}").contains("no knowledge articles"));
        assert!(!dir.path().join("metrics.json").exists());
    }

    #[test]
    fn case_window_covers_explicit_report_window() {
        let windows = RunWindows::resolve(
            Some(date(2026, 1, 1)),
            Some(date(2026, 1, 31)),
            fixture_today(),
            3,
        )
        .expect("windows");
        assert_eq!(windows.trend.start, date(2026, 8, 1));
        assert_eq!(windows.case_window().start, date(2026, 1, 1));
        assert_eq!(windows.case_window().end, fixture_today());
    }

    #[test]
    fn report_names_and_slugs() {
        let month = DateWindow::new(date(2026, 9, 1), date(2026, 9, 30)).expect("window");
        assert_eq!(default_report_name(&month), "kcs_report_2026-09.pdf");
        let span = DateWindow::new(date(2026, 8, 15), date(2026, 9, 14)).expect("window");
        assert_eq!(default_report_name(&span), "kcs_report_20260815_20260914.pdf");
        assert_eq!(slug("Valid-Cases Breakdown by Region"), "valid_cases_breakdown_by_region");
    }
}
