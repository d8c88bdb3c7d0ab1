use std::io::{self, Write};

use anyhow::{Context, Result};

use super::{open_warehouse, run_windows};
use crate::cli::MetricsArgs;
use crate::pipeline::collect_metrics;
use crate::report::format_percent;
use crate::transform::MetricSet;

pub fn run(args: MetricsArgs) -> Result<()> {
    let (warehouse, config) = open_warehouse(&args.warehouse)?;
    let windows = run_windows(&args.window)?;
    let collected = collect_metrics(&warehouse, &config, &windows)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &collected.metrics)
            .context("failed to serialize metrics json output")?;
        writeln!(output)?;
    } else {
        write_text_metrics(&mut output, &collected.metrics)?;
    }
    output.flush()?;
    Ok(())
}

fn write_text_metrics(output: &mut impl Write, metrics: &MetricSet) -> Result<()> {
    writeln!(output, "Report window: {}", metrics.report_window)?;
    writeln!(
        output,
        "Trend window: {} ({} months)",
        metrics.trend_window, metrics.trend_months
    )?;
    writeln!(
        output,
        "Cases: {}  Articles: {}",
        metrics.report_cases, metrics.report_articles
    )?;
    writeln!(
        output,
        "Close-reason ratio: {}",
        format_percent(metrics.close_reason_ratio)
    )?;
    for row in &metrics.close_reason_ratio_by_region {
        writeln!(output, "  {}: {}", row.region, format_percent(row.ratio))?;
    }

    let quality = &metrics.close_reason_quality;
    writeln!(
        output,
        "KCS engagement: {} of {} cases ({})",
        quality.kcs_action_taken,
        quality.total(),
        quality
            .percent()
            .map(|percent| format!("{percent:.1}%"))
            .unwrap_or_else(|| "n/a".to_string())
    )?;

    writeln!(output, "Close reasons:")?;
    for entry in &metrics.close_reason_distribution {
        writeln!(output, "  {}: {}", entry.reason, entry.count)?;
    }

    writeln!(output, "Valid cases by region:")?;
    for row in &metrics.region_valid_cases {
        writeln!(
            output,
            "  {}: {} valid, ratio {}",
            row.region,
            row.valid_cases_count,
            format_percent(row.close_reason_ratio)
        )?;
    }

    writeln!(output, "Monthly close-reason ratio:")?;
    for row in &metrics.monthly_ratio {
        writeln!(output, "  {}: {}", row.month, format_percent(row.ratio))?;
    }

    writeln!(output, "Open cases by week:")?;
    for row in &metrics.open_cases_weekly {
        writeln!(output, "  {} {}: {}", row.week, row.region, row.open_cases_count)?;
    }

    let osp = &metrics.osp_engagement;
    writeln!(
        output,
        "OSP: {} cases, engagement {} over {}",
        osp.count,
        format_percent(osp.close_reason_ratio),
        osp.close_reason_denom
    )?;
    writeln!(
        output,
        "Articles: created={} published={} median_days_to_publish={}",
        metrics.articles_created,
        metrics.articles_published,
        metrics
            .median_days_to_publish
            .map(|days| format!("{days:.1}"))
            .unwrap_or_else(|| "n/a".to_string())
    )?;
    for (label, rates) in [
        ("per employee", &metrics.articles_per_employee),
        ("per coach", &metrics.articles_per_coach),
    ] {
        for rate in rates {
            writeln!(
                output,
                "  {} {label}: {:.2} ({} / {})",
                rate.region, rate.per_capita, rate.count, rate.headcount
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::pipeline::RunWindows;
    use crate::test_support::{fixture_today, fixture_warehouse};

    #[test]
    fn text_metrics_cover_every_section() {
        let windows = RunWindows::resolve(None, None, fixture_today(), 6).expect("windows");
        let collected = collect_metrics(&fixture_warehouse(), &ReportConfig::default(), &windows)
            .expect("metrics");

        let mut buffer = Vec::new();
        write_text_metrics(&mut buffer, &collected.metrics).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");

        assert!(text.starts_with("Report window: 2026-09-01..2026-09-30\n"));
        assert!(text.contains("Close-reason ratio: 57.1%"));
        assert!(text.contains("KCS engagement: 4 of 5 cases (80.0%)"));
        assert!(text.contains("  2026-07: 0.0%"));
        assert!(text.contains("OSP: 3 cases, engagement 100.0% over 2"));
        assert!(text.contains("Articles: created=2 published=3 median_days_to_publish=6.0"));
    }
}
