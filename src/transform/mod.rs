use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::ReportConfig;
use crate::model::{ArticleRecord, CaseRecord};
use crate::window::DateWindow;

mod clean;
mod metrics;

pub use clean::{CleanedTable, clean_articles, clean_cases};
pub use metrics::*;

/// Every metric the report shows, computed once per run.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSet {
    pub report_window: DateWindow,
    pub trend_window: DateWindow,
    pub trend_months: u32,
    pub report_cases: usize,
    pub report_articles: usize,
    pub close_reason_ratio: Option<f64>,
    pub close_reason_ratio_by_region: Vec<RegionRatio>,
    pub close_reason_quality: CloseReasonQuality,
    pub close_reason_distribution: Vec<ReasonCount>,
    pub region_valid_cases: Vec<RegionValidCases>,
    pub monthly_ratio: Vec<MonthlyRatio>,
    pub monthly_region_ratio: Vec<MonthlyRegionRatio>,
    pub open_cases_weekly: Vec<WeeklyRegionCount>,
    pub osp_engagement: OspEngagement,
    pub articles_created: usize,
    pub articles_published: usize,
    pub median_days_to_publish: Option<f64>,
    pub articles_per_employee: Vec<RegionRate>,
    pub articles_per_coach: Vec<RegionRate>,
}

/// Compute the metric set from the cleaned tables.
///
/// `cases` covers the trend window; the report-window metrics use the subset closed inside
/// `report_window`.
pub fn compute_metric_set(
    articles: &CleanedTable<ArticleRecord>,
    cases: &CleanedTable<CaseRecord>,
    report_window: DateWindow,
    today: NaiveDate,
    trend_months: u32,
    config: &ReportConfig,
) -> Result<MetricSet> {
    let report_cases = cases.restrict(report_window);
    if articles.is_empty() {
        bail!("no knowledge articles left after cleaning for {}", articles.window());
    }
    if report_cases.is_empty() {
        bail!("no support cases left after cleaning for {report_window}");
    }

    let rules = MetricRules::new(config)?;
    let month = report_cases.records();
    let article_rows = articles.records();

    let metrics = MetricSet {
        report_window,
        trend_window: cases.window(),
        trend_months,
        report_cases: month.len(),
        report_articles: article_rows.len(),
        close_reason_ratio: close_reason_ratio(&rules, month, None),
        close_reason_ratio_by_region: close_reason_ratio_by_region(&rules, month),
        close_reason_quality: close_reason_quality(&rules, month),
        close_reason_distribution: close_reason_distribution(
            &rules,
            month,
            config.distribution_other_threshold,
        ),
        region_valid_cases: all_regions_valid_cases_and_ratios(&rules, month),
        monthly_ratio: close_reason_ratio_last_n_months(&rules, cases.records(), today, trend_months),
        monthly_region_ratio: close_reason_ratio_last_n_months_by_region(
            &rules,
            cases.records(),
            today,
            trend_months,
        ),
        open_cases_weekly: open_cases_week_over_week_by_region(&rules, month, None),
        osp_engagement: osp_kcs_engagement(&rules, month, &report_window),
        articles_created: count_created_articles(
            &rules,
            article_rows,
            report_window.start,
            report_window.end,
        ),
        articles_published: count_published_articles(
            &rules,
            article_rows,
            report_window.start,
            report_window.end,
        ),
        median_days_to_publish: median_days_to_publish(&rules, article_rows),
        articles_per_employee: articles_created_per_capita(
            &rules,
            article_rows,
            &report_window,
            &config.team_sizes,
        ),
        articles_per_coach: articles_created_per_capita(
            &rules,
            article_rows,
            &report_window,
            &config.coach_sizes,
        ),
    };

    info!(
        window = %report_window,
        cases = metrics.report_cases,
        articles = metrics.report_articles,
        close_reason_ratio = ?metrics.close_reason_ratio,
        median_days_to_publish = ?metrics.median_days_to_publish,
        "computed metric set"
    );
    Ok(metrics)
}
