use std::collections::{BTreeMap, BTreeSet};

use crate::report::{Insight, ReportFigure, format_kcs_engagement_by_region, format_percent};
use crate::transform::{MetricSet, RegionRate};

mod chart;
mod plots;
mod svg;

pub use chart::{Anchor, Chart, Color, Shape, text_width, wedge_points};
pub use svg::write_svg;

use plots::{
    Bar, DonutStyle, Segment, Series, Slice, ValueAxis, bar_chart, donut_chart, line_chart,
    stacked_bar_chart,
};

const ACTION_BLUE: Color = Color::hex(0x2E86AB);
const NEUTRAL_GRAY: Color = Color::hex(0xB0B7BC);
const VALID_ORANGE: Color = Color::hex(0xFFA500);
const MISSING_BLUE: Color = Color::hex(0x1F4E9C);
const BAR_COLOR: Color = Color::hex(0x636EFA);

const PASTEL: [Color; 6] = [
    Color::hex(0x66C5CC),
    Color::hex(0xF6CF71),
    Color::hex(0xF89C74),
    Color::hex(0xDCB0F2),
    Color::hex(0x87C55F),
    Color::hex(0x9EB9F3),
];

/// All report figures, in page order.
pub fn render_figures(metrics: &MetricSet) -> Vec<ReportFigure> {
    vec![
        close_reason_overall_pie(metrics),
        close_reason_distribution_pie(metrics),
        valid_cases_ratio_stacked(metrics),
        ratio_series_by_region(metrics),
        open_cases_week_over_week(metrics),
        articles_per_capita(
            "Articles Created per Employee by Region",
            "Articles Created per Employee",
            &metrics.articles_per_employee,
        ),
        articles_per_capita(
            "Articles Created per Coach by Region",
            "Articles Created per Coach",
            &metrics.articles_per_coach,
        ),
        operations_summary(metrics),
    ]
}

pub fn close_reason_overall_pie(metrics: &MetricSet) -> ReportFigure {
    let title = "Overall Close-Reason Quality";
    let quality = &metrics.close_reason_quality;
    let slices = vec![
        Slice {
            label: "KCS ACTION TAKEN".to_string(),
            value: quality.kcs_action_taken as f64,
            color: ACTION_BLUE,
        },
        Slice {
            label: "NON-ACTIONABLE".to_string(),
            value: quality.non_actionable as f64,
            color: NEUTRAL_GRAY,
        },
    ];
    let style = DonutStyle {
        hole: 0.4,
        pull_largest: false,
        legend: false,
        unit: "cases",
    };

    let insight = match quality.percent() {
        Some(percent) => Insight::Engagement(format!("{percent:.1}")),
        None => Insight::Text("No data available for KCS Engagement insight.".to_string()),
    };
    ReportFigure {
        title: "KCS Engagement".to_string(),
        chart: Some(donut_chart(title, &slices, &style)),
        insight,
    }
}

pub fn close_reason_distribution_pie(metrics: &MetricSet) -> ReportFigure {
    let title = "Close Reason Distribution";
    let slices: Vec<Slice> = metrics
        .close_reason_distribution
        .iter()
        .enumerate()
        .map(|(index, entry)| Slice {
            label: entry.reason.clone(),
            value: entry.count as f64,
            color: PASTEL[index % PASTEL.len()],
        })
        .collect();
    let style = DonutStyle {
        hole: 0.5,
        pull_largest: true,
        legend: true,
        unit: "",
    };
    ReportFigure {
        title: title.to_string(),
        chart: Some(donut_chart(title, &slices, &style)),
        insight: Insight::None,
    }
}

/// One stacked bar per region: the ratio share of valid cases below, the remainder above.
pub fn valid_cases_ratio_stacked(metrics: &MetricSet) -> ReportFigure {
    let title = "Valid-Cases Breakdown by Region";
    let rows = &metrics.region_valid_cases;

    let categories: Vec<String> = rows.iter().map(|row| row.region.clone()).collect();
    let mut lower = Segment {
        name: "Close-Reason".to_string(),
        color: VALID_ORANGE,
        values: Vec::new(),
        labels: Vec::new(),
    };
    let mut upper = Segment {
        name: "Missing".to_string(),
        color: MISSING_BLUE,
        values: Vec::new(),
        labels: Vec::new(),
    };
    for row in rows {
        let ratio = row.close_reason_ratio.unwrap_or(0.0);
        let valid = (row.valid_cases_count as f64 * ratio).round();
        let missing = row.valid_cases_count as f64 - valid;
        lower.values.push(valid);
        lower
            .labels
            .push(format!("{valid} ({})", format_percent(row.close_reason_ratio)));
        upper.values.push(missing);
        upper.labels.push(format!("{missing}"));
    }

    let insight = Insight::Pairs {
        heading: Some(format_kcs_engagement_by_region(rows)),
        pairs: rows
            .iter()
            .map(|row| {
                (
                    row.region.to_uppercase(),
                    row.close_reason_ratio
                        .map(|ratio| format!("{ratio:.3}"))
                        .unwrap_or_else(|| "n/a".to_string()),
                )
            })
            .collect(),
    };
    let chart = if rows.is_empty() {
        Chart::no_data(title)
    } else {
        stacked_bar_chart(title, "Number of Cases", &categories, &[lower, upper])
    };
    ReportFigure {
        title: title.to_string(),
        chart: Some(chart),
        insight,
    }
}

/// Close-reason ratio per month and region over the trend window.
pub fn ratio_series_by_region(metrics: &MetricSet) -> ReportFigure {
    let title = format!("Close-Reason Ratio - Last {} Months", metrics.trend_months);
    let rows: Vec<_> = metrics
        .monthly_region_ratio
        .iter()
        .filter(|row| !row.region.to_uppercase().contains("ADMIN"))
        .collect();

    let months: Vec<String> = rows
        .iter()
        .map(|row| row.month.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut by_region: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
    for row in &rows {
        let Some(position) = months.iter().position(|month| *month == row.month.to_string()) else {
            continue;
        };
        let points = by_region
            .entry(row.region.as_str())
            .or_insert_with(|| vec![None; months.len()]);
        points[position] = row.ratio;
    }
    let series: Vec<Series> = by_region
        .into_iter()
        .map(|(region, points)| Series {
            name: region.to_string(),
            points,
        })
        .collect();

    let insight = Insight::Pairs {
        heading: Some("Overall close-reason ratio by month".to_string()),
        pairs: metrics
            .monthly_ratio
            .iter()
            .map(|row| (row.month.to_string(), format_percent(row.ratio)))
            .collect(),
    };
    ReportFigure {
        chart: Some(line_chart(
            &title,
            "Close-Reason Ratio",
            &months,
            &series,
            ValueAxis::Percent,
            false,
        )),
        title,
        insight,
    }
}

pub fn open_cases_week_over_week(metrics: &MetricSet) -> ReportFigure {
    let title = "Open Cases Week over Week by Region";
    let weeks: Vec<String> = metrics
        .open_cases_weekly
        .iter()
        .map(|row| row.week.format("%Y-%m-%d").to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_region: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
    for row in &metrics.open_cases_weekly {
        let week = row.week.format("%Y-%m-%d").to_string();
        let Some(position) = weeks.iter().position(|candidate| *candidate == week) else {
            continue;
        };
        let points = by_region
            .entry(row.region.as_str())
            .or_insert_with(|| vec![None; weeks.len()]);
        points[position] = Some(row.open_cases_count as f64);
    }
    let series: Vec<Series> = by_region
        .into_iter()
        .map(|(region, points)| Series {
            name: region.to_string(),
            points,
        })
        .collect();

    ReportFigure {
        title: title.to_string(),
        chart: Some(line_chart(
            title,
            "Open Cases Count",
            &weeks,
            &series,
            ValueAxis::Count,
            true,
        )),
        insight: Insight::None,
    }
}

pub fn articles_per_capita(title: &str, y_title: &str, rates: &[RegionRate]) -> ReportFigure {
    let bars: Vec<Bar> = rates
        .iter()
        .map(|rate| Bar {
            label: rate.region.clone(),
            value: rate.per_capita,
            text: format!("{:.2}", rate.per_capita),
        })
        .collect();
    let insight = Insight::Pairs {
        heading: None,
        pairs: rates
            .iter()
            .map(|rate| {
                (
                    rate.region.clone(),
                    format!("{} created / {} headcount", rate.count, rate.headcount),
                )
            })
            .collect(),
    };
    ReportFigure {
        title: title.to_string(),
        chart: Some(bar_chart(title, y_title, &bars, BAR_COLOR)),
        insight,
    }
}

pub fn operations_summary(metrics: &MetricSet) -> ReportFigure {
    let osp = &metrics.osp_engagement;
    let pairs = vec![
        ("Reporting window".to_string(), metrics.report_window.to_string()),
        ("Closed cases".to_string(), metrics.report_cases.to_string()),
        (
            "Overall close-reason ratio".to_string(),
            format_percent(metrics.close_reason_ratio),
        ),
        ("Articles created".to_string(), metrics.articles_created.to_string()),
        ("Articles published".to_string(), metrics.articles_published.to_string()),
        (
            "Median days to publish".to_string(),
            metrics
                .median_days_to_publish
                .map(|days| format!("{days:.1}"))
                .unwrap_or_else(|| "n/a".to_string()),
        ),
        ("OSP cases".to_string(), osp.count.to_string()),
        (
            "OSP KCS engagement".to_string(),
            format!(
                "{} of {} cases with a close reason",
                format_percent(osp.close_reason_ratio),
                osp.close_reason_denom
            ),
        ),
    ];
    ReportFigure {
        title: "Operations Summary".to_string(),
        chart: None,
        insight: Insight::Pairs {
            heading: None,
            pairs,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::extract::{fetch_cases_window, fetch_ka_window};
    use crate::test_support::{fixture_today, fixture_warehouse};
    use crate::transform::{clean_articles, clean_cases, compute_metric_set};
    use crate::window::{last_month_window, last_n_months_window};

    fn fixture_metrics() -> MetricSet {
        let config = ReportConfig::default();
        let warehouse = fixture_warehouse();
        let month = last_month_window(fixture_today());
        let trend = last_n_months_window(fixture_today(), 6).expect("trend");
        let articles = clean_articles(
            &fetch_ka_window(&warehouse, &config.tables, &month).expect("articles"),
            month,
        )
        .expect("clean articles");
        let cases = clean_cases(
            &fetch_cases_window(&warehouse, &config.tables, &trend).expect("cases"),
            trend,
        )
        .expect("clean cases");
        compute_metric_set(&articles, &cases, month, fixture_today(), 6, &config).expect("metrics")
    }

    #[test]
    fn render_figures_produces_every_page_in_order() {
        let figures = render_figures(&fixture_metrics());
        let titles: Vec<&str> = figures.iter().map(|figure| figure.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "KCS Engagement",
                "Close Reason Distribution",
                "Valid-Cases Breakdown by Region",
                "Close-Reason Ratio - Last 6 Months",
                "Open Cases Week over Week by Region",
                "Articles Created per Employee by Region",
                "Articles Created per Coach by Region",
                "Operations Summary",
            ]
        );
        assert_eq!(figures[0].insight, Insight::Engagement("80.0".to_string()));
        assert!(figures[7].chart.is_none());
    }

    #[test]
    fn ratio_series_drops_admin_regions() {
        let figure = ratio_series_by_region(&fixture_metrics());
        let chart = figure.chart.expect("chart");
        let texts: Vec<&str> = chart.texts().collect();
        assert!(texts.contains(&"EMEA"));
        assert!(!texts.iter().any(|text| text.contains("ADMIN")));
        assert!(texts.contains(&"2026-07"));
    }

    #[test]
    fn valid_cases_insight_lists_region_ratios() {
        let figure = valid_cases_ratio_stacked(&fixture_metrics());
        let text = figure.insight.render().expect("insight");
        assert!(text.starts_with("KCS Engagement by Region: AMERICAS: 33.3%, APJ: 50.0%, EMEA: 100.0%"));
        assert!(text.contains("APJ: 0.500"));
    }
}
