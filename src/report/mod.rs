use crate::transform::RegionValidCases;
use crate::visualize::Chart;

mod pdf;

pub use pdf::export_report_pdf;

/// Narrative attached to a figure.
#[derive(Debug, Clone, PartialEq)]
pub enum Insight {
    None,
    /// Engagement percentage, already formatted with one decimal.
    Engagement(String),
    Text(String),
    Pairs {
        heading: Option<String>,
        pairs: Vec<(String, String)>,
    },
}

impl Insight {
    pub fn render(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Engagement(percent) => Some(format_kcs_engagement_insight(percent)),
            Self::Text(text) => Some(text.clone()),
            Self::Pairs { heading, pairs } => {
                let mut lines: Vec<String> = heading.iter().cloned().collect();
                lines.extend(pairs.iter().map(|(key, value)| format!("{key}: {value}")));
                Some(lines.join("\n"))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportFigure {
    pub title: String,
    pub chart: Option<Chart>,
    pub insight: Insight,
}

pub fn format_kcs_engagement_insight(percent: &str) -> String {
    format!(
        "Engineer KCS Engagement: % of closed cases involving any of the 4 Knowledge Actions \
         (create, use, update, or provide feedback on Knowledge Articles / Docs).\n\n\
         MoM: This month, we had reached to our KPI by {percent}%."
    )
}

pub fn format_kcs_engagement_by_region(rows: &[RegionValidCases]) -> String {
    if rows.is_empty() {
        return "No KCS Engagement data available by region.".to_string();
    }
    let mut pairs: Vec<(String, Option<f64>)> = rows
        .iter()
        .map(|row| (row.region.to_uppercase(), row.close_reason_ratio))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let summary: Vec<String> = pairs
        .into_iter()
        .map(|(region, ratio)| format!("{region}: {}", format_percent(ratio)))
        .collect();
    format!("KCS Engagement by Region: {}", summary.join(", "))
}

pub fn format_percent(ratio: Option<f64>) -> String {
    match ratio {
        Some(ratio) => format!("{:.1}%", ratio * 100.0),
        None => "n/a".to_string(),
    }
}
