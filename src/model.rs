use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One knowledge-article version after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub article_id: Option<String>,
    pub title: Option<String>,
    pub region: Option<String>,
    pub creator_region: Option<String>,
    pub creator_name: Option<String>,
    pub published_by_name: Option<String>,
    /// The extract held an empty string rather than NULL for the publisher.
    pub published_by_blank: bool,
    pub views_by_customers: i64,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub days_to_publish: Option<f64>,
    pub article_type: Option<String>,
    pub publish_status: Option<String>,
    pub internal: Option<bool>,
    pub visible_to_customers: Option<bool>,
    pub version_is_latest: Option<bool>,
    pub community_article_url: Option<String>,
    pub article_attach_count: Option<i64>,
}

impl ArticleRecord {
    pub fn published_on(&self) -> Option<NaiveDate> {
        self.published_at.map(|value| value.date())
    }

    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at.map(|value| value.date())
    }
}

/// One support case after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub created_date: Option<NaiveDateTime>,
    pub closed_date: Option<NaiveDateTime>,
    pub region: Option<String>,
    pub product: Option<String>,
    pub owner_name: Option<String>,
    pub created_by_region: Option<String>,
    pub age: Option<f64>,
    pub customer_account_region: Option<String>,
    pub attached_article_count: Option<i64>,
    pub close_reason: Option<String>,
    pub status: Option<String>,
    pub case_record_type: Option<String>,
    pub owner_role: Option<String>,
    pub owner_company: Option<String>,
}

impl CaseRecord {
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_date.map(|value| value.date())
    }

    pub fn closed_on(&self) -> Option<NaiveDate> {
        self.closed_date.map(|value| value.date())
    }

    /// Region trimmed and upper-cased, the key every per-region metric groups on.
    pub fn region_key(&self) -> Option<String> {
        self.region
            .as_deref()
            .map(|region| region.trim().to_uppercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPaths {
    pub warehouse_path: String,
    pub output_dir: String,
    pub pdf_path: String,
    pub metrics_path: String,
    pub chart_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCounts {
    pub raw_articles: usize,
    pub raw_cases: usize,
    pub clean_articles: usize,
    pub clean_cases: usize,
    pub report_window_cases: usize,
    pub figures: usize,
    pub charts_written: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub report_window_start: NaiveDate,
    pub report_window_end: NaiveDate,
    pub trend_window_start: NaiveDate,
    pub trend_window_end: NaiveDate,
    pub command: String,
    pub paths: ReportPaths,
    pub counts: ReportCounts,
    pub pdf_sha256: String,
    pub warnings: Vec<String>,
}
