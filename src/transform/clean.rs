use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::extract::{RawTable, RawValue};
use crate::model::{ArticleRecord, CaseRecord};
use crate::window::DateWindow;

const ARTICLE_COLUMNS: &[&str] = &[
    "ARTICLE_NUMBER",
    "ARTILE_TITLE",
    "PUBLISHED_BY_NAME",
    "PUBLISHED_BY_REGION",
    "PUBLIC_KB_VIEWCOUNT",
    "ARTICLE_FIRST_PUBLISHED_DATE",
    "DAYS_TO_PUBLISH",
    "ARTICLE_TYPE",
    "PUBLISH_STATUS",
    "INTERNAL",
    "COMMUNITY_ARTICLE_URL",
    "ARTICLE_CASE_ATTACH_COUNT",
    "CREATOR_REGION",
    "ARTICLE_CREATED_DATE",
    "CREATOR_NAME",
    "VISIBLE_IN_CUSTOMER_PORTAL",
    "VERSION_IS_LATEST",
];

const CASE_COLUMNS: &[&str] = &[
    "CASE_NUMBER",
    "CREATED_DATE",
    "CLOSED_DATE",
    "REGION",
    "PRODUCT",
    "OWNER_NAME",
    "CREATED_BY_REGION",
    "AGE",
    "CUSTOMER_ACCOUNT_REGION",
    "ATTACHED_ARTICLE_COUNT",
    "CLOSE_REASON",
    "STATUS",
    "RECORD_TYPE",
    "OWNER_ROLE",
    "OWNER_COMPANY",
];

/// Records that carry the date a window bounds them on.
pub trait Anchored {
    fn anchor_date(&self) -> Option<NaiveDate>;
}

impl Anchored for ArticleRecord {
    fn anchor_date(&self) -> Option<NaiveDate> {
        self.published_on()
    }
}

impl Anchored for CaseRecord {
    fn anchor_date(&self) -> Option<NaiveDate> {
        self.closed_on()
    }
}

/// Deduplicated, typed records, all anchored inside `window`.
#[derive(Debug, Clone)]
pub struct CleanedTable<T> {
    window: DateWindow,
    records: Vec<T>,
}

impl<T: Anchored + Clone> CleanedTable<T> {
    fn bounded(window: DateWindow, records: Vec<T>) -> (Self, usize) {
        let before = records.len();
        let records: Vec<T> = records
            .into_iter()
            .filter(|record| record.anchor_date().is_some_and(|date| window.contains(date)))
            .collect();
        let dropped = before - records.len();
        (Self { window, records }, dropped)
    }

    #[cfg(test)]
    pub fn from_records(window: DateWindow, records: Vec<T>) -> Self {
        Self::bounded(window, records).0
    }

    /// Narrow to a sub-window on the anchor date.
    pub fn restrict(&self, window: DateWindow) -> Self {
        Self::bounded(window, self.records.clone()).0
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn clean_articles(raw: &RawTable, window: DateWindow) -> Result<CleanedTable<ArticleRecord>> {
    let columns = ColumnMap::resolve(raw, ARTICLE_COLUMNS).context("article extract is missing columns")?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());
    let mut duplicates = 0_usize;
    for row in raw.rows() {
        let record = ArticleRecord {
            article_id: text(columns.get(row, "ARTICLE_NUMBER")),
            title: text(columns.get(row, "ARTILE_TITLE")),
            region: text(columns.get(row, "PUBLISHED_BY_REGION")),
            creator_region: text(columns.get(row, "CREATOR_REGION")),
            creator_name: text(columns.get(row, "CREATOR_NAME")),
            published_by_name: text(columns.get(row, "PUBLISHED_BY_NAME")),
            published_by_blank: matches!(
                columns.get(row, "PUBLISHED_BY_NAME"),
                RawValue::Text(value) if value.is_empty()
            ),
            views_by_customers: integer(columns.get(row, "PUBLIC_KB_VIEWCOUNT")).unwrap_or(0),
            published_at: timestamp(columns.get(row, "ARTICLE_FIRST_PUBLISHED_DATE")),
            created_at: timestamp(columns.get(row, "ARTICLE_CREATED_DATE")),
            days_to_publish: number(columns.get(row, "DAYS_TO_PUBLISH")),
            article_type: text(columns.get(row, "ARTICLE_TYPE")),
            publish_status: text(columns.get(row, "PUBLISH_STATUS")),
            internal: boolean(columns.get(row, "INTERNAL")),
            visible_to_customers: boolean(columns.get(row, "VISIBLE_IN_CUSTOMER_PORTAL")),
            version_is_latest: boolean(columns.get(row, "VERSION_IS_LATEST")),
            community_article_url: text(columns.get(row, "COMMUNITY_ARTICLE_URL")),
            article_attach_count: integer(columns.get(row, "ARTICLE_CASE_ATTACH_COUNT")),
        };

        let key = serde_json::to_string(&record).context("failed to fingerprint article row")?;
        if seen.insert(key) {
            records.push(record);
        } else {
            duplicates += 1;
        }
    }

    let (table, out_of_window) = CleanedTable::bounded(window, records);
    info!(
        raw = raw.len(),
        duplicates,
        out_of_window,
        kept = table.len(),
        "cleaned knowledge articles"
    );
    Ok(table)
}

pub fn clean_cases(raw: &RawTable, window: DateWindow) -> Result<CleanedTable<CaseRecord>> {
    let columns = ColumnMap::resolve(raw, CASE_COLUMNS).context("case extract is missing columns")?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());
    let mut duplicates = 0_usize;
    let mut missing_ids = 0_usize;
    for row in raw.rows() {
        let Some(case_id) = text(columns.get(row, "CASE_NUMBER")) else {
            missing_ids += 1;
            continue;
        };
        if !seen.insert(case_id.trim().to_string()) {
            duplicates += 1;
            continue;
        }

        records.push(CaseRecord {
            case_id,
            created_date: timestamp(columns.get(row, "CREATED_DATE")),
            closed_date: timestamp(columns.get(row, "CLOSED_DATE")),
            region: text(columns.get(row, "REGION")),
            product: text(columns.get(row, "PRODUCT")),
            owner_name: text(columns.get(row, "OWNER_NAME")),
            created_by_region: text(columns.get(row, "CREATED_BY_REGION")),
            age: number(columns.get(row, "AGE")),
            customer_account_region: text(columns.get(row, "CUSTOMER_ACCOUNT_REGION")),
            attached_article_count: integer(columns.get(row, "ATTACHED_ARTICLE_COUNT")),
            close_reason: text(columns.get(row, "CLOSE_REASON")),
            status: text(columns.get(row, "STATUS")),
            case_record_type: text(columns.get(row, "RECORD_TYPE")),
            owner_role: text(columns.get(row, "OWNER_ROLE")),
            owner_company: text(columns.get(row, "OWNER_COMPANY")),
        });
    }

    let (table, out_of_window) = CleanedTable::bounded(window, records);
    info!(
        raw = raw.len(),
        duplicates,
        missing_ids,
        out_of_window,
        kept = table.len(),
        "cleaned support cases"
    );
    Ok(table)
}

struct ColumnMap {
    positions: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn resolve(raw: &RawTable, wanted: &[&'static str]) -> Result<Self> {
        let mut positions = HashMap::with_capacity(wanted.len());
        let mut missing = Vec::new();
        for column in wanted {
            match raw.column_index(column) {
                Some(position) => {
                    positions.insert(*column, position);
                }
                None => missing.push(*column),
            }
        }
        if !missing.is_empty() {
            bail!("missing columns: {}", missing.join(", "));
        }
        debug!(
            columns = positions.len(),
            extract_columns = raw.columns().len(),
            "resolved extract columns"
        );
        Ok(Self { positions })
    }

    fn get<'a>(&self, row: &'a [RawValue], column: &str) -> &'a RawValue {
        self.positions
            .get(column)
            .and_then(|position| row.get(*position))
            .unwrap_or(&RawValue::Null)
    }
}

pub(crate) fn text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => None,
        RawValue::Integer(value) => Some(value.to_string()),
        RawValue::Real(value) => Some(value.to_string()),
        RawValue::Text(value) if value.trim().is_empty() => None,
        RawValue::Text(value) => Some(value.clone()),
    }
}

pub(crate) fn boolean(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Null => None,
        RawValue::Integer(value) => Some(*value != 0),
        RawValue::Real(value) => Some(*value != 0.0),
        RawValue::Text(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "y" | "yes" | "1" => Some(true),
            "false" | "f" | "n" | "no" | "0" => Some(false),
            _ => None,
        },
    }
}

pub(crate) fn number(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Integer(value) => Some(*value as f64),
        RawValue::Real(value) if value.is_finite() => Some(*value),
        RawValue::Text(value) => value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

pub(crate) fn integer(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Integer(value) => Some(*value),
        RawValue::Text(value) if value.trim().parse::<i64>().is_ok() => value.trim().parse().ok(),
        _ => number(value).map(|value| value.round() as i64),
    }
}

pub(crate) fn timestamp(value: &RawValue) -> Option<NaiveDateTime> {
    let RawValue::Text(value) = value else {
        return None;
    };
    let value = value.trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
