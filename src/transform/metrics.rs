use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{CaseRules, ReportConfig};
use crate::model::{ArticleRecord, CaseRecord};
use crate::window::{DateWindow, YearMonth, week_bucket_start};

const EXTERNAL_RECORD_TYPE: &str = "External";
const ONLINE_STATUS: &str = "Online";

/// Configured rules plus their compiled matchers.
pub struct MetricRules<'a> {
    pub config: &'a ReportConfig,
    roles: CaseRules,
}

impl<'a> MetricRules<'a> {
    pub fn new(config: &'a ReportConfig) -> Result<Self> {
        Ok(Self {
            config,
            roles: config.rules()?,
        })
    }

    fn has_valid_reason(&self, case: &CaseRecord) -> bool {
        case.close_reason
            .as_deref()
            .is_some_and(|reason| self.config.close_reasons.iter().any(|valid| valid == reason.trim()))
    }

    fn is_purged(&self, case: &CaseRecord) -> bool {
        case.status
            .as_deref()
            .is_some_and(|status| status.trim() == self.config.purged_status)
    }

    fn is_engaged(&self, case: &CaseRecord) -> bool {
        case.owner_role
            .as_deref()
            .is_some_and(|role| self.roles.engaged_owner_role.is_match(role))
    }

    fn is_ratio_excluded_region(&self, case: &CaseRecord) -> bool {
        case.region_key()
            .is_some_and(|region| self.config.ratio_excluded_regions.contains(&region))
    }

    /// Valid for the close-reason ratio, optionally applying the excluded-region rule.
    fn is_valid_case(&self, case: &CaseRecord, exclude_regions: bool) -> bool {
        self.has_valid_reason(case)
            && !self.is_purged(case)
            && self.is_engaged(case)
            && is_external(case)
            && !(exclude_regions && self.is_ratio_excluded_region(case))
    }

    fn is_eligible_article(&self, article: &ArticleRecord) -> bool {
        article
            .article_type
            .as_deref()
            .is_some_and(|kind| self.config.article_types.iter().any(|allowed| allowed == kind))
            && article.creator_name.as_deref() != Some(self.config.excluded_creator.as_str())
            && article.version_is_latest == Some(true)
    }
}

fn is_external(case: &CaseRecord) -> bool {
    case.case_record_type
        .as_deref()
        .is_some_and(|kind| kind.trim() == EXTERNAL_RECORD_TYPE)
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| round3(numerator as f64 / denominator as f64))
}

fn ratio_of<'c>(
    rules: &MetricRules<'_>,
    cases: impl IntoIterator<Item = &'c CaseRecord>,
    exclude_regions: bool,
) -> Option<f64> {
    let mut denominator = 0;
    let mut numerator = 0;
    for case in cases {
        if case.close_reason.is_none() {
            continue;
        }
        denominator += 1;
        if rules.is_valid_case(case, exclude_regions) {
            numerator += 1;
        }
    }
    ratio(numerator, denominator)
}

fn in_region<'c>(
    cases: &'c [CaseRecord],
    region: Option<&str>,
) -> impl Iterator<Item = &'c CaseRecord> {
    let wanted = region.map(|region| region.trim().to_uppercase());
    cases.iter().filter(move |case| match &wanted {
        Some(wanted) => case.region_key().as_ref() == Some(wanted),
        None => true,
    })
}

fn distinct_regions(cases: &[CaseRecord]) -> BTreeSet<String> {
    cases.iter().filter_map(CaseRecord::region_key).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRatio {
    pub region: String,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRatio {
    pub month: YearMonth,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRegionRatio {
    pub month: YearMonth,
    pub region: String,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionValidCases {
    pub region: String,
    pub valid_cases_count: usize,
    pub close_reason_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRegionCount {
    pub week: NaiveDate,
    pub region: String,
    pub open_cases_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OspEngagement {
    pub count: usize,
    pub close_reason_ratio: Option<f64>,
    pub close_reason_denom: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseReasonQuality {
    pub kcs_action_taken: usize,
    pub non_actionable: usize,
}

impl CloseReasonQuality {
    pub fn total(&self) -> usize {
        self.kcs_action_taken + self.non_actionable
    }

    /// Share of cases with a knowledge action, in percent.
    pub fn percent(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.kcs_action_taken as f64 * 100.0 / total as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRate {
    pub region: String,
    pub count: usize,
    pub headcount: u32,
    pub per_capita: f64,
}

/// Share of non-null close reasons that record a knowledge action.
///
/// `None` covers every region; `Some(region)` matches the trimmed, upper-cased region.
pub fn close_reason_ratio(
    rules: &MetricRules<'_>,
    cases: &[CaseRecord],
    region: Option<&str>,
) -> Option<f64> {
    ratio_of(rules, in_region(cases, region), true)
}

pub fn close_reason_ratio_by_region(rules: &MetricRules<'_>, cases: &[CaseRecord]) -> Vec<RegionRatio> {
    distinct_regions(cases)
        .into_iter()
        .map(|region| RegionRatio {
            ratio: close_reason_ratio(rules, cases, Some(&region)),
            region,
        })
        .collect()
}

fn cases_by_created_month<'c>(
    cases: &'c [CaseRecord],
    today: NaiveDate,
    months: u32,
) -> BTreeMap<YearMonth, Vec<&'c CaseRecord>> {
    let start_month = YearMonth::of(today).months_back(months.saturating_sub(1));
    let mut grouped: BTreeMap<YearMonth, Vec<&CaseRecord>> = BTreeMap::new();
    for case in cases {
        let Some(created) = case.created_on() else {
            continue;
        };
        let month = YearMonth::of(created);
        if start_month.is_none_or(|start| month >= start) {
            grouped.entry(month).or_default().push(case);
        }
    }
    grouped
}

pub fn close_reason_ratio_last_n_months(
    rules: &MetricRules<'_>,
    cases: &[CaseRecord],
    today: NaiveDate,
    months: u32,
) -> Vec<MonthlyRatio> {
    cases_by_created_month(cases, today, months)
        .into_iter()
        .map(|(month, group)| MonthlyRatio {
            month,
            ratio: ratio_of(rules, group, true),
        })
        .collect()
}

pub fn close_reason_ratio_last_n_months_by_region(
    rules: &MetricRules<'_>,
    cases: &[CaseRecord],
    today: NaiveDate,
    months: u32,
) -> Vec<MonthlyRegionRatio> {
    let mut records = Vec::new();
    for (month, group) in cases_by_created_month(cases, today, months) {
        let mut by_region: BTreeMap<String, Vec<&CaseRecord>> = BTreeMap::new();
        for case in group {
            if let Some(region) = case.region_key() {
                by_region.entry(region).or_default().push(case);
            }
        }
        for (region, cases) in by_region {
            records.push(MonthlyRegionRatio {
                month,
                region,
                ratio: ratio_of(rules, cases, true),
            });
        }
    }
    records
}

/// Valid cases and their ratio; `ALL` or `None` means every region.
///
/// Unlike [`close_reason_ratio`], excluded regions are not filtered here.
pub fn valid_cases_and_ratio<'c>(
    rules: &MetricRules<'_>,
    cases: &'c [CaseRecord],
    region: Option<&str>,
) -> (Vec<&'c CaseRecord>, Option<f64>) {
    let region = region.filter(|region| !region.trim().eq_ignore_ascii_case("ALL"));
    let scoped: Vec<&CaseRecord> = in_region(cases, region).collect();
    let denominator = scoped.iter().filter(|case| case.close_reason.is_some()).count();
    let valid: Vec<&CaseRecord> = scoped
        .into_iter()
        .filter(|case| rules.is_valid_case(case, false))
        .collect();
    let ratio = ratio(valid.len(), denominator);
    (valid, ratio)
}

pub fn all_regions_valid_cases_and_ratios(
    rules: &MetricRules<'_>,
    cases: &[CaseRecord],
) -> Vec<RegionValidCases> {
    distinct_regions(cases)
        .into_iter()
        .filter(|region| !rules.config.valid_cases_excluded_regions.contains(region))
        .map(|region| {
            let (valid, ratio) = valid_cases_and_ratio(rules, cases, Some(&region));
            RegionValidCases {
                valid_cases_count: valid.len(),
                close_reason_ratio: ratio,
                region,
            }
        })
        .collect()
}

pub fn count_created_articles(
    rules: &MetricRules<'_>,
    articles: &[ArticleRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> usize {
    articles
        .iter()
        .filter(|article| rules.is_eligible_article(article))
        .filter(|article| article.created_on().is_some_and(|day| start <= day && day <= end))
        .count()
}

/// Distinct online articles first published in `[start, end]`.
pub fn count_published_articles(
    rules: &MetricRules<'_>,
    articles: &[ArticleRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> usize {
    articles
        .iter()
        .filter(|article| rules.is_eligible_article(article))
        .filter(|article| article.publish_status.as_deref() == Some(ONLINE_STATUS))
        .filter(|article| article.published_on().is_some_and(|day| start <= day && day <= end))
        .filter_map(|article| article.article_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

pub fn median_days_to_publish(rules: &MetricRules<'_>, articles: &[ArticleRecord]) -> Option<f64> {
    let mut days: Vec<f64> = articles
        .iter()
        .filter(|article| {
            article.publish_status.as_deref() == Some(ONLINE_STATUS)
                && article.visible_to_customers == Some(true)
                && article.version_is_latest == Some(true)
                && article
                    .article_type
                    .as_deref()
                    .is_some_and(|kind| rules.config.article_types.iter().any(|allowed| allowed == kind))
                && article.published_at.is_some()
                && !article.published_by_blank
                && article.internal == Some(false)
        })
        .filter_map(|article| article.days_to_publish)
        .collect();
    median(&mut days)
}

pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|left, right| left.total_cmp(right));
    let middle = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[middle - 1] + values[middle]) / 2.0)
    } else {
        Some(values[middle])
    }
}

/// Cases per intra-month week of closing, per region.
pub fn open_cases_week_over_week_by_region(
    rules: &MetricRules<'_>,
    cases: &[CaseRecord],
    end_date: Option<NaiveDate>,
) -> Vec<WeeklyRegionCount> {
    let config = rules.config;
    let mut counts: BTreeMap<(NaiveDate, String), usize> = BTreeMap::new();
    for case in cases {
        let Some(region) = case.region_key().filter(|region| !region.is_empty()) else {
            continue;
        };
        if config.open_cases_excluded_regions.contains(&region) {
            continue;
        }
        if case
            .owner_role
            .as_ref()
            .is_some_and(|role| config.open_cases_excluded_roles.contains(role))
        {
            continue;
        }
        if case.case_record_type.as_deref() == Some(config.open_cases_excluded_record_type.as_str()) {
            continue;
        }
        let Some(closed) = case.closed_on() else {
            continue;
        };
        if end_date.is_some_and(|end| closed > end) {
            continue;
        }
        *counts.entry((week_bucket_start(closed), region)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((week, region), open_cases_count)| WeeklyRegionCount {
            week,
            region,
            open_cases_count,
        })
        .collect()
}

/// Engagement of outsourced-partner engineers on cases created in `window`.
pub fn osp_kcs_engagement(
    rules: &MetricRules<'_>,
    cases: &[CaseRecord],
    window: &DateWindow,
) -> OspEngagement {
    let config = rules.config;
    let filtered: Vec<&CaseRecord> = cases
        .iter()
        .filter(|case| is_external(case))
        .filter(|case| {
            case.owner_role
                .as_deref()
                .is_some_and(|role| rules.roles.osp_owner_role.is_match(role))
        })
        .filter(|case| !rules.is_purged(case))
        .filter(|case| {
            case.owner_company
                .as_ref()
                .is_some_and(|company| config.osp_companies.contains(company))
        })
        .filter(|case| case.created_on().is_some_and(|day| window.contains(day)))
        .collect();

    let reasons: Vec<String> = filtered
        .iter()
        .filter_map(|case| case.close_reason.as_deref())
        .map(|reason| reason.trim().to_lowercase())
        .collect();
    let valid = reasons
        .iter()
        .filter(|reason| {
            config
                .close_reasons
                .iter()
                .any(|valid| valid.to_lowercase() == **reason)
        })
        .count();

    OspEngagement {
        count: filtered.len(),
        close_reason_ratio: ratio(valid, reasons.len()),
        close_reason_denom: reasons.len(),
    }
}

fn engaged_external_cases<'c>(
    rules: &'c MetricRules<'_>,
    cases: &'c [CaseRecord],
) -> impl Iterator<Item = &'c CaseRecord> {
    cases
        .iter()
        .filter(move |case| is_external(case) && rules.is_engaged(case) && !rules.is_purged(case))
}

pub fn close_reason_quality(rules: &MetricRules<'_>, cases: &[CaseRecord]) -> CloseReasonQuality {
    let mut quality = CloseReasonQuality {
        kcs_action_taken: 0,
        non_actionable: 0,
    };
    for case in engaged_external_cases(rules, cases).filter(|case| case.close_reason.is_some()) {
        if rules.has_valid_reason(case) {
            quality.kcs_action_taken += 1;
        } else {
            quality.non_actionable += 1;
        }
    }
    quality
}

/// Close-reason counts, with reasons under `other_threshold` of the total folded into `Other`.
pub fn close_reason_distribution(
    rules: &MetricRules<'_>,
    cases: &[CaseRecord],
    other_threshold: f64,
) -> Vec<ReasonCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for reason in engaged_external_cases(rules, cases)
        .filter_map(|case| case.close_reason.as_deref())
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
    {
        *counts.entry(reason.to_string()).or_default() += 1;
    }

    let total: usize = counts.values().sum();
    let threshold = total as f64 * other_threshold;
    let mut ranked: Vec<ReasonCount> = counts
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    let (mut main, rare): (Vec<ReasonCount>, Vec<ReasonCount>) = ranked
        .into_iter()
        .partition(|entry| entry.count as f64 >= threshold);
    if !rare.is_empty() {
        main.push(ReasonCount {
            reason: "Other".to_string(),
            count: rare.iter().map(|entry| entry.count).sum(),
        });
    }
    main
}

/// Articles created in `window` per head of each configured region, highest first.
pub fn articles_created_per_capita(
    rules: &MetricRules<'_>,
    articles: &[ArticleRecord],
    window: &DateWindow,
    headcounts: &BTreeMap<String, u32>,
) -> Vec<RegionRate> {
    let mut by_region: HashMap<String, Vec<ArticleRecord>> = HashMap::new();
    for article in articles {
        let region = article
            .region
            .as_deref()
            .map(|region| region.trim().to_uppercase())
            .unwrap_or_default();
        by_region.entry(region).or_default().push(article.clone());
    }

    let mut rates: Vec<RegionRate> = headcounts
        .iter()
        .filter_map(|(region, headcount)| {
            let regional = by_region.get(region)?;
            let count = count_created_articles(rules, regional, window.start, window.end);
            let per_capita = if *headcount > 0 {
                count as f64 / *headcount as f64
            } else {
                0.0
            };
            Some(RegionRate {
                region: region.clone(),
                count,
                headcount: *headcount,
                per_capita,
            })
        })
        .collect();
    rates.sort_by(|a, b| {
        b.per_capita
            .total_cmp(&a.per_capita)
            .then_with(|| a.region.cmp(&b.region))
    });
    rates
}
