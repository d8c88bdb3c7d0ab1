use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ARTICLES_TABLE: &str = "KNOWLEDGE_ARTICLE_VERSIONS_SOURCE_T";
pub const DEFAULT_CASES_TABLE: &str = "SUPPORT_CASES_T";

/// Business rules and warehouse layout for a report run.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub tables: WarehouseTables,
    pub close_reasons: Vec<String>,
    pub purged_status: String,
    pub engaged_owner_role_pattern: String,
    pub osp_owner_role_pattern: String,
    pub osp_companies: Vec<String>,
    pub ratio_excluded_regions: Vec<String>,
    pub valid_cases_excluded_regions: Vec<String>,
    pub open_cases_excluded_regions: Vec<String>,
    pub open_cases_excluded_roles: Vec<String>,
    pub open_cases_excluded_record_type: String,
    pub article_types: Vec<String>,
    pub excluded_creator: String,
    pub team_sizes: BTreeMap<String, u32>,
    pub coach_sizes: BTreeMap<String, u32>,
    pub distribution_other_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseTables {
    pub articles: String,
    pub cases: String,
}

impl Default for WarehouseTables {
    fn default() -> Self {
        Self {
            articles: DEFAULT_ARTICLES_TABLE.to_string(),
            cases: DEFAULT_CASES_TABLE.to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tables: WarehouseTables::default(),
            close_reasons: strings(&[
                "Solved by existing article",
                "Solved by existing doc",
                "Article Updated",
                "Article Flagged",
                "Article Created",
            ]),
            purged_status: "Closed – Purged".to_string(),
            engaged_owner_role_pattern: "Support|Idaptive|EPM".to_string(),
            osp_owner_role_pattern: "Idaptive|Support".to_string(),
            osp_companies: strings(&["Solugenix", "Helpware"]),
            ratio_excluded_regions: strings(&["ADMIN", "INTERNAL"]),
            valid_cases_excluded_regions: strings(&["NONE", "ADMIN LAND (TEST)"]),
            open_cases_excluded_regions: strings(&["ADMIN LAND (TEST)"]),
            open_cases_excluded_roles: strings(&[
                "Queue – Support Mailbox",
                "Queue – Sales Ops",
                "Users Access",
                "Queue – Renewal Ops",
            ]),
            open_cases_excluded_record_type: "License".to_string(),
            article_types: strings(&["FAQ", "How To", "Technical Issue"]),
            excluded_creator: "BI Integration".to_string(),
            team_sizes: headcounts(&[("AMERICAS", 92), ("EMEA", 46), ("APJ", 41)]),
            coach_sizes: headcounts(&[("AMERICAS", 5), ("EMEA", 7), ("APJ", 3)]),
            distribution_other_threshold: 0.03,
        }
    }
}

impl ReportConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_identifier(&self.tables.articles)?;
        ensure_identifier(&self.tables.cases)?;
        if !(0.0..1.0).contains(&self.distribution_other_threshold) {
            bail!(
                "distribution_other_threshold must be in [0, 1): {}",
                self.distribution_other_threshold
            );
        }
        self.rules()?;
        Ok(())
    }

    pub fn rules(&self) -> Result<CaseRules> {
        Ok(CaseRules {
            engaged_owner_role: case_insensitive(&self.engaged_owner_role_pattern)?,
            osp_owner_role: case_insensitive(&self.osp_owner_role_pattern)?,
        })
    }
}

/// Compiled owner-role matchers.
#[derive(Debug, Clone)]
pub struct CaseRules {
    pub engaged_owner_role: Regex,
    pub osp_owner_role: Regex,
}

pub fn ensure_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("table name is not a plain SQL identifier: {name:?}");
    }
    Ok(())
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid owner role pattern: {pattern}"))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn headcounts(values: &[(&str, u32)]) -> BTreeMap<String, u32> {
    values
        .iter()
        .map(|(region, size)| (region.to_string(), *size))
        .collect()
}
