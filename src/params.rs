//! Preprocessing parameters produced at training time and the feature schema derived from them.
//!
//! Both are loaded once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Canonical column names shared by the feature builder and the training artifacts.
pub mod columns {
    pub const PEOPLE_COUNT: &str = "People Count";
    pub const MARKETING_HEADCOUNT: &str = "MarketingHeadcount";
    pub const COMPANY_REVENUE: &str = "Company Revenue";
    pub const INDUSTRY: &str = "Industry";
    pub const IS_B2B: &str = "is_B2B";
    pub const PROMPT_VOLUME: &str = "PromptVolume";

    pub const RATIO: &str = "Marketing_to_Headcount_Ratio";
    pub const LOG_REVENUE: &str = "log_CompanyRevenue";
    pub const LOG_PEOPLE: &str = "log_PeopleCount";
    pub const LOG_PROMPT_VOLUME: &str = "log_PromptVolume";

    /// Prefix of every one-hot industry column.
    pub const INDUSTRY_PREFIX: &str = "Industry_";
    /// Bucket for industries outside the trained vocabulary.
    pub const OTHER_INDUSTRY: &str = "Other";
}

fn default_model_version() -> String {
    "v3".to_string()
}

/// Training-time medians used for imputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medians {
    #[serde(rename = "People Count")]
    pub people_count: f64,
    #[serde(rename = "Company Revenue")]
    pub company_revenue: f64,
    #[serde(rename = "PromptVolume", default, skip_serializing_if = "Option::is_none")]
    pub prompt_volume: Option<f64>,
}

/// The preprocessing artifact written next to the two models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreprocessingParams {
    pub medians: Medians,
    /// Ordered model input columns. Models are position-sensitive.
    pub feature_cols: Vec<String>,
    #[serde(default)]
    pub top_industries: Vec<String>,
    #[serde(default)]
    pub all_industry_cols: Vec<String>,
    #[serde(default = "default_model_version")]
    pub model_version: String,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    /// Simplified training replaced non-positive head counts with the median.
    #[serde(default)]
    pub impute_nonpositive_people_count: bool,
}

/// Which of the two pipeline configurations the parameters describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// Industry one-hot plus prompt volume.
    Full,
    /// Five features: head counts, revenue, B2B flag and the ratio.
    Simplified,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::Full => "full",
            SchemaVariant::Simplified => "simplified",
        }
    }
}

/// Feature schema the builder is parameterized by.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    pub variant: SchemaVariant,
    pub industry_one_hot: bool,
    pub prompt_volume: bool,
    pub impute_nonpositive_people_count: bool,
    pub columns: Vec<String>,
    pub medians: Medians,
    pub top_industries: HashSet<String>,
    /// `(column name, industry label)` for every one-hot column, in artifact order.
    pub industry_columns: Vec<(String, String)>,
}

impl PreprocessingParams {
    /// Checks the artifact is internally consistent.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.feature_cols.is_empty() {
            anyhow::bail!("feature_cols cannot be empty");
        }

        let mut seen = HashSet::new();
        for col in &self.feature_cols {
            if !seen.insert(col.as_str()) {
                anyhow::bail!("feature_cols contains duplicate column '{}'", col);
            }
        }

        if !self.medians.people_count.is_finite() || !self.medians.company_revenue.is_finite() {
            anyhow::bail!("medians must be finite numbers");
        }

        for col in &self.all_industry_cols {
            if !col.starts_with(columns::INDUSTRY_PREFIX) {
                anyhow::bail!(
                    "industry column '{}' must start with '{}'",
                    col,
                    columns::INDUSTRY_PREFIX
                );
            }
        }

        let wants_prompt_volume = self
            .feature_cols
            .iter()
            .any(|c| c == columns::LOG_PROMPT_VOLUME || c == columns::PROMPT_VOLUME);
        match self.medians.prompt_volume {
            Some(median) if !median.is_finite() => {
                anyhow::bail!("PromptVolume median must be a finite number")
            }
            None if wants_prompt_volume => {
                anyhow::bail!("feature_cols uses PromptVolume but no PromptVolume median is present")
            }
            _ => {}
        }

        Ok(())
    }

    /// Derives the feature schema. Call [`PreprocessingParams::validate`] first.
    pub fn schema(&self) -> FeatureSchema {
        let industry_one_hot = !self.all_industry_cols.is_empty();
        let prompt_volume = self.medians.prompt_volume.is_some();
        let variant = if industry_one_hot || prompt_volume {
            SchemaVariant::Full
        } else {
            SchemaVariant::Simplified
        };

        let industry_columns = self
            .all_industry_cols
            .iter()
            .map(|col| {
                let label = col
                    .strip_prefix(columns::INDUSTRY_PREFIX)
                    .unwrap_or(col)
                    .to_string();
                (col.clone(), label)
            })
            .collect();

        FeatureSchema {
            variant,
            industry_one_hot,
            prompt_volume,
            impute_nonpositive_people_count: self.impute_nonpositive_people_count,
            columns: self.feature_cols.clone(),
            medians: self.medians.clone(),
            top_industries: self.top_industries.iter().cloned().collect(),
            industry_columns,
        }
    }

    /// Medians keyed by canonical column name, for reporting.
    pub fn median_table(&self) -> BTreeMap<&'static str, f64> {
        let mut table = BTreeMap::new();
        table.insert(columns::PEOPLE_COUNT, self.medians.people_count);
        table.insert(columns::COMPANY_REVENUE, self.medians.company_revenue);
        if let Some(pv) = self.medians.prompt_volume {
            table.insert(columns::PROMPT_VOLUME, pv);
        }
        table
    }
}

impl FeatureSchema {
    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn simplified() -> PreprocessingParams {
        serde_json::from_value(json!({
            "medians": { "People Count": 250.0, "Company Revenue": 25000000.0 },
            "feature_cols": [
                "log_PeopleCount",
                "log_CompanyRevenue",
                "MarketingHeadcount",
                "is_B2B",
                "Marketing_to_Headcount_Ratio"
            ],
            "model_version": "v3_simplified"
        }))
        .unwrap()
    }

    #[test]
    fn test_simplified_schema() {
        let params = simplified();
        params.validate().unwrap();
        let schema = params.schema();

        assert_eq!(schema.variant, SchemaVariant::Simplified);
        assert!(!schema.industry_one_hot);
        assert!(!schema.prompt_volume);
        assert_eq!(schema.feature_count(), 5);
    }

    #[test]
    fn test_full_schema_strips_industry_prefix() {
        let params: PreprocessingParams = serde_json::from_value(json!({
            "medians": {
                "People Count": 250.0,
                "Company Revenue": 25000000.0,
                "PromptVolume": 1200.0
            },
            "top_industries": ["Software"],
            "feature_cols": ["log_PromptVolume", "Industry_Software", "Industry_Other"],
            "all_industry_cols": ["Industry_Software", "Industry_Other"]
        }))
        .unwrap();
        params.validate().unwrap();
        let schema = params.schema();

        assert_eq!(schema.variant, SchemaVariant::Full);
        assert_eq!(params.model_version, "v3");
        assert_eq!(
            schema.industry_columns,
            vec![
                ("Industry_Software".to_string(), "Software".to_string()),
                ("Industry_Other".to_string(), "Other".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let mut params = simplified();
        params.feature_cols.push("is_B2B".to_string());
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_prompt_volume_without_median_rejected() {
        let mut params = simplified();
        params.feature_cols.push("log_PromptVolume".to_string());
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("PromptVolume"));
    }

    #[test]
    fn test_bad_industry_column_rejected() {
        let mut params = simplified();
        params.all_industry_cols = vec!["Software".to_string()];
        assert!(params.validate().is_err());
    }
}
