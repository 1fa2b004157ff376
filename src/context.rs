//! The immutable state every request reads: preprocessing parameters, the derived
//! feature schema and the two models.
//!
//! Built once by the entry point and handed to the record processor and batch
//! aggregator by reference. Nothing in here is mutated after construction, so it is
//! shared across worker threads behind an `Arc` without locking.
use crate::artifacts::load_artifact;
use crate::config::Config;
use crate::errors::AppError;
use crate::features::FeatureVector;
use crate::model::{Classifier, DecisionTree, Regressor, TreeKind};
use crate::params::{FeatureSchema, PreprocessingParams};
use anyhow::Context;
use std::path::Path;

pub struct ScoringContext {
    params: PreprocessingParams,
    schema: FeatureSchema,
    classifier: Box<dyn Classifier>,
    regressor: Box<dyn Regressor>,
    strict_schema: bool,
    artifact_checksum: Option<String>,
}

/// Checks a model's declared input against the ordered feature columns.
fn check_alignment(
    role: &str,
    columns: &[String],
    n_features: usize,
    names: Option<&[String]>,
) -> anyhow::Result<()> {
    if n_features != columns.len() {
        anyhow::bail!(
            "{} expects {} features but feature_cols has {}",
            role,
            n_features,
            columns.len()
        );
    }
    if let Some(names) = names {
        if let Some((pos, (declared, expected))) = names
            .iter()
            .zip(columns)
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            anyhow::bail!(
                "{} column {} is '{}' but feature_cols has '{}'",
                role,
                pos,
                declared,
                expected
            );
        }
    }
    Ok(())
}

impl ScoringContext {
    /// Assembles a context from already-loaded parts.
    ///
    /// Fails when the parameters are inconsistent or either model's declared input
    /// shape differs from `feature_cols`.
    pub fn new(
        params: PreprocessingParams,
        classifier: Box<dyn Classifier>,
        regressor: Box<dyn Regressor>,
        strict_schema: bool,
    ) -> anyhow::Result<Self> {
        params.validate().context("invalid preprocessing parameters")?;
        let schema = params.schema();

        check_alignment(
            "classifier",
            &schema.columns,
            classifier.n_features(),
            classifier.feature_names(),
        )?;
        check_alignment(
            "regressor",
            &schema.columns,
            regressor.n_features(),
            regressor.feature_names(),
        )?;

        Ok(Self {
            params,
            schema,
            classifier,
            regressor,
            strict_schema,
            artifact_checksum: None,
        })
    }

    /// Loads the three artifacts named in `config` and assembles the context.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let params = load_artifact::<PreprocessingParams>(
            &config.params_path,
            config.params_sha256.as_deref(),
        )?;
        tracing::info!(
            "✅ Preprocessing params loaded ({} features, version {})",
            params.value.feature_cols.len(),
            params.value.model_version
        );

        let classifier = load_tree(&config.classifier_path, TreeKind::Classifier)?;
        tracing::info!("✅ Model A loaded (Close Score)");
        let regressor = load_tree(&config.regressor_path, TreeKind::Regressor)?;
        tracing::info!("✅ Model B loaded (ACV Prediction)");

        let mut context = Self::new(
            params.value,
            Box::new(classifier),
            Box::new(regressor),
            config.strict_schema,
        )?;
        context.artifact_checksum = Some(params.checksum);
        Ok(context)
    }

    pub fn params(&self) -> &PreprocessingParams {
        &self.params
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    pub fn strict_schema(&self) -> bool {
        self.strict_schema
    }

    /// SHA-256 of the preprocessing parameters artifact, when loaded from disk.
    pub fn artifact_checksum(&self) -> Option<&str> {
        self.artifact_checksum.as_deref()
    }

    /// Per-request column identity check, only active in strict mode.
    pub fn verify_vector(&self, vector: &FeatureVector) -> Result<(), AppError> {
        if !self.strict_schema {
            return Ok(());
        }

        let columns = &self.schema.columns;
        let declared = [
            (
                "classifier",
                self.classifier.n_features(),
                self.classifier.feature_names(),
            ),
            (
                "regressor",
                self.regressor.n_features(),
                self.regressor.feature_names(),
            ),
        ];

        for (role, n_features, names) in declared {
            if vector.len() != n_features || vector.len() != columns.len() {
                return Err(AppError::InternalComputation(format!(
                    "{} expects {} features, built {} for {} columns",
                    role,
                    n_features,
                    vector.len(),
                    columns.len()
                )));
            }
            if names.is_some_and(|names| names != columns.as_slice()) {
                return Err(AppError::InternalComputation(format!(
                    "{} column order differs from feature_cols",
                    role
                )));
            }
        }
        Ok(())
    }
}

fn load_tree(path: &Path, kind: TreeKind) -> anyhow::Result<DecisionTree> {
    let tree = load_artifact::<DecisionTree>(path, None)?.value;
    if tree.kind != kind {
        anyhow::bail!(
            "{} holds a {:?} but a {:?} was expected",
            path.display(),
            tree.kind,
            kind
        );
    }
    tree.validate()
        .with_context(|| format!("invalid model in {}", path.display()))?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> PreprocessingParams {
        serde_json::from_value(json!({
            "medians": { "People Count": 250.0, "Company Revenue": 25000000.0 },
            "feature_cols": ["MarketingHeadcount", "Marketing_to_Headcount_Ratio"]
        }))
        .unwrap()
    }

    fn tree(kind: &str, names: Option<Vec<&str>>) -> DecisionTree {
        let leaf = if kind == "classifier" {
            json!([1.0, 1.0])
        } else {
            json!([1000.0])
        };
        serde_json::from_value(json!({
            "kind": kind,
            "n_features": 2,
            "feature_names": names,
            "nodes": [{ "value": leaf }]
        }))
        .unwrap()
    }

    #[test]
    fn test_aligned_models_accepted() {
        let names = Some(vec!["MarketingHeadcount", "Marketing_to_Headcount_Ratio"]);
        let ctx = ScoringContext::new(
            params(),
            Box::new(tree("classifier", names.clone())),
            Box::new(tree("regressor", names)),
            true,
        )
        .unwrap();

        let v = FeatureVector::new(vec![4.0, 0.1]).unwrap();
        assert!(ctx.verify_vector(&v).is_ok());
        let short = FeatureVector::new(vec![4.0]).unwrap();
        assert!(ctx.verify_vector(&short).is_err());
    }

    #[test]
    fn test_reordered_model_columns_rejected() {
        let swapped = Some(vec!["Marketing_to_Headcount_Ratio", "MarketingHeadcount"]);
        let result = ScoringContext::new(
            params(),
            Box::new(tree("classifier", swapped)),
            Box::new(tree("regressor", None)),
            true,
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("classifier column 0"));
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let mut p = params();
        p.feature_cols.push("is_B2B".to_string());
        let result = ScoringContext::new(
            p,
            Box::new(tree("classifier", None)),
            Box::new(tree("regressor", None)),
            false,
        );
        assert!(result.is_err());
    }
}
