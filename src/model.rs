//! Model seams and the decision-tree implementation loaded from disk.
//!
//! The scorer only sees the [`Classifier`] and [`Regressor`] traits; any model that
//! accepts the agreed feature vector can be plugged in behind them.
use crate::errors::AppError;
use serde::{Deserialize, Serialize};

/// Binary classifier: probability of the positive class.
pub trait Classifier: Send + Sync {
    /// Probability that the record belongs to class 1.
    fn predict_proba(&self, features: &[f64]) -> Result<f64, AppError>;

    /// Number of inputs the model was trained on.
    fn n_features(&self) -> usize;

    /// Column names the model was trained on, when recorded.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

/// Scalar regressor.
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, AppError>;

    fn n_features(&self) -> usize;

    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

/// Node of a binary decision tree.
///
/// Splits send `x[feature] <= threshold` to `left`, everything else to `right`. The
/// feature is rounded to `f32` before the comparison, as the training library stores
/// inputs in single precision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class weights for classifiers, a single value for regressors.
        value: Vec<f64>,
    },
}

/// What a tree's leaves hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    Classifier,
    Regressor,
}

/// A fitted decision tree, as exported by the training job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    pub kind: TreeKind,
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Structural checks run once at load time.
    ///
    /// Children always come after their parent, so a walk terminates in at most
    /// `nodes.len()` steps.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("tree has no nodes");
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                anyhow::bail!(
                    "tree declares {} features but lists {} feature names",
                    self.n_features,
                    names.len()
                );
            }
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= self.n_features {
                        anyhow::bail!("node {} splits on unknown feature {}", idx, feature);
                    }
                    if threshold.is_nan() {
                        anyhow::bail!("node {} has a NaN threshold", idx);
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            anyhow::bail!("node {} has invalid child {}", idx, child);
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    let expected = match self.kind {
                        TreeKind::Classifier => 2,
                        TreeKind::Regressor => 1,
                    };
                    if value.len() != expected {
                        anyhow::bail!(
                            "leaf {} holds {} values, expected {}",
                            idx,
                            value.len(),
                            expected
                        );
                    }
                    if value.iter().any(|v| !v.is_finite()) {
                        anyhow::bail!("leaf {} holds a non-finite value", idx);
                    }
                    if self.kind == TreeKind::Classifier
                        && (value.iter().any(|v| *v < 0.0) || value.iter().sum::<f64>() <= 0.0)
                    {
                        anyhow::bail!("leaf {} has invalid class weights", idx);
                    }
                }
            }
        }
        Ok(())
    }

    /// Walks the tree and returns the leaf values for `features`.
    fn leaf(&self, features: &[f64]) -> Result<&[f64], AppError> {
        if features.len() != self.n_features {
            return Err(AppError::InternalComputation(format!(
                "model expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        AppError::InternalComputation(format!("feature {} out of range", feature))
                    })?;
                    let x = f64::from(x as f32);
                    idx = if x <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return Ok(value),
                None => {
                    return Err(AppError::InternalComputation(format!(
                        "node {} out of range",
                        idx
                    )))
                }
            }
        }

        Err(AppError::InternalComputation(
            "tree walk did not reach a leaf".to_string(),
        ))
    }

    fn expect_kind(&self, kind: TreeKind) -> Result<(), AppError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(AppError::InternalComputation(format!(
                "tree is a {:?}, used as a {:?}",
                self.kind, kind
            )))
        }
    }
}

impl Classifier for DecisionTree {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, AppError> {
        self.expect_kind(TreeKind::Classifier)?;
        let weights = self.leaf(features)?;
        let total: f64 = weights.iter().sum();
        match weights {
            [_, positive] if total > 0.0 => Ok(positive / total),
            _ => Err(AppError::InternalComputation(
                "classifier leaf has invalid class weights".to_string(),
            )),
        }
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}

impl Regressor for DecisionTree {
    fn predict(&self, features: &[f64]) -> Result<f64, AppError> {
        self.expect_kind(TreeKind::Regressor)?;
        match self.leaf(features)? {
            [value] => Ok(*value),
            _ => Err(AppError::InternalComputation(
                "regressor leaf must hold one value".to_string(),
            )),
        }
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}
