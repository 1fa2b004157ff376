use crate::errors::{AppError, ResultExt};
use crate::features::FeatureVector;
use crate::model::{Classifier, Regressor};
use serde::{Deserialize, Serialize};

/// Priority band derived from the close score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "Low Priority")]
    LowPriority,
    #[serde(rename = "Medium Target")]
    MediumTarget,
    #[serde(rename = "Good Target")]
    GoodTarget,
    #[serde(rename = "Ideal Target")]
    IdealTarget,
}

impl Segment {
    /// Lower bound of each band, highest first.
    pub const THRESHOLDS: [(f64, Segment); 3] = [
        (0.70, Segment::IdealTarget),
        (0.50, Segment::GoodTarget),
        (0.30, Segment::MediumTarget),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::IdealTarget => "Ideal Target",
            Segment::GoodTarget => "Good Target",
            Segment::MediumTarget => "Medium Target",
            Segment::LowPriority => "Low Priority",
        }
    }
}

/// Maps a close score to its band. Lower bounds are inclusive; anything below 0.30,
/// NaN included, is `LowPriority`.
pub fn assign_segment(score: f64) -> Segment {
    Segment::THRESHOLDS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, segment)| *segment)
        .unwrap_or(Segment::LowPriority)
}

/// Model outputs and derived metrics for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub close_score: f64,
    pub predicted_acv: f64,
    pub expected_value: f64,
    pub segment: Segment,
}

/// Runs both models on `vector` and derives expected value and segment.
pub fn score(
    classifier: &dyn Classifier,
    regressor: &dyn Regressor,
    vector: &FeatureVector,
) -> Result<Score, AppError> {
    if vector.is_empty() {
        return Err(AppError::InternalComputation(
            "cannot score an empty feature vector".to_string(),
        ));
    }

    let close_score = classifier
        .predict_proba(vector.as_slice())
        .with_context(|| format!("classifier inference on {} features", vector.len()))?;
    if !(0.0..=1.0).contains(&close_score) {
        return Err(AppError::InternalComputation(format!(
            "classifier returned {} outside [0, 1]",
            close_score
        )));
    }

    let raw_acv = regressor
        .predict(vector.as_slice())
        .context("regressor inference")?;
    if !raw_acv.is_finite() {
        return Err(AppError::InternalComputation(format!(
            "regressor returned non-finite value {}",
            raw_acv
        )));
    }
    // Contract values cannot be negative
    let predicted_acv = raw_acv.max(0.0);

    Ok(Score {
        close_score,
        predicted_acv,
        expected_value: close_score * predicted_acv,
        segment: assign_segment(close_score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    impl Classifier for Fixed {
        fn predict_proba(&self, _: &[f64]) -> Result<f64, AppError> {
            Ok(self.0)
        }
        fn n_features(&self) -> usize {
            0
        }
    }

    impl Regressor for Fixed {
        fn predict(&self, _: &[f64]) -> Result<f64, AppError> {
            Ok(self.0)
        }
        fn n_features(&self) -> usize {
            0
        }
    }

    fn vector() -> FeatureVector {
        FeatureVector::new(vec![0.1]).unwrap()
    }

    #[test]
    fn test_segment_boundaries() {
        assert_eq!(assign_segment(1.0), Segment::IdealTarget);
        assert_eq!(assign_segment(0.70), Segment::IdealTarget);
        assert_eq!(assign_segment(0.6999), Segment::GoodTarget);
        assert_eq!(assign_segment(0.50), Segment::GoodTarget);
        assert_eq!(assign_segment(0.4999), Segment::MediumTarget);
        assert_eq!(assign_segment(0.30), Segment::MediumTarget);
        assert_eq!(assign_segment(0.2999), Segment::LowPriority);
        assert_eq!(assign_segment(0.0), Segment::LowPriority);
        assert_eq!(assign_segment(f64::NAN), Segment::LowPriority);
    }

    #[test]
    fn test_negative_acv_clamped() {
        let s = score(&Fixed(0.8), &Fixed(-1500.0), &vector()).unwrap();
        assert_eq!(s.predicted_acv, 0.0);
        assert_eq!(s.expected_value, 0.0);
        assert_eq!(s.segment, Segment::IdealTarget);
    }

    #[test]
    fn test_expected_value_is_product() {
        let s = score(&Fixed(0.5), &Fixed(20000.0), &vector()).unwrap();
        assert_eq!(s.expected_value, 10000.0);
        assert_eq!(s.segment, Segment::GoodTarget);
    }

    #[test]
    fn test_out_of_range_probability_is_internal() {
        let err = score(&Fixed(1.5), &Fixed(1.0), &vector()).unwrap_err();
        assert!(matches!(err, AppError::InternalComputation(_)));
    }

    #[test]
    fn test_empty_vector_is_internal() {
        let empty = FeatureVector::new(vec![]).unwrap();
        let err = score(&Fixed(0.5), &Fixed(1.0), &empty).unwrap_err();
        assert!(matches!(err, AppError::InternalComputation(_)));
    }

    #[test]
    fn test_model_failure_carries_context() {
        struct Broken;
        impl Classifier for Broken {
            fn predict_proba(&self, _: &[f64]) -> Result<f64, AppError> {
                Err(AppError::InternalComputation("tree walk failed".to_string()))
            }
            fn n_features(&self) -> usize {
                1
            }
        }

        let err = score(&Broken, &Fixed(1.0), &vector()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "classifier inference on 1 features: Internal error: tree walk failed"
        );
        assert!(matches!(err.root(), AppError::InternalComputation(_)));
    }

    #[test]
    fn test_segment_serializes_as_label() {
        let json = serde_json::to_string(&Segment::MediumTarget).unwrap();
        assert_eq!(json, "\"Medium Target\"");
    }
}
