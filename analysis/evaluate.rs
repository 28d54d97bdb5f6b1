//! # Model Evaluation
//!
//! Scores a fitted model on a held-out test set: per-record probabilities,
//! thresholded classes, the confusion matrix, and its derived statistics.
//!
//! Convention: label 0, the absence of disease, is the statistical positive
//! class throughout, matching the original clinical analysis this pipeline
//! reproduces (its evaluation library took the first factor level as the
//! positive one). Sensitivity is therefore the recognition rate of label-0
//! records, and the reported prevalence is the label-0 fraction. The
//! decision threshold is a parameter; the convention is not.

use crate::data::Dataset;
use crate::model::{FittedModel, ModelError};
use ndarray::{Array1, ArrayView1};
use std::fmt;
use thiserror::Error;

/// Probability cut for classing a record as diseased.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("The evaluation set is empty; classification rates are undefined.")]
    EmptyTestSet,
    #[error("Prediction failed: {0}")]
    Model(#[from] ModelError),
}

/// Per-record model outputs on a test set.
#[derive(Debug, Clone)]
pub struct PredictionSet {
    /// Fitted disease probabilities, one per record.
    pub probabilities: Array1<f64>,
    /// Thresholded classes: 1.0 where the probability exceeds the threshold.
    pub predicted: Array1<f64>,
    /// The threshold the classes were derived under.
    pub threshold: f64,
}

/// Classification counts under the label-0-positive convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Label-0 records predicted 0.
    pub true_positive: usize,
    /// Label-1 records predicted 0.
    pub false_positive: usize,
    /// Label-0 records predicted 1.
    pub false_negative: usize,
    /// Label-1 records predicted 1.
    pub true_negative: usize,
}

/// A scored test set: the raw predictions plus the confusion counts.
#[derive(Debug)]
pub struct Evaluation {
    pub predictions: PredictionSet,
    pub confusion: ConfusionMatrix,
}

impl ConfusionMatrix {
    /// Counts agreements between observed and predicted 0/1 vectors.
    pub fn from_labels(
        actual: ArrayView1<f64>,
        predicted: ArrayView1<f64>,
    ) -> Result<Self, EvalError> {
        assert_eq!(
            actual.len(),
            predicted.len(),
            "observed and predicted lengths must match"
        );
        if actual.is_empty() {
            return Err(EvalError::EmptyTestSet);
        }
        let mut matrix = ConfusionMatrix {
            true_positive: 0,
            false_positive: 0,
            false_negative: 0,
            true_negative: 0,
        };
        for (&a, &p) in actual.iter().zip(predicted.iter()) {
            match (a == 0.0, p == 0.0) {
                (true, true) => matrix.true_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (false, true) => matrix.false_positive += 1,
                (false, false) => matrix.true_negative += 1,
            }
        }
        Ok(matrix)
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }

    /// Fraction of records classed correctly.
    pub fn accuracy(&self) -> f64 {
        (self.true_positive + self.true_negative) as f64 / self.total() as f64
    }

    /// Recognition rate of label-0 records.
    pub fn sensitivity(&self) -> f64 {
        self.true_positive as f64 / (self.true_positive + self.false_negative) as f64
    }

    /// Recognition rate of label-1 records.
    pub fn specificity(&self) -> f64 {
        self.true_negative as f64 / (self.true_negative + self.false_positive) as f64
    }

    /// Fraction of label-0 calls that were right (precision).
    pub fn positive_predictive_value(&self) -> f64 {
        self.true_positive as f64 / (self.true_positive + self.false_positive) as f64
    }

    /// Fraction of label-1 calls that were right.
    pub fn negative_predictive_value(&self) -> f64 {
        self.true_negative as f64 / (self.true_negative + self.false_negative) as f64
    }

    /// Observed label-0 fraction of the test set.
    pub fn prevalence(&self) -> f64 {
        (self.true_positive + self.false_negative) as f64 / self.total() as f64
    }

    /// Correct label-0 calls as a fraction of the whole test set.
    pub fn detection_rate(&self) -> f64 {
        self.true_positive as f64 / self.total() as f64
    }

    /// All label-0 calls as a fraction of the whole test set.
    pub fn detection_prevalence(&self) -> f64 {
        (self.true_positive + self.false_positive) as f64 / self.total() as f64
    }

    /// Mean of sensitivity and specificity.
    pub fn balanced_accuracy(&self) -> f64 {
        (self.sensitivity() + self.specificity()) / 2.0
    }

    /// Cohen's Kappa: observed agreement corrected for the agreement the
    /// marginals would produce by chance.
    pub fn kappa(&self) -> f64 {
        let total = self.total() as f64;
        let observed = self.accuracy();
        let actual_zero = (self.true_positive + self.false_negative) as f64;
        let actual_one = (self.false_positive + self.true_negative) as f64;
        let called_zero = (self.true_positive + self.false_positive) as f64;
        let called_one = (self.false_negative + self.true_negative) as f64;
        let expected = (actual_zero * called_zero + actual_one * called_one) / (total * total);
        (observed - expected) / (1.0 - expected)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            observed 0   observed 1")?;
        writeln!(
            f,
            "predicted 0 {:>10} {:>12}",
            self.true_positive, self.false_positive
        )?;
        write!(
            f,
            "predicted 1 {:>10} {:>12}",
            self.false_negative, self.true_negative
        )
    }
}

/// Scores `model` on `test`, thresholding probabilities at `threshold`.
///
/// Rates with an empty denominator (a test set missing one class entirely)
/// come back as NaN rather than an error; only the empty test set is one.
pub fn evaluate_model(
    model: &FittedModel,
    test: &Dataset,
    threshold: f64,
) -> Result<Evaluation, EvalError> {
    if test.n_records() == 0 {
        return Err(EvalError::EmptyTestSet);
    }
    let probabilities = model.predict(test.features())?;
    let predicted = probabilities.mapv(|p| if p > threshold { 1.0 } else { 0.0 });
    let confusion = ConfusionMatrix::from_labels(test.labels(), predicted.view())?;
    log::info!(
        "evaluated {} records: accuracy {:.4}, kappa {:.4}",
        confusion.total(),
        confusion.accuracy(),
        confusion.kappa()
    );
    Ok(Evaluation {
        predictions: PredictionSet {
            probabilities,
            predicted,
            threshold,
        },
        confusion,
    })
}
