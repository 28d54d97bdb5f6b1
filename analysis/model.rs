//! # The Fitted Model Artifact
//!
//! The immutable result of a logistic fit: per-term estimates with their
//! Wald statistics, the goodness-of-fit diagnostics, and the configuration
//! the fit ran under. The artifact serializes to human-readable TOML so a
//! trained model can be saved once and evaluated later without refitting.

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use thiserror::Error;

/// Explicit controls for the IRLS loop, persisted with the model so a saved
/// artifact records how it was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FitConfig {
    /// Iteration cap. Reaching it without converging is an error, which is
    /// what surfaces perfectly separable data.
    pub max_iterations: usize,
    /// Convergence threshold on the max-abs coefficient change.
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            max_iterations: 25,
            tolerance: 1e-8,
        }
    }
}

/// One model term with its estimate and Wald statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coefficient {
    /// `(intercept)` or an attribute name.
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z_value: f64,
    /// Two-sided p-value against the standard normal.
    pub p_value: f64,
}

/// Goodness-of-fit numbers reported alongside the coefficients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub n_samples: usize,
    pub null_deviance: f64,
    pub df_null: usize,
    pub residual_deviance: f64,
    pub df_residual: usize,
    pub aic: f64,
    pub iterations: usize,
}

/// A fitted logistic model. The first coefficient is always the intercept;
/// the rest follow the attribute order of the design the model was fitted
/// on.
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedModel {
    pub config: FitConfig,
    pub coefficients: Vec<Coefficient>,
    pub diagnostics: FitDiagnostics,
}

/// Custom error type for model loading, saving, and prediction.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error(
        "Prediction data has {found} attribute columns, but the model was fitted on {expected}."
    )]
    MismatchedColumnCount { found: usize, expected: usize },
    #[error("The model holds no coefficients; the file is malformed or from an incompatible version.")]
    EmptyModel,
}

impl FittedModel {
    /// Predicts the disease probability for each record.
    ///
    /// A fast, non-iterative pass: linear predictor, then the inverse logit
    /// with the same clamps the fitting loop applies, so outputs always lie
    /// strictly inside (0, 1).
    pub fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let Some((intercept, slopes)) = self.coefficients.split_first() else {
            return Err(ModelError::EmptyModel);
        };
        if features.ncols() != slopes.len() {
            return Err(ModelError::MismatchedColumnCount {
                found: features.ncols(),
                expected: slopes.len(),
            });
        }

        let slope_values = Array1::from_iter(slopes.iter().map(|c| c.estimate));
        let eta = features.dot(&slope_values) + intercept.estimate;
        // Clamp eta to prevent numerical overflow in exp().
        let eta_clamped = eta.mapv(|e| e.clamp(-700.0, 700.0));
        let mut probs = eta_clamped.mapv(|e| 1.0 / (1.0 + f64::exp(-e)));
        probs.mapv_inplace(|p| p.clamp(1e-8, 1.0 - 1e-8));
        Ok(probs)
    }

    /// Renders the coefficient table and fit diagnostics the way a GLM
    /// summary conventionally prints.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("Coefficients:\n");
        out.push_str(&format!(
            "{:<14} {:>10} {:>11} {:>8} {:>10}\n",
            "", "Estimate", "Std. Error", "z value", "Pr(>|z|)"
        ));
        for coefficient in &self.coefficients {
            out.push_str(&format!(
                "{:<14} {:>10.5} {:>11.5} {:>8.3} {:>10} {}\n",
                coefficient.term,
                coefficient.estimate,
                coefficient.std_error,
                coefficient.z_value,
                format_p_value(coefficient.p_value),
                significance_code(coefficient.p_value),
            ));
        }
        out.push_str("---\n");
        out.push_str("Signif. codes:  0 '***' 0.001 '**' 0.01 '*' 0.05 '.' 0.1 ' ' 1\n\n");

        let d = &self.diagnostics;
        out.push_str(&format!(
            "    Null deviance: {:.2}  on {} degrees of freedom\n",
            d.null_deviance, d.df_null
        ));
        out.push_str(&format!(
            "Residual deviance: {:.2}  on {} degrees of freedom\n",
            d.residual_deviance, d.df_residual
        ));
        out.push_str(&format!("AIC: {:.2}\n\n", d.aic));
        out.push_str(&format!("Number of IRLS iterations: {}\n", d.iterations));
        out
    }

    /// Saves the fitted model to a file in a human-readable TOML format.
    pub fn save(&self, path: &str) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads a fitted model from a TOML file.
    pub fn load(path: &str) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        let model = toml::from_str(&toml_string)?;
        Ok(model)
    }
}

fn format_p_value(p: f64) -> String {
    if p < 1e-4 {
        format!("{:.2e}", p)
    } else {
        format!("{:.4}", p)
    }
}

fn significance_code(p: f64) -> &'static str {
    if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else if p < 0.1 {
        "."
    } else {
        ""
    }
}
