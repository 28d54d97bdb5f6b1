//! # Iteratively Reweighted Least Squares
//!
//! Unpenalized logistic regression fitted by Newton-Raphson on the binomial
//! log-likelihood. Each iteration forms the working response and weights at
//! the current linear predictor and solves the weighted normal equations
//! `(X'WX) b = X'Wz`; convergence is declared once the coefficient vector
//! stops moving. The iteration cap doubles as the guard against perfectly
//! separable data, where the MLE does not exist and the coefficients grow
//! without bound.
//!
//! At convergence the inverse of `X'WX` (the observed Fisher information)
//! supplies the coefficient covariance, from which standard errors,
//! z-statistics and two-sided p-values are derived, along with the null and
//! residual deviances and the AIC.

use crate::model::{Coefficient, FitConfig, FitDiagnostics, FittedModel};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::{Cholesky, Solve, UPLO};
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

const MIN_WEIGHT: f64 = 1e-6;
const PROB_EPS: f64 = 1e-8; // Epsilon for clamping probabilities

/// Errors raised while fitting the logistic model.
#[derive(Error, Debug)]
pub enum FitError {
    #[error(
        "The IRLS loop did not converge within {max_iterations} iterations (last max coefficient change {last_change:.3e}). Perfectly or quasi-perfectly separable data is the usual cause."
    )]
    NonConvergence {
        max_iterations: usize,
        last_change: f64,
    },
    #[error(
        "The weighted design matrix is singular: attributes are perfectly collinear, constant, or outnumber the records. {details}"
    )]
    SingularDesign { details: String },
}

/// Fits an intercept-plus-slopes logistic model by IRLS.
///
/// `terms` names the feature columns, one per column of `features`; the
/// intercept is added internally and reported as `(intercept)`. The fit is a
/// pure function of its arguments: identical inputs reproduce identical
/// coefficients.
pub fn fit_logistic(
    features: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    terms: &[&str],
    config: &FitConfig,
) -> Result<FittedModel, FitError> {
    assert_eq!(
        features.nrows(),
        labels.len(),
        "features and labels must agree on record count"
    );
    assert_eq!(
        terms.len(),
        features.ncols(),
        "one term name per feature column"
    );

    let n = features.nrows();
    let p = features.ncols() + 1;

    // Design matrix with a leading intercept column.
    let mut x = Array2::ones((n, p));
    x.slice_mut(s![.., 1..]).assign(&features);

    let mut beta: Array1<f64> = Array1::zeros(p);
    let mut eta: Array1<f64> = Array1::zeros(n);
    let mut last_change = f64::INFINITY;
    let mut converged_after = None;

    for iter in 1..=config.max_iterations {
        let (_, weights, z) = working_response(labels, &eta);
        let xw = &x * &weights.view().insert_axis(Axis(1));
        let xtwx = x.t().dot(&xw);
        let xtwz = xw.t().dot(&z);

        // Positive-definiteness gate: rank-deficient designs fail here.
        let factor = xtwx
            .cholesky(UPLO::Lower)
            .map_err(|e| FitError::SingularDesign {
                details: format!("Cholesky factorization failed: {e}"),
            })?;
        check_full_rank(&factor)?;
        let beta_new = xtwx
            .solve_into(xtwz)
            .map_err(|e| FitError::SingularDesign {
                details: format!("Linear solve failed: {e}"),
            })?;

        if !beta_new.iter().all(|b| b.is_finite()) {
            log::error!("non-finite coefficients at iteration {iter}");
            return Err(FitError::NonConvergence {
                max_iterations: config.max_iterations,
                last_change: f64::INFINITY,
            });
        }

        last_change = (&beta_new - &beta)
            .iter()
            .fold(0.0_f64, |acc, &d| acc.max(d.abs()));
        beta = beta_new;
        eta = x.dot(&beta);
        log::debug!("iteration {iter}: max coefficient change {last_change:.3e}");

        if last_change < config.tolerance {
            converged_after = Some(iter);
            break;
        }
    }

    let Some(iterations) = converged_after else {
        return Err(FitError::NonConvergence {
            max_iterations: config.max_iterations,
            last_change,
        });
    };

    // Final weighted quantities at the converged coefficients.
    let (mu, weights, _) = working_response(labels, &eta);
    if mu.iter().any(|&m| m <= PROB_EPS || m >= 1.0 - PROB_EPS) {
        log::warn!("fitted probabilities numerically 0 or 1 occurred; estimates may sit on a boundary");
    }

    let xw = &x * &weights.view().insert_axis(Axis(1));
    let xtwx = x.t().dot(&xw);
    let factor = xtwx
        .cholesky(UPLO::Lower)
        .map_err(|e| FitError::SingularDesign {
            details: format!("Cholesky factorization failed: {e}"),
        })?;
    check_full_rank(&factor)?;
    let covariance = invert_information(&xtwx)?;

    let residual_deviance = binomial_deviance(labels, &mu);
    let null_mu = Array1::from_elem(n, labels.sum() / n as f64);
    let null_deviance = binomial_deviance(labels, &null_mu);
    let aic = residual_deviance + 2.0 * p as f64;

    log::info!(
        "logistic fit converged after {iterations} iterations: residual deviance {residual_deviance:.4}, AIC {aic:.4}"
    );

    let normal = Normal::new(0.0, 1.0).expect("standard normal parameters are valid");
    let mut coefficients = Vec::with_capacity(p);
    for j in 0..p {
        let term = if j == 0 {
            "(intercept)".to_string()
        } else {
            terms[j - 1].to_string()
        };
        let estimate = beta[j];
        let std_error = covariance[[j, j]].sqrt();
        let z_value = estimate / std_error;
        let p_value = 2.0 * (1.0 - normal.cdf(z_value.abs()));
        coefficients.push(Coefficient {
            term,
            estimate,
            std_error,
            z_value,
            p_value,
        });
    }

    Ok(FittedModel {
        config: *config,
        coefficients,
        diagnostics: FitDiagnostics {
            n_samples: n,
            null_deviance,
            df_null: n - 1,
            residual_deviance,
            df_residual: n - p,
            aic,
            iterations,
        },
    })
}

/// Working response for the logit link: returns `(mu, weights, z)` at the
/// given linear predictor.
fn working_response(
    y: ArrayView1<f64>,
    eta: &Array1<f64>,
) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    // Clamp eta to prevent overflow in exp.
    let eta_clamped = eta.mapv(|e| e.clamp(-700.0, 700.0));
    // Clamp mu away from exactly 0 and 1, which is crucial for the
    // stability of the weights and deviance calculations.
    let mut mu = eta_clamped.mapv(|e| 1.0 / (1.0 + (-e).exp()));
    mu.mapv_inplace(|v| v.clamp(PROB_EPS, 1.0 - PROB_EPS));
    let weights = (&mu * (1.0 - &mu)).mapv(|v| v.max(MIN_WEIGHT));
    let residual = &y - &mu;
    let z = &eta_clamped + &(&residual / &weights);
    (mu, weights, z)
}

/// Binomial deviance, `-2` times the log-likelihood of `mu` against `y`.
fn binomial_deviance(y: ArrayView1<f64>, mu: &Array1<f64>) -> f64 {
    const EPS: f64 = 1e-8;
    let total_residual = ndarray::Zip::from(y).and(mu).fold(0.0, |acc, &yi, &mui| {
        let mui_c = mui.clamp(EPS, 1.0 - EPS);
        let term1 = if yi > EPS {
            yi * (yi.ln() - mui_c.ln())
        } else {
            0.0
        };
        let term2 = if yi < 1.0 - EPS {
            (1.0 - yi) * ((1.0 - yi).ln() - (1.0 - mui_c).ln())
        } else {
            0.0
        };
        acc + term1 + term2
    });
    2.0 * total_residual
}

/// Relative floor on Cholesky pivots. Exactly rank-deficient designs can
/// still factor under rounding noise, with a collapsed trailing pivot; this
/// catches them the way R's rank-revealing QR tolerance does.
const MIN_PIVOT_RATIO: f64 = 1e-6;

fn check_full_rank(factor: &Array2<f64>) -> Result<(), FitError> {
    let diag = factor.diag();
    let largest = diag.fold(0.0_f64, |acc, &d| acc.max(d));
    let smallest = diag.fold(f64::INFINITY, |acc, &d| acc.min(d));
    if !(smallest > largest * MIN_PIVOT_RATIO) {
        return Err(FitError::SingularDesign {
            details: format!(
                "Cholesky pivot ratio {:.3e} signals rank deficiency.",
                smallest / largest
            ),
        });
    }
    Ok(())
}

/// Inverts the Fisher information by solving against each unit vector.
fn invert_information(information: &Array2<f64>) -> Result<Array2<f64>, FitError> {
    let p = information.nrows();
    let mut inverse = Array2::zeros((p, p));
    for j in 0..p {
        let mut unit = Array1::zeros(p);
        unit[j] = 1.0;
        let column = information
            .solve_into(unit)
            .map_err(|e| FitError::SingularDesign {
                details: format!("Linear solve failed: {e}"),
            })?;
        inverse.column_mut(j).assign(&column);
    }
    Ok(inverse)
}
