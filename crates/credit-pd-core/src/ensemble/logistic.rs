//! L2-regularised logistic regression fitted by Newton's method (IRLS).
//!
//! Minimises
//!
//! ```text
//! Σ w_i · [log(1 + e^{η_i}) − y_i η_i] + ‖β‖² / (2C)
//! ```
//!
//! with `η = b + xᵀβ`. The intercept `b` is not penalised. Each Newton step
//! solves the Hessian system by Cholesky, falling back to an SVD solve when the
//! Hessian is numerically singular, and is halved until the objective
//! decreases.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::ProbabilisticClassifier;
use crate::config::LogisticParams;
use crate::error::CreditPdError;
use crate::CreditPdResult;

const MAX_STEP_HALVINGS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub iterations: u32,
    pub converged: bool,
}

impl LogisticRegression {
    pub fn fit<R: AsRef<[f64]>>(
        x: &[R],
        y: &[u8],
        params: &LogisticParams,
    ) -> CreditPdResult<Self> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(CreditPdError::InvalidInput {
                field: "logistic.x".into(),
                reason: format!("{} rows for {} labels", n, y.len()),
            });
        }
        if params.c <= 0.0 {
            return Err(CreditPdError::InvalidInput {
                field: "logistic.c".into(),
                reason: "C must be positive.".into(),
            });
        }
        let positives = y.iter().filter(|v| **v == 1).count();
        if positives == 0 || positives == n {
            return Err(CreditPdError::InsufficientData(
                "logistic regression needs both classes in its training rows".into(),
            ));
        }

        let p = x[0].as_ref().len();
        let dim = p + 1;
        let design = DMatrix::from_fn(n, dim, |i, j| {
            if j == 0 {
                1.0
            } else {
                x[i].as_ref().get(j - 1).copied().unwrap_or(0.0)
            }
        });
        let target = DVector::from_iterator(n, y.iter().map(|v| f64::from(*v)));
        let weights = sample_weights(y, positives, params.class_balanced);
        let lambda = 1.0 / params.c;

        let mut beta = DVector::<f64>::zeros(dim);
        let mut objective = penalised_loss(&design, &target, &weights, &beta, lambda);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < params.max_iter {
            iterations += 1;
            let eta = &design * &beta;
            let prob = eta.map(sigmoid);

            let residual = DVector::from_fn(n, |i, _| weights[i] * (prob[i] - target[i]));
            let mut gradient = design.transpose() * residual;
            let curvature = DVector::from_fn(n, |i, _| weights[i] * prob[i] * (1.0 - prob[i]));
            let mut scaled = design.clone();
            for (i, mut row) in scaled.row_iter_mut().enumerate() {
                row *= curvature[i];
            }
            let mut hessian = design.transpose() * scaled;
            for j in 1..dim {
                gradient[j] += lambda * beta[j];
                hessian[(j, j)] += lambda;
            }

            let step = solve(hessian, &gradient).ok_or_else(|| CreditPdError::NumericalFailure {
                context: "logistic regression".into(),
                reason: format!("singular Hessian at iteration {iterations}"),
            })?;

            let mut t = 1.0;
            let mut candidate = &beta - &step * t;
            let mut candidate_obj = penalised_loss(&design, &target, &weights, &candidate, lambda);
            let mut halvings = 0;
            while candidate_obj > objective && halvings < MAX_STEP_HALVINGS {
                t *= 0.5;
                candidate = &beta - &step * t;
                candidate_obj = penalised_loss(&design, &target, &weights, &candidate, lambda);
                halvings += 1;
            }

            let max_change = (&step * t).amax();
            beta = candidate;
            objective = candidate_obj;
            if max_change < params.tolerance {
                converged = true;
                break;
            }
        }

        if !beta.iter().all(|v| v.is_finite()) {
            return Err(CreditPdError::NumericalFailure {
                context: "logistic regression".into(),
                reason: "non-finite coefficients".into(),
            });
        }
        if !converged {
            tracing::debug!(iterations, "logistic regression stopped at max_iter");
        }

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
            iterations,
            converged,
        })
    }

    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(b, v)| b * v)
                .sum::<f64>()
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.decision_function(x))
    }
}

/// `n / (2 · n_class)` per row when balanced, else 1.
fn sample_weights(y: &[u8], positives: usize, balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; y.len()];
    }
    let n = y.len() as f64;
    let w_pos = n / (2.0 * positives as f64);
    let w_neg = n / (2.0 * (y.len() - positives) as f64);
    y.iter()
        .map(|v| if *v == 1 { w_pos } else { w_neg })
        .collect()
}

fn penalised_loss(
    design: &DMatrix<f64>,
    target: &DVector<f64>,
    weights: &[f64],
    beta: &DVector<f64>,
    lambda: f64,
) -> f64 {
    let eta = design * beta;
    let data: f64 = eta
        .iter()
        .zip(target.iter())
        .zip(weights)
        .map(|((e, t), w)| w * (softplus(*e) - t * e))
        .sum();
    let penalty: f64 = beta.iter().skip(1).map(|b| b * b).sum();
    data + 0.5 * lambda * penalty
}

fn solve(hessian: DMatrix<f64>, gradient: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = hessian.clone().cholesky() {
        let step = chol.solve(gradient);
        if step.iter().all(|v| v.is_finite()) {
            return Some(step);
        }
    }
    let svd = hessian.svd(true, true);
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(step) = svd.solve(gradient, tol) {
            if step.iter().all(|v| v.is_finite()) {
                return Some(step);
            }
        }
    }
    None
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}
