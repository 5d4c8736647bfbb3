//! Relevance vector machine
//!
//! Sparse Bayesian learning over one kernel basis function per training
//! example (optionally a subset) plus an optional constant basis. Each basis
//! weight has its own Gaussian prior precision α_k; re-estimating the
//! precisions drives most of them to infinity, and those bases are pruned.
//!
//! Regression (Gaussian noise with precision β):
//!
//! ```text
//! Σ = (A + β ΦᵀΦ)⁻¹      μ = β Σ Φᵀ t
//! γ_k = 1 − α_k Σ_kk     α_k ← γ_k / μ_k²     β ← (N − Σγ) / ‖t − Φμ‖²
//! ```
//!
//! Classification uses the Laplace approximation: the posterior mode is found
//! by iteratively reweighted least squares and Σ is the inverse Hessian there.

use crate::config::RelevanceConfig;
use crate::core::{
    softplus, CancellationToken, Convergence, KernelError, Result, SupportVector, Target,
};
use crate::data::TrainingExamples;
use crate::kernel::KernelFunction;
use crate::model::{KernelModel, TrainingOutcome};
use crate::solver::Trainer;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

/// Newton iterations spent on the posterior mode per outer iteration
const MAX_IRLS_STEPS: usize = 25;
const IRLS_TOLERANCE: f64 = 1e-8;

/// Sparse Bayesian kernel learner
pub struct RelevanceVectorSolver {
    kernel: KernelFunction,
    config: RelevanceConfig,
}

/// Example index behind a basis column, `None` for the constant basis
type Basis = Option<usize>;

impl RelevanceVectorSolver {
    pub fn new(kernel: KernelFunction, config: RelevanceConfig) -> Self {
        Self { kernel, config }
    }

    /// Example-anchored bases: every example, or an evenly spaced subset
    fn basis_examples(&self, n: usize) -> Vec<usize> {
        match self.config.max_basis {
            Some(cap) if cap < n => (0..cap).map(|k| k * n / cap).collect(),
            _ => (0..n).collect(),
        }
    }

    /// N × M design matrix, one column per basis
    fn design_matrix(&self, examples: &TrainingExamples, bases: &[Basis]) -> DMatrix<f64> {
        DMatrix::from_fn(examples.len(), bases.len(), |r, c| match bases[c] {
            Some(e) => self.kernel.evaluate(examples.row(r), examples.row(e)),
            None => 1.0,
        })
    }

    fn fit(
        &self,
        examples: &TrainingExamples,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Basis>, DVector<f64>, Convergence)> {
        let n = examples.len();
        let mut bases: Vec<Basis> = self.basis_examples(n).into_iter().map(Some).collect();
        if self.config.use_bias {
            bases.push(None);
        }
        let full = self.design_matrix(examples, &bases);
        let targets = DVector::from_column_slice(examples.targets());
        let classification = examples.is_classification();

        let initial = self
            .config
            .initial_alpha
            .unwrap_or(1.0 / (n as f64 * n as f64));
        let mut alpha = vec![initial; bases.len()];
        let mut active: Vec<usize> = (0..bases.len()).collect();
        let mut beta = initial_noise_precision(examples.targets());
        let mut mode = DVector::zeros(active.len());

        let mut iterations = 0;
        let mut max_delta = f64::INFINITY;
        let convergence = loop {
            cancel.check()?;
            if active.is_empty() {
                break Convergence::Converged { iterations };
            }
            if iterations >= self.config.max_iterations {
                break Convergence::DidNotFullyConverge {
                    iterations,
                    residual: max_delta,
                };
            }

            let phi = columns(&full, &active);
            let alpha_active: Vec<f64> = active.iter().map(|&k| alpha[k]).collect();
            let (sigma, mu) = if classification {
                laplace_posterior(&phi, &alpha_active, &targets, &mode)?
            } else {
                regression_posterior(&phi, &alpha_active, beta, &targets)?
            };

            // Re-estimate precisions and prune the bases that switch off.
            let mut gamma_sum = 0.0;
            max_delta = 0.0;
            let mut survivors = Vec::with_capacity(active.len());
            let mut kept_mode = Vec::with_capacity(active.len());
            for (pos, &k) in active.iter().enumerate() {
                let gamma = 1.0 - alpha[k] * sigma[(pos, pos)];
                gamma_sum += gamma;
                let mu2 = mu[pos] * mu[pos];
                let updated = if gamma > 0.0 && mu2 > 0.0 {
                    gamma / mu2
                } else {
                    f64::INFINITY
                };
                if updated > self.config.alpha_max {
                    continue;
                }
                max_delta = max_delta.max((updated.ln() - alpha[k].ln()).abs());
                alpha[k] = updated;
                survivors.push(k);
                kept_mode.push(mu[pos]);
            }
            let pruned = active.len() - survivors.len();

            if !classification {
                let residual = (&targets - &phi * &mu).norm_squared();
                let dof = (n as f64 - gamma_sum).max(f64::EPSILON);
                beta = dof / residual.max(f64::MIN_POSITIVE);
                if !beta.is_finite() {
                    return Err(KernelError::ill_conditioned(
                        "noise precision of the relevance vector model is not finite",
                    ));
                }
            }

            active = survivors;
            mode = DVector::from_vec(kept_mode);
            iterations += 1;
            debug!(
                "RVM iteration {}: {} bases ({} pruned), max |Δ log α| {:.3e}",
                iterations,
                active.len(),
                pruned,
                max_delta
            );

            if pruned == 0 && max_delta < self.config.min_delta_log_alpha {
                break Convergence::Converged { iterations };
            }
        };

        // Weights at the final precisions
        let weights = if active.is_empty() {
            DVector::zeros(0)
        } else {
            let phi = columns(&full, &active);
            let alpha_active: Vec<f64> = active.iter().map(|&k| alpha[k]).collect();
            if classification {
                laplace_posterior(&phi, &alpha_active, &targets, &mode)?.1
            } else {
                regression_posterior(&phi, &alpha_active, beta, &targets)?.1
            }
        };
        let kept = active.iter().map(|&k| bases[k]).collect();
        Ok((kept, weights, convergence))
    }
}

fn initial_noise_precision(targets: &[f64]) -> f64 {
    let n = targets.len() as f64;
    let mean = targets.iter().sum::<f64>() / n;
    let variance = targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
    1.0 / (0.1 * variance).max(1e-6)
}

fn columns(full: &DMatrix<f64>, active: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(full.nrows(), active.len(), |r, c| full[(r, active[c])])
}

/// Gaussian posterior over the weights of the active bases
fn regression_posterior(
    phi: &DMatrix<f64>,
    alpha: &[f64],
    beta: f64,
    targets: &DVector<f64>,
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let mut hessian = phi.transpose() * phi * beta;
    for (k, a) in alpha.iter().enumerate() {
        hessian[(k, k)] += a;
    }
    let sigma = hessian
        .cholesky()
        .ok_or_else(|| {
            KernelError::ill_conditioned("relevance vector posterior precision is not positive definite")
        })?
        .inverse();
    let mu = &sigma * (phi.transpose() * targets) * beta;
    if mu.iter().any(|v| !v.is_finite()) {
        return Err(KernelError::ill_conditioned(
            "relevance vector posterior mean is not finite",
        ));
    }
    Ok((sigma, mu))
}

/// Laplace approximation for ±1 labels with a logistic likelihood
fn laplace_posterior(
    phi: &DMatrix<f64>,
    alpha: &[f64],
    labels: &DVector<f64>,
    start: &DVector<f64>,
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let m = phi.ncols();
    let t01 = labels.map(|y| if y > 0.0 { 1.0 } else { 0.0 });
    let mut w = if start.len() == m {
        start.clone()
    } else {
        DVector::zeros(m)
    };

    let log_posterior = |w: &DVector<f64>| -> f64 {
        let a = phi * w;
        let likelihood: f64 = a
            .iter()
            .zip(t01.iter())
            .map(|(&a, &t)| -(t * softplus(-a) + (1.0 - t) * softplus(a)))
            .sum();
        let prior: f64 = w.iter().zip(alpha).map(|(wk, ak)| ak * wk * wk).sum();
        likelihood - 0.5 * prior
    };

    for _ in 0..MAX_IRLS_STEPS {
        let (hessian, gradient) = irls_system(phi, alpha, &t01, &w);
        let step = hessian
            .cholesky()
            .ok_or_else(|| {
                KernelError::ill_conditioned("relevance vector Hessian is not positive definite")
            })?
            .solve(&gradient);

        // Newton step with backtracking on the log posterior
        let current = log_posterior(&w);
        let mut scale = 1.0;
        let mut candidate = &w + &step;
        while log_posterior(&candidate) < current && scale > 1e-4 {
            scale *= 0.5;
            candidate = &w + &step * scale;
        }
        w = candidate;
        if (&step * scale).amax() < IRLS_TOLERANCE {
            break;
        }
    }
    if w.iter().any(|v| !v.is_finite()) {
        return Err(KernelError::ill_conditioned(
            "relevance vector posterior mode is not finite",
        ));
    }

    let (hessian, _) = irls_system(phi, alpha, &t01, &w);
    let sigma = hessian
        .cholesky()
        .ok_or_else(|| {
            KernelError::ill_conditioned("relevance vector Hessian is not positive definite")
        })?
        .inverse();
    Ok((sigma, w))
}

/// Negative Hessian ΦᵀBΦ + A and gradient Φᵀ(t − σ(Φw)) − Aw of the log posterior
fn irls_system(
    phi: &DMatrix<f64>,
    alpha: &[f64],
    t01: &DVector<f64>,
    w: &DVector<f64>,
) -> (DMatrix<f64>, DVector<f64>) {
    let p = (phi * w).map(crate::core::logistic);
    let b = p.map(|p| p * (1.0 - p));

    let weighted = DMatrix::from_fn(phi.nrows(), phi.ncols(), |r, c| phi[(r, c)] * b[r]);
    let mut hessian = phi.transpose() * weighted;
    let mut gradient = phi.transpose() * (t01 - &p);
    for (k, a) in alpha.iter().enumerate() {
        hessian[(k, k)] += a;
        gradient[k] -= a * w[k];
    }
    (hessian, gradient)
}

impl Trainer for RelevanceVectorSolver {
    fn name(&self) -> &'static str {
        "relevance"
    }

    fn train(
        &self,
        examples: &TrainingExamples,
        cancel: &CancellationToken,
    ) -> Result<TrainingOutcome> {
        cancel.check()?;
        if examples.is_empty() {
            return Err(KernelError::EmptyDataset);
        }
        if examples.is_classification() {
            examples.validate_binary_labels()?;
        }

        let (bases, weights, convergence) = self.fit(examples, cancel)?;

        let mut bias = 0.0;
        let mut support_vectors = Vec::with_capacity(bases.len());
        for (basis, &w) in bases.iter().zip(weights.iter()) {
            match *basis {
                None => bias = w,
                Some(e) => {
                    let y = examples.target(e);
                    let (target, alpha) = if examples.is_classification() {
                        // coefficient = alpha * y must equal w
                        (Target::Label(y), w * y)
                    } else {
                        (Target::Value(y), w)
                    };
                    support_vectors.push(SupportVector::new(examples.row(e).to_vec(), target, alpha));
                }
            }
        }

        match convergence {
            Convergence::Converged { iterations } => info!(
                "RVM converged after {} iterations with {} relevance vectors out of {}",
                iterations,
                support_vectors.len(),
                examples.len()
            ),
            Convergence::DidNotFullyConverge {
                iterations,
                residual,
            } => warn!(
                "RVM stopped after {} iterations, max |Δ log α| still {:.3e}",
                iterations, residual
            ),
        }

        let model = KernelModel::from_examples(self.kernel, support_vectors, bias, examples);
        Ok(TrainingOutcome::new(model, convergence))
    }
}
