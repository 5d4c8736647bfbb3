//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Support vector classification and epsilon regression both reduce to
//!
//! ```text
//! min_α  f(α) = ½ αᵀQα + pᵀα   s.t.  yᵀα = 0,  0 ≤ α_i ≤ C_i
//! ```
//!
//! which is solved by optimizing one pair of variables at a time. The pair is
//! the maximal violating pair with second-order gain selection, and iteration
//! stops once the largest KKT violation drops below `convergence_epsilon`.
//!
//! Kernel logistic regression uses the same solver with single-coordinate
//! Newton steps on the entropy-regularized dual. The bias is folded into the
//! kernel (`K + 1`), so there is no equality constraint and `b = Σ α_i y_i`.

use crate::cache::KernelCache;
use crate::config::{DualConfig, DualLoss, DEFAULT_CACHE_SIZE};
use crate::core::{
    CancellationToken, Convergence, KernelError, Result, SupportVector, Target,
};
use crate::data::TrainingExamples;
use crate::kernel::KernelFunction;
use crate::model::{KernelModel, TrainingOutcome};
use crate::solver::Trainer;
use log::{debug, info, warn};

/// Replacement for a non-positive curvature along the working pair
const TAU: f64 = 1e-12;

/// Starting point of the logistic dual, as a fraction of C_i
const LOGISTIC_START: f64 = 1e-3;

/// Pairwise QP in the variables of one dual problem
struct DualProblem {
    /// Example behind each variable
    index: Vec<usize>,
    y: Vec<f64>,
    p: Vec<f64>,
    upper: Vec<f64>,
}

impl DualProblem {
    fn len(&self) -> usize {
        self.index.len()
    }

    /// Variable may move in the direction that increases y_t α_t
    fn is_up(&self, t: usize, alpha: &[f64]) -> bool {
        if self.y[t] > 0.0 {
            alpha[t] < self.upper[t]
        } else {
            alpha[t] > 0.0
        }
    }

    fn is_low(&self, t: usize, alpha: &[f64]) -> bool {
        if self.y[t] > 0.0 {
            alpha[t] > 0.0
        } else {
            alpha[t] < self.upper[t]
        }
    }
}

/// Optimized dual variables and the state they were reached in
struct DualSolution {
    alpha: Vec<f64>,
    bias: f64,
    convergence: Convergence,
    trace: Vec<f64>,
}

/// Dual-coordinate solver for SVM classification, SVR and kernel logistic regression
pub struct SMOSolver {
    kernel: KernelFunction,
    config: DualConfig,
    cache_size: usize,
}

impl SMOSolver {
    /// Create a new SMO solver with the given kernel and configuration
    pub fn new(kernel: KernelFunction, config: DualConfig) -> Self {
        Self {
            kernel,
            config,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }

    /// Set kernel cache size in bytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn config(&self) -> &DualConfig {
        &self.config
    }

    /// Per-example upper bounds C_i: class cost factor times example weight
    pub fn upper_bounds(&self, examples: &TrainingExamples) -> Vec<f64> {
        let (mut l_pos, mut l_neg) = (self.config.l_pos, self.config.l_neg);
        if self.config.balance_cost && examples.is_classification() {
            let (n_pos, n_neg) = examples.class_counts();
            let n = examples.len() as f64;
            l_pos *= n / (2.0 * n_pos.max(1) as f64);
            l_neg *= n / (2.0 * n_neg.max(1) as f64);
        }

        (0..examples.len())
            .map(|i| {
                let factor = if !examples.is_classification() {
                    1.0
                } else if examples.target(i) > 0.0 {
                    l_pos
                } else {
                    l_neg
                };
                self.config.c * factor * examples.weight(i)
            })
            .collect()
    }

    fn train_classifier(
        &self,
        examples: &TrainingExamples,
        cache: &mut KernelCache<'_, KernelFunction>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<SupportVector>, DualSolution)> {
        let n = examples.len();
        let problem = DualProblem {
            index: (0..n).collect(),
            y: examples.targets().to_vec(),
            p: vec![-1.0; n],
            upper: self.upper_bounds(examples),
        };
        let solution = self.solve_pairwise(&problem, cache, cancel)?;

        let support_vectors = (0..n)
            .filter(|&i| solution.alpha[i] > 0.0)
            .map(|i| {
                SupportVector::new(
                    examples.row(i).to_vec(),
                    Target::Label(examples.target(i)),
                    solution.alpha[i],
                )
            })
            .collect();
        Ok((support_vectors, solution))
    }

    fn train_regression(
        &self,
        examples: &TrainingExamples,
        cache: &mut KernelCache<'_, KernelFunction>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<SupportVector>, DualSolution)> {
        let n = examples.len();
        let upper = self.upper_bounds(examples);
        let eps = self.config.epsilon;

        // α⁺ in slots 0..n, α⁻ in slots n..2n
        let mut problem = DualProblem {
            index: Vec::with_capacity(2 * n),
            y: Vec::with_capacity(2 * n),
            p: Vec::with_capacity(2 * n),
            upper: Vec::with_capacity(2 * n),
        };
        for (sign, offset) in [(1.0, -1.0), (-1.0, 1.0)] {
            for i in 0..n {
                problem.index.push(i);
                problem.y.push(sign);
                problem.p.push(eps + offset * examples.target(i));
                problem.upper.push(upper[i]);
            }
        }
        let solution = self.solve_pairwise(&problem, cache, cancel)?;

        let support_vectors = (0..n)
            .filter_map(|i| {
                let coefficient = solution.alpha[i] - solution.alpha[n + i];
                (coefficient != 0.0).then(|| {
                    SupportVector::new(
                        examples.row(i).to_vec(),
                        Target::Value(examples.target(i)),
                        coefficient,
                    )
                })
            })
            .collect();
        Ok((support_vectors, solution))
    }

    /// Pairwise updates until the maximal KKT violation is below tolerance
    fn solve_pairwise(
        &self,
        problem: &DualProblem,
        cache: &mut KernelCache<'_, KernelFunction>,
        cancel: &CancellationToken,
    ) -> Result<DualSolution> {
        let l = problem.len();
        let mut alpha = vec![0.0; l];
        // G = Qα + p
        let mut gradient = problem.p.clone();
        let mut trace = Vec::new();
        let mut iterations = 0;

        let convergence = loop {
            cancel.check()?;

            let (pair, gap) = self.select_working_set(problem, &alpha, &gradient, cache);
            let Some((i, j)) = pair.filter(|_| gap >= self.config.convergence_epsilon) else {
                break Convergence::Converged { iterations };
            };
            if iterations >= self.config.max_iterations {
                break Convergence::DidNotFullyConverge {
                    iterations,
                    residual: gap,
                };
            }

            let (old_i, old_j) = (alpha[i], alpha[j]);
            self.update_pair(problem, i, j, &mut alpha, &gradient, cache);
            let (delta_i, delta_j) = (alpha[i] - old_i, alpha[j] - old_j);

            let (idx_i, idx_j) = (problem.index[i], problem.index[j]);
            for t in 0..l {
                let idx_t = problem.index[t];
                let q_ti = problem.y[t] * problem.y[i] * cache.get(idx_t, idx_i);
                let q_tj = problem.y[t] * problem.y[j] * cache.get(idx_t, idx_j);
                gradient[t] += q_ti * delta_i + q_tj * delta_j;
            }

            iterations += 1;
            // f(α) = ½ Σ α_t (G_t + p_t)
            let objective: f64 = 0.5
                * alpha
                    .iter()
                    .zip(gradient.iter().zip(&problem.p))
                    .map(|(a, (g, p))| a * (g + p))
                    .sum::<f64>();
            trace.push(-objective);

            if iterations % 1000 == 0 {
                debug!(
                    "SMO iteration {}: dual objective {:.6}, violation {:.3e}",
                    iterations, -objective, gap
                );
            }
        };

        let bias = -self.calculate_rho(problem, &alpha, &gradient);
        Ok(DualSolution {
            alpha,
            bias,
            convergence,
            trace,
        })
    }

    /// Maximal violating pair, second variable chosen by second-order gain.
    ///
    /// Returns the pair (if any) and the KKT gap `max_up(-yG) - min_low(-yG)`.
    fn select_working_set(
        &self,
        problem: &DualProblem,
        alpha: &[f64],
        gradient: &[f64],
        cache: &mut KernelCache<'_, KernelFunction>,
    ) -> (Option<(usize, usize)>, f64) {
        let l = problem.len();

        let mut gmax = f64::NEG_INFINITY;
        let mut first = None;
        for t in 0..l {
            if problem.is_up(t, alpha) {
                let value = -problem.y[t] * gradient[t];
                if value >= gmax {
                    gmax = value;
                    first = Some(t);
                }
            }
        }
        let Some(i) = first else {
            return (None, 0.0);
        };

        let idx_i = problem.index[i];
        let k_ii = cache.diag(idx_i);
        let mut gmax2 = f64::NEG_INFINITY;
        let mut second = None;
        let mut obj_min = f64::INFINITY;
        for t in 0..l {
            if !problem.is_low(t, alpha) {
                continue;
            }
            let yg = problem.y[t] * gradient[t];
            gmax2 = gmax2.max(yg);

            let b = gmax + yg;
            if b > 0.0 {
                let idx_t = problem.index[t];
                let mut a = k_ii + cache.diag(idx_t) - 2.0 * cache.get(idx_i, idx_t);
                if a <= 0.0 {
                    a = TAU;
                }
                let obj = -(b * b) / a;
                if obj <= obj_min {
                    obj_min = obj;
                    second = Some(t);
                }
            }
        }

        (second.map(|j| (i, j)), gmax + gmax2)
    }

    /// Analytic solution of the two-variable subproblem, clipped to the box
    fn update_pair(
        &self,
        problem: &DualProblem,
        i: usize,
        j: usize,
        alpha: &mut [f64],
        gradient: &[f64],
        cache: &mut KernelCache<'_, KernelFunction>,
    ) {
        let (idx_i, idx_j) = (problem.index[i], problem.index[j]);
        let (c_i, c_j) = (problem.upper[i], problem.upper[j]);
        let mut quad = cache.diag(idx_i) + cache.diag(idx_j) - 2.0 * cache.get(idx_i, idx_j);
        if quad <= 0.0 {
            quad = TAU;
        }

        if problem.y[i] != problem.y[j] {
            let delta = (-gradient[i] - gradient[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = c_i - diff;
                }
            } else if alpha[j] > c_j {
                alpha[j] = c_j;
                alpha[i] = c_j + diff;
            }
        } else {
            let delta = (gradient[i] - gradient[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > c_i {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = sum - c_i;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c_j {
                if alpha[j] > c_j {
                    alpha[j] = c_j;
                    alpha[i] = sum - c_j;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }
    }

    /// Threshold ρ (bias = -ρ): mean of y_t G_t over free variables, else the
    /// midpoint of the interval allowed by the bounded ones
    fn calculate_rho(&self, problem: &DualProblem, alpha: &[f64], gradient: &[f64]) -> f64 {
        let mut upper_bound = f64::INFINITY;
        let mut lower_bound = f64::NEG_INFINITY;
        let mut sum_free = 0.0;
        let mut n_free = 0usize;

        for t in 0..problem.len() {
            let yg = problem.y[t] * gradient[t];
            let at_upper = alpha[t] >= problem.upper[t];
            let at_lower = alpha[t] <= 0.0;
            if at_upper && at_lower {
                // zero-cost variable, carries no information
                continue;
            }
            if at_upper {
                if problem.y[t] < 0.0 {
                    upper_bound = upper_bound.min(yg);
                } else {
                    lower_bound = lower_bound.max(yg);
                }
            } else if at_lower {
                if problem.y[t] > 0.0 {
                    upper_bound = upper_bound.min(yg);
                } else {
                    lower_bound = lower_bound.max(yg);
                }
            } else {
                n_free += 1;
                sum_free += yg;
            }
        }

        if n_free > 0 {
            sum_free / n_free as f64
        } else {
            match (upper_bound.is_finite(), lower_bound.is_finite()) {
                (true, true) => (upper_bound + lower_bound) / 2.0,
                (true, false) => upper_bound,
                (false, true) => lower_bound,
                (false, false) => 0.0,
            }
        }
    }

    /// Single-coordinate Newton descent on the kernel logistic regression dual
    ///
    /// ```text
    /// F(α) = ½ Σ_ij α_i α_j y_i y_j (K_ij + 1) + Σ_i [α_i ln α_i + (C_i − α_i) ln(C_i − α_i)]
    /// ```
    fn train_logistic(
        &self,
        examples: &TrainingExamples,
        cache: &mut KernelCache<'_, KernelFunction>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<SupportVector>, DualSolution)> {
        let n = examples.len();
        let y = examples.targets();
        let upper = self.upper_bounds(examples);
        let mut alpha: Vec<f64> = upper.iter().map(|c| c * LOGISTIC_START).collect();

        // f_t = Σ_j α_j y_j (K_tj + 1)
        let mut f = vec![0.0; n];
        for (t, f_t) in f.iter_mut().enumerate() {
            for j in 0..n {
                if alpha[j] > 0.0 {
                    *f_t += alpha[j] * y[j] * (cache.get(t, j) + 1.0);
                }
            }
        }
        let mut objective: f64 = (0..n)
            .filter(|&i| upper[i] > 0.0)
            .map(|i| 0.5 * alpha[i] * y[i] * f[i] + entropy(alpha[i], upper[i]))
            .sum();

        let mut trace = Vec::new();
        let mut iterations = 0;
        let convergence = loop {
            cancel.check()?;

            let mut worst = None;
            let mut max_violation = 0.0;
            for i in (0..n).filter(|&i| upper[i] > 0.0) {
                let g = y[i] * f[i] + (alpha[i] / (upper[i] - alpha[i])).ln();
                if g.abs() > max_violation {
                    max_violation = g.abs();
                    worst = Some((i, g));
                }
            }
            let Some((i, g)) = worst.filter(|_| max_violation >= self.config.convergence_epsilon)
            else {
                break Convergence::Converged { iterations };
            };
            if iterations >= self.config.max_iterations {
                break Convergence::DidNotFullyConverge {
                    iterations,
                    residual: max_violation,
                };
            }

            let (a, c) = (alpha[i], upper[i]);
            let k_ii = cache.diag(i) + 1.0;
            let h = k_ii + c / (a * (c - a));
            let mut delta = -g / h;
            // stay strictly inside (0, C)
            if a + delta <= 0.0 {
                delta = -0.9 * a;
            } else if a + delta >= c {
                delta = 0.9 * (c - a);
            }

            let change = |d: f64| 0.5 * d * d * k_ii + d * y[i] * f[i] + entropy(a + d, c) - entropy(a, c);
            let mut delta_objective = change(delta);
            let mut halvings = 0;
            while delta_objective > 0.0 && halvings < 50 {
                delta *= 0.5;
                delta_objective = change(delta);
                halvings += 1;
            }
            if delta_objective > 0.0 {
                return Err(KernelError::ill_conditioned(format!(
                    "logistic dual step for example {i} does not decrease the objective"
                )));
            }

            alpha[i] = a + delta;
            for (t, f_t) in f.iter_mut().enumerate() {
                *f_t += delta * y[i] * (cache.get(t, i) + 1.0);
            }
            objective += delta_objective;
            iterations += 1;
            trace.push(-objective);

            if iterations % 1000 == 0 {
                debug!(
                    "KLR iteration {}: dual objective {:.6}, violation {:.3e}",
                    iterations, -objective, max_violation
                );
            }
        };

        let bias: f64 = alpha.iter().zip(y).map(|(a, y)| a * y).sum();
        let support_vectors = (0..n)
            .filter(|&i| alpha[i] > 0.0)
            .map(|i| SupportVector::new(examples.row(i).to_vec(), Target::Label(y[i]), alpha[i]))
            .collect();
        Ok((
            support_vectors,
            DualSolution {
                alpha,
                bias,
                convergence,
                trace,
            },
        ))
    }
}

/// a ln a + (c − a) ln(c − a), continuous at the bounds
fn entropy(a: f64, c: f64) -> f64 {
    let term = |v: f64| if v > 0.0 { v * v.ln() } else { 0.0 };
    term(a) + term(c - a)
}

impl Trainer for SMOSolver {
    fn name(&self) -> &'static str {
        "dual"
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
        } else if self.config.loss == DualLoss::Logistic {
            return Err(KernelError::NotApplicable(
                "logistic loss needs a two-class problem".to_string(),
            ));
        }

        let mut cache = KernelCache::with_memory_limit(examples, &self.kernel, self.cache_size);
        let (support_vectors, solution) = match (examples.is_classification(), self.config.loss) {
            (true, DualLoss::Hinge) => self.train_classifier(examples, &mut cache, cancel)?,
            (true, DualLoss::Logistic) => self.train_logistic(examples, &mut cache, cancel)?,
            (false, _) => self.train_regression(examples, &mut cache, cancel)?,
        };

        match solution.convergence {
            Convergence::Converged { iterations } => info!(
                "Dual solver converged after {} iterations: {} support vectors, bias {:.6}, cache hit rate {:.1}%",
                iterations,
                support_vectors.len(),
                solution.bias,
                cache.hit_rate() * 100.0
            ),
            Convergence::DidNotFullyConverge {
                iterations,
                residual,
            } => warn!(
                "Dual solver stopped after {} iterations with KKT violation {:.3e} (tolerance {})",
                iterations, residual, self.config.convergence_epsilon
            ),
        }

        let model = KernelModel::from_examples(self.kernel, support_vectors, solution.bias, examples);
        Ok(TrainingOutcome::new(model, solution.convergence).with_objective_trace(solution.trace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClassNames;
    use approx::assert_relative_eq;

    fn separable() -> TrainingExamples {
        TrainingExamples::new(
            vec![
                vec![2.0, 2.0],
                vec![2.5, 1.5],
                vec![3.0, 3.0],
                vec![-2.0, -2.0],
                vec![-1.5, -2.5],
                vec![-3.0, -3.0],
            ],
            vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0],
            None,
            false,
        )
        .unwrap()
        .with_class_names(ClassNames::default())
    }

    fn solver(kernel: KernelFunction) -> SMOSolver {
        SMOSolver::new(kernel, DualConfig::default())
    }

    #[test]
    fn test_separable_classification() {
        let examples = separable();
        let outcome = solver(KernelFunction::Dot)
            .train(&examples, &CancellationToken::new())
            .expect("training succeeds");

        assert!(outcome.convergence.is_converged());
        let model = &outcome.model;
        for i in 0..examples.len() {
            assert_eq!(model.predict(examples.row(i)).label, examples.target(i));
        }
        assert!(model.margin() > 0.0);
    }

    #[test]
    fn test_equality_constraint_and_box() {
        let examples = separable();
        let smo = solver(KernelFunction::radial(0.5).unwrap());
        let mut cache = KernelCache::disabled(&examples, &smo.kernel);
        let (svs, solution) = smo
            .train_classifier(&examples, &mut cache, &CancellationToken::new())
            .unwrap();

        let balance: f64 = svs.iter().map(|sv| sv.coefficient()).sum();
        assert_relative_eq!(balance, 0.0, epsilon = 1e-9);
        assert!(solution.alpha.iter().all(|&a| (0.0..=1.0).contains(&a)));
    }

    #[test]
    fn test_dual_objective_non_decreasing() {
        let examples = TrainingExamples::new(
            vec![
                vec![0.0, 1.0],
                vec![1.0, 0.2],
                vec![0.4, 0.4],
                vec![1.0, 1.0],
                vec![0.1, 0.9],
                vec![0.8, 0.1],
            ],
            vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
            None,
            false,
        )
        .unwrap()
        .with_class_names(ClassNames::default());
        let outcome = solver(KernelFunction::radial(1.0).unwrap())
            .train(&examples, &CancellationToken::new())
            .unwrap();

        let trace = &outcome.objective_trace;
        assert!(!trace.is_empty());
        for pair in trace.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12, "objective decreased: {pair:?}");
        }
    }

    #[test]
    fn test_iteration_cap_reports_notice() {
        let config = DualConfig {
            max_iterations: 1,
            ..DualConfig::default()
        };
        let outcome = SMOSolver::new(KernelFunction::radial(1.0).unwrap(), config)
            .train(&separable(), &CancellationToken::new())
            .unwrap();
        assert!(matches!(
            outcome.convergence,
            Convergence::DidNotFullyConverge { iterations: 1, .. }
        ));
    }

    #[test]
    fn test_invalid_label_rejected() {
        let examples = TrainingExamples::new(vec![vec![1.0], vec![2.0]], vec![1.0, 2.0], None, false)
            .unwrap()
            .with_class_names(ClassNames::default());
        assert!(matches!(
            solver(KernelFunction::Dot).train(&examples, &CancellationToken::new()),
            Err(KernelError::InvalidLabel { index: 1, .. })
        ));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            solver(KernelFunction::Dot).train(&separable(), &cancel),
            Err(KernelError::TrainingCancelled)
        ));
    }

    #[test]
    fn test_cost_balancing() {
        let examples = TrainingExamples::new(
            vec![vec![0.0]; 4],
            vec![1.0, -1.0, -1.0, -1.0],
            Some(vec![1.0, 1.0, 2.0, 1.0]),
            false,
        )
        .unwrap()
        .with_class_names(ClassNames::default());
        let config = DualConfig {
            c: 2.0,
            l_pos: 3.0,
            balance_cost: true,
            ..DualConfig::default()
        };
        let upper = SMOSolver::new(KernelFunction::Dot, config).upper_bounds(&examples);
        // C_pos = 2 * 3 * 4/(2*1), C_neg = 2 * 1 * 4/(2*3), times weights
        assert_relative_eq!(upper[0], 12.0, epsilon = 1e-12);
        assert_relative_eq!(upper[1], 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(upper[2], 8.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_epsilon_regression() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 10.0]).collect();
        let targets: Vec<f64> = rows.iter().map(|r| 3.0 * r[0] - 1.0).collect();
        let examples = TrainingExamples::new(rows, targets, None, false).unwrap();
        let config = DualConfig {
            c: 10.0,
            epsilon: 0.01,
            ..DualConfig::default()
        };
        let outcome = SMOSolver::new(KernelFunction::Dot, config)
            .train(&examples, &CancellationToken::new())
            .unwrap();

        let model = &outcome.model;
        let w = model.linear_weights().expect("dot kernel");
        assert_relative_eq!(w[0], 3.0, epsilon = 0.05);
        assert_relative_eq!(model.bias(), -1.0, epsilon = 0.05);
        assert!(!model.is_classification());
    }

    #[test]
    fn test_logistic_dual() {
        let config = DualConfig {
            loss: DualLoss::Logistic,
            ..DualConfig::default()
        };
        let examples = separable();
        let outcome = SMOSolver::new(KernelFunction::Dot, config)
            .train(&examples, &CancellationToken::new())
            .unwrap();

        assert!(outcome.convergence.is_converged());
        let model = &outcome.model;
        for i in 0..examples.len() {
            assert_eq!(model.predict(examples.row(i)).label, examples.target(i));
        }
        let balance: f64 = model.support_vectors().iter().map(|sv| sv.coefficient()).sum();
        assert_relative_eq!(model.bias(), balance, epsilon = 1e-12);
        for pair in outcome.objective_trace.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12);
        }
    }

    #[test]
    fn test_logistic_needs_classes() {
        let config = DualConfig {
            loss: DualLoss::Logistic,
            ..DualConfig::default()
        };
        let examples = TrainingExamples::new(vec![vec![1.0]], vec![0.5], None, false).unwrap();
        assert!(matches!(
            SMOSolver::new(KernelFunction::Dot, config).train(&examples, &CancellationToken::new()),
            Err(KernelError::NotApplicable(_))
        ));
    }

    #[test]
    fn test_single_example() {
        let examples = TrainingExamples::new(vec![vec![1.0]], vec![1.0], None, false)
            .unwrap()
            .with_class_names(ClassNames::default());
        let outcome = solver(KernelFunction::Dot)
            .train(&examples, &CancellationToken::new())
            .unwrap();
        assert_eq!(outcome.model.predict(&[1.0]).label, 1.0);
    }
}
