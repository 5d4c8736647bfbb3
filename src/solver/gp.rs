//! Sparse Gaussian-process regression over a greedily chosen basis set
//!
//! Training points are streamed once. A point joins the basis set `B` when it
//! is far enough from the span of the current basis in feature space
//!
//! ```text
//! γ(x) = k(x, x) − k_B(x)ᵀ K_BB⁻¹ k_B(x) > geometrical_tol
//! ```
//!
//! and the current fit mispredicts it by more than `epsilon_tol`. `K_BB` is
//! kept as a Cholesky factor grown by one row per admission. The projected
//! process weights are
//!
//! ```text
//! w = (K_BN K_NB + σ² K_BB)⁻¹ K_BN (t − t̄)        bias = t̄
//! ```
//!
//! with `K_BN K_NB` and `K_BN (t − t̄)` accumulated over the stream.

use crate::config::GaussianProcessConfig;
use crate::core::{CancellationToken, Convergence, KernelError, Result, SupportVector, Target};
use crate::data::TrainingExamples;
use crate::kernel::KernelFunction;
use crate::model::{KernelModel, TrainingOutcome};
use crate::solver::Trainer;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};

/// Sparse basis-vector Gaussian process
pub struct GaussianProcessSolver {
    kernel: KernelFunction,
    config: GaussianProcessConfig,
}

/// Running state of the basis selection
struct BasisSet {
    members: Vec<usize>,
    /// Lower Cholesky factor of K_BB
    chol: DMatrix<f64>,
    /// Σ k_B(x) k_B(x)ᵀ over the points seen so far
    gram: DMatrix<f64>,
    /// Σ k_B(x) (t − t̄) over the points seen so far
    moment: DVector<f64>,
    weights: Option<DVector<f64>>,
}

impl BasisSet {
    fn empty() -> Self {
        Self {
            members: Vec::new(),
            chol: DMatrix::zeros(0, 0),
            gram: DMatrix::zeros(0, 0),
            moment: DVector::zeros(0),
            weights: None,
        }
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    /// Projected-process weights for the statistics gathered so far
    fn weights(&mut self, noise_variance: f64) -> Result<DVector<f64>> {
        if let Some(w) = &self.weights {
            return Ok(w.clone());
        }
        let w = projected_weights(&self.chol, &self.gram, &self.moment, noise_variance)?;
        self.weights = Some(w.clone());
        Ok(w)
    }
}

impl GaussianProcessSolver {
    pub fn new(kernel: KernelFunction, config: GaussianProcessConfig) -> Self {
        Self { kernel, config }
    }

    fn basis_column(&self, examples: &TrainingExamples, members: &[usize], i: usize) -> DVector<f64> {
        DVector::from_iterator(
            members.len(),
            members
                .iter()
                .map(|&b| self.kernel.evaluate(examples.row(b), examples.row(i))),
        )
    }

    /// Stream the examples and return the basis set with its final weights
    fn fit(
        &self,
        examples: &TrainingExamples,
        centered: &[f64],
        cancel: &CancellationToken,
    ) -> Result<(Vec<usize>, DVector<f64>)> {
        let noise = self.config.noise_variance;
        let mut basis = BasisSet::empty();

        for i in 0..examples.len() {
            cancel.check()?;
            let mut k = self.basis_column(examples, &basis.members, i);

            if basis.len() < self.config.max_basis_vectors {
                let kxx = self.kernel.evaluate(examples.row(i), examples.row(i));
                let projection = if basis.members.is_empty() {
                    DVector::zeros(0)
                } else {
                    basis.chol.solve_lower_triangular(&k).ok_or_else(|| {
                        KernelError::ill_conditioned("basis Gram matrix lost positive definiteness")
                    })?
                };
                let gamma = kxx - projection.norm_squared();

                if gamma > self.config.geometrical_tol {
                    let predicted = if basis.members.is_empty() {
                        0.0
                    } else {
                        k.dot(&basis.weights(noise)?)
                    };
                    if (centered[i] - predicted).abs() > self.config.epsilon_tol {
                        self.admit(examples, centered, &mut basis, i, &projection, gamma);
                        k = DVector::from_iterator(k.len() + 1, k.iter().copied().chain(Some(kxx)));
                        debug!(
                            "Admitted example {} as basis vector {} (gamma {:.3e})",
                            i,
                            basis.len(),
                            gamma
                        );
                    }
                }
            }

            basis.gram += &k * k.transpose();
            basis.moment += &k * centered[i];
            basis.weights = None;
        }

        if basis.members.is_empty() {
            return Ok((Vec::new(), DVector::zeros(0)));
        }
        let weights = basis.weights(noise)?;
        Ok((basis.members, weights))
    }

    /// Grow the factor, gram and moment by example `i` using points `0..i`
    fn admit(
        &self,
        examples: &TrainingExamples,
        centered: &[f64],
        basis: &mut BasisSet,
        i: usize,
        projection: &DVector<f64>,
        gamma: f64,
    ) {
        let m = basis.len();
        let pivot = gamma.sqrt();
        let chol = &basis.chol;
        basis.chol = DMatrix::from_fn(m + 1, m + 1, |r, c| match (r < m, c < m) {
            (true, true) => chol[(r, c)],
            (false, true) => projection[c],
            (false, false) => pivot,
            (true, false) => 0.0,
        });

        let mut cross = DVector::zeros(m + 1);
        let mut moment = 0.0;
        for j in 0..i {
            let kj = self.kernel.evaluate(examples.row(j), examples.row(i));
            for (b, &member) in basis.members.iter().enumerate() {
                cross[b] += kj * self.kernel.evaluate(examples.row(j), examples.row(member));
            }
            cross[m] += kj * kj;
            moment += kj * centered[j];
        }
        let gram = &basis.gram;
        basis.gram = DMatrix::from_fn(m + 1, m + 1, |r, c| match (r < m, c < m) {
            (true, true) => gram[(r, c)],
            (false, _) => cross[c],
            (true, false) => cross[r],
        });
        basis.moment = DVector::from_iterator(
            m + 1,
            basis.moment.iter().copied().chain(Some(moment)),
        );
        basis.members.push(i);
        basis.weights = None;
    }
}

/// Solve `(A + σ² L Lᵀ) w = c` through `(L⁻¹ A L⁻ᵀ + σ² I) Lᵀ w = L⁻¹ c`
fn projected_weights(
    chol: &DMatrix<f64>,
    gram: &DMatrix<f64>,
    moment: &DVector<f64>,
    noise_variance: f64,
) -> Result<DVector<f64>> {
    let singular = || KernelError::ill_conditioned("basis Gram matrix lost positive definiteness");

    let left = chol.solve_lower_triangular(gram).ok_or_else(singular)?;
    let mut whitened = chol
        .solve_lower_triangular(&left.transpose())
        .ok_or_else(singular)?;
    whitened = (&whitened + whitened.transpose()) * 0.5;
    for d in 0..whitened.nrows() {
        whitened[(d, d)] += noise_variance;
    }

    let rhs = chol.solve_lower_triangular(moment).ok_or_else(singular)?;
    let v = whitened
        .cholesky()
        .ok_or_else(|| KernelError::ill_conditioned("projected process system is not positive definite"))?
        .solve(&rhs);
    let w = chol.transpose().solve_upper_triangular(&v).ok_or_else(singular)?;
    if w.iter().any(|x| !x.is_finite()) {
        return Err(KernelError::ill_conditioned(
            "projected process weights are not finite",
        ));
    }
    Ok(w)
}

impl Trainer for GaussianProcessSolver {
    fn name(&self) -> &'static str {
        "gaussian_process"
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

        let n = examples.len();
        let mean = examples.targets().iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = examples.targets().iter().map(|t| t - mean).collect();

        let (members, weights) = self.fit(examples, &centered, cancel)?;

        let support_vectors = members
            .iter()
            .zip(weights.iter())
            .map(|(&e, &w)| {
                let y = examples.target(e);
                let (target, alpha) = if examples.is_classification() {
                    (Target::Label(y), w * y)
                } else {
                    (Target::Value(y), w)
                };
                SupportVector::new(examples.row(e).to_vec(), target, alpha)
            })
            .collect::<Vec<_>>();

        info!(
            "Gaussian process kept {} basis vectors out of {} examples",
            support_vectors.len(),
            n
        );

        let model = KernelModel::from_examples(self.kernel, support_vectors, mean, examples);
        Ok(TrainingOutcome::new(
            model,
            Convergence::Converged { iterations: n },
        ))
    }
}
