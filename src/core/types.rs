//! Core type definitions shared by trainers and models

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1), or the predicted value for regression
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Logistic squashing of the decision value: P(positive class)
    pub fn positive_probability(&self) -> f64 {
        logistic(self.decision_value)
    }

    /// Probability assigned to the predicted class
    pub fn confidence(&self) -> f64 {
        let p = self.positive_probability();
        if self.label > 0.0 {
            p
        } else {
            1.0 - p
        }
    }
}

/// 1 / (1 + exp(-x)), evaluated without overflow for large |x|
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^x) without overflow
pub fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Largest stored index + 1, i.e. the minimal dense width
    pub fn min_dim(&self) -> usize {
        self.indices.last().map_or(0, |&i| i + 1)
    }

    /// Expand into a dense vector of width `dim`; indices beyond `dim` are dropped
    pub fn to_dense(&self, dim: usize) -> Vec<f64> {
        let mut dense = vec![0.0; dim];
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            if i < dim {
                dense[i] = v;
            }
        }
        dense
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Names of the two classes of a binary classification problem.
///
/// Targets are encoded as -1 for `negative` and +1 for `positive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNames {
    pub negative: String,
    pub positive: String,
}

impl ClassNames {
    pub fn new(negative: impl Into<String>, positive: impl Into<String>) -> Self {
        Self {
            negative: negative.into(),
            positive: positive.into(),
        }
    }

    /// Map a ±1 label to its class name
    pub fn name_for(&self, label: f64) -> &str {
        if label > 0.0 {
            &self.positive
        } else {
            &self.negative
        }
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::new("-1", "+1")
    }
}

/// What a trained model predicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Task {
    Classification { classes: ClassNames },
    Regression,
}

impl Task {
    pub fn is_classification(&self) -> bool {
        matches!(self, Task::Classification { .. })
    }
}

/// Target attached to a support vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// Class label, -1 or +1
    Label(f64),
    /// Real-valued regression target
    Value(f64),
}

impl Target {
    pub fn value(&self) -> f64 {
        match *self {
            Target::Label(y) | Target::Value(y) => y,
        }
    }
}

/// A training example retained by a model together with its dual weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportVector {
    pub x: Vec<f64>,
    pub target: Target,
    pub alpha: f64,
}

impl SupportVector {
    pub fn new(x: Vec<f64>, target: Target, alpha: f64) -> Self {
        Self { x, target, alpha }
    }

    /// Coefficient of this vector's kernel term in the decision function.
    ///
    /// Labelled vectors contribute `alpha * y`; valued vectors carry a signed
    /// coefficient in `alpha` directly.
    pub fn coefficient(&self) -> f64 {
        match self.target {
            Target::Label(y) => self.alpha * y,
            Target::Value(_) => self.alpha,
        }
    }
}

/// How a training run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convergence {
    /// Stopping criterion satisfied
    Converged { iterations: usize },
    /// Iteration or generation cap reached first; the best solution found is returned
    DidNotFullyConverge { iterations: usize, residual: f64 },
}

impl Convergence {
    pub fn iterations(&self) -> usize {
        match *self {
            Convergence::Converged { iterations }
            | Convergence::DidNotFullyConverge { iterations, .. } => iterations,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }
}

/// Cooperative cancellation flag shared between a caller and a running trainer
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns `TrainingCancelled` once the flag is raised
    pub fn check(&self) -> crate::core::Result<()> {
        if self.is_cancelled() {
            Err(crate::core::KernelError::TrainingCancelled)
        } else {
            Ok(())
        }
    }
}
