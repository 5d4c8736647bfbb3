//! Trained kernel model and the prediction pipeline
//!
//! Every trainer backend produces the same [`KernelModel`]: a kernel, a set of
//! weighted support vectors, a bias and the task it was trained for. Scoring
//! standardizes the input with the training statistics (when present) and then
//! takes either the kernel expansion
//!
//! ```text
//! f(x) = b + Σ_i c_i · K(x_i, x)
//! ```
//!
//! or, for the dot kernel, the equivalent O(d) form `b + w·x`.

use crate::core::{
    ClassNames, Convergence, KernelError, Prediction, Result, SupportVector, Task,
};
use crate::data::{NormalizationStats, TrainingExamples};
use crate::kernel::ops::dot;
use crate::kernel::KernelFunction;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Immutable trained model, safe to share between threads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelModel {
    kernel: KernelFunction,
    support_vectors: Vec<SupportVector>,
    bias: f64,
    task: Task,
    normalization: Option<NormalizationStats>,
    attribute_names: Vec<String>,
    /// Σ c_i x_i, built on first use for dot-kernel models
    #[serde(skip)]
    linear_weights: OnceLock<Option<Vec<f64>>>,
}

impl KernelModel {
    pub fn new(
        kernel: KernelFunction,
        support_vectors: Vec<SupportVector>,
        bias: f64,
        task: Task,
        attribute_names: Vec<String>,
    ) -> Self {
        Self {
            kernel,
            support_vectors,
            bias,
            task,
            normalization: None,
            attribute_names,
            linear_weights: OnceLock::new(),
        }
    }

    /// Model over the feature space of `examples` (task, names and scaling included)
    pub fn from_examples(
        kernel: KernelFunction,
        support_vectors: Vec<SupportVector>,
        bias: f64,
        examples: &TrainingExamples,
    ) -> Self {
        let model = Self::new(
            kernel,
            support_vectors,
            bias,
            examples.task(),
            examples.attribute_names().to_vec(),
        )
        .with_normalization(examples.normalization().cloned());
        if model.kernel.is_linear() {
            // Build eagerly while the run still owns the data.
            model.linear_weights();
        }
        model
    }

    pub fn with_normalization(mut self, normalization: Option<NormalizationStats>) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn kernel(&self) -> &KernelFunction {
        &self.kernel
    }

    pub fn support_vectors(&self) -> &[SupportVector] {
        &self.support_vectors
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn is_classification(&self) -> bool {
        self.task.is_classification()
    }

    pub fn class_names(&self) -> Option<&ClassNames> {
        match &self.task {
            Task::Classification { classes } => Some(classes),
            Task::Regression => None,
        }
    }

    pub fn normalization(&self) -> Option<&NormalizationStats> {
        self.normalization.as_ref()
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    /// Number of input attributes
    pub fn dim(&self) -> usize {
        self.attribute_names.len()
    }

    /// Number of support vectors with non-zero weight
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.iter().filter(|sv| sv.alpha != 0.0).count()
    }

    /// Weight vector w = Σ c_i x_i, available only for the dot kernel
    pub fn linear_weights(&self) -> Option<&[f64]> {
        self.linear_weights
            .get_or_init(|| {
                self.kernel.is_linear().then(|| {
                    let mut w = vec![0.0; self.dim()];
                    for sv in &self.support_vectors {
                        let c = sv.coefficient();
                        for (wj, xj) in w.iter_mut().zip(&sv.x) {
                            *wj += c * xj;
                        }
                    }
                    w
                })
            })
            .as_deref()
    }

    fn prepare<'x>(&self, x: &'x [f64]) -> Cow<'x, [f64]> {
        match &self.normalization {
            Some(stats) => Cow::Owned(stats.apply(x)),
            None => Cow::Borrowed(x),
        }
    }

    /// Decision value for a raw (unstandardized) example.
    ///
    /// The input is expected to have `dim()` attributes; see [`try_score`](Self::try_score).
    pub fn score(&self, x: &[f64]) -> f64 {
        if self.linear_weights().is_some() {
            self.score_via_weights(x)
        } else {
            self.score_via_kernel_sum(x)
        }
    }

    /// [`score`](Self::score) with an input width check
    pub fn try_score(&self, x: &[f64]) -> Result<f64> {
        self.check_width(x)?;
        Ok(self.score(x))
    }

    /// b + Σ c_i K(x_i, x), whatever the kernel
    pub fn score_via_kernel_sum(&self, x: &[f64]) -> f64 {
        let x = self.prepare(x);
        self.bias
            + self
                .support_vectors
                .iter()
                .filter(|sv| sv.alpha != 0.0)
                .map(|sv| sv.coefficient() * self.kernel.evaluate(&sv.x, &x))
                .sum::<f64>()
    }

    /// b + w·x; falls back to the kernel sum when the kernel is not the dot product
    pub fn score_via_weights(&self, x: &[f64]) -> f64 {
        match self.linear_weights() {
            Some(w) => self.bias + dot(w, &self.prepare(x)),
            None => self.score_via_kernel_sum(x),
        }
    }

    /// Label (±1) or regression value, plus the raw decision value
    pub fn predict(&self, x: &[f64]) -> Prediction {
        let score = self.score(x);
        let label = match self.task {
            Task::Classification { .. } => sign(score),
            Task::Regression => score,
        };
        Prediction::new(label, score)
    }

    pub fn try_predict(&self, x: &[f64]) -> Result<Prediction> {
        self.check_width(x)?;
        Ok(self.predict(x))
    }

    pub fn predict_batch<R: AsRef<[f64]>>(&self, rows: &[R]) -> Vec<Prediction> {
        rows.iter().map(|x| self.predict(x.as_ref())).collect()
    }

    /// Predicted class name and per-class confidences `1/(1+e^-score)`
    pub fn predict_label(&self, x: &[f64]) -> Result<(String, BTreeMap<String, f64>)> {
        let classes = self.class_names().ok_or_else(|| {
            KernelError::NotApplicable("class labels require a classification model".to_string())
        })?;
        let prediction = self.try_predict(x)?;
        let p = prediction.positive_probability();

        let mut confidences = BTreeMap::new();
        confidences.insert(classes.negative.clone(), 1.0 - p);
        confidences.insert(classes.positive.clone(), p);
        Ok((classes.name_for(prediction.label).to_string(), confidences))
    }

    /// Attribute name → weight for two-class dot-kernel models
    pub fn feature_weights(&self) -> Result<Vec<(String, f64)>> {
        if !self.is_classification() {
            return Err(KernelError::NotApplicable(
                "feature weights are only defined for classification models".to_string(),
            ));
        }
        let w = self.linear_weights().ok_or_else(|| {
            KernelError::NotApplicable(format!(
                "feature weights need the dot kernel, model uses {}",
                self.kernel
            ))
        })?;
        Ok(self
            .attribute_names
            .iter()
            .cloned()
            .zip(w.iter().copied())
            .collect())
    }

    /// Geometric margin 1/‖w‖, with ‖w‖² taken through the kernel expansion when
    /// there are no explicit weights
    pub fn margin(&self) -> f64 {
        let norm_sq = match self.linear_weights() {
            Some(w) => dot(w, w),
            None => {
                let svs: Vec<&SupportVector> =
                    self.support_vectors.iter().filter(|sv| sv.alpha != 0.0).collect();
                let mut sum = 0.0;
                for a in &svs {
                    for b in &svs {
                        sum += a.coefficient() * b.coefficient() * self.kernel.evaluate(&a.x, &b.x);
                    }
                }
                sum
            }
        };
        if norm_sq > 0.0 {
            1.0 / norm_sq.sqrt()
        } else {
            f64::INFINITY
        }
    }

    /// Copy of the model without the vectors that carry zero weight
    pub fn without_zero_weights(&self) -> Self {
        Self {
            support_vectors: self
                .support_vectors
                .iter()
                .filter(|sv| sv.alpha != 0.0)
                .cloned()
                .collect(),
            linear_weights: OnceLock::new(),
            ..self.clone()
        }
    }

    /// Human-readable decision function
    pub fn formula(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "f(x) = {:.6}", self.bias);
        match self.linear_weights() {
            Some(w) => {
                for (name, wj) in self.attribute_names.iter().zip(w) {
                    let _ = writeln!(out, "  {} {:.6} * {}", sign_char(*wj), wj.abs(), name);
                }
            }
            None => {
                for (i, sv) in self
                    .support_vectors
                    .iter()
                    .enumerate()
                    .filter(|(_, sv)| sv.alpha != 0.0)
                {
                    let c = sv.coefficient();
                    let _ = writeln!(out, "  {} {:.6} * K(x{}, x)", sign_char(c), c.abs(), i + 1);
                }
                let _ = writeln!(out, "where K = {}", self.kernel.describe());
            }
        }
        if self.normalization.is_some() {
            out.push_str("(x standardized with the training mean and variance)\n");
        }
        out
    }

    fn check_width(&self, x: &[f64]) -> Result<()> {
        if x.len() != self.dim() {
            return Err(KernelError::dimension("prediction input", self.dim(), x.len()));
        }
        Ok(())
    }
}

fn sign(score: f64) -> f64 {
    if score >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

fn sign_char(value: f64) -> char {
    if value < 0.0 {
        '-'
    } else {
        '+'
    }
}

/// Trained model plus how the run ended
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: KernelModel,
    pub convergence: Convergence,
    /// Per-iteration objective values; empty for backends that track none
    pub objective_trace: Vec<f64>,
}

impl TrainingOutcome {
    pub fn new(model: KernelModel, convergence: Convergence) -> Self {
        Self {
            model,
            convergence,
            objective_trace: Vec::new(),
        }
    }

    pub fn with_objective_trace(mut self, trace: Vec<f64>) -> Self {
        self.objective_trace = trace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Target;
    use approx::assert_relative_eq;

    fn two_class_model(kernel: KernelFunction) -> KernelModel {
        KernelModel::new(
            kernel,
            vec![
                SupportVector::new(vec![1.0, 2.0], Target::Label(1.0), 0.5),
                SupportVector::new(vec![-1.0, 0.5], Target::Label(-1.0), 0.25),
                SupportVector::new(vec![3.0, 3.0], Target::Label(1.0), 0.0),
            ],
            0.1,
            Task::Classification {
                classes: ClassNames::new("no", "yes"),
            },
            vec!["a".to_string(), "b".to_string()],
        )
    }

    #[test]
    fn test_linear_weights() {
        let model = two_class_model(KernelFunction::Dot);
        // 0.5*[1,2] - 0.25*[-1,0.5]
        let w = model.linear_weights().expect("dot kernel has weights");
        assert_relative_eq!(w[0], 0.75);
        assert_relative_eq!(w[1], 0.875);
        assert!(two_class_model(KernelFunction::radial(1.0).unwrap())
            .linear_weights()
            .is_none());
    }

    #[test]
    fn test_scoring_paths_agree() {
        let model = two_class_model(KernelFunction::Dot);
        for x in [[0.0, 0.0], [1.0, -1.0], [2.5, 4.0]] {
            assert_relative_eq!(
                model.score_via_weights(&x),
                model.score_via_kernel_sum(&x),
                epsilon = 1e-12
            );
        }
        assert_relative_eq!(model.score(&[1.0, 1.0]), 0.1 + 0.75 + 0.875, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_weight_vectors_do_not_matter() {
        let model = two_class_model(KernelFunction::radial(0.3).unwrap());
        let trimmed = model.without_zero_weights();
        assert_eq!(trimmed.support_vectors().len(), 2);
        assert_eq!(model.n_support_vectors(), 2);
        for x in [[0.0, 0.0], [3.0, 3.0], [-2.0, 1.0]] {
            assert_eq!(model.score(&x), trimmed.score(&x));
        }
    }

    #[test]
    fn test_predict_label_confidences() {
        let model = two_class_model(KernelFunction::Dot);
        let (label, conf) = model.predict_label(&[1.0, 1.0]).unwrap();
        assert_eq!(label, "yes");
        assert_relative_eq!(conf["yes"] + conf["no"], 1.0);
        assert!(conf["yes"] > 0.5);

        let (label, _) = model.predict_label(&[-5.0, -5.0]).unwrap();
        assert_eq!(label, "no");

        assert!(matches!(
            model.predict_label(&[1.0]),
            Err(KernelError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_regression_model() {
        let model = KernelModel::new(
            KernelFunction::Dot,
            vec![SupportVector::new(vec![2.0], Target::Value(3.0), 0.5)],
            1.0,
            Task::Regression,
            vec!["x".to_string()],
        );
        assert_eq!(model.predict(&[2.0]).label, 3.0);
        assert!(matches!(model.predict_label(&[2.0]), Err(KernelError::NotApplicable(_))));
        assert!(matches!(model.feature_weights(), Err(KernelError::NotApplicable(_))));
    }

    #[test]
    fn test_feature_weights_and_margin() {
        let model = two_class_model(KernelFunction::Dot);
        let weights = model.feature_weights().unwrap();
        assert_eq!(weights[0].0, "a");
        assert_relative_eq!(weights[1].1, 0.875);

        let norm = (0.75f64 * 0.75 + 0.875 * 0.875).sqrt();
        assert_relative_eq!(model.margin(), 1.0 / norm, epsilon = 1e-12);

        let poly = two_class_model(KernelFunction::polynomial(1).unwrap());
        assert!(poly.feature_weights().is_err());
        // polynomial of degree 1 is the dot product evaluated through the expansion
        assert_relative_eq!(poly.margin(), 1.0 / norm, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_input() {
        let stats = NormalizationStats::from_stats(vec![
            crate::data::AttributeStats { mean: 1.0, variance: 4.0 },
            crate::data::AttributeStats { mean: 0.0, variance: 1.0 },
        ]);
        let model = two_class_model(KernelFunction::Dot).with_normalization(Some(stats));
        // [3, 1] standardizes to [1, 1]
        assert_relative_eq!(model.score(&[3.0, 1.0]), 0.1 + 0.75 + 0.875, epsilon = 1e-12);
        assert!(model.formula().contains("standardized"));
    }

    #[test]
    fn test_formula() {
        let linear = two_class_model(KernelFunction::Dot).formula();
        assert!(linear.starts_with("f(x) = 0.100000"));
        assert!(linear.contains("+ 0.750000 * a"));

        let kernel = two_class_model(KernelFunction::radial(0.5).unwrap()).formula();
        assert!(kernel.contains("- 0.250000 * K(x2, x)"));
        assert!(!kernel.contains("K(x3, x)"));
        assert!(kernel.contains("radial(gamma=0.5)"));
    }

    #[test]
    fn test_serde_roundtrip_keeps_scores() {
        let model = two_class_model(KernelFunction::Dot);
        let json = serde_json::to_string(&model).unwrap();
        let back: KernelModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score(&[0.3, -0.7]), model.score(&[0.3, -0.7]));
    }

    #[test]
    fn test_model_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KernelModel>();
    }
}
