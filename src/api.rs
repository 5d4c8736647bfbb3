//! High-level entry points for training and evaluating kernel models
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kernlearn::api;
//! use kernlearn::config::{ParameterMap, TrainerConfig};
//! use kernlearn::data::LibSVMDataset;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ParameterMap::from_pairs([("kernel_type", "radial"), ("kernel_gamma", "0.5")]);
//! let config = TrainerConfig::from_params(&params)?;
//!
//! let dataset = LibSVMDataset::from_file("data.libsvm")?;
//! let outcome = api::train(&dataset, &config)?;
//!
//! let metrics = api::evaluate(&outcome.model, &dataset)?;
//! println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::config::{ParameterMap, TrainerConfig};
use crate::core::{CancellationToken, Dataset, KernelError, Prediction, Result};
use crate::data::{LibSVMDataset, TrainingExamples};
use crate::model::{KernelModel, TrainingOutcome};
use crate::solver::build_trainer;
use log::info;
use std::path::Path;
use std::thread;

/// Train on a dataset with a fresh cancellation token
pub fn train<D: Dataset + ?Sized>(dataset: &D, config: &TrainerConfig) -> Result<TrainingOutcome> {
    train_cancellable(dataset, config, &CancellationToken::new())
}

/// Train on a dataset; `cancel` may be raised from another thread
pub fn train_cancellable<D: Dataset + ?Sized>(
    dataset: &D,
    config: &TrainerConfig,
    cancel: &CancellationToken,
) -> Result<TrainingOutcome> {
    config.validate()?;
    let examples = TrainingExamples::from_dataset(dataset, config.scale)?;
    train_examples(&examples, config, cancel)
}

/// Parse the parameter map first, then train; configuration errors never touch the data
pub fn train_with_params<D: Dataset + ?Sized>(
    dataset: &D,
    params: &ParameterMap,
) -> Result<TrainingOutcome> {
    let config = TrainerConfig::from_params(params)?;
    train(dataset, &config)
}

/// Train on already prepared examples
pub fn train_examples(
    examples: &TrainingExamples,
    config: &TrainerConfig,
    cancel: &CancellationToken,
) -> Result<TrainingOutcome> {
    config.validate()?;
    let trainer = build_trainer(config);
    info!(
        "Training {} model on {} examples with {} attributes, kernel {}",
        trainer.name(),
        examples.len(),
        examples.dim(),
        config.kernel
    );
    trainer.train(examples, cancel)
}

/// Train from a LibSVM format file
pub fn train_from_file<P: AsRef<Path>>(path: P, config: &TrainerConfig) -> Result<TrainingOutcome> {
    config.validate()?;
    let dataset = LibSVMDataset::from_file(path)?;
    train(&dataset, config)
}

/// Run one independent training per configuration, each on its own thread
///
/// Results come back in the order of `configs`.
pub fn train_parallel<D: Dataset + ?Sized>(
    dataset: &D,
    configs: &[TrainerConfig],
) -> Vec<Result<TrainingOutcome>> {
    thread::scope(|scope| {
        let handles: Vec<_> = configs
            .iter()
            .map(|config| scope.spawn(move || train(dataset, config)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

/// Predict every row of a dataset, checking the input width
pub fn predict_dataset<D: Dataset + ?Sized>(
    model: &KernelModel,
    dataset: &D,
) -> Result<Vec<Prediction>> {
    (0..dataset.len())
        .map(|i| model.try_predict(&dataset.row(i)))
        .collect()
}

/// Confusion counts of a two-class model on a labelled dataset
pub fn evaluate<D: Dataset + ?Sized>(model: &KernelModel, dataset: &D) -> Result<EvaluationMetrics> {
    if !model.is_classification() || dataset.class_names().is_none() {
        return Err(KernelError::NotApplicable(
            "classification metrics need a two-class model and labelled data".to_string(),
        ));
    }
    let predictions = predict_dataset(model, dataset)?;

    let mut tp = 0; // True positives
    let mut tn = 0; // True negatives
    let mut fp = 0; // False positives
    let mut fn_ = 0; // False negatives

    for (pred, actual) in predictions.iter().zip(dataset.targets()) {
        match (pred.label > 0.0, actual > 0.0) {
            (true, true) => tp += 1,
            (false, false) => tn += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
        }
    }

    Ok(EvaluationMetrics::new(tp, tn, fp, fn_))
}

/// Error summary of a regression model on a dataset
pub fn evaluate_regression<D: Dataset + ?Sized>(
    model: &KernelModel,
    dataset: &D,
) -> Result<RegressionMetrics> {
    if model.is_classification() {
        return Err(KernelError::NotApplicable(
            "regression metrics need a regression model".to_string(),
        ));
    }
    let predictions = predict_dataset(model, dataset)?;
    let residuals: Vec<f64> = predictions
        .iter()
        .zip(dataset.targets())
        .map(|(pred, actual)| pred.label - actual)
        .collect();
    Ok(RegressionMetrics::from_residuals(&residuals))
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }
}

/// Regression error summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub count: usize,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
}

impl RegressionMetrics {
    fn from_residuals(residuals: &[f64]) -> Self {
        if residuals.is_empty() {
            return Self {
                count: 0,
                rmse: 0.0,
                mae: 0.0,
            };
        }
        let n = residuals.len() as f64;
        Self {
            count: residuals.len(),
            rmse: (residuals.iter().map(|r| r * r).sum::<f64>() / n).sqrt(),
            mae: residuals.iter().map(|r| r.abs()).sum::<f64>() / n,
        }
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;
    use crate::kernel::KernelFunction;

    /// Dot-kernel dual SVM on LibSVM data with default parameters
    pub fn train_libsvm<P: AsRef<Path>>(path: P) -> Result<KernelModel> {
        Ok(train_from_file(path, &TrainerConfig::dual(KernelFunction::Dot))?.model)
    }

    /// Train on one LibSVM file, report accuracy on another
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
        config: &TrainerConfig,
    ) -> Result<f64> {
        let model = train_from_file(train_path, config)?.model;
        let test = LibSVMDataset::from_file(test_path)?;
        Ok(evaluate(&model, &test)?.accuracy())
    }
}
