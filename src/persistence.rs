//! Model serialization and persistence
//!
//! Trained models are written as pretty-printed JSON together with a small
//! metadata header, for use with the CLI application and other scenarios where
//! a model outlives the training run.

use crate::config::Algorithm;
use crate::core::{KernelError, Result};
use crate::model::{KernelModel, TrainingOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A model plus the metadata describing how it was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedModel {
    pub metadata: ModelMetadata,
    pub model: KernelModel,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Trainer backend name
    pub algorithm: String,
    pub n_support_vectors: usize,
    pub n_attributes: usize,
    /// Iterations (or generations) the run took
    pub iterations: usize,
    pub converged: bool,
    /// Creation timestamp
    pub created_at: String,
}

impl SavedModel {
    /// Wrap a finished training run
    pub fn from_outcome(outcome: &TrainingOutcome, algorithm: Algorithm) -> Self {
        let model = outcome.model.without_zero_weights();
        Self {
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                algorithm: algorithm.name().to_string(),
                n_support_vectors: model.n_support_vectors(),
                n_attributes: model.dim(),
                iterations: outcome.convergence.iterations(),
                converged: outcome.convergence.is_converged(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            model,
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| KernelError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load a model file and check that its parts fit together
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let saved: SavedModel = serde_json::from_reader(reader)
            .map_err(|e| KernelError::SerializationError(e.to_string()))?;
        saved.check()?;
        Ok(saved)
    }

    fn check(&self) -> Result<()> {
        let model = &self.model;
        model.kernel().validate()?;
        let dim = model.dim();
        if let Some(sv) = model.support_vectors().iter().find(|sv| sv.x.len() != dim) {
            return Err(KernelError::dimension("stored support vector", dim, sv.x.len()));
        }
        if let Some(stats) = model.normalization() {
            if stats.dim() != dim {
                return Err(KernelError::dimension("stored normalization", dim, stats.dim()));
            }
        }
        Ok(())
    }

    pub fn into_model(self) -> KernelModel {
        self.model
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== Kernel Model Summary ===");
        println!("Algorithm: {}", self.metadata.algorithm);
        println!("Kernel: {}", self.model.kernel().describe());
        match self.model.class_names() {
            Some(classes) => println!("Task: classification ({} / {})", classes.negative, classes.positive),
            None => println!("Task: regression"),
        }
        println!("Attributes: {}", self.metadata.n_attributes);
        println!("Support Vectors: {}", self.metadata.n_support_vectors);
        println!("Bias: {:.6}", self.model.bias());
        println!(
            "Training: {} iterations ({})",
            self.metadata.iterations,
            if self.metadata.converged {
                "converged"
            } else {
                "not fully converged"
            }
        );
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
    }
}
