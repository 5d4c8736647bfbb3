//! Kernel-based learning engine
//!
//! Support vector machines and regression, relevance vector machines, kernel
//! logistic regression (dual and evolutionary) and sparse Gaussian-process
//! regression, all producing one [`KernelModel`] scored as a weighted kernel
//! expansion plus a bias.

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod data;
pub mod kernel;
pub mod model;
pub mod persistence;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, RegressionMetrics};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::config::{Algorithm, ParameterMap, TrainerConfig};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{ConfigurationError, KernelError, Result};
pub use crate::data::{LibSVMDataset, NormalizationStats, TrainingExamples};
pub use crate::kernel::{Kernel, KernelFunction, KernelKind};
pub use crate::model::{KernelModel, TrainingOutcome};
pub use crate::solver::{build_trainer, Trainer};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
