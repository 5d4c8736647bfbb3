//! Training data: dataset readers, standardization and the dense example matrix

pub mod examples;
pub mod libsvm;
pub mod normalization;

pub use self::examples::TrainingExamples;
pub use self::libsvm::LibSVMDataset;
pub use self::normalization::{AttributeStats, NormalizationStats};
