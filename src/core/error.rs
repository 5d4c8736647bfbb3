//! Error types for the kernel learning engine

use thiserror::Error;

/// Invalid or missing hyperparameter, detected before any training work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid value for parameter '{name}': {value} ({reason})")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Unknown value for parameter '{name}': {value} (expected one of: {expected})")]
    UnknownValue {
        name: String,
        value: String,
        expected: String,
    },
}

impl ConfigurationError {
    pub(crate) fn missing(name: &str) -> Self {
        Self::MissingParameter {
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid(name: &str, value: impl ToString, reason: &str) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label at example {index}: expected -1 or +1, got {value}")]
    InvalidLabel { index: usize, value: f64 },

    #[error("Ill-conditioned problem: {context}")]
    IllConditionedProblem { context: String },

    #[error("Training cancelled")]
    TrainingCancelled,

    #[error("Not applicable: {0}")]
    NotApplicable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl KernelError {
    pub(crate) fn dimension(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    pub(crate) fn ill_conditioned(context: impl Into<String>) -> Self {
        Self::IllConditionedProblem {
            context: context.into(),
        }
    }

    /// True for errors raised before any training work starts
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
