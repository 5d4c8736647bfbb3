//! Core traits at the boundary with dataset providers

use crate::core::ClassNames;

/// Type of an input attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    Nominal,
}

/// Dataset abstraction supplied by collaborators
///
/// Rows are accessed densely; the label column is exposed as a real target.
/// For two-class problems `class_names` returns the class names and targets are
/// -1 (negative) or +1 (positive).
pub trait Dataset: Send + Sync {
    /// Number of examples in the dataset
    fn len(&self) -> usize;

    /// Number of attributes (dimensionality)
    fn dim(&self) -> usize;

    /// Get one row as a dense vector
    ///
    /// # Panics
    /// Panics if index >= len()
    fn row(&self, i: usize) -> Vec<f64>;

    /// Label or regression target of example `i`
    fn target(&self, i: usize) -> f64;

    /// Optional per-example weight
    fn weight(&self, _i: usize) -> Option<f64> {
        None
    }

    /// Attribute names, `att1..attN` unless the dataset knows better
    fn attribute_names(&self) -> Vec<String> {
        (1..=self.dim()).map(|j| format!("att{j}")).collect()
    }

    fn attribute_kind(&self, _j: usize) -> AttributeKind {
        AttributeKind::Numeric
    }

    /// Class names for two-class problems, `None` for regression
    fn class_names(&self) -> Option<ClassNames>;

    /// Get all targets as a vector
    fn targets(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.target(i)).collect()
    }

    /// The weight column, `None` when no row carries a weight
    ///
    /// A partial column comes back shorter than `len()`.
    fn weights(&self) -> Option<Vec<f64>> {
        let given: Vec<f64> = (0..self.len()).filter_map(|i| self.weight(i)).collect();
        (!given.is_empty()).then_some(given)
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Simple owned dataset
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    weights: Option<Vec<f64>>,
    attribute_names: Option<Vec<String>>,
    class_names: Option<ClassNames>,
}

impl InMemoryDataset {
    /// Regression dataset with real-valued targets
    pub fn regression(rows: Vec<Vec<f64>>, targets: Vec<f64>) -> Self {
        Self {
            rows,
            targets,
            weights: None,
            attribute_names: None,
            class_names: None,
        }
    }

    /// Two-class dataset with ±1 targets and default class names
    pub fn classification(rows: Vec<Vec<f64>>, labels: Vec<f64>) -> Self {
        Self {
            class_names: Some(ClassNames::default()),
            ..Self::regression(rows, labels)
        }
    }

    pub fn with_class_names(mut self, classes: ClassNames) -> Self {
        self.class_names = Some(classes);
        self
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_attribute_names(mut self, names: Vec<String>) -> Self {
        self.attribute_names = Some(names);
        self
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn dim(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    fn row(&self, i: usize) -> Vec<f64> {
        self.rows[i].clone()
    }

    fn target(&self, i: usize) -> f64 {
        self.targets[i]
    }

    fn weight(&self, i: usize) -> Option<f64> {
        self.weights.as_ref().and_then(|w| w.get(i).copied())
    }

    fn attribute_names(&self) -> Vec<String> {
        match &self.attribute_names {
            Some(names) => names.clone(),
            None => (1..=self.dim()).map(|j| format!("att{j}")).collect(),
        }
    }

    fn class_names(&self) -> Option<ClassNames> {
        self.class_names.clone()
    }

    fn targets(&self) -> Vec<f64> {
        self.targets.clone()
    }

    fn weights(&self) -> Option<Vec<f64>> {
        self.weights.clone()
    }
}
