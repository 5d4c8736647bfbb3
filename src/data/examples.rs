//! Training examples shared by all trainer backends

use crate::core::{
    AttributeKind, ClassNames, Dataset, KernelError, Result, SparseVector, Task,
};
use crate::data::normalization::NormalizationStats;
use log::debug;

/// Dense, optionally standardized feature matrix with targets and weights
///
/// Lives for one training run; the trained model copies whatever it keeps.
#[derive(Debug, Clone)]
pub struct TrainingExamples {
    /// Row-major feature values
    data: Vec<f64>,
    n: usize,
    dim: usize,
    targets: Vec<f64>,
    weights: Option<Vec<f64>>,
    attribute_names: Vec<String>,
    class_names: Option<ClassNames>,
    normalization: Option<NormalizationStats>,
}

impl TrainingExamples {
    /// Build from dense rows.
    ///
    /// With `scale` set, per-attribute statistics are computed and the stored
    /// matrix is standardized.
    pub fn new(
        rows: Vec<Vec<f64>>,
        targets: Vec<f64>,
        weights: Option<Vec<f64>>,
        scale: bool,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(KernelError::EmptyDataset);
        }
        let n = rows.len();
        let dim = rows[0].len();

        if targets.len() != n {
            return Err(KernelError::dimension("targets", n, targets.len()));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(KernelError::dimension(&format!("row {i}"), dim, row.len()));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(KernelError::InvalidDataset(format!(
                    "non-finite value at row {i}, attribute {j}"
                )));
            }
        }
        if let Some(i) = targets.iter().position(|t| !t.is_finite()) {
            return Err(KernelError::InvalidDataset(format!(
                "non-finite target at row {i}"
            )));
        }
        if let Some(w) = &weights {
            if w.len() != n {
                return Err(KernelError::dimension("weights", n, w.len()));
            }
            if let Some(i) = w.iter().position(|v| !v.is_finite() || *v < 0.0) {
                return Err(KernelError::InvalidDataset(format!(
                    "weight at row {i} must be finite and non-negative, got {}",
                    w[i]
                )));
            }
        }

        let normalization = scale.then(|| NormalizationStats::fit(&rows, dim));
        let mut data = Vec::with_capacity(n * dim);
        for row in &rows {
            match &normalization {
                Some(stats) => data.extend(stats.apply(row)),
                None => data.extend_from_slice(row),
            }
        }
        debug!("Built {n} training examples with {dim} attributes (scaled: {scale})");

        Ok(Self {
            data,
            n,
            dim,
            targets,
            weights,
            attribute_names: (1..=dim).map(|j| format!("att{j}")).collect(),
            class_names: None,
            normalization,
        })
    }

    /// Build from sparse rows; the width is the largest index seen + 1
    pub fn from_sparse(
        rows: &[SparseVector],
        targets: Vec<f64>,
        weights: Option<Vec<f64>>,
        scale: bool,
    ) -> Result<Self> {
        let dim = rows.iter().map(SparseVector::min_dim).max().unwrap_or(0);
        let dense = rows.iter().map(|r| r.to_dense(dim)).collect();
        Self::new(dense, targets, weights, scale)
    }

    /// Pull every row, target and weight out of a dataset adapter
    pub fn from_dataset<D: Dataset + ?Sized>(dataset: &D, scale: bool) -> Result<Self> {
        if dataset.is_empty() {
            return Err(KernelError::EmptyDataset);
        }
        let dim = dataset.dim();
        let names = dataset.attribute_names();
        if names.len() != dim {
            return Err(KernelError::dimension("attribute names", dim, names.len()));
        }
        if let Some(j) = (0..dim).find(|&j| dataset.attribute_kind(j) == AttributeKind::Nominal) {
            return Err(KernelError::InvalidDataset(format!(
                "attribute '{}' is nominal; kernel learners need numeric attributes",
                names[j]
            )));
        }

        let rows: Vec<Vec<f64>> = (0..dataset.len()).map(|i| dataset.row(i)).collect();
        let weights = dataset.weights();

        let mut examples = Self::new(rows, dataset.targets(), weights, scale)?;
        if examples.dim != dim {
            return Err(KernelError::dimension("dataset rows", dim, examples.dim));
        }
        examples.attribute_names = names;
        examples.class_names = dataset.class_names();
        Ok(examples)
    }

    /// Mark the examples as a two-class problem with ±1 targets
    pub fn with_class_names(mut self, classes: ClassNames) -> Self {
        self.class_names = Some(classes);
        self
    }

    pub fn with_attribute_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.dim {
            return Err(KernelError::dimension("attribute names", self.dim, names.len()));
        }
        self.attribute_names = names;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Feature vector of example `i` (standardized if scaling was requested)
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n).map(move |i| self.row(i))
    }

    pub fn target(&self, i: usize) -> f64 {
        self.targets[i]
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Weight of example `i`, 1.0 when no weights were supplied
    pub fn weight(&self, i: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |w| w[i])
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    pub fn class_names(&self) -> Option<&ClassNames> {
        self.class_names.as_ref()
    }

    pub fn normalization(&self) -> Option<&NormalizationStats> {
        self.normalization.as_ref()
    }

    pub fn is_classification(&self) -> bool {
        self.class_names.is_some()
    }

    pub fn task(&self) -> Task {
        match &self.class_names {
            Some(classes) => Task::Classification {
                classes: classes.clone(),
            },
            None => Task::Regression,
        }
    }

    /// Every target must be -1 or +1
    pub fn validate_binary_labels(&self) -> Result<()> {
        match self
            .targets
            .iter()
            .position(|&y| y != 1.0 && y != -1.0)
        {
            Some(index) => Err(KernelError::InvalidLabel {
                index,
                value: self.targets[index],
            }),
            None => Ok(()),
        }
    }

    /// (positive, negative) label counts
    pub fn class_counts(&self) -> (usize, usize) {
        let positive = self.targets.iter().filter(|&&y| y > 0.0).count();
        (positive, self.n - positive)
    }
}
