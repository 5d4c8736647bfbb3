//! Per-attribute mean/variance standardization
//!
//! Statistics are computed once from the training matrix and applied
//! unchanged to every example seen at prediction time. An attribute whose
//! training values are all equal has variance 0 and always maps to 0.

use serde::{Deserialize, Serialize};

/// Mean and sample variance of one attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeStats {
    pub mean: f64,
    pub variance: f64,
}

impl AttributeStats {
    /// Standardize a single value
    pub fn apply(&self, value: f64) -> f64 {
        if self.variance > 0.0 {
            (value - self.mean) / self.variance.sqrt()
        } else {
            0.0
        }
    }
}

/// Attribute index → (mean, variance)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    attributes: Vec<AttributeStats>,
}

impl NormalizationStats {
    /// Compute statistics column by column over `rows` (all of width `dim`)
    pub fn fit<R: AsRef<[f64]>>(rows: &[R], dim: usize) -> Self {
        let n = rows.len();
        let attributes = (0..dim)
            .map(|j| {
                let column = rows.iter().map(|r| r.as_ref()[j]);
                let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
                for v in column.clone() {
                    min = min.min(v);
                    max = max.max(v);
                    sum += v;
                }
                let mean = if n > 0 { sum / n as f64 } else { 0.0 };

                // Constant columns get exactly zero variance regardless of rounding.
                let variance = if n > 1 && max > min {
                    column.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
                } else {
                    0.0
                };
                AttributeStats { mean, variance }
            })
            .collect();

        Self { attributes }
    }

    pub fn from_stats(attributes: Vec<AttributeStats>) -> Self {
        Self { attributes }
    }

    pub fn dim(&self) -> usize {
        self.attributes.len()
    }

    pub fn get(&self, attribute: usize) -> Option<&AttributeStats> {
        self.attributes.get(attribute)
    }

    pub fn attributes(&self) -> &[AttributeStats] {
        &self.attributes
    }

    /// Standardize `row` in place; attributes without statistics are left untouched
    pub fn apply_in_place(&self, row: &mut [f64]) {
        for (value, stats) in row.iter_mut().zip(&self.attributes) {
            *value = stats.apply(*value);
        }
    }

    pub fn apply(&self, row: &[f64]) -> Vec<f64> {
        let mut out = row.to_vec();
        self.apply_in_place(&mut out);
        out
    }
}
