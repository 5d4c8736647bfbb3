//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! A file whose labels are integers taking at most two distinct values is
//! read as a two-class problem: the smaller label becomes the negative class
//! (-1) and the larger one the positive class (+1). Anything else is read as
//! regression with the labels as targets.

use crate::core::{ClassNames, Dataset, KernelError, Result, SparseVector};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset implementation for LibSVM format files
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    rows: Vec<SparseVector>,
    /// Labels as written in the file
    labels: Vec<f64>,
    targets: Vec<f64>,
    dimensions: usize,
    class_names: Option<ClassNames>,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        let mut max_dimension = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, features) = Self::parse_line(line).map_err(|e| {
                KernelError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            max_dimension = max_dimension.max(features.min_dim());
            labels.push(label);
            rows.push(features);
        }

        if rows.is_empty() {
            return Err(KernelError::EmptyDataset);
        }

        let (targets, class_names) = encode_labels(&labels);
        debug!(
            "Loaded {} libsvm rows with {} attributes ({})",
            rows.len(),
            max_dimension,
            if class_names.is_some() { "classification" } else { "regression" }
        );

        Ok(LibSVMDataset {
            rows,
            labels,
            targets,
            dimensions: max_dimension,
            class_names,
        })
    }

    /// Treat the labels as real-valued targets even if they look like two classes
    pub fn into_regression(mut self) -> Self {
        if self.class_names.take().is_some() {
            self.targets = self.labels.clone();
        }
        self
    }

    /// ±1 targets against an existing pair of classes
    ///
    /// The file may hold only one of the two classes; a label matching
    /// neither class name is an error.
    pub fn targets_for(&self, classes: &ClassNames) -> Result<Vec<f64>> {
        let parse = |name: &str| {
            name.parse::<f64>().map_err(|_| {
                KernelError::InvalidDataset(format!("class '{name}' is not a numeric libsvm label"))
            })
        };
        let negative = parse(&classes.negative)?;
        let positive = parse(&classes.positive)?;

        self.labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                if label == positive {
                    Ok(1.0)
                } else if label == negative {
                    Ok(-1.0)
                } else {
                    Err(KernelError::InvalidDataset(format!(
                        "label {label} at example {i} is neither class {} nor {}",
                        classes.negative, classes.positive
                    )))
                }
            })
            .collect()
    }

    pub fn sparse_row(&self, i: usize) -> &SparseVector {
        &self.rows[i]
    }

    /// Parse a single line in libsvm format
    fn parse_line(line: &str) -> Result<(f64, SparseVector)> {
        let mut parts = line.split_whitespace();

        let label_str = parts
            .next()
            .ok_or_else(|| KernelError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| KernelError::ParseError(format!("Invalid label: {label_str}")))?;

        let mut indices = Vec::new();
        let mut values = Vec::new();

        for feature_str in parts {
            let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
                KernelError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index_str.parse::<usize>().map_err(|_| {
                KernelError::ParseError(format!("Invalid feature index: {index_str}"))
            })?;
            let value = value_str.parse::<f64>().map_err(|_| {
                KernelError::ParseError(format!("Invalid feature value: {value_str}"))
            })?;

            // libsvm uses 1-based indexing
            if index == 0 {
                return Err(KernelError::ParseError(format!(
                    "Feature index must be positive: {index}"
                )));
            }

            indices.push(index - 1);
            values.push(value);
        }

        Ok((label, SparseVector::new(indices, values)))
    }
}

/// Map raw labels to ±1 targets plus class names, or keep them as regression targets
fn encode_labels(labels: &[f64]) -> (Vec<f64>, Option<ClassNames>) {
    let mut distinct: Vec<f64> = Vec::new();
    for &label in labels {
        if !distinct.contains(&label) {
            distinct.push(label);
        }
        if distinct.len() > 2 || label.fract() != 0.0 {
            return (labels.to_vec(), None);
        }
    }
    distinct.sort_by(|a, b| a.total_cmp(b));

    let (negative, positive) = match distinct.as_slice() {
        [only] if *only > 0.0 => (-only.abs(), *only),
        [only] => (*only, only.abs().max(1.0)),
        [lo, hi] => (*lo, *hi),
        _ => return (labels.to_vec(), None),
    };
    let targets = labels
        .iter()
        .map(|&l| if l == positive { 1.0 } else { -1.0 })
        .collect();
    let classes = ClassNames::new(format_label(negative), format_label(positive));
    (targets, Some(classes))
}

fn format_label(label: f64) -> String {
    if label > 0.0 {
        format!("+{label}")
    } else {
        format!("{label}")
    }
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn row(&self, i: usize) -> Vec<f64> {
        self.rows[i].to_dense(self.dimensions)
    }

    fn target(&self, i: usize) -> f64 {
        self.targets[i]
    }

    fn class_names(&self) -> Option<ClassNames> {
        self.class_names.clone()
    }

    fn targets(&self) -> Vec<f64> {
        self.targets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_basic() {
        let (label, features) = LibSVMDataset::parse_line("+1 1:0.5 3:1.2").unwrap();

        assert_eq!(label, 1.0);
        assert_eq!(features.indices, vec![0, 2]); // 1-based to 0-based
        assert_eq!(features.values, vec![0.5, 1.2]);
        assert_eq!(features.min_dim(), 3);
    }

    #[test]
    fn test_parse_line_invalid_format() {
        assert!(LibSVMDataset::parse_line("+1 1").is_err());
        assert!(LibSVMDataset::parse_line("+1 abc:1.0").is_err());
        assert!(LibSVMDataset::parse_line("+1 1:abc").is_err());
        // Zero index (libsvm is 1-based)
        assert!(LibSVMDataset::parse_line("+1 0:1.0").is_err());
        assert!(LibSVMDataset::parse_line("x 1:1.0").is_err());
    }

    #[test]
    fn test_from_reader_classification() {
        let data = "+1 1:0.5 3:1.2\n-1 2:0.3 5:2.1\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
        assert_eq!(dataset.targets(), vec![1.0, -1.0]);
        assert_eq!(dataset.class_names(), Some(ClassNames::new("-1", "+1")));
        assert_eq!(dataset.row(0), vec![0.5, 0.0, 1.2, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_one_labels_become_two_classes() {
        let data = "0 1:1\n1 1:2\n1 1:3\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(dataset.targets(), vec![-1.0, 1.0, 1.0]);
        assert_eq!(dataset.class_names(), Some(ClassNames::new("0", "+1")));
    }

    #[test]
    fn test_real_labels_are_regression() {
        let data = "0.5 1:1\n1.5 1:2\n-2 1:3\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();
        assert!(dataset.class_names().is_none());
        assert_eq!(dataset.targets(), vec![0.5, 1.5, -2.0]);

        let three_classes = "1 1:1\n2 1:2\n3 1:3\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(three_classes)).unwrap();
        assert!(dataset.class_names().is_none());
    }

    #[test]
    fn test_into_regression() {
        let data = "3 1:1\n7 1:2\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data))
            .unwrap()
            .into_regression();
        assert!(dataset.class_names().is_none());
        assert_eq!(dataset.targets(), vec![3.0, 7.0]);
    }

    #[test]
    fn test_targets_for_model_classes() {
        let classes = ClassNames::new("+1", "+2");
        // Only the negative class is present, so the file alone reads it as positive
        let one_class = LibSVMDataset::from_reader(Cursor::new("1 1:1\n1 1:2\n")).unwrap();
        assert_eq!(one_class.targets(), vec![1.0, 1.0]);
        assert_eq!(one_class.targets_for(&classes).unwrap(), vec![-1.0, -1.0]);

        let both = LibSVMDataset::from_reader(Cursor::new("2 1:1\n1 1:2\n")).unwrap();
        assert_eq!(both.targets_for(&classes).unwrap(), vec![1.0, -1.0]);

        let unknown = LibSVMDataset::from_reader(Cursor::new("1 1:1\n3 1:2\n")).unwrap();
        assert!(matches!(
            unknown.targets_for(&classes),
            Err(KernelError::InvalidDataset(_))
        ));
        assert!(matches!(
            both.targets_for(&ClassNames::new("bad", "good")),
            Err(KernelError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_from_reader_empty_lines_and_comments() {
        let data = "# Comment line\n+1 1:0.5\n\n# Another comment\n-1 2:0.3\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.targets(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_from_reader_empty_dataset() {
        let result = LibSVMDataset::from_reader(Cursor::new("# Only comments\n\n"));
        assert!(matches!(result, Err(KernelError::EmptyDataset)));
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:0.5 3:1.2").expect("Failed to write");
        writeln!(temp_file, "-1 2:0.3 5:2.1").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let dataset = LibSVMDataset::from_file(temp_file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
    }

    #[test]
    fn test_from_file_io_error() {
        let result = LibSVMDataset::from_file("/non/existent/file.libsvm");
        assert!(matches!(result, Err(KernelError::IoError(_))));
    }
}
