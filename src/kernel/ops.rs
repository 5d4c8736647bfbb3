//! Dense vector primitives used by the kernel formulas

/// Dot product of two dense vectors of equal length
///
/// Extra trailing entries of the longer slice are ignored.
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

/// Squared Euclidean distance ||x - y||²
pub fn squared_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}

/// Squared L2 norm
pub fn norm_squared(x: &[f64]) -> f64 {
    dot(x, x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product() {
        assert_eq!(dot(&[1.0, 3.0, 2.0], &[2.0, 2.0, 4.0]), 16.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn test_squared_distance() {
        // (1-0)² + (3-2)² + (0-1)² + (2-4)² = 7
        assert_eq!(squared_distance(&[1.0, 3.0, 0.0, 2.0], &[0.0, 2.0, 1.0, 4.0]), 7.0);
        assert_eq!(squared_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_norm_squared() {
        assert_eq!(norm_squared(&[3.0, 4.0]), 25.0);
    }
}
