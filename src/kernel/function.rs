//! The closed family of kernel functions
//!
//! Every kernel is a variant of [`KernelFunction`] carrying its own
//! hyperparameters. Evaluation is a single match over the variants:
//!
//! | kind                 | K(u, v)                                              |
//! |----------------------|------------------------------------------------------|
//! | dot                  | u·v                                                  |
//! | radial               | exp(-γ‖u-v‖²)                                        |
//! | polynomial           | (u·v)^d                                              |
//! | neural               | tanh(a·(u·v) + b)                                    |
//! | anova                | (Σⱼ exp(-γ(uⱼ-vⱼ)²))^d                               |
//! | epanechnikov         | (1 - r²)^d for r = ‖u-v‖/σ₁ ≤ 1, else 0              |
//! | gaussian_combination | Σₛ exp(-‖u-v‖²/σₛ), s ∈ {1, 2, 3}                    |
//! | multiquadric         | sqrt(‖u-v‖²/σ₁ + shift²)                             |

use crate::config::ParameterMap;
use crate::core::{ConfigurationError, Result};
use crate::kernel::ops::{dot, squared_distance};
use crate::kernel::Kernel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kernel kind without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    Dot,
    Radial,
    Polynomial,
    Neural,
    Anova,
    Epanechnikov,
    GaussianCombination,
    Multiquadric,
}

impl KernelKind {
    pub const ALL: [KernelKind; 8] = [
        KernelKind::Dot,
        KernelKind::Radial,
        KernelKind::Polynomial,
        KernelKind::Neural,
        KernelKind::Anova,
        KernelKind::Epanechnikov,
        KernelKind::GaussianCombination,
        KernelKind::Multiquadric,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            KernelKind::Dot => "dot",
            KernelKind::Radial => "radial",
            KernelKind::Polynomial => "polynomial",
            KernelKind::Neural => "neural",
            KernelKind::Anova => "anova",
            KernelKind::Epanechnikov => "epanechnikov",
            KernelKind::GaussianCombination => "gaussian_combination",
            KernelKind::Multiquadric => "multiquadric",
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        KernelKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownValue {
                name: "kernel_type".to_string(),
                value: s.to_string(),
                expected: KernelKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Parametrized kernel function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KernelFunction {
    Dot,
    Radial { gamma: f64 },
    Polynomial { degree: u32 },
    Neural { a: f64, b: f64 },
    Anova { gamma: f64, degree: u32 },
    Epanechnikov { sigma1: f64, degree: u32 },
    GaussianCombination { sigma1: f64, sigma2: f64, sigma3: f64 },
    Multiquadric { sigma1: f64, shift: f64 },
}

impl Default for KernelFunction {
    fn default() -> Self {
        KernelFunction::Dot
    }
}

impl KernelFunction {
    /// Linear kernel K(u, v) = u·v
    pub fn dot() -> Self {
        KernelFunction::Dot
    }

    pub fn radial(gamma: f64) -> Result<Self> {
        KernelFunction::Radial { gamma }.validated()
    }

    pub fn polynomial(degree: u32) -> Result<Self> {
        KernelFunction::Polynomial { degree }.validated()
    }

    pub fn neural(a: f64, b: f64) -> Result<Self> {
        KernelFunction::Neural { a, b }.validated()
    }

    pub fn anova(gamma: f64, degree: u32) -> Result<Self> {
        KernelFunction::Anova { gamma, degree }.validated()
    }

    pub fn epanechnikov(sigma1: f64, degree: u32) -> Result<Self> {
        KernelFunction::Epanechnikov { sigma1, degree }.validated()
    }

    pub fn gaussian_combination(sigma1: f64, sigma2: f64, sigma3: f64) -> Result<Self> {
        KernelFunction::GaussianCombination {
            sigma1,
            sigma2,
            sigma3,
        }
        .validated()
    }

    pub fn multiquadric(sigma1: f64, shift: f64) -> Result<Self> {
        KernelFunction::Multiquadric { sigma1, shift }.validated()
    }

    /// Build a kernel from the flat parameter map.
    ///
    /// Reads `kernel_type` (default `dot`) and then exactly the keys that kind
    /// needs; a missing key is a `MissingParameter` error.
    pub fn from_params(params: &ParameterMap) -> std::result::Result<Self, ConfigurationError> {
        let kind: KernelKind = params.str_or("kernel_type", "dot").parse()?;
        let kernel = match kind {
            KernelKind::Dot => KernelFunction::Dot,
            KernelKind::Radial => KernelFunction::Radial {
                gamma: params.require_f64("kernel_gamma")?,
            },
            KernelKind::Polynomial => KernelFunction::Polynomial {
                degree: params.require_u32("kernel_degree")?,
            },
            KernelKind::Neural => KernelFunction::Neural {
                a: params.require_f64("kernel_a")?,
                b: params.require_f64("kernel_b")?,
            },
            KernelKind::Anova => KernelFunction::Anova {
                gamma: params.require_f64("kernel_gamma")?,
                degree: params.require_u32("kernel_degree")?,
            },
            KernelKind::Epanechnikov => KernelFunction::Epanechnikov {
                sigma1: params.require_f64("kernel_sigma1")?,
                degree: params.require_u32("kernel_degree")?,
            },
            KernelKind::GaussianCombination => KernelFunction::GaussianCombination {
                sigma1: params.require_f64("kernel_sigma1")?,
                sigma2: params.require_f64("kernel_sigma2")?,
                sigma3: params.require_f64("kernel_sigma3")?,
            },
            KernelKind::Multiquadric => KernelFunction::Multiquadric {
                sigma1: params.require_f64("kernel_sigma1")?,
                shift: params.require_f64("kernel_shift")?,
            },
        };
        kernel.check()?;
        Ok(kernel)
    }

    pub fn kind(&self) -> KernelKind {
        match self {
            KernelFunction::Dot => KernelKind::Dot,
            KernelFunction::Radial { .. } => KernelKind::Radial,
            KernelFunction::Polynomial { .. } => KernelKind::Polynomial,
            KernelFunction::Neural { .. } => KernelKind::Neural,
            KernelFunction::Anova { .. } => KernelKind::Anova,
            KernelFunction::Epanechnikov { .. } => KernelKind::Epanechnikov,
            KernelFunction::GaussianCombination { .. } => KernelKind::GaussianCombination,
            KernelFunction::Multiquadric { .. } => KernelKind::Multiquadric,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, KernelFunction::Dot)
    }

    /// Check that every hyperparameter lies in the domain of its kind
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(Into::into)
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    fn check(&self) -> std::result::Result<(), ConfigurationError> {
        match *self {
            KernelFunction::Dot => Ok(()),
            KernelFunction::Radial { gamma } => positive("kernel_gamma", gamma),
            KernelFunction::Polynomial { degree } => exponent(degree),
            KernelFunction::Neural { a, b } => {
                finite("kernel_a", a)?;
                finite("kernel_b", b)
            }
            KernelFunction::Anova { gamma, degree } => {
                positive("kernel_gamma", gamma)?;
                exponent(degree)
            }
            KernelFunction::Epanechnikov { sigma1, degree } => {
                positive("kernel_sigma1", sigma1)?;
                exponent(degree)
            }
            KernelFunction::GaussianCombination {
                sigma1,
                sigma2,
                sigma3,
            } => {
                positive("kernel_sigma1", sigma1)?;
                positive("kernel_sigma2", sigma2)?;
                positive("kernel_sigma3", sigma3)
            }
            KernelFunction::Multiquadric { sigma1, shift } => {
                positive("kernel_sigma1", sigma1)?;
                finite("kernel_shift", shift)
            }
        }
    }

    /// Evaluate K(u, v)
    pub fn evaluate(&self, u: &[f64], v: &[f64]) -> f64 {
        match *self {
            KernelFunction::Dot => dot(u, v),
            KernelFunction::Radial { gamma } => (-gamma * squared_distance(u, v)).exp(),
            KernelFunction::Polynomial { degree } => dot(u, v).powi(degree as i32),
            KernelFunction::Neural { a, b } => (a * dot(u, v) + b).tanh(),
            KernelFunction::Anova { gamma, degree } => {
                let sum: f64 = u
                    .iter()
                    .zip(v)
                    .map(|(x, y)| (-gamma * (x - y) * (x - y)).exp())
                    .sum();
                sum.powi(degree as i32)
            }
            KernelFunction::Epanechnikov { sigma1, degree } => {
                let r = squared_distance(u, v).sqrt() / sigma1;
                if r > 1.0 {
                    0.0
                } else {
                    (1.0 - r * r).powi(degree as i32)
                }
            }
            KernelFunction::GaussianCombination {
                sigma1,
                sigma2,
                sigma3,
            } => {
                let d2 = squared_distance(u, v);
                (-d2 / sigma1).exp() + (-d2 / sigma2).exp() + (-d2 / sigma3).exp()
            }
            KernelFunction::Multiquadric { sigma1, shift } => {
                (squared_distance(u, v) / sigma1 + shift * shift).sqrt()
            }
        }
    }

    /// Short human-readable form, e.g. `radial(gamma=0.5)`
    pub fn describe(&self) -> String {
        match *self {
            KernelFunction::Dot => "dot".to_string(),
            KernelFunction::Radial { gamma } => format!("radial(gamma={gamma})"),
            KernelFunction::Polynomial { degree } => format!("polynomial(degree={degree})"),
            KernelFunction::Neural { a, b } => format!("neural(a={a}, b={b})"),
            KernelFunction::Anova { gamma, degree } => {
                format!("anova(gamma={gamma}, degree={degree})")
            }
            KernelFunction::Epanechnikov { sigma1, degree } => {
                format!("epanechnikov(sigma1={sigma1}, degree={degree})")
            }
            KernelFunction::GaussianCombination {
                sigma1,
                sigma2,
                sigma3,
            } => format!(
                "gaussian_combination(sigma1={sigma1}, sigma2={sigma2}, sigma3={sigma3})"
            ),
            KernelFunction::Multiquadric { sigma1, shift } => {
                format!("multiquadric(sigma1={sigma1}, shift={shift})")
            }
        }
    }
}

impl Kernel for KernelFunction {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        self.evaluate(x, y)
    }
}

impl fmt::Display for KernelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn positive(name: &str, value: f64) -> std::result::Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(name, value, "must be positive"))
    }
}

fn finite(name: &str, value: f64) -> std::result::Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(name, value, "must be finite"))
    }
}

/// Degrees feed `powi`, which takes an `i32`
fn exponent(degree: u32) -> std::result::Result<(), ConfigurationError> {
    if i32::try_from(degree).is_ok() {
        Ok(())
    } else {
        Err(ConfigurationError::invalid("kernel_degree", degree, "is too large"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KernelError;
    use approx::assert_relative_eq;

    fn all_kernels() -> Vec<KernelFunction> {
        vec![
            KernelFunction::dot(),
            KernelFunction::radial(0.5).unwrap(),
            KernelFunction::polynomial(3).unwrap(),
            KernelFunction::neural(0.1, -0.2).unwrap(),
            KernelFunction::anova(0.5, 2).unwrap(),
            KernelFunction::epanechnikov(4.0, 2).unwrap(),
            KernelFunction::gaussian_combination(1.0, 2.0, 3.0).unwrap(),
            KernelFunction::multiquadric(1.0, 0.5).unwrap(),
        ]
    }

    #[test]
    fn test_dot_and_polynomial() {
        let u = [1.0, 2.0];
        let v = [3.0, -1.0];
        assert_eq!(KernelFunction::dot().evaluate(&u, &v), 1.0);
        assert_eq!(KernelFunction::polynomial(2).unwrap().evaluate(&u, &[2.0, 1.0]), 16.0);
        assert_eq!(KernelFunction::polynomial(0).unwrap().evaluate(&u, &v), 1.0);
    }

    #[test]
    fn test_radial_kernel() {
        let k = KernelFunction::radial(1.0).unwrap();
        assert_relative_eq!(k.evaluate(&[1.0, 2.0], &[1.0, 2.0]), 1.0);
        assert_relative_eq!(k.evaluate(&[1.0], &[3.0]), (-4.0f64).exp());
    }

    #[test]
    fn test_neural_kernel() {
        let k = KernelFunction::neural(0.5, 1.0).unwrap();
        assert_relative_eq!(k.evaluate(&[1.0, 1.0], &[2.0, 0.0]), (0.5f64 * 2.0 + 1.0).tanh());
    }

    #[test]
    fn test_anova_kernel() {
        let k = KernelFunction::anova(1.0, 2).unwrap();
        // exp(0) + exp(-1) squared
        let expected = (1.0 + (-1.0f64).exp()).powi(2);
        assert_relative_eq!(k.evaluate(&[0.0, 1.0], &[0.0, 2.0]), expected);
    }

    #[test]
    fn test_epanechnikov_support() {
        let k = KernelFunction::epanechnikov(2.0, 1).unwrap();
        assert_relative_eq!(k.evaluate(&[0.0], &[1.0]), 0.75);
        assert_eq!(k.evaluate(&[0.0], &[3.0]), 0.0);
    }

    #[test]
    fn test_gaussian_combination_and_multiquadric() {
        let g = KernelFunction::gaussian_combination(1.0, 2.0, 4.0).unwrap();
        let d2: f64 = 4.0;
        let expected = (-d2).exp() + (-d2 / 2.0).exp() + (-d2 / 4.0).exp();
        assert_relative_eq!(g.evaluate(&[0.0], &[2.0]), expected);

        let m = KernelFunction::multiquadric(2.0, 1.0).unwrap();
        assert_relative_eq!(m.evaluate(&[0.0], &[2.0]), 3.0f64.sqrt());
    }

    #[test]
    fn test_kernels_are_symmetric() {
        let u = [0.3, -1.2, 2.0];
        let v = [1.1, 0.4, -0.5];
        for k in all_kernels() {
            assert_eq!(k.evaluate(&u, &v), k.evaluate(&v, &u), "{k}");
        }
    }

    #[test]
    fn test_invalid_hyperparameters_rejected() {
        assert!(matches!(
            KernelFunction::radial(0.0),
            Err(KernelError::Configuration(ConfigurationError::InvalidParameter { .. }))
        ));
        assert!(KernelFunction::radial(f64::NAN).is_err());
        assert!(KernelFunction::gaussian_combination(1.0, -1.0, 1.0).is_err());
        assert!(KernelFunction::neural(f64::INFINITY, 0.0).is_err());
        assert!(KernelFunction::Radial { gamma: -1.0 }.validate().is_err());
    }

    #[test]
    fn test_from_params_requires_kind_specific_keys() {
        let mut params = ParameterMap::new();
        params.set("kernel_type", "radial");
        assert_eq!(
            KernelFunction::from_params(&params),
            Err(ConfigurationError::MissingParameter {
                name: "kernel_gamma".to_string()
            })
        );

        params.set("kernel_gamma", "0.25");
        assert_eq!(
            KernelFunction::from_params(&params),
            Ok(KernelFunction::Radial { gamma: 0.25 })
        );
    }

    #[test]
    fn test_from_params_defaults_to_dot() {
        assert_eq!(
            KernelFunction::from_params(&ParameterMap::new()),
            Ok(KernelFunction::Dot)
        );
    }

    #[test]
    fn test_oversized_degree_rejected() {
        let too_large = i32::MAX as u32 + 1;
        for kernel in [
            KernelFunction::polynomial(too_large),
            KernelFunction::anova(0.5, too_large),
            KernelFunction::epanechnikov(1.0, u32::MAX),
        ] {
            assert!(matches!(
                kernel,
                Err(KernelError::Configuration(ConfigurationError::InvalidParameter { ref name, .. }))
                    if name == "kernel_degree"
            ));
        }
        assert!(KernelFunction::polynomial(i32::MAX as u32).is_ok());

        let params = ParameterMap::from_pairs([
            ("kernel_type", "polynomial"),
            ("kernel_degree", "4294967295"),
        ]);
        assert!(matches!(
            KernelFunction::from_params(&params),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_from_params_negative_degree() {
        let params = ParameterMap::from_pairs([("kernel_type", "polynomial"), ("kernel_degree", "-2")]);
        assert!(matches!(
            KernelFunction::from_params(&params),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Gaussian Combination".parse::<KernelKind>(), Ok(KernelKind::GaussianCombination));
        assert_eq!("RADIAL".parse::<KernelKind>(), Ok(KernelKind::Radial));
        assert!("sigmoid".parse::<KernelKind>().is_err());
        for kind in KernelKind::ALL {
            assert_eq!(kind.name().parse::<KernelKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_kind_and_describe() {
        let k = KernelFunction::anova(0.5, 3).unwrap();
        assert_eq!(k.kind(), KernelKind::Anova);
        assert_eq!(k.describe(), "anova(gamma=0.5, degree=3)");
        assert!(KernelFunction::dot().is_linear());
        assert!(!k.is_linear());
    }

    #[test]
    fn test_serde_roundtrip_tagged() {
        let k = KernelFunction::radial(0.5).unwrap();
        let json = serde_json::to_string(&k).unwrap();
        assert!(json.contains("\"kind\":\"radial\""));
        let back: KernelFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, k);
    }

    #[test]
    fn test_numerical_stability() {
        let k = KernelFunction::radial(1e-6).unwrap();
        let value = k.evaluate(&[1e6], &[-1e6]);
        assert!(value.is_finite() && (0.0..=1.0).contains(&value));
    }
}
