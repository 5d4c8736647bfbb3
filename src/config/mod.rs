//! Trainer configuration
//!
//! [`TrainerConfig`] is the typed, validated form of the flat [`ParameterMap`].
//! Everything is checked here, before any training data is touched.

pub mod params;

pub use self::params::ParameterMap;

use crate::core::{ConfigurationError, Result};
use crate::kernel::KernelFunction;

/// Default kernel cache budget: 200 MB
pub const DEFAULT_CACHE_SIZE: usize = 200 * 1024 * 1024;

/// Which trainer backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Dual,
    Relevance,
    Evolutionary,
    GaussianProcess,
}

impl Algorithm {
    const NAMES: [&'static str; 4] = ["dual", "relevance", "evolutionary", "gaussian_process"];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Dual => "dual",
            Algorithm::Relevance => "relevance",
            Algorithm::Evolutionary => "evolutionary",
            Algorithm::GaussianProcess => "gaussian_process",
        }
    }
}

/// Loss optimized by the dual-coordinate solver on two-class problems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualLoss {
    /// Support vector machine
    Hinge,
    /// Kernel logistic regression
    Logistic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DualConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Cost factor for positive examples
    pub l_pos: f64,
    /// Cost factor for negative examples
    pub l_neg: f64,
    /// Rescale the class cost factors by inverse class frequency
    pub balance_cost: bool,
    /// Width of the epsilon-insensitive tube (regression only)
    pub epsilon: f64,
    /// Tolerance on the maximal KKT violation
    pub convergence_epsilon: f64,
    pub max_iterations: usize,
    pub loss: DualLoss,
}

impl Default for DualConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            l_pos: 1.0,
            l_neg: 1.0,
            balance_cost: false,
            epsilon: 0.0,
            convergence_epsilon: 0.001,
            max_iterations: 100_000,
            loss: DualLoss::Hinge,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceConfig {
    /// Bases whose precision exceeds this value are pruned
    pub alpha_max: f64,
    /// Stop once max |Δ log alpha| falls below this value
    pub min_delta_log_alpha: f64,
    /// Starting precision for every basis; 1/N² when unset
    pub initial_alpha: Option<f64>,
    pub max_iterations: usize,
    /// Cap on the number of example-anchored bases
    pub max_basis: Option<usize>,
    /// Add a constant basis carrying the bias
    pub use_bias: bool,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            alpha_max: 1e12,
            min_delta_log_alpha: 1e-3,
            initial_alpha: None,
            max_iterations: 100,
            max_basis: None,
            use_bias: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionScheme {
    /// Scalar fitness, tournament selection
    Tournament,
    /// Two objectives, non-dominated sorting
    Pareto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionaryConfig {
    pub c: f64,
    pub population_size: usize,
    pub max_generations: usize,
    pub generations_without_improvement: usize,
    pub selection: SelectionScheme,
    /// Tournament size as a fraction of the population
    pub tournament_fraction: f64,
    /// Elitism: carry the best individual into the next generation
    pub keep_best: bool,
    /// Variance of the Gaussian mutation, relative to C
    pub mutation_variance: f64,
    pub crossover_prob: f64,
    pub seed: Option<u64>,
}

impl Default for EvolutionaryConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            population_size: 20,
            max_generations: 1000,
            generations_without_improvement: 30,
            selection: SelectionScheme::Tournament,
            tournament_fraction: 0.75,
            keep_best: true,
            mutation_variance: 0.1,
            crossover_prob: 0.9,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaussianProcessConfig {
    pub max_basis_vectors: usize,
    /// Minimal prediction error for a point to be admitted as basis vector
    pub epsilon_tol: f64,
    /// Minimal orthogonal residual for a point to be admitted as basis vector
    pub geometrical_tol: f64,
    /// Observation noise variance
    pub noise_variance: f64,
}

impl Default for GaussianProcessConfig {
    fn default() -> Self {
        Self {
            max_basis_vectors: 100,
            epsilon_tol: 1e-7,
            geometrical_tol: 1e-7,
            noise_variance: 0.01,
        }
    }
}

/// Algorithm-specific settings
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmConfig {
    Dual(DualConfig),
    Relevance(RelevanceConfig),
    Evolutionary(EvolutionaryConfig),
    GaussianProcess(GaussianProcessConfig),
}

impl AlgorithmConfig {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            AlgorithmConfig::Dual(_) => Algorithm::Dual,
            AlgorithmConfig::Relevance(_) => Algorithm::Relevance,
            AlgorithmConfig::Evolutionary(_) => Algorithm::Evolutionary,
            AlgorithmConfig::GaussianProcess(_) => Algorithm::GaussianProcess,
        }
    }
}

/// Complete configuration of one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub kernel: KernelFunction,
    /// Standardize attributes before training and prediction
    pub scale: bool,
    /// Kernel cache size in bytes; 0 disables caching
    pub cache_size: usize,
    pub algorithm: AlgorithmConfig,
}

impl TrainerConfig {
    pub fn dual(kernel: KernelFunction) -> Self {
        Self::with_algorithm(kernel, AlgorithmConfig::Dual(DualConfig::default()))
    }

    pub fn relevance(kernel: KernelFunction) -> Self {
        Self::with_algorithm(kernel, AlgorithmConfig::Relevance(RelevanceConfig::default()))
    }

    pub fn evolutionary(kernel: KernelFunction) -> Self {
        Self::with_algorithm(
            kernel,
            AlgorithmConfig::Evolutionary(EvolutionaryConfig::default()),
        )
    }

    pub fn gaussian_process(kernel: KernelFunction) -> Self {
        Self::with_algorithm(
            kernel,
            AlgorithmConfig::GaussianProcess(GaussianProcessConfig::default()),
        )
    }

    pub fn with_algorithm(kernel: KernelFunction, algorithm: AlgorithmConfig) -> Self {
        Self {
            kernel,
            scale: true,
            cache_size: DEFAULT_CACHE_SIZE,
            algorithm,
        }
    }

    /// Enable or disable attribute standardization
    pub fn with_scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    /// Set kernel cache size in bytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Parse and validate a flat parameter map
    pub fn from_params(params: &ParameterMap) -> Result<Self> {
        let algorithm = match params.choice_or("algorithm", &Algorithm::NAMES, "dual")? {
            "relevance" => Algorithm::Relevance,
            "evolutionary" => Algorithm::Evolutionary,
            "gaussian_process" => Algorithm::GaussianProcess,
            _ => Algorithm::Dual,
        };
        let kernel = KernelFunction::from_params(params)?;

        let algorithm = match algorithm {
            Algorithm::Dual => {
                let d = DualConfig::default();
                AlgorithmConfig::Dual(DualConfig {
                    c: params.f64_or("C", d.c)?,
                    l_pos: params.f64_or("L_pos", d.l_pos)?,
                    l_neg: params.f64_or("L_neg", d.l_neg)?,
                    balance_cost: params.bool_or("balance_cost", d.balance_cost)?,
                    epsilon: params.f64_or("epsilon", d.epsilon)?,
                    convergence_epsilon: params
                        .f64_or("convergence_epsilon", d.convergence_epsilon)?,
                    max_iterations: params.usize_or("max_iterations", d.max_iterations)?,
                    loss: match params.choice_or("dual_loss", &["hinge", "logistic"], "hinge")? {
                        "logistic" => DualLoss::Logistic,
                        _ => DualLoss::Hinge,
                    },
                })
            }
            Algorithm::Relevance => {
                let d = RelevanceConfig::default();
                AlgorithmConfig::Relevance(RelevanceConfig {
                    alpha_max: params.f64_or("alpha_max", d.alpha_max)?,
                    min_delta_log_alpha: params
                        .f64_or("min_delta_log_alpha", d.min_delta_log_alpha)?,
                    initial_alpha: params.optional_f64("initial_alpha")?,
                    max_iterations: params.usize_or("max_iterations", d.max_iterations)?,
                    max_basis: params.optional_usize("max_basis")?,
                    use_bias: params.bool_or("use_bias", d.use_bias)?,
                })
            }
            Algorithm::Evolutionary => {
                let d = EvolutionaryConfig::default();
                AlgorithmConfig::Evolutionary(EvolutionaryConfig {
                    c: params.f64_or("C", d.c)?,
                    population_size: params.usize_or("population_size", d.population_size)?,
                    max_generations: params.usize_or("max_generations", d.max_generations)?,
                    generations_without_improvement: params.usize_or(
                        "generations_without_improvement",
                        d.generations_without_improvement,
                    )?,
                    selection: match params.choice_or(
                        "selection",
                        &["tournament", "pareto"],
                        "tournament",
                    )? {
                        "pareto" => SelectionScheme::Pareto,
                        _ => SelectionScheme::Tournament,
                    },
                    tournament_fraction: params
                        .f64_or("tournament_fraction", d.tournament_fraction)?,
                    keep_best: params.bool_or("keep_best", d.keep_best)?,
                    mutation_variance: params.f64_or("mutation_variance", d.mutation_variance)?,
                    crossover_prob: params.f64_or("crossover_prob", d.crossover_prob)?,
                    seed: params.optional_u64("seed")?,
                })
            }
            Algorithm::GaussianProcess => {
                let d = GaussianProcessConfig::default();
                AlgorithmConfig::GaussianProcess(GaussianProcessConfig {
                    max_basis_vectors: params
                        .usize_or("max_basis_vectors", d.max_basis_vectors)?,
                    epsilon_tol: params.f64_or("epsilon_tol", d.epsilon_tol)?,
                    geometrical_tol: params.f64_or("geometrical_tol", d.geometrical_tol)?,
                    noise_variance: params.f64_or("noise_variance", d.noise_variance)?,
                })
            }
        };

        let cache_mb = params.f64_or("kernel_cache", (DEFAULT_CACHE_SIZE >> 20) as f64)?;
        if cache_mb.is_nan() || cache_mb < 0.0 {
            return Err(ConfigurationError::invalid("kernel_cache", cache_mb, "must be >= 0").into());
        }

        let config = Self {
            kernel,
            scale: params.bool_or("scale", true)?,
            cache_size: (cache_mb * 1024.0 * 1024.0) as usize,
            algorithm,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every numeric setting against its domain
    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        match &self.algorithm {
            AlgorithmConfig::Dual(d) => {
                positive("C", d.c)?;
                positive("L_pos", d.l_pos)?;
                positive("L_neg", d.l_neg)?;
                non_negative("epsilon", d.epsilon)?;
                positive("convergence_epsilon", d.convergence_epsilon)?;
                at_least_one("max_iterations", d.max_iterations)?;
            }
            AlgorithmConfig::Relevance(r) => {
                positive("alpha_max", r.alpha_max)?;
                positive("min_delta_log_alpha", r.min_delta_log_alpha)?;
                if let Some(alpha) = r.initial_alpha {
                    positive("initial_alpha", alpha)?;
                }
                at_least_one("max_iterations", r.max_iterations)?;
                if let Some(cap) = r.max_basis {
                    at_least_one("max_basis", cap)?;
                }
            }
            AlgorithmConfig::Evolutionary(e) => {
                positive("C", e.c)?;
                if e.population_size < 2 {
                    return Err(ConfigurationError::invalid(
                        "population_size",
                        e.population_size,
                        "must be at least 2",
                    )
                    .into());
                }
                at_least_one("max_generations", e.max_generations)?;
                at_least_one(
                    "generations_without_improvement",
                    e.generations_without_improvement,
                )?;
                probability("tournament_fraction", e.tournament_fraction)?;
                non_negative("mutation_variance", e.mutation_variance)?;
                probability("crossover_prob", e.crossover_prob)?;
            }
            AlgorithmConfig::GaussianProcess(g) => {
                at_least_one("max_basis_vectors", g.max_basis_vectors)?;
                non_negative("epsilon_tol", g.epsilon_tol)?;
                non_negative("geometrical_tol", g.geometrical_tol)?;
                positive("noise_variance", g.noise_variance)?;
            }
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(name, value, "must be positive").into())
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(name, value, "must be >= 0").into())
    }
}

fn probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(name, value, "must lie in [0, 1]").into())
    }
}

fn at_least_one(name: &str, value: usize) -> Result<()> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(name, value, "must be at least 1").into())
    }
}
