//! Trainer backends
//!
//! Four interchangeable algorithms behind one [`Trainer`] trait, all
//! producing the same [`KernelModel`](crate::model::KernelModel):
//!
//! * [`SMOSolver`]: dual-coordinate SVM / SVR / kernel logistic regression
//! * [`RelevanceVectorSolver`]: sparse Bayesian regression and classification
//! * [`EvolutionarySolver`]: kernel logistic regression by evolutionary search
//! * [`GaussianProcessSolver`]: sparse basis-vector Gaussian process regression

pub mod evolutionary;
pub mod gp;
pub mod rvm;
pub mod smo;

pub use self::evolutionary::EvolutionarySolver;
pub use self::gp::GaussianProcessSolver;
pub use self::rvm::RelevanceVectorSolver;
pub use self::smo::SMOSolver;

use crate::config::{AlgorithmConfig, TrainerConfig};
use crate::core::{CancellationToken, Result};
use crate::data::TrainingExamples;
use crate::model::TrainingOutcome;

/// A training algorithm
///
/// A trainer owns its hyperparameters; each call to [`train`](Trainer::train)
/// is an independent run over borrowed examples.
pub trait Trainer: Send + Sync {
    /// Short algorithm name used in logs
    fn name(&self) -> &'static str;

    /// Fit a model. The token is checked at the start of every outer iteration.
    fn train(
        &self,
        examples: &TrainingExamples,
        cancel: &CancellationToken,
    ) -> Result<TrainingOutcome>;
}

/// Build the trainer selected by `config`
pub fn build_trainer(config: &TrainerConfig) -> Box<dyn Trainer> {
    let kernel = config.kernel;
    match &config.algorithm {
        AlgorithmConfig::Dual(dual) => {
            Box::new(SMOSolver::new(kernel, dual.clone()).with_cache_size(config.cache_size))
        }
        AlgorithmConfig::Relevance(rvm) => Box::new(RelevanceVectorSolver::new(kernel, rvm.clone())),
        AlgorithmConfig::Evolutionary(evo) => Box::new(
            EvolutionarySolver::new(kernel, evo.clone()).with_cache_size(config.cache_size),
        ),
        AlgorithmConfig::GaussianProcess(gp) => {
            Box::new(GaussianProcessSolver::new(kernel, gp.clone()))
        }
    }
}
