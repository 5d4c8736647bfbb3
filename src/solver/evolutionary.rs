//! Kernel logistic regression by evolutionary search
//!
//! Individuals are alpha vectors in the box `[0, C]^N`. For an individual the
//! kernel expansion `f_i = Σ_j α_j y_j K_ij` is evaluated over the training
//! set, the bias is recovered from the KKT conditions of the logistic dual and
//! two quantities are scored:
//!
//! ```text
//! margin   = ½ Σ_i α_i y_i f_i
//! log_loss = Σ_i w_i ln(1 + exp(-y_i (f_i + b)))
//! ```
//!
//! Tournament selection minimizes `margin + C · log_loss`; Pareto selection
//! keeps the pair apart and ranks individuals by non-dominated sorting and
//! crowding distance.

use crate::cache::KernelCache;
use crate::config::{EvolutionaryConfig, SelectionScheme, DEFAULT_CACHE_SIZE};
use crate::core::{
    softplus, CancellationToken, ConfigurationError, Convergence, KernelError, Result,
    SupportVector, Target,
};
use crate::data::TrainingExamples;
use crate::kernel::KernelFunction;
use crate::model::{KernelModel, TrainingOutcome};
use crate::solver::Trainer;
use log::{debug, info, warn};
use rand::prelude::*;
use std::cmp::Ordering;
use std::f64::consts::PI;

/// Fitness gains below this do not reset the stagnation counter
const IMPROVEMENT_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fitness {
    margin: f64,
    log_loss: f64,
    bias: f64,
    /// margin + C · log_loss
    scalar: f64,
}

impl Fitness {
    fn dominates(&self, other: &Fitness) -> bool {
        self.margin <= other.margin
            && self.log_loss <= other.log_loss
            && (self.margin < other.margin || self.log_loss < other.log_loss)
    }
}

#[derive(Debug, Clone)]
struct Individual {
    alpha: Vec<f64>,
    fitness: Fitness,
    /// Pareto front index (0 = non-dominated)
    rank: usize,
    crowding: f64,
}

/// Evolutionary kernel logistic regression
pub struct EvolutionarySolver {
    kernel: KernelFunction,
    config: EvolutionaryConfig,
    cache_size: usize,
}

impl EvolutionarySolver {
    pub fn new(kernel: KernelFunction, config: EvolutionaryConfig) -> Self {
        Self {
            kernel,
            config,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }

    /// Set kernel cache size in bytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    fn evaluate(
        &self,
        alpha: &[f64],
        examples: &TrainingExamples,
        cache: &mut KernelCache<'_, KernelFunction>,
    ) -> Fitness {
        let n = examples.len();
        let c = self.config.c;
        let y = examples.targets();

        let mut f = vec![0.0; n];
        for (i, f_i) in f.iter_mut().enumerate() {
            for j in (0..n).filter(|&j| alpha[j] > 0.0) {
                *f_i += alpha[j] * y[j] * cache.get(i, j);
            }
        }
        let margin = 0.5 * (0..n).map(|i| alpha[i] * y[i] * f[i]).sum::<f64>();

        // y_i (f_i + b) = ln((C − α_i) / α_i) at strictly interior points
        let interior: Vec<f64> = (0..n)
            .filter(|&i| alpha[i] > 0.0 && alpha[i] < c)
            .map(|i| y[i] * ((c - alpha[i]) / alpha[i]).ln() - f[i])
            .collect();
        let bias = if interior.is_empty() {
            (0..n).map(|i| y[i] - f[i]).sum::<f64>() / n as f64
        } else {
            interior.iter().sum::<f64>() / interior.len() as f64
        };

        let log_loss = (0..n)
            .map(|i| examples.weight(i) * softplus(-y[i] * (f[i] + bias)))
            .sum::<f64>();

        Fitness {
            margin,
            log_loss,
            bias,
            scalar: margin + c * log_loss,
        }
    }

    fn individual(
        &self,
        alpha: Vec<f64>,
        examples: &TrainingExamples,
        cache: &mut KernelCache<'_, KernelFunction>,
    ) -> Individual {
        let fitness = self.evaluate(&alpha, examples, cache);
        Individual {
            alpha,
            fitness,
            rank: 0,
            crowding: 0.0,
        }
    }

    /// Scalar-fitness tournament over `tournament_fraction` of the population
    fn tournament<'p, R: Rng>(&self, population: &'p [Individual], rng: &mut R) -> &'p Individual {
        let size = ((population.len() as f64 * self.config.tournament_fraction).round() as usize)
            .clamp(2, population.len());
        let mut best = &population[rng.gen_range(0..population.len())];
        for _ in 1..size {
            let challenger = &population[rng.gen_range(0..population.len())];
            if challenger.fitness.scalar < best.fitness.scalar {
                best = challenger;
            }
        }
        best
    }

    /// Binary tournament on (front rank, crowding distance)
    fn crowded_tournament<'p, R: Rng>(population: &'p [Individual], rng: &mut R) -> &'p Individual {
        let a = &population[rng.gen_range(0..population.len())];
        let b = &population[rng.gen_range(0..population.len())];
        match crowded_order(a, b) {
            Ordering::Greater => b,
            _ => a,
        }
    }

    /// Uniform crossover (with probability `crossover_prob`) followed by Gaussian mutation
    fn offspring<R: Rng>(&self, first: &[f64], second: &[f64], rng: &mut R) -> Vec<f64> {
        let n = first.len();
        let mut child: Vec<f64> = if rng.gen::<f64>() < self.config.crossover_prob {
            first
                .iter()
                .zip(second)
                .map(|(&a, &b)| if rng.gen::<bool>() { a } else { b })
                .collect()
        } else {
            first.to_vec()
        };

        let c = self.config.c;
        let sigma = self.config.mutation_variance.sqrt() * c;
        let forced = rng.gen_range(0..n);
        let rate = 1.0 / n as f64;
        for (i, gene) in child.iter_mut().enumerate() {
            if i == forced || rng.gen::<f64>() < rate {
                *gene = (*gene + sigma * standard_normal(rng)).clamp(0.0, c);
            }
        }
        child
    }

    fn evolve(
        &self,
        examples: &TrainingExamples,
        cache: &mut KernelCache<'_, KernelFunction>,
        cancel: &CancellationToken,
    ) -> Result<(Individual, Convergence, Vec<f64>)> {
        let n = examples.len();
        let c = self.config.c;
        let size = self.config.population_size;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut population: Vec<Individual> = (0..size)
            .map(|_| {
                let alpha = (0..n).map(|_| rng.gen_range(0.0..c)).collect();
                self.individual(alpha, examples, cache)
            })
            .collect();
        if self.config.selection == SelectionScheme::Pareto {
            assign_fronts(&mut population);
        }

        let mut best = best_individual(&population, self.config.selection);
        let mut trace = vec![best.fitness.scalar];
        let mut stagnant = 0;
        let mut last_gain = f64::INFINITY;
        let mut generation = 0;

        let convergence = loop {
            cancel.check()?;
            if stagnant >= self.config.generations_without_improvement {
                break Convergence::Converged {
                    iterations: generation,
                };
            }
            if generation >= self.config.max_generations {
                break Convergence::DidNotFullyConverge {
                    iterations: generation,
                    residual: last_gain,
                };
            }

            population = match self.config.selection {
                SelectionScheme::Tournament => {
                    let mut next = Vec::with_capacity(size);
                    if self.config.keep_best {
                        next.push(best.clone());
                    }
                    while next.len() < size {
                        let first = self.tournament(&population, &mut rng);
                        let second = self.tournament(&population, &mut rng);
                        let alpha = self.offspring(&first.alpha, &second.alpha, &mut rng);
                        next.push(self.individual(alpha, examples, cache));
                    }
                    next
                }
                SelectionScheme::Pareto => {
                    let mut merged = population.clone();
                    for _ in 0..size {
                        let first = Self::crowded_tournament(&population, &mut rng);
                        let second = Self::crowded_tournament(&population, &mut rng);
                        let alpha = self.offspring(&first.alpha, &second.alpha, &mut rng);
                        merged.push(self.individual(alpha, examples, cache));
                    }
                    assign_fronts(&mut merged);
                    merged.sort_by(crowded_order);
                    merged.truncate(size);
                    merged
                }
            };
            generation += 1;

            let candidate = best_individual(&population, self.config.selection);
            let gain = best.fitness.scalar - candidate.fitness.scalar;
            if gain > IMPROVEMENT_EPS {
                stagnant = 0;
                last_gain = gain;
            } else {
                stagnant += 1;
            }
            // Without elitism the population best may get worse; remember the best seen.
            if candidate.fitness.scalar < best.fitness.scalar
                || self.config.selection == SelectionScheme::Pareto
            {
                best = candidate;
            }
            trace.push(best.fitness.scalar);

            if generation % 50 == 0 {
                debug!(
                    "Generation {}: best fitness {:.6} (margin {:.6}, log loss {:.6})",
                    generation, best.fitness.scalar, best.fitness.margin, best.fitness.log_loss
                );
            }
        };

        Ok((best, convergence, trace))
    }
}

/// Lowest scalar fitness; restricted to the first front under Pareto selection
fn best_individual(population: &[Individual], selection: SelectionScheme) -> Individual {
    population
        .iter()
        .filter(|ind| selection == SelectionScheme::Tournament || ind.rank == 0)
        .min_by(|a, b| a.fitness.scalar.total_cmp(&b.fitness.scalar))
        .unwrap_or(&population[0])
        .clone()
}

/// Fast non-dominated sort plus crowding distance within each front
fn assign_fronts(population: &mut [Individual]) {
    let n = population.len();
    let mut dominated_by = vec![0usize; n];
    let mut dominates: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in 0..n {
            if i != j && population[i].fitness.dominates(&population[j].fitness) {
                dominates[i].push(j);
                dominated_by[j] += 1;
            }
        }
    }

    let mut front: Vec<usize> = (0..n).filter(|&i| dominated_by[i] == 0).collect();
    let mut rank = 0;
    while !front.is_empty() {
        for &i in &front {
            population[i].rank = rank;
        }
        assign_crowding(population, &front);

        let mut next = Vec::new();
        for &i in &front {
            for &j in &dominates[i] {
                dominated_by[j] -= 1;
                if dominated_by[j] == 0 {
                    next.push(j);
                }
            }
        }
        front = next;
        rank += 1;
    }
}

fn assign_crowding(population: &mut [Individual], front: &[usize]) {
    for &i in front {
        population[i].crowding = 0.0;
    }
    let objectives: [fn(&Fitness) -> f64; 2] = [|f| f.margin, |f| f.log_loss];
    for objective in objectives {
        let mut order = front.to_vec();
        order.sort_by(|&a, &b| {
            objective(&population[a].fitness).total_cmp(&objective(&population[b].fitness))
        });
        let (Some(&lo), Some(&hi)) = (order.first(), order.last()) else {
            continue;
        };
        let range = objective(&population[hi].fitness) - objective(&population[lo].fitness);
        population[lo].crowding = f64::INFINITY;
        population[hi].crowding = f64::INFINITY;
        if range <= 0.0 {
            continue;
        }
        for w in order.windows(3) {
            let spread = objective(&population[w[2]].fitness) - objective(&population[w[0]].fitness);
            population[w[1]].crowding += spread / range;
        }
    }
}

/// Lower rank first, then larger crowding distance
fn crowded_order(a: &Individual, b: &Individual) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| b.crowding.total_cmp(&a.crowding))
}

/// Box–Muller transform
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

impl Trainer for EvolutionarySolver {
    fn name(&self) -> &'static str {
        "evolutionary"
    }

    fn train(
        &self,
        examples: &TrainingExamples,
        cancel: &CancellationToken,
    ) -> Result<TrainingOutcome> {
        cancel.check()?;
        if examples.is_empty() {
            return Err(KernelError::EmptyDataset);
        }
        if !examples.is_classification() {
            return Err(KernelError::NotApplicable(
                "evolutionary kernel logistic regression needs a two-class problem".to_string(),
            ));
        }
        examples.validate_binary_labels()?;
        if self.config.population_size < 2 {
            return Err(ConfigurationError::invalid(
                "population_size",
                self.config.population_size,
                "must be at least 2",
            )
            .into());
        }

        let mut cache = KernelCache::with_memory_limit(examples, &self.kernel, self.cache_size);
        let (best, convergence, trace) = self.evolve(examples, &mut cache, cancel)?;

        match convergence {
            Convergence::Converged { iterations } => info!(
                "Evolutionary search stagnated after {} generations: fitness {:.6} (margin {:.6}, log loss {:.6})",
                iterations, best.fitness.scalar, best.fitness.margin, best.fitness.log_loss
            ),
            Convergence::DidNotFullyConverge { iterations, .. } => warn!(
                "Evolutionary search hit the generation cap ({}) while still improving",
                iterations
            ),
        }

        let support_vectors = (0..examples.len())
            .filter(|&i| best.alpha[i] > 0.0)
            .map(|i| {
                SupportVector::new(
                    examples.row(i).to_vec(),
                    Target::Label(examples.target(i)),
                    best.alpha[i],
                )
            })
            .collect();
        let model =
            KernelModel::from_examples(self.kernel, support_vectors, best.fitness.bias, examples);
        Ok(TrainingOutcome::new(model, convergence).with_objective_trace(trace))
    }
}
