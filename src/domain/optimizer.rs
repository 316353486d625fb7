//! Genetic population optimizer for one training window.
//!
//! Each generation is evaluated as a whole (optionally on the rayon pool),
//! ranked by fitness with a stable sort, then rebuilt from the top
//! `elite_count` survivors plus mutated clones of them. The best candidate
//! seen in any generation is returned.
//!
//! The RNG is only used on the calling thread, between evaluations, so a
//! seeded run produces the same result with or without `parallel`.

use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use super::backtest::{run_backtest, BacktestConfig, SimulationResult};
use super::candle::Candle;
use super::fitness::FitnessPolicy;
use super::mutation::mutate;
use super::seeds::{random_gene, seed_genes};
use super::strategy::StrategyGene;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub generations: usize,
    pub elite_count: usize,
    /// Per-operator mutation probability in `[0, 1]`.
    pub mutation_rate: f64,
    pub parallel: bool,
    /// Cost assumptions stamped onto seeded and random genes.
    pub fee_pct: f64,
    pub slippage_pct: f64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        GeneticConfig {
            population_size: 30,
            generations: 10,
            elite_count: 5,
            mutation_rate: 0.3,
            parallel: true,
            fee_pct: 0.001,
            slippage_pct: 0.0005,
        }
    }
}

/// An evaluated gene.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub gene: StrategyGene,
    pub fitness: f64,
    pub result: SimulationResult,
}

pub struct GeneticOptimizer {
    config: GeneticConfig,
    backtest: BacktestConfig,
    fitness: FitnessPolicy,
}

impl GeneticOptimizer {
    pub fn new(config: GeneticConfig, backtest: BacktestConfig, fitness: FitnessPolicy) -> Self {
        Self {
            config,
            backtest,
            fitness,
        }
    }

    /// Seeds first (truncated to the population size), then random genes.
    pub fn initial_population<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<StrategyGene> {
        let mut population = seed_genes(self.config.fee_pct, self.config.slippage_pct);
        population.truncate(self.config.population_size);
        while population.len() < self.config.population_size {
            let name = format!("Random #{}", population.len() + 1);
            population.push(random_gene(
                rng,
                name,
                self.config.fee_pct,
                self.config.slippage_pct,
            ));
        }
        population
    }

    /// Evolve from the default seeded population.
    pub fn optimize<R: Rng + ?Sized>(&self, candles: &[Candle], rng: &mut R) -> Option<Candidate> {
        let population = self.initial_population(rng);
        self.evolve(candles, population, rng)
    }

    /// Evolve a given starting population. Returns `None` when no gene ever
    /// produced a valid backtest.
    pub fn evolve<R: Rng + ?Sized>(
        &self,
        candles: &[Candle],
        mut population: Vec<StrategyGene>,
        rng: &mut R,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for generation in 0..self.config.generations {
            let scored = self.evaluate_population(candles, &population);

            let mut ranked: Vec<(usize, f64)> = scored
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.as_ref().map(|(fitness, _)| (i, *fitness)))
                .collect();
            // Stable: equal fitness keeps population order.
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

            if let Some(&(top, fitness)) = ranked.first() {
                let improved = best.as_ref().is_none_or(|b| fitness > b.fitness);
                if improved {
                    if let Some((_, result)) = &scored[top] {
                        best = Some(Candidate {
                            gene: population[top].clone(),
                            fitness,
                            result: result.clone(),
                        });
                    }
                }
                info!(
                    "Generation {}/{}: best fitness {:.4} ({}), {} of {} valid",
                    generation + 1,
                    self.config.generations,
                    fitness,
                    population[top].name,
                    ranked.len(),
                    population.len()
                );
            } else {
                info!(
                    "Generation {}/{}: no valid candidates",
                    generation + 1,
                    self.config.generations
                );
            }

            if generation + 1 < self.config.generations {
                let survivors: Vec<StrategyGene> = ranked
                    .iter()
                    .take(self.config.elite_count)
                    .map(|&(i, _)| population[i].clone())
                    .collect();
                population = self.breed(survivors, generation + 2, rng);
            }
        }

        best
    }

    /// Survivors carried unchanged, refilled with mutated clones named after
    /// their parent and `generation`. With no survivors the next generation
    /// is drawn at random.
    fn breed<R: Rng + ?Sized>(
        &self,
        survivors: Vec<StrategyGene>,
        generation: usize,
        rng: &mut R,
    ) -> Vec<StrategyGene> {
        if survivors.is_empty() {
            return (0..self.config.population_size)
                .map(|i| {
                    random_gene(
                        rng,
                        format!("Random #{}", i + 1),
                        self.config.fee_pct,
                        self.config.slippage_pct,
                    )
                })
                .collect();
        }

        let mut next = survivors;
        let elites = next.len();
        while next.len() < self.config.population_size {
            let parent = &next[rng.gen_range(0..elites)];
            let mut child = mutate(parent, self.config.mutation_rate, rng);
            child.name = child_name(&parent.name, generation, next.len() + 1);
            next.push(child);
        }
        next
    }

    /// Score every gene. Output order matches `population` regardless of
    /// completion order.
    fn evaluate_population(
        &self,
        candles: &[Candle],
        population: &[StrategyGene],
    ) -> Vec<Option<(f64, SimulationResult)>> {
        if self.config.parallel {
            population
                .par_iter()
                .map(|gene| self.evaluate(candles, gene))
                .collect()
        } else {
            population
                .iter()
                .map(|gene| self.evaluate(candles, gene))
                .collect()
        }
    }

    fn evaluate(&self, candles: &[Candle], gene: &StrategyGene) -> Option<(f64, SimulationResult)> {
        if let Err(e) = gene.validate() {
            debug!("Skipping {}: {}", gene.name, e);
            return None;
        }
        match run_backtest(candles, gene, &self.backtest) {
            Ok(result) => Some((self.fitness.score(&result), result)),
            Err(e) => {
                debug!("Backtest failed for {}: {}", gene.name, e);
                None
            }
        }
    }
}

/// `"<base> [g<generation>.<index>]"`, replacing any lineage suffix the
/// parent already carries.
fn child_name(parent: &str, generation: usize, index: usize) -> String {
    let base = match parent.rfind(" [g") {
        Some(at) if parent.ends_with(']') => &parent[..at],
        _ => parent,
    };
    format!("{} [g{}.{}]", base, generation, index)
}
