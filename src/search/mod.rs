//! NSGA-II-style multi-objective search.
//!
//! Generational loop over an owned population:
//! `Init -> {Vary -> Repair -> Evaluate -> Select -> UpdateFront} x ngen`.
//!
//! Selection merges parents and offspring, ranks them with fast
//! non-dominated sorting, and trims the boundary front by descending
//! crowding distance. A running [`ParetoArchive`] collects every
//! non-dominated individual seen, deduplicated by objective tuple.
//!
//! Structural errors abort the run before the first generation.
//! Per-generation repair or evaluation failures are logged and that
//! generation's offspring batch is dropped; the search continues with
//! the parent population.
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic
//!   Algorithm: NSGA-II"
//! - Cheng et al. (1996), "A Tutorial Survey of JSSP using GA"

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::SchedulingError;
use crate::ga::operators::{
    mutate_sequence_exchange, mutate_shortest_proc_time, pox_crossover, repair_precedence,
    uniform_assignment_crossover,
};
use crate::ga::{evaluate, Fitness, Individual};
use crate::models::{Instance, Schedule};

/// How the final individual is picked from the Pareto archive.
///
/// A policy knob, not an algorithmic necessity: observed deployments
/// differ between pure makespan and a harmonic mean of both objectives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalarization {
    /// Minimize makespan, ties by workload balance.
    #[default]
    Makespan,
    /// Minimize the harmonic mean of makespan and workload balance.
    HarmonicMean,
}

impl Scalarization {
    fn choose(&self, members: &[Individual]) -> Option<usize> {
        let key = |ind: &Individual| {
            ind.fitness
                .map(|f| (f.makespan, f.workload_balance))
                .unwrap_or((i64::MAX, i64::MAX))
        };
        match self {
            Scalarization::Makespan => (0..members.len()).min_by_key(|&i| key(&members[i])),
            Scalarization::HarmonicMean => (0..members.len()).min_by(|&a, &b| {
                let ha = members[a].fitness.map(|f| f.harmonic_mean()).unwrap_or(f64::INFINITY);
                let hb = members[b].fitness.map(|f| f.harmonic_mean()).unwrap_or(f64::INFINITY);
                ha.total_cmp(&hb).then_with(|| key(&members[a]).cmp(&key(&members[b])))
            }),
        }
    }
}

/// Search configuration. All knobs arrive pre-validated from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Population size N (and offspring batch size).
    pub population_size: usize,
    /// Number of generations.
    pub generations: usize,
    /// Probability that a parent pair undergoes crossover.
    pub crossover_rate: f64,
    /// Per-gene mutation probability.
    pub mutation_rate: f64,
    /// Jobs preserved verbatim by the order crossover.
    pub preserving_jobs: usize,
    /// Whether to re-linearize offspring on assembly-type instances.
    pub repair_precedence: bool,
    /// Final pick from the Pareto archive.
    pub scalarization: Scalarization,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Evaluate offspring on a rayon worker pool.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            crossover_rate: 0.7,
            mutation_rate: 0.2,
            preserving_jobs: 1,
            repair_precedence: true,
            scalarization: Scalarization::default(),
            seed: None,
            parallel: false,
        }
    }
}

impl SearchConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the generation count.
    pub fn with_generations(mut self, ngen: usize) -> Self {
        self.generations = ngen;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, cr: f64) -> Self {
        self.crossover_rate = cr;
        self
    }

    /// Sets the per-gene mutation probability.
    pub fn with_mutation_rate(mut self, indpb: f64) -> Self {
        self.mutation_rate = indpb;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the final scalarization.
    pub fn with_scalarization(mut self, scalarization: Scalarization) -> Self {
        self.scalarization = scalarization;
        self
    }
}

/// Running archive of mutually non-dominated individuals.
///
/// Duplicates by objective tuple are suppressed; inserting a dominating
/// individual evicts everything it dominates.
#[derive(Debug, Clone, Default)]
pub struct ParetoArchive {
    members: Vec<Individual>,
}

impl ParetoArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an evaluated individual. Returns whether it was kept.
    pub fn insert(&mut self, individual: &Individual) -> bool {
        let Some(fitness) = individual.fitness else {
            return false;
        };
        let rejected = self
            .members
            .iter()
            .any(|m| m.fitness.is_some_and(|f| f.dominates(&fitness) || f == fitness));
        if rejected {
            return false;
        }
        self.members
            .retain(|m| !m.fitness.is_some_and(|f| fitness.dominates(&f)));
        self.members.push(individual.clone());
        true
    }

    /// Inserts every individual of a population.
    pub fn extend<'a>(&mut self, individuals: impl IntoIterator<Item = &'a Individual>) {
        for individual in individuals {
            self.insert(individual);
        }
    }

    /// Archive members.
    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the archive is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Consumes the archive.
    pub fn into_members(self) -> Vec<Individual> {
        self.members
    }
}

/// Outcome of a search run.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Archive member minimizing the configured scalarization.
    pub best: Individual,
    /// The best individual's schedule.
    pub best_schedule: Schedule,
    /// Final Pareto archive.
    pub pareto_front: Vec<Individual>,
    /// Generations completed.
    pub generations: usize,
}

/// Runs the NSGA-II search on an instance.
///
/// # Errors
/// [`SchedulingError::InfeasibleInstance`] and
/// [`SchedulingError::CyclicPrecedence`] surface immediately from the
/// initial evaluation; later generations degrade gracefully instead.
pub fn run(instance: &Instance, config: &SearchConfig) -> Result<SearchResult, SchedulingError> {
    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let n = config.population_size.max(2);

    // Init: half random seeds, half load-balanced.
    let mut population: Vec<Individual> = (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Individual::random(instance, &mut rng)
            } else {
                Individual::greedy_balanced(instance, &mut rng)
            }
        })
        .collect();
    evaluate_population(instance, &mut population, config.parallel)?;

    let mut archive = ParetoArchive::new();
    archive.extend(population.iter());

    let needs_repair = config.repair_precedence && instance.has_dag_precedence();

    for generation in 1..=config.generations {
        let mut offspring = variation(&population, instance, config, &mut rng);

        if needs_repair {
            if let Some(err) = offspring
                .iter_mut()
                .find_map(|child| repair_precedence(child, instance).err())
            {
                error!(generation, %err, "precedence repair failed; skipping offspring batch");
                continue;
            }
        }

        if let Err(err) = evaluate_population(instance, &mut offspring, config.parallel) {
            error!(generation, %err, "offspring evaluation failed; skipping offspring batch");
            continue;
        }

        let mut combined = population;
        combined.append(&mut offspring);
        population = select_next(combined, n);
        archive.extend(population.iter());

        if let Some(best) = population.iter().filter_map(|p| p.fitness).map(|f| f.makespan).min() {
            debug!(generation, best_makespan = best, front_size = archive.len());
        }
    }

    // The archive is seeded from the evaluated initial population, so a
    // best member always exists.
    let best_index = config
        .scalarization
        .choose(archive.members())
        .expect("archive is seeded during init");
    let mut best = archive.members()[best_index].clone();
    let best_schedule = evaluate(instance, &mut best)?;

    Ok(SearchResult {
        best,
        best_schedule,
        pareto_front: archive.into_members(),
        generations: config.generations,
    })
}

/// Builds an offspring batch of the population's size.
fn variation<R: Rng>(
    population: &[Individual],
    instance: &Instance,
    config: &SearchConfig,
    rng: &mut R,
) -> Vec<Individual> {
    let n = population.len();
    let mut offspring = Vec::with_capacity(n);
    while offspring.len() < n {
        let first = rng.random_range(0..n);
        let mut second = rng.random_range(0..n);
        if n > 1 {
            while second == first {
                second = rng.random_range(0..n);
            }
        }

        let (mut child1, mut child2) = if rng.random_bool(config.crossover_rate) {
            let (mut a, mut b) = pox_crossover(
                &population[first],
                &population[second],
                instance,
                config.preserving_jobs,
                rng,
            );
            uniform_assignment_crossover(&mut a, &mut b, rng);
            (a, b)
        } else {
            (population[first].clone(), population[second].clone())
        };

        for child in [&mut child1, &mut child2] {
            mutate_shortest_proc_time(child, instance, config.mutation_rate, rng);
            if rng.random_bool(config.mutation_rate) {
                mutate_sequence_exchange(child, instance, rng);
            }
            child.fitness = None;
        }

        offspring.push(child1);
        if offspring.len() < n {
            offspring.push(child2);
        }
    }
    offspring
}

fn evaluate_population(
    instance: &Instance,
    population: &mut [Individual],
    parallel: bool,
) -> Result<(), SchedulingError> {
    let score = |individual: &mut Individual| -> Result<(), SchedulingError> {
        if individual.fitness.is_none() {
            evaluate(instance, individual)?;
        }
        Ok(())
    };
    if parallel {
        population.par_iter_mut().try_for_each(score)
    } else {
        population.iter_mut().try_for_each(score)
    }
}

/// NSGA-II environmental selection: non-dominated ranks, then crowding
/// distance inside the boundary front, down to exactly `n` survivors.
fn select_next(combined: Vec<Individual>, n: usize) -> Vec<Individual> {
    let fitnesses: Vec<Fitness> = combined
        .iter()
        .map(|ind| {
            ind.fitness.unwrap_or(Fitness {
                makespan: i64::MAX,
                workload_balance: i64::MAX,
            })
        })
        .collect();

    let mut survivors: Vec<usize> = Vec::with_capacity(n);
    for front in fast_non_dominated_sort(&fitnesses) {
        if survivors.len() + front.len() <= n {
            survivors.extend(&front);
            if survivors.len() == n {
                break;
            }
        } else {
            let distance = crowding_distance(&fitnesses, &front);
            let mut order: Vec<usize> = (0..front.len()).collect();
            order.sort_by(|&a, &b| {
                distance[b]
                    .total_cmp(&distance[a])
                    .then_with(|| fitnesses[front[a]].makespan.cmp(&fitnesses[front[b]].makespan))
                    .then_with(|| front[a].cmp(&front[b]))
            });
            survivors.extend(order.into_iter().take(n - survivors.len()).map(|i| front[i]));
            break;
        }
    }

    survivors
        .into_iter()
        .map(|index| combined[index].clone())
        .collect()
}

/// Deb's fast non-dominated sort; returns fronts of indexes, best first.
fn fast_non_dominated_sort(fitnesses: &[Fitness]) -> Vec<Vec<usize>> {
    let n = fitnesses.len();
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut first_front = Vec::new();

    for p in 0..n {
        for q in 0..n {
            if p == q {
                continue;
            }
            if fitnesses[p].dominates(&fitnesses[q]) {
                dominated[p].push(q);
            } else if fitnesses[q].dominates(&fitnesses[p]) {
                domination_count[p] += 1;
            }
        }
        if domination_count[p] == 0 {
            first_front.push(p);
        }
    }

    let mut current = first_front;
    while !current.is_empty() {
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominated[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(std::mem::take(&mut current));
        current = next;
    }
    fronts
}

/// Crowding distance of each front member in normalized objective space;
/// boundary members get infinity.
fn crowding_distance(fitnesses: &[Fitness], front: &[usize]) -> Vec<f64> {
    let len = front.len();
    let mut distance = vec![0.0f64; len];
    if len <= 2 {
        return vec![f64::INFINITY; len];
    }
    for objective in 0..2 {
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by(|&a, &b| {
            fitnesses[front[a]].objectives()[objective]
                .total_cmp(&fitnesses[front[b]].objectives()[objective])
        });
        let low = fitnesses[front[order[0]]].objectives()[objective];
        let high = fitnesses[front[order[len - 1]]].objectives()[objective];
        distance[order[0]] = f64::INFINITY;
        distance[order[len - 1]] = f64::INFINITY;
        if high - low <= 0.0 {
            continue;
        }
        for window in 1..len - 1 {
            let previous = fitnesses[front[order[window - 1]]].objectives()[objective];
            let next = fitnesses[front[order[window + 1]]].objectives()[objective];
            distance[order[window]] += (next - previous) / (high - low);
        }
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(makespan: i64, workload_balance: i64) -> Individual {
        Individual {
            sequence: Vec::new(),
            assignment: Vec::new(),
            fitness: Some(Fitness {
                makespan,
                workload_balance,
            }),
        }
    }

    fn interleaving_instance() -> Instance {
        let mut inst = Instance::new(2);
        for _ in 0..2 {
            let j = inst.add_job("A", 0);
            inst.add_operation(j, &[(0, 1), (1, 1)]);
            inst.add_operation(j, &[(0, 2), (1, 2)]);
        }
        inst
    }

    #[test]
    fn test_fast_non_dominated_sort_ranks() {
        let fitnesses: Vec<Fitness> = [
            fit(1, 5),
            fit(2, 4),
            fit(3, 3),
            fit(2, 5), // dominated by (2,4)
            fit(4, 6), // dominated by several
        ]
        .iter()
        .map(|i| i.fitness.unwrap())
        .collect();

        let fronts = fast_non_dominated_sort(&fitnesses);
        assert_eq!(fronts[0], vec![0, 1, 2]);
        assert_eq!(fronts[1], vec![3]);
        assert_eq!(fronts[2], vec![4]);
    }

    #[test]
    fn test_crowding_boundaries_are_infinite() {
        let fitnesses: Vec<Fitness> = [fit(1, 9), fit(5, 5), fit(9, 1)]
            .iter()
            .map(|i| i.fitness.unwrap())
            .collect();
        let distance = crowding_distance(&fitnesses, &[0, 1, 2]);
        assert_eq!(distance[0], f64::INFINITY);
        assert_eq!(distance[2], f64::INFINITY);
        assert!(distance[1].is_finite());
    }

    #[test]
    fn test_select_next_prefers_low_ranks() {
        let combined = vec![fit(1, 5), fit(5, 1), fit(3, 3), fit(6, 6), fit(7, 7)];
        let survivors = select_next(combined, 3);
        assert_eq!(survivors.len(), 3);
        // (6,6) and (7,7) are dominated and must not survive.
        assert!(survivors
            .iter()
            .all(|s| s.fitness.unwrap().makespan <= 5));
    }

    #[test]
    fn test_archive_rejects_dominated_and_duplicates() {
        let mut archive = ParetoArchive::new();
        assert!(archive.insert(&fit(5, 5)));
        assert!(!archive.insert(&fit(5, 5)), "duplicate tuple suppressed");
        assert!(!archive.insert(&fit(6, 6)), "dominated insert rejected");
        assert!(archive.insert(&fit(4, 6)));
        assert_eq!(archive.len(), 2);

        // A dominating individual evicts what it dominates.
        assert!(archive.insert(&fit(4, 4)));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_archive_never_holds_dominated_pair() {
        let mut archive = ParetoArchive::new();
        for (m, w) in [(9, 1), (5, 5), (1, 9), (4, 4), (6, 6), (4, 5), (3, 6)] {
            archive.insert(&fit(m, w));
        }
        let members = archive.members();
        for a in members {
            for b in members {
                let (fa, fb) = (a.fitness.unwrap(), b.fitness.unwrap());
                assert!(!fa.dominates(&fb), "{fa:?} dominates {fb:?}");
            }
        }
    }

    #[test]
    fn test_scalarization_choices() {
        let members = vec![fit(4, 0), fit(3, 5)];
        assert_eq!(Scalarization::Makespan.choose(&members), Some(1));
        // Harmonic mean of (4, 0) is 0; of (3, 5) is 3.75.
        assert_eq!(Scalarization::HarmonicMean.choose(&members), Some(0));
    }

    #[test]
    fn test_run_finds_good_schedules() {
        let inst = interleaving_instance();
        let config = SearchConfig::default()
            .with_population_size(16)
            .with_generations(15)
            .with_seed(42);

        let result = run(&inst, &config).unwrap();
        let best = result.best.fitness.unwrap();
        // 3 is the optimum; 6 is the worst single-machine serialization.
        assert!((3..=6).contains(&best.makespan), "makespan {}", best.makespan);
        assert!(result.best_schedule.is_complete());
        assert_eq!(result.generations, 15);

        for a in &result.pareto_front {
            for b in &result.pareto_front {
                assert!(!a.fitness.unwrap().dominates(&b.fitness.unwrap()));
            }
        }
    }

    #[test]
    fn test_run_parallel_matches_contract() {
        let inst = interleaving_instance();
        let config = SearchConfig::default()
            .with_population_size(8)
            .with_generations(5)
            .with_seed(7)
            .with_parallel(true);

        let result = run(&inst, &config).unwrap();
        assert!(result.best.fitness.is_some());
        assert!(!result.pareto_front.is_empty());
    }

    #[test]
    fn test_run_on_assembly_instance_with_repair() {
        let mut inst = Instance::new(2);
        let j0 = inst.add_job("A", 0);
        let a = inst.add_operation_dag(j0, &[(0, 2), (1, 3)], &[]);
        let b = inst.add_operation_dag(j0, &[(1, 2)], &[]);
        inst.add_operation_dag(j0, &[(0, 1), (1, 1)], &[a, b]);
        let j1 = inst.add_job("B", 0);
        inst.add_operation(j1, &[(0, 2), (1, 2)]);

        let config = SearchConfig::default()
            .with_population_size(10)
            .with_generations(10)
            .with_seed(3);
        let result = run(&inst, &config).unwrap();
        assert!(result.best_schedule.is_complete());
        assert!(result.best.is_valid(&inst));
    }

    #[test]
    fn test_run_propagates_structural_errors() {
        let mut inst = Instance::new(1);
        let j = inst.add_job("A", 0);
        inst.add_operation(j, &[]);

        let config = SearchConfig::default()
            .with_population_size(4)
            .with_generations(2)
            .with_seed(1);
        let err = run(&inst, &config).unwrap_err();
        assert!(matches!(err, SchedulingError::InfeasibleInstance { .. }));
    }
}
