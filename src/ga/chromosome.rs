//! Dual-vector chromosome: operation sequence + machine assignment.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;
use crate::models::{Instance, MachineId, OperationId, Schedule};
use crate::scheduler::{construct, DecisionPoint, DecisionPolicy};

use super::operators::is_precedence_valid;

/// Objective tuple of an evaluated individual. Both objectives are
/// minimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fitness {
    /// Latest completion time.
    pub makespan: i64,
    /// Max - min of per-machine busy time.
    pub workload_balance: i64,
}

impl Fitness {
    /// Pareto dominance: no worse on both objectives, strictly better on
    /// at least one.
    pub fn dominates(&self, other: &Fitness) -> bool {
        self.makespan <= other.makespan
            && self.workload_balance <= other.workload_balance
            && (self.makespan < other.makespan || self.workload_balance < other.workload_balance)
    }

    /// Objectives as floats, for crowding-distance arithmetic.
    pub fn objectives(&self) -> [f64; 2] {
        [self.makespan as f64, self.workload_balance as f64]
    }

    /// Harmonic mean of the two objectives (0 when both are 0).
    pub fn harmonic_mean(&self) -> f64 {
        let a = self.makespan as f64;
        let b = self.workload_balance as f64;
        if a + b == 0.0 {
            0.0
        } else {
            2.0 * a * b / (a + b)
        }
    }
}

/// A candidate solution: operation order plus machine choices.
///
/// `fitness` is unset until [`evaluate`] runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    /// Precedence-feasible permutation of operation ids.
    pub sequence: Vec<OperationId>,
    /// Per operation, an index into its compatibility list.
    pub assignment: Vec<usize>,
    /// Objective tuple; `None` before evaluation.
    pub fitness: Option<Fitness>,
}

impl Individual {
    /// Creates a random individual: the sequence is sampled by repeatedly
    /// drawing from the ready frontier of the precedence DAG, the machine
    /// choice uniformly from each operation's compatibility list.
    pub fn random<R: Rng>(instance: &Instance, rng: &mut R) -> Self {
        let sequence = random_topological_order(instance, rng);
        let assignment = instance
            .operations()
            .iter()
            .map(|op| {
                if op.options.is_empty() {
                    0
                } else {
                    rng.random_range(0..op.options.len())
                }
            })
            .collect();
        Self {
            sequence,
            assignment,
            fitness: None,
        }
    }

    /// Creates a load-aware individual: random sequence, each operation
    /// assigned to the currently least-loaded compatible machine.
    pub fn greedy_balanced<R: Rng>(instance: &Instance, rng: &mut R) -> Self {
        let sequence = random_topological_order(instance, rng);
        let mut loads = vec![0i64; instance.nr_of_machines()];
        let mut assignment = vec![0usize; instance.nr_of_operations()];
        for &op_id in &sequence {
            let op = instance.operation(op_id);
            let choice = op
                .options
                .iter()
                .enumerate()
                .min_by_key(|(_, o)| (loads[o.machine], o.duration, o.machine));
            if let Some((index, option)) = choice {
                loads[option.machine] += option.duration;
                assignment[op_id] = index;
            }
        }
        Self {
            sequence,
            assignment,
            fitness: None,
        }
    }

    /// Structural validity: both vectors span the arena, the sequence is
    /// a topological permutation, and every machine choice is in range.
    pub fn is_valid(&self, instance: &Instance) -> bool {
        let n = instance.nr_of_operations();
        if self.sequence.len() != n || self.assignment.len() != n {
            return false;
        }
        let mut seen = vec![false; n];
        for &op in &self.sequence {
            if op >= n || seen[op] {
                return false;
            }
            seen[op] = true;
        }
        for (op_id, &choice) in self.assignment.iter().enumerate() {
            let options = instance.operation(op_id).option_count();
            if options == 0 || choice >= options {
                return false;
            }
        }
        is_precedence_valid(&self.sequence, instance)
    }

    /// Decodes into a fixed-preference decision policy.
    pub fn decode(&self, instance: &Instance) -> PreferencePolicy {
        let n = instance.nr_of_operations();
        let mut position = vec![usize::MAX; n];
        for (index, &op) in self.sequence.iter().enumerate() {
            if op < n {
                position[op] = index;
            }
        }
        let machine = instance
            .operations()
            .iter()
            .map(|op| {
                op.options
                    .get(self.assignment.get(op.id).copied().unwrap_or(0))
                    .or_else(|| op.options.first())
                    .map(|o| o.machine)
                    .unwrap_or(0)
            })
            .collect();
        PreferencePolicy { position, machine }
    }
}

/// Fixed-preference policy decoded from an individual.
///
/// At each decision point it takes the ready operation earliest in the
/// sequence and waits for exactly the machine the assignment vector
/// names, declining the instant when that machine is busy.
#[derive(Debug, Clone)]
pub struct PreferencePolicy {
    position: Vec<usize>,
    machine: Vec<MachineId>,
}

impl DecisionPolicy for PreferencePolicy {
    fn name(&self) -> &'static str {
        "CHROMOSOME"
    }

    fn select(&mut self, point: &DecisionPoint<'_>) -> Option<usize> {
        let &chosen = point
            .ready
            .iter()
            .min_by_key(|&&op| self.position.get(op).copied().unwrap_or(usize::MAX))?;
        let machine = *self.machine.get(chosen)?;
        point
            .candidates
            .iter()
            .position(|c| c.operation == chosen && c.machine == machine)
    }
}

/// Decodes, constructs, and scores an individual against an instance.
///
/// Sets `individual.fitness` to `(makespan, workload_balance)` and
/// returns the constructed schedule. The instance is never mutated, so
/// evaluations of different individuals may run in parallel.
pub fn evaluate(
    instance: &Instance,
    individual: &mut Individual,
) -> Result<Schedule, SchedulingError> {
    let mut policy = individual.decode(instance);
    let schedule = construct(instance, &mut policy)?;
    individual.fitness = Some(Fitness {
        makespan: schedule.makespan(),
        workload_balance: schedule.workload_balance(),
    });
    Ok(schedule)
}

fn random_topological_order<R: Rng>(instance: &Instance, rng: &mut R) -> Vec<OperationId> {
    let operations = instance.operations();
    let mut indegree: Vec<usize> = operations.iter().map(|op| op.predecessors.len()).collect();
    let mut frontier: Vec<OperationId> = operations
        .iter()
        .filter(|op| op.predecessors.is_empty())
        .map(|op| op.id)
        .collect();
    let mut sequence = Vec::with_capacity(operations.len());
    while !frontier.is_empty() {
        let pick = rng.random_range(0..frontier.len());
        let op = frontier.swap_remove(pick);
        sequence.push(op);
        for &succ in &operations[op].successors {
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                frontier.push(succ);
            }
        }
    }
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// Two jobs, two operations each, two machines, unit/double
    /// durations, no setup.
    fn interleaving_instance() -> Instance {
        let mut inst = Instance::new(2);
        let j0 = inst.add_job("A", 0);
        inst.add_operation(j0, &[(0, 1), (1, 1)]);
        inst.add_operation(j0, &[(0, 2), (1, 2)]);
        let j1 = inst.add_job("A", 0);
        inst.add_operation(j1, &[(0, 1), (1, 1)]);
        inst.add_operation(j1, &[(0, 2), (1, 2)]);
        inst
    }

    #[test]
    fn test_random_individual_is_valid() {
        let inst = interleaving_instance();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..20 {
            let ind = Individual::random(&inst, &mut rng);
            assert!(ind.is_valid(&inst));
            assert!(ind.fitness.is_none());
        }
    }

    #[test]
    fn test_greedy_balanced_is_valid() {
        let inst = interleaving_instance();
        let mut rng = SmallRng::seed_from_u64(7);
        let ind = Individual::greedy_balanced(&inst, &mut rng);
        assert!(ind.is_valid(&inst));
    }

    #[test]
    fn test_interleaved_decoding_reaches_optimum() {
        let inst = interleaving_instance();
        // J0 first op on M0, J1 first op on M1, then swap machines.
        let mut ind = Individual {
            sequence: vec![0, 2, 1, 3],
            assignment: vec![0, 1, 1, 0],
            fitness: None,
        };
        let schedule = evaluate(&inst, &mut ind).unwrap();
        assert!(schedule.is_complete());
        let fitness = ind.fitness.unwrap();
        assert_eq!(fitness.makespan, 3);
        assert_eq!(fitness.workload_balance, 0);
    }

    #[test]
    fn test_decode_waits_for_assigned_machine() {
        let mut inst = Instance::new(2);
        let j0 = inst.add_job("A", 0);
        inst.add_operation(j0, &[(0, 5)]);
        let j1 = inst.add_job("A", 0);
        inst.add_operation(j1, &[(0, 1), (1, 1)]);

        // Operation 1 insists on machine 0 even though machine 1 idles.
        let mut ind = Individual {
            sequence: vec![0, 1],
            assignment: vec![0, 0],
            fitness: None,
        };
        let schedule = evaluate(&inst, &mut ind).unwrap();
        let second = schedule.assignment(1).unwrap();
        assert_eq!(second.machine, 0);
        assert_eq!(second.start, 5);
        assert_eq!(ind.fitness.unwrap().makespan, 6);
    }

    #[test]
    fn test_decode_backdates_to_machine_availability() {
        // Sequence preference stalls operation 1 behind operation 0 on a
        // shared machine; operation 2's machine has been idle all along,
        // so it still starts at 0.
        let mut inst = Instance::new(2);
        let j0 = inst.add_job("A", 0);
        inst.add_operation(j0, &[(0, 4)]);
        let j1 = inst.add_job("A", 0);
        inst.add_operation(j1, &[(0, 1)]);
        let j2 = inst.add_job("A", 0);
        inst.add_operation(j2, &[(1, 1)]);

        let mut ind = Individual {
            sequence: vec![0, 1, 2],
            assignment: vec![0, 0, 0],
            fitness: None,
        };
        let schedule = evaluate(&inst, &mut ind).unwrap();
        assert_eq!(schedule.assignment(1).unwrap().start, 4);
        assert_eq!(schedule.assignment(2).unwrap().start, 0);
        assert_eq!(ind.fitness.unwrap().makespan, 5);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let inst = interleaving_instance();
        let mut rng = SmallRng::seed_from_u64(11);
        let template = Individual::random(&inst, &mut rng);

        let mut first = template.clone();
        let mut second = template.clone();
        let s1 = evaluate(&inst, &mut first).unwrap();
        let s2 = evaluate(&inst, &mut second).unwrap();
        assert_eq!(first.fitness, second.fitness);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_dominates() {
        let a = Fitness {
            makespan: 3,
            workload_balance: 0,
        };
        let b = Fitness {
            makespan: 4,
            workload_balance: 0,
        };
        let c = Fitness {
            makespan: 2,
            workload_balance: 5,
        };
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
        assert!(!a.dominates(&c));
        assert!(!c.dominates(&a));
        assert!(!a.dominates(&a));
    }

    #[test]
    fn test_harmonic_mean() {
        let f = Fitness {
            makespan: 4,
            workload_balance: 0,
        };
        assert_eq!(f.harmonic_mean(), 0.0);
        let g = Fitness {
            makespan: 3,
            workload_balance: 3,
        };
        assert!((g.harmonic_mean() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_random_order_respects_dag() {
        let mut inst = Instance::new(1);
        let j = inst.add_job("A", 0);
        let a = inst.add_operation_dag(j, &[(0, 1)], &[]);
        let b = inst.add_operation_dag(j, &[(0, 1)], &[]);
        inst.add_operation_dag(j, &[(0, 1)], &[a, b]);

        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            let ind = Individual::random(&inst, &mut rng);
            assert!(ind.is_valid(&inst));
            assert_eq!(ind.sequence[2], 2);
        }
    }
}
