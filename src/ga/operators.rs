//! Precedence-preserving genetic operators.
//!
//! - [`pox_crossover`]: preserved jobs keep their placement from one
//!   parent, the rest follow the other parent's relative order.
//! - [`uniform_assignment_crossover`]: machine-choice genes carry no
//!   ordering constraint and are exchanged per-gene.
//! - [`mutate_shortest_proc_time`]: local-greedy machine reassignment.
//! - [`mutate_sequence_exchange`]: position swap restricted to windows
//!   where both orderings stay topologically valid.
//! - [`repair_precedence`]: stable minimal re-linearization for
//!   assembly-type (DAG) instances.
//!
//! # Reference
//! Bierwirth et al. (1996), precedence-preserving crossover for JSSP

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::SchedulingError;
use crate::models::{Instance, JobId, OperationId};

use super::Individual;

/// Whether `sequence` is a topological order of the instance's
/// precedence DAG. Does not check that it is a permutation.
pub fn is_precedence_valid(sequence: &[OperationId], instance: &Instance) -> bool {
    let n = instance.nr_of_operations();
    let mut position = vec![usize::MAX; n];
    for (index, &op) in sequence.iter().enumerate() {
        if op >= n {
            return false;
        }
        position[op] = index;
    }
    instance.operations().iter().all(|op| {
        op.predecessors
            .iter()
            .all(|&pred| position[pred] < position[op.id])
    })
}

/// Precedence-preserving order crossover (POX).
///
/// Picks `preserve` random jobs; each child keeps those jobs'
/// operations exactly where one parent placed them and fills the
/// remaining slots with the other parent's operations in their original
/// relative order. Assignment vectors are inherited from the template
/// parent; exchange them separately with
/// [`uniform_assignment_crossover`].
pub fn pox_crossover<R: Rng>(
    parent1: &Individual,
    parent2: &Individual,
    instance: &Instance,
    preserve: usize,
    rng: &mut R,
) -> (Individual, Individual) {
    let nr_jobs = instance.nr_of_jobs();
    if nr_jobs == 0 {
        return (parent1.clone(), parent2.clone());
    }
    let mut jobs: Vec<JobId> = (0..nr_jobs).collect();
    jobs.shuffle(rng);
    let preserved: HashSet<JobId> = jobs.into_iter().take(preserve.clamp(1, nr_jobs)).collect();

    let child1 = Individual {
        sequence: pox_child(&parent1.sequence, &parent2.sequence, &preserved, instance),
        assignment: parent1.assignment.clone(),
        fitness: None,
    };
    let child2 = Individual {
        sequence: pox_child(&parent2.sequence, &parent1.sequence, &preserved, instance),
        assignment: parent2.assignment.clone(),
        fitness: None,
    };
    (child1, child2)
}

fn pox_child(
    template: &[OperationId],
    donor: &[OperationId],
    preserved: &HashSet<JobId>,
    instance: &Instance,
) -> Vec<OperationId> {
    let mut donor_iter = donor
        .iter()
        .filter(|&&op| !preserved.contains(&instance.operation(op).job));
    template
        .iter()
        .map(|&op| {
            if preserved.contains(&instance.operation(op).job) {
                op
            } else {
                donor_iter.next().copied().unwrap_or(op)
            }
        })
        .collect()
}

/// Exchanges machine-choice genes between two individuals, each gene
/// independently with probability 1/2.
pub fn uniform_assignment_crossover<R: Rng>(a: &mut Individual, b: &mut Individual, rng: &mut R) {
    for (ga, gb) in a.assignment.iter_mut().zip(b.assignment.iter_mut()) {
        if rng.random_bool(0.5) {
            std::mem::swap(ga, gb);
        }
    }
}

/// Reassigns operations to their duration-minimizing compatible machine,
/// each gene independently with probability `indpb`.
///
/// Local-greedy rather than random: the replacement is always the
/// fastest option, which pulls machine choices toward short processing
/// times while the sequence vector keeps exploring.
pub fn mutate_shortest_proc_time<R: Rng>(
    individual: &mut Individual,
    instance: &Instance,
    indpb: f64,
    rng: &mut R,
) {
    for op in instance.operations() {
        if op.options.len() < 2 || !rng.random_bool(indpb) {
            continue;
        }
        let fastest = op
            .options
            .iter()
            .enumerate()
            .min_by_key(|(_, o)| (o.duration, o.machine))
            .map(|(index, _)| index);
        if let Some(index) = fastest {
            individual.assignment[op.id] = index;
        }
    }
}

/// Swaps two sequence positions, keeping the order topologically valid.
///
/// A swap of positions `i < j` is valid iff no direct successor of the
/// operation at `i` sits in `(i, j]` and no direct predecessor of the
/// operation at `j` sits in `[i, j)`; any transitive violation inside
/// the window implies a direct one, so the local check is exact. Gives
/// up after a bounded number of attempts on heavily constrained
/// sequences.
pub fn mutate_sequence_exchange<R: Rng>(
    individual: &mut Individual,
    instance: &Instance,
    rng: &mut R,
) {
    let n = individual.sequence.len();
    if n < 2 {
        return;
    }
    let mut position = vec![usize::MAX; instance.nr_of_operations()];
    for (index, &op) in individual.sequence.iter().enumerate() {
        position[op] = index;
    }
    for _ in 0..8 {
        let mut i = rng.random_range(0..n);
        let mut j = rng.random_range(0..n);
        if i == j {
            continue;
        }
        if i > j {
            std::mem::swap(&mut i, &mut j);
        }
        let a = individual.sequence[i];
        let b = individual.sequence[j];
        let a_blocked = instance
            .operation(a)
            .successors
            .iter()
            .any(|&s| position[s] > i && position[s] <= j);
        let b_blocked = instance
            .operation(b)
            .predecessors
            .iter()
            .any(|&p| position[p] >= i && position[p] < j);
        if a_blocked || b_blocked {
            continue;
        }
        individual.sequence.swap(i, j);
        return;
    }
}

/// Re-linearizes an individual's sequence into the nearest valid
/// topological order, stable with respect to non-conflicting pairs:
/// each step takes the earliest remaining operation whose predecessors
/// have all been emitted.
///
/// # Errors
/// [`SchedulingError::RepairFailure`] when no valid linearization
/// exists, which signals a variation bug (or a cyclic instance) rather
/// than a data issue. The search loop logs it and skips the offspring
/// batch.
pub fn repair_precedence(
    individual: &mut Individual,
    instance: &Instance,
) -> Result<(), SchedulingError> {
    let sequence = &individual.sequence;
    let n = instance.nr_of_operations();
    if sequence.len() != n {
        return Err(SchedulingError::RepairFailure);
    }
    if is_precedence_valid(sequence, instance) {
        return Ok(());
    }

    let mut emitted = vec![false; n];
    let mut taken = vec![false; sequence.len()];
    let mut repaired = Vec::with_capacity(sequence.len());
    while repaired.len() < sequence.len() {
        let next = sequence.iter().enumerate().position(|(index, &op)| {
            !taken[index]
                && op < n
                && !emitted[op]
                && instance
                    .operation(op)
                    .predecessors
                    .iter()
                    .all(|&pred| emitted[pred])
        });
        match next {
            Some(index) => {
                taken[index] = true;
                emitted[sequence[index]] = true;
                repaired.push(sequence[index]);
            }
            None => return Err(SchedulingError::RepairFailure),
        }
    }
    individual.sequence = repaired;
    Ok(())
}
