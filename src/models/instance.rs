//! Immutable problem instance.
//!
//! An instance aggregates jobs, an arena of operations with index-based
//! precedence lists, machines, and setup times. It is read-only for the
//! duration of a run: schedule construction writes only to its own
//! [`Schedule`](super::Schedule) state, so one instance can be shared
//! across parallel evaluations.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::SchedulingError;

use super::{Job, JobId, Machine, MachineId, MachineOption, Operation, OperationId, SetupTimes};

/// An immutable flexible job-shop instance.
///
/// Built incrementally with [`add_job`](Instance::add_job) and
/// [`add_operation`](Instance::add_operation); operations added to a job
/// chain onto the job's previous operation. Assembly-type precedence is
/// expressed with [`add_operation_dag`](Instance::add_operation_dag) or
/// extra [`add_precedence`](Instance::add_precedence) edges.
///
/// # Example
///
/// ```
/// use flexshop::models::Instance;
///
/// let mut instance = Instance::new(2);
/// let job = instance.add_job("A", 0);
/// instance.add_operation(job, &[(0, 3), (1, 2)]);
/// instance.add_operation(job, &[(1, 4)]);
///
/// assert_eq!(instance.nr_of_operations(), 2);
/// assert_eq!(instance.operation(1).predecessors, vec![0]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    jobs: Vec<Job>,
    operations: Vec<Operation>,
    machines: Vec<Machine>,
    setup_times: SetupTimes,
}

impl Instance {
    /// Creates an instance with `machine_count` machines and no jobs.
    pub fn new(machine_count: usize) -> Self {
        Self {
            jobs: Vec::new(),
            operations: Vec::new(),
            machines: (0..machine_count).map(Machine::new).collect(),
            setup_times: SetupTimes::new(),
        }
    }

    /// Sets the sequence-dependent setup times.
    pub fn with_setup_times(mut self, setup_times: SetupTimes) -> Self {
        self.setup_times = setup_times;
        self
    }

    /// Adds a job and returns its id.
    pub fn add_job(&mut self, family: impl Into<String>, release_time: i64) -> JobId {
        let id = self.jobs.len();
        self.jobs.push(Job::new(id, family, release_time));
        id
    }

    /// Adds an operation to a job, chained after the job's previous
    /// operation. Returns the new operation id.
    ///
    /// `options` are (machine, duration) compatibility pairs.
    pub fn add_operation(&mut self, job: JobId, options: &[(MachineId, i64)]) -> OperationId {
        let predecessors: Vec<OperationId> = self.jobs[job].operations.last().copied().into_iter().collect();
        self.push_operation(job, options, predecessors)
    }

    /// Adds an operation with explicit predecessors (assembly-type DAG
    /// precedence). Returns the new operation id.
    pub fn add_operation_dag(
        &mut self,
        job: JobId,
        options: &[(MachineId, i64)],
        predecessors: &[OperationId],
    ) -> OperationId {
        self.push_operation(job, options, predecessors.to_vec())
    }

    /// Adds a precedence edge between two existing operations.
    pub fn add_precedence(&mut self, before: OperationId, after: OperationId) {
        if after < self.operations.len() {
            self.operations[after].predecessors.push(before);
        }
        if before < self.operations.len() {
            self.operations[before].successors.push(after);
        }
    }

    fn push_operation(
        &mut self,
        job: JobId,
        options: &[(MachineId, i64)],
        predecessors: Vec<OperationId>,
    ) -> OperationId {
        let id = self.operations.len();
        let position = self.jobs[job].operations.len();
        let options = options
            .iter()
            .map(|&(machine, duration)| MachineOption::new(machine, duration))
            .collect();
        let mut op = Operation::new(id, job, position, options);
        for &pred in &predecessors {
            if pred < self.operations.len() {
                self.operations[pred].successors.push(id);
            }
        }
        op.predecessors = predecessors;
        self.operations.push(op);
        self.jobs[job].operations.push(id);
        id
    }

    /// All jobs.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// The operation arena.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// All machines.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Sequence-dependent setup times.
    pub fn setup_times(&self) -> &SetupTimes {
        &self.setup_times
    }

    /// A job by id.
    pub fn job(&self, id: JobId) -> &Job {
        &self.jobs[id]
    }

    /// An operation by id.
    pub fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id]
    }

    /// Number of jobs.
    pub fn nr_of_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Number of machines.
    pub fn nr_of_machines(&self) -> usize {
        self.machines.len()
    }

    /// Number of operations.
    pub fn nr_of_operations(&self) -> usize {
        self.operations.len()
    }

    /// Whether any job's internal precedence deviates from a simple chain
    /// (assembly-type instance). Such instances need precedence repair
    /// after genetic variation.
    pub fn has_dag_precedence(&self) -> bool {
        self.jobs.iter().any(|job| {
            job.operations.iter().enumerate().any(|(k, &op_id)| {
                let preds = &self.operations[op_id].predecessors;
                if k == 0 {
                    !preds.is_empty()
                } else {
                    preds.len() != 1 || preds[0] != job.operations[k - 1]
                }
            })
        })
    }

    /// A topological order of the precedence graph, lowest ids first.
    ///
    /// # Errors
    /// [`SchedulingError::CyclicPrecedence`] if the graph has a cycle.
    pub fn topological_order(&self) -> Result<Vec<OperationId>, SchedulingError> {
        let mut indegree: Vec<usize> = self
            .operations
            .iter()
            .map(|op| op.predecessors.len())
            .collect();
        let mut heap: BinaryHeap<Reverse<OperationId>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(id, _)| Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(self.operations.len());
        while let Some(Reverse(id)) = heap.pop() {
            order.push(id);
            for &succ in &self.operations[id].successors {
                indegree[succ] -= 1;
                if indegree[succ] == 0 {
                    heap.push(Reverse(succ));
                }
            }
        }

        if order.len() < self.operations.len() {
            let operation = indegree
                .iter()
                .enumerate()
                .find(|(_, &d)| d > 0)
                .map(|(id, _)| id)
                .unwrap_or(0);
            return Err(SchedulingError::CyclicPrecedence { operation });
        }
        Ok(order)
    }
}
