//! Operation model.
//!
//! An operation is the smallest schedulable unit of work. It belongs to a
//! job, may run on any machine in its compatibility list at a
//! machine-dependent duration, and is ordered by explicit precedence
//! edges over operation indexes.
//!
//! # Reference
//! Brandimarte (1993), "Routing and scheduling in a flexible job shop"

use serde::{Deserialize, Serialize};

use super::{JobId, MachineId};

/// Dense operation index into the instance arena.
pub type OperationId = usize;

/// A (machine, duration) compatibility pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineOption {
    /// Compatible machine.
    pub machine: MachineId,
    /// Processing duration on that machine (time units, >= 0).
    pub duration: i64,
}

impl MachineOption {
    /// Creates a compatibility pair.
    pub fn new(machine: MachineId, duration: i64) -> Self {
        Self { machine, duration }
    }
}

/// An operation to be scheduled.
///
/// Static description only. Per-run timing (assigned machine, start, end,
/// setup) lives in [`Schedule`](super::Schedule), never here, so an
/// [`Instance`](super::Instance) can be shared read-only across parallel
/// evaluations.
///
/// Precedence is index-based: `predecessors`/`successors` hold operation
/// indexes into the instance arena, not references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Dense operation index.
    pub id: OperationId,
    /// Owning job.
    pub job: JobId,
    /// Position within the owning job (0-indexed).
    pub position: usize,
    /// Compatible machines with machine-dependent durations.
    /// At least one entry is required for a feasible instance.
    pub options: Vec<MachineOption>,
    /// Operations that must finish before this one starts.
    pub predecessors: Vec<OperationId>,
    /// Operations waiting on this one.
    pub successors: Vec<OperationId>,
}

impl Operation {
    pub(crate) fn new(
        id: OperationId,
        job: JobId,
        position: usize,
        options: Vec<MachineOption>,
    ) -> Self {
        Self {
            id,
            job,
            position,
            options,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Processing duration on a specific machine, if compatible.
    pub fn duration_on(&self, machine: MachineId) -> Option<i64> {
        self.options
            .iter()
            .find(|o| o.machine == machine)
            .map(|o| o.duration)
    }

    /// The duration-minimizing compatibility pair (ties broken by lowest
    /// machine id). `None` for an operation with no compatible machine.
    pub fn fastest_option(&self) -> Option<MachineOption> {
        self.options
            .iter()
            .min_by_key(|o| (o.duration, o.machine))
            .copied()
    }

    /// Lower bound on this operation's processing time: the shortest
    /// duration across compatible machines (0 if none).
    pub fn min_duration(&self) -> i64 {
        self.options.iter().map(|o| o.duration).min().unwrap_or(0)
    }

    /// Number of compatible machines.
    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}
