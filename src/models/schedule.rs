//! Schedule state and result.
//!
//! A schedule is the per-run record produced by construction: write-once
//! operation assignments plus per-machine timelines. Derived objectives
//! (makespan, workload balance) are computed from it.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};

use super::{JobId, MachineId, OperationId};

/// A scheduled operation: machine plus timing.
///
/// The setup interval occupies `[setup_start, start)` and is empty when
/// no setup was required; processing occupies `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpAssignment {
    /// Scheduled operation.
    pub operation: OperationId,
    /// Owning job (denormalized for query convenience).
    pub job: JobId,
    /// Assigned machine.
    pub machine: MachineId,
    /// Start of the setup interval. Equal to `start` when no setup.
    pub setup_start: i64,
    /// Processing start.
    pub start: i64,
    /// Processing end.
    pub end: i64,
}

impl OpAssignment {
    /// Setup duration preceding processing.
    #[inline]
    pub fn setup(&self) -> i64 {
        self.start - self.setup_start
    }

    /// Processing duration.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Total machine occupancy (setup + processing).
    #[inline]
    pub fn busy(&self) -> i64 {
        self.end - self.setup_start
    }
}

/// Per-run state of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineTimeline {
    /// Machine this timeline belongs to.
    pub machine: MachineId,
    /// Instant the machine becomes free.
    pub free_at: i64,
    /// Family of the last processed job, for setup lookups.
    pub last_family: Option<String>,
    /// Assigned operations in start order.
    pub operations: Vec<OperationId>,
    /// Total occupancy (setup + processing) so far.
    pub busy_time: i64,
}

impl MachineTimeline {
    fn new(machine: MachineId) -> Self {
        Self {
            machine,
            free_at: 0,
            last_family: None,
            operations: Vec::new(),
            busy_time: 0,
        }
    }
}

/// A (possibly partial) schedule for one instance.
///
/// Produced by the constructor; assignments are write-once per run.
/// In online-arrival mode operations beyond the horizon stay
/// unscheduled and objectives cover scheduled work only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    assignments: Vec<Option<OpAssignment>>,
    timelines: Vec<MachineTimeline>,
}

impl Schedule {
    pub(crate) fn new(operation_count: usize, machine_count: usize) -> Self {
        Self {
            assignments: vec![None; operation_count],
            timelines: (0..machine_count).map(MachineTimeline::new).collect(),
        }
    }

    /// Records an assignment and advances the machine timeline.
    pub(crate) fn record(&mut self, assignment: OpAssignment, family: &str) {
        debug_assert!(self.assignments[assignment.operation].is_none());
        let timeline = &mut self.timelines[assignment.machine];
        debug_assert!(timeline.free_at <= assignment.setup_start);
        timeline.free_at = assignment.end;
        timeline.last_family = Some(family.to_string());
        timeline.busy_time += assignment.busy();
        timeline.operations.push(assignment.operation);
        self.assignments[assignment.operation] = Some(assignment);
    }

    /// The assignment for an operation, if scheduled.
    pub fn assignment(&self, operation: OperationId) -> Option<&OpAssignment> {
        self.assignments.get(operation).and_then(|a| a.as_ref())
    }

    /// All recorded assignments.
    pub fn assignments(&self) -> impl Iterator<Item = &OpAssignment> {
        self.assignments.iter().filter_map(|a| a.as_ref())
    }

    /// Per-machine timelines.
    pub fn timelines(&self) -> &[MachineTimeline] {
        &self.timelines
    }

    /// The timeline of one machine.
    pub fn timeline(&self, machine: MachineId) -> &MachineTimeline {
        &self.timelines[machine]
    }

    /// Operations left unscheduled (non-empty only for horizon-bounded
    /// online runs).
    pub fn unscheduled(&self) -> Vec<OperationId> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Whether every operation is scheduled.
    pub fn is_complete(&self) -> bool {
        self.assignments.iter().all(|a| a.is_some())
    }

    /// Number of scheduled operations.
    pub fn scheduled_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_some()).count()
    }

    /// Makespan: latest end over scheduled operations (0 if none).
    pub fn makespan(&self) -> i64 {
        self.assignments().map(|a| a.end).max().unwrap_or(0)
    }

    /// Workload balance: max - min of per-machine busy time across all
    /// machines. 0 iff every machine is equally busy; lower is better.
    pub fn workload_balance(&self) -> i64 {
        let max = self.timelines.iter().map(|t| t.busy_time).max();
        let min = self.timelines.iter().map(|t| t.busy_time).min();
        match (max, min) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }

    /// Completion time of a job's latest scheduled operation.
    pub fn job_completion(&self, job: JobId) -> Option<i64> {
        self.assignments()
            .filter(|a| a.job == job)
            .map(|a| a.end)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(
        operation: OperationId,
        job: JobId,
        machine: MachineId,
        setup_start: i64,
        start: i64,
        end: i64,
    ) -> OpAssignment {
        OpAssignment {
            operation,
            job,
            machine,
            setup_start,
            start,
            end,
        }
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new(3, 2);
        s.record(assignment(0, 0, 0, 0, 1, 5), "A");
        s.record(assignment(1, 0, 1, 0, 0, 3), "A");
        s.record(assignment(2, 1, 0, 5, 5, 8), "A");
        s
    }

    #[test]
    fn test_assignment_intervals() {
        let a = assignment(0, 0, 0, 0, 1, 5);
        assert_eq!(a.setup(), 1);
        assert_eq!(a.duration(), 4);
        assert_eq!(a.busy(), 5);
    }

    #[test]
    fn test_makespan() {
        assert_eq!(sample_schedule().makespan(), 8);
        assert_eq!(Schedule::new(0, 2).makespan(), 0);
    }

    #[test]
    fn test_workload_balance() {
        let s = sample_schedule();
        // Machine 0 busy 5 + 3 = 8, machine 1 busy 3.
        assert_eq!(s.workload_balance(), 5);

        let mut even = Schedule::new(2, 2);
        even.record(assignment(0, 0, 0, 0, 0, 4), "A");
        even.record(assignment(1, 1, 1, 0, 0, 4), "A");
        assert_eq!(even.workload_balance(), 0);
    }

    #[test]
    fn test_timeline_tracking() {
        let s = sample_schedule();
        let t0 = s.timeline(0);
        assert_eq!(t0.free_at, 8);
        assert_eq!(t0.operations, vec![0, 2]);
        assert_eq!(t0.busy_time, 8);
        assert_eq!(t0.last_family.as_deref(), Some("A"));
    }

    #[test]
    fn test_completion_state() {
        let mut s = Schedule::new(2, 1);
        assert!(!s.is_complete());
        assert_eq!(s.unscheduled(), vec![0, 1]);

        s.record(assignment(0, 0, 0, 0, 0, 2), "A");
        s.record(assignment(1, 0, 0, 2, 2, 4), "A");
        assert!(s.is_complete());
        assert!(s.unscheduled().is_empty());
        assert_eq!(s.scheduled_count(), 2);
    }

    #[test]
    fn test_job_completion() {
        let s = sample_schedule();
        assert_eq!(s.job_completion(0), Some(5));
        assert_eq!(s.job_completion(1), Some(8));
        assert_eq!(s.job_completion(9), None);
    }
}
