//! The schedule constructor: decision policy in, feasible schedule out.
//!
//! # Timing rules
//!
//! For a chosen (operation, machine) pair:
//! `setup_start = max(operation ready time, machine free time)`; a setup
//! interval is inserted when the machine's last processed family differs
//! from the operation's family; `start = setup_start + setup`;
//! `end = start + duration(operation, machine)`.
//!
//! A policy may decline an instant (see [`DecisionPolicy::select`]); the
//! clock then advances to the next event. Fixed-preference policies use
//! this to wait for their assigned machine, so a chosen pair can start
//! earlier than the instant the decision was made; per-machine and
//! per-job orderings still hold because ready and free times bound the
//! start from below.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::SchedulingError;
use crate::models::{
    Instance, MachineId, MachineTimeline, OpAssignment, OperationId, Schedule,
};

/// A schedulable (ready operation, free machine) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair {
    /// Ready operation.
    pub operation: OperationId,
    /// Free compatible machine.
    pub machine: MachineId,
    /// Processing duration of the operation on that machine.
    pub duration: i64,
}

/// Everything a policy may inspect at one decision instant.
#[derive(Debug)]
pub struct DecisionPoint<'a> {
    /// Current simulation time.
    pub time: i64,
    /// The instance under construction (read-only).
    pub instance: &'a Instance,
    /// All ready, unscheduled operations (ascending id), including those
    /// whose compatible machines are all busy.
    pub ready: &'a [OperationId],
    /// Schedulable pairs at this instant, ordered by (operation, machine).
    pub candidates: &'a [CandidatePair],
    /// Per-machine run state (free time, last family).
    pub timelines: &'a [MachineTimeline],
    /// Unscheduled-operation count per job.
    pub ops_remaining: &'a [usize],
    /// Lower bound on remaining processing per job (sum of fastest
    /// durations of its unscheduled operations).
    pub work_remaining: &'a [i64],
}

/// A sequencing/assignment decision policy.
///
/// Implemented by the dispatching-rule policy, by decoded chromosomes,
/// and by external inference-based dispatchers. The same contract works
/// in online-arrival mode, where decisions are emitted without seeing
/// future arrivals.
pub trait DecisionPolicy {
    /// Policy name for diagnostics.
    fn name(&self) -> &'static str;

    /// Picks one candidate (an index into `point.candidates`), or `None`
    /// to leave this instant idle and let the clock advance to the next
    /// event.
    fn select(&mut self, point: &DecisionPoint<'_>) -> Option<usize>;
}

/// Discrete-event schedule constructor.
///
/// Deterministic given a deterministic policy: events are ordered by
/// (time, job id, operation position) and candidate pairs by
/// (operation, machine).
#[derive(Debug, Clone)]
pub struct Constructor<'a> {
    instance: &'a Instance,
    horizon: Option<i64>,
}

impl<'a> Constructor<'a> {
    /// Creates a constructor for an instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            horizon: None,
        }
    }

    /// Bounds the simulation at `horizon` (online-arrival mode).
    ///
    /// Events at or after the horizon are not processed; operations not
    /// scheduled by then are reported via
    /// [`Schedule::unscheduled`](crate::models::Schedule::unscheduled).
    pub fn with_horizon(mut self, horizon: i64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Runs the simulation.
    ///
    /// # Errors
    /// [`SchedulingError::InfeasibleInstance`] if an operation has no
    /// compatible machine; [`SchedulingError::CyclicPrecedence`] if the
    /// precedence relation is not a DAG. Both are detected before the
    /// event loop runs.
    pub fn run(&self, policy: &mut dyn DecisionPolicy) -> Result<Schedule, SchedulingError> {
        let instance = self.instance;
        for op in instance.operations() {
            if op.options.is_empty() {
                return Err(SchedulingError::InfeasibleInstance { operation: op.id });
            }
        }
        instance.topological_order()?;

        let nr_ops = instance.nr_of_operations();
        let mut schedule = Schedule::new(nr_ops, instance.nr_of_machines());
        let mut pred_remaining: Vec<usize> = instance
            .operations()
            .iter()
            .map(|op| op.predecessors.len())
            .collect();
        let mut ready_at: Vec<Option<i64>> = vec![None; nr_ops];
        let mut ops_remaining: Vec<usize> = instance
            .jobs()
            .iter()
            .map(|job| job.operations.len())
            .collect();
        let mut work_remaining: Vec<i64> = instance
            .jobs()
            .iter()
            .map(|job| {
                job.operations
                    .iter()
                    .map(|&op| instance.operation(op).min_duration())
                    .sum()
            })
            .collect();

        // Event key: (time, job id, operation position).
        let mut events: BinaryHeap<Reverse<(i64, usize, usize)>> = BinaryHeap::new();
        for op in instance.operations() {
            if op.predecessors.is_empty() {
                let release = instance.job(op.job).release_time;
                ready_at[op.id] = Some(release);
                events.push(Reverse((release, op.job, op.position)));
            }
        }

        while let Some(&Reverse((time, _, _))) = events.peek() {
            if let Some(horizon) = self.horizon {
                if time >= horizon {
                    break;
                }
            }
            while let Some(&Reverse((t, _, _))) = events.peek() {
                if t != time {
                    break;
                }
                events.pop();
            }

            // Keep offering pairs at this instant until the policy passes
            // or nothing is schedulable.
            loop {
                let (ready, candidates) = gather(instance, &schedule, &ready_at, time);
                if candidates.is_empty() {
                    break;
                }
                let pick = {
                    let point = DecisionPoint {
                        time,
                        instance,
                        ready: &ready,
                        candidates: &candidates,
                        timelines: schedule.timelines(),
                        ops_remaining: &ops_remaining,
                        work_remaining: &work_remaining,
                    };
                    policy.select(&point)
                };
                let Some(pick) = pick else { break };
                debug_assert!(pick < candidates.len(), "policy picked out of range");
                let Some(&CandidatePair {
                    operation,
                    machine,
                    duration,
                }) = candidates.get(pick)
                else {
                    break;
                };

                let op = instance.operation(operation);
                let job = instance.job(op.job);
                // Candidates only ever contain ready operations.
                let ready_time = ready_at[operation].expect("candidate operation is ready");
                let (free_at, setup) = {
                    let timeline = schedule.timeline(machine);
                    let setup = match &timeline.last_family {
                        Some(prev) => instance.setup_times().get(machine, prev, &job.family),
                        None => 0,
                    };
                    (timeline.free_at, setup)
                };
                let setup_start = ready_time.max(free_at);
                let start = setup_start + setup;
                let end = start + duration;
                schedule.record(
                    OpAssignment {
                        operation,
                        job: op.job,
                        machine,
                        setup_start,
                        start,
                        end,
                    },
                    &job.family,
                );

                ops_remaining[op.job] -= 1;
                work_remaining[op.job] -= op.min_duration();
                // Event times are clamped to the current instant so the
                // clock never runs backwards on zero-duration operations.
                events.push(Reverse((end.max(time), op.job, op.position)));

                for &succ in &op.successors {
                    pred_remaining[succ] -= 1;
                    if pred_remaining[succ] == 0 {
                        let succ_op = instance.operation(succ);
                        let release = instance.job(succ_op.job).release_time;
                        let ready = succ_op
                            .predecessors
                            .iter()
                            .filter_map(|&p| schedule.assignment(p))
                            .map(|a| a.end)
                            .max()
                            .unwrap_or(0)
                            .max(release);
                        ready_at[succ] = Some(ready);
                        events.push(Reverse((ready.max(time), succ_op.job, succ_op.position)));
                    }
                }
            }
        }

        Ok(schedule)
    }
}

/// Constructs a complete schedule with no horizon.
pub fn construct(
    instance: &Instance,
    policy: &mut dyn DecisionPolicy,
) -> Result<Schedule, SchedulingError> {
    Constructor::new(instance).run(policy)
}

fn gather(
    instance: &Instance,
    schedule: &Schedule,
    ready_at: &[Option<i64>],
    time: i64,
) -> (Vec<OperationId>, Vec<CandidatePair>) {
    let mut ready = Vec::new();
    for (id, readiness) in ready_at.iter().enumerate() {
        if schedule.assignment(id).is_none() && readiness.is_some_and(|t| t <= time) {
            ready.push(id);
        }
    }

    let mut candidates = Vec::new();
    for &id in &ready {
        for option in &instance.operation(id).options {
            if schedule.timeline(option.machine).free_at <= time {
                candidates.push(CandidatePair {
                    operation: id,
                    machine: option.machine,
                    duration: option.duration,
                });
            }
        }
    }
    candidates.sort_by_key(|c| (c.operation, c.machine));
    (ready, candidates)
}
