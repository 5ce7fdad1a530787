//! Priority dispatching rules.
//!
//! [`RulePolicy`] drives the constructor with a two-stage decision:
//! rank ready operations by the configured [`OperationRule`], then rank
//! the top operation's available machines by the configured
//! [`MachineRule`]. Ties break by lowest operation id, then lowest
//! machine id.
//!
//! # Score Convention
//!
//! Lower scores = higher priority. "Most …" rules negate their measure.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;
use crate::models::{MachineId, OperationId};
use crate::scheduler::{CandidatePair, DecisionPoint, DecisionPolicy};

/// Operation-selection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationRule {
    /// First In First Out: earliest job release/arrival time.
    Fifo,
    /// Shortest Processing Time on the best available machine.
    /// Must be paired with [`MachineRule::Spt`].
    Spt,
    /// Most Operations Remaining in the owning job.
    Mor,
    /// Least Operations Remaining in the owning job.
    Lor,
    /// Most Work Remaining in the owning job.
    Mwkr,
    /// Least Work Remaining in the owning job.
    Lwkr,
}

impl OperationRule {
    /// Rule name.
    pub fn name(&self) -> &'static str {
        match self {
            OperationRule::Fifo => "FIFO",
            OperationRule::Spt => "SPT",
            OperationRule::Mor => "MOR",
            OperationRule::Lor => "LOR",
            OperationRule::Mwkr => "MWKR",
            OperationRule::Lwkr => "LWKR",
        }
    }
}

/// Machine-selection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineRule {
    /// Shortest processing time on the candidate machine.
    Spt,
    /// Earliest end time among available candidates, setup included.
    Eet,
}

impl MachineRule {
    /// Rule name.
    pub fn name(&self) -> &'static str {
        match self {
            MachineRule::Spt => "SPT",
            MachineRule::Eet => "EET",
        }
    }
}

/// A validated (operation rule, machine rule) dispatching policy.
///
/// # Example
///
/// ```
/// use flexshop::dispatching::{MachineRule, OperationRule, RulePolicy};
/// use flexshop::models::Instance;
/// use flexshop::scheduler::construct;
///
/// let mut instance = Instance::new(1);
/// let job = instance.add_job("A", 0);
/// instance.add_operation(job, &[(0, 5)]);
///
/// let mut policy = RulePolicy::new(OperationRule::Fifo, MachineRule::Eet)?;
/// let schedule = construct(&instance, &mut policy)?;
/// assert_eq!(schedule.makespan(), 5);
/// # Ok::<(), flexshop::SchedulingError>(())
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RulePolicy {
    operation_rule: OperationRule,
    machine_rule: MachineRule,
}

impl RulePolicy {
    /// Creates a rule policy, rejecting incompatible combinations.
    ///
    /// # Errors
    /// [`SchedulingError::IncompatibleRulePair`]: the SPT operation rule
    /// ranks operations by their shortest available processing time, so
    /// any other machine rule would schedule a different duration than
    /// the one that won the ranking.
    pub fn new(
        operation_rule: OperationRule,
        machine_rule: MachineRule,
    ) -> Result<Self, SchedulingError> {
        if operation_rule == OperationRule::Spt && machine_rule != MachineRule::Spt {
            return Err(SchedulingError::IncompatibleRulePair {
                operation_rule,
                machine_rule,
            });
        }
        Ok(Self {
            operation_rule,
            machine_rule,
        })
    }

    /// The configured operation rule.
    pub fn operation_rule(&self) -> OperationRule {
        self.operation_rule
    }

    /// The configured machine rule.
    pub fn machine_rule(&self) -> MachineRule {
        self.machine_rule
    }

    fn operation_score(&self, operation: OperationId, point: &DecisionPoint<'_>) -> i64 {
        let job = point.instance.operation(operation).job;
        match self.operation_rule {
            OperationRule::Fifo => point.instance.job(job).release_time,
            OperationRule::Spt => point
                .candidates
                .iter()
                .filter(|c| c.operation == operation)
                .map(|c| c.duration)
                .min()
                .unwrap_or(i64::MAX),
            OperationRule::Mor => -(point.ops_remaining[job] as i64),
            OperationRule::Lor => point.ops_remaining[job] as i64,
            OperationRule::Mwkr => -point.work_remaining[job],
            OperationRule::Lwkr => point.work_remaining[job],
        }
    }

    fn machine_score(&self, pair: &CandidatePair, point: &DecisionPoint<'_>) -> i64 {
        match self.machine_rule {
            MachineRule::Spt => pair.duration,
            MachineRule::Eet => {
                let timeline = &point.timelines[pair.machine];
                let family = &point.instance.job(point.instance.operation(pair.operation).job).family;
                let setup = match &timeline.last_family {
                    Some(prev) => point.instance.setup_times().get(pair.machine, prev, family),
                    None => 0,
                };
                setup + pair.duration
            }
        }
    }
}

impl DecisionPolicy for RulePolicy {
    fn name(&self) -> &'static str {
        self.operation_rule.name()
    }

    fn select(&mut self, point: &DecisionPoint<'_>) -> Option<usize> {
        // Stage 1: best schedulable operation. Candidates are sorted by
        // (operation, machine), so distinct operations appear in id order
        // and ties resolve to the lowest id.
        let mut best_operation: Option<(i64, OperationId)> = None;
        let mut previous = usize::MAX;
        for pair in point.candidates {
            if pair.operation == previous {
                continue;
            }
            previous = pair.operation;
            let score = self.operation_score(pair.operation, point);
            if best_operation.is_none_or(|(s, o)| (score, pair.operation) < (s, o)) {
                best_operation = Some((score, pair.operation));
            }
        }
        let (_, operation) = best_operation?;

        // Stage 2: best machine for that operation, ties to the lowest id.
        let mut best: Option<(i64, MachineId, usize)> = None;
        for (index, pair) in point.candidates.iter().enumerate() {
            if pair.operation != operation {
                continue;
            }
            let score = self.machine_score(pair, point);
            if best.is_none_or(|(s, m, _)| (score, pair.machine) < (s, m)) {
                best = Some((score, pair.machine, index));
            }
        }
        best.map(|(_, _, index)| index)
    }
}
