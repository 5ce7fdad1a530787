//! Scheduling error taxonomy.
//!
//! Structural errors (`InfeasibleInstance`, `CyclicPrecedence`,
//! `IncompatibleRulePair`) are fatal and surface to the caller before any
//! simulation runs. `RepairFailure` is recovered at the generation
//! boundary of the search loop: the offending offspring batch is dropped,
//! the error logged, and the search continues.
//!
//! A horizon-bounded run that leaves operations unscheduled is *not* an
//! error; it is a documented result state on
//! [`Schedule`](crate::models::Schedule).

use thiserror::Error;

use crate::dispatching::{MachineRule, OperationRule};
use crate::models::OperationId;

/// Errors raised by schedule construction and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulingError {
    /// An operation has no compatible machine.
    #[error("operation {operation} has no compatible machine")]
    InfeasibleInstance {
        /// The operation with an empty compatibility list.
        operation: OperationId,
    },

    /// The precedence relation is not a DAG.
    #[error("precedence graph has a cycle involving operation {operation}")]
    CyclicPrecedence {
        /// An operation on the cycle.
        operation: OperationId,
    },

    /// The configured dispatching-rule combination is invalid.
    #[error("operation rule {operation_rule:?} cannot be paired with machine rule {machine_rule:?}")]
    IncompatibleRulePair {
        /// Configured operation-selection rule.
        operation_rule: OperationRule,
        /// Configured machine-selection rule.
        machine_rule: MachineRule,
    },

    /// No precedence-valid linearization exists for an offspring
    /// sequence. Signals a variation bug rather than a data issue.
    #[error("no precedence-preserving linearization exists for the offspring sequence")]
    RepairFailure,
}
