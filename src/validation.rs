//! Input validation for problem instances.
//!
//! Checks structural integrity of an instance before scheduling. Detects:
//! - Operations with no compatible machine
//! - Machine references outside the instance
//! - Negative durations
//! - Dangling predecessor references
//! - Jobs with no operations
//! - Circular precedence (DAG validation)
//!
//! The constructor repeats the fatal subset of these checks (missing
//! compatibility, cycles) so it stays safe on unvalidated input; this
//! module is the richer preflight that reports *all* problems at once.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use crate::models::Instance;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// An operation has an empty compatibility list.
    NoCompatibleMachine,
    /// A compatibility pair references a machine that doesn't exist.
    InvalidMachineReference,
    /// A compatibility pair has a negative duration.
    NegativeDuration,
    /// An operation references a predecessor that doesn't exist.
    InvalidPredecessor,
    /// A job has no operations.
    EmptyJob,
    /// Precedence graph contains a cycle.
    CyclicDependency,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates an instance.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_instance(instance: &Instance) -> ValidationResult {
    let mut errors = Vec::new();
    let machine_count = instance.nr_of_machines();
    let operation_count = instance.nr_of_operations();

    for job in instance.jobs() {
        if job.operations.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyJob,
                format!("job {} has no operations", job.id),
            ));
        }
    }

    for op in instance.operations() {
        if op.options.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::NoCompatibleMachine,
                format!("operation {} has no compatible machine", op.id),
            ));
        }
        for option in &op.options {
            if option.machine >= machine_count {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidMachineReference,
                    format!(
                        "operation {} references unknown machine {}",
                        op.id, option.machine
                    ),
                ));
            }
            if option.duration < 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NegativeDuration,
                    format!(
                        "operation {} has negative duration {} on machine {}",
                        op.id, option.duration, option.machine
                    ),
                ));
            }
        }
        for &pred in &op.predecessors {
            if pred >= operation_count {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!("operation {} references unknown predecessor {}", op.id, pred),
                ));
            }
        }
    }

    // Cycle check only makes sense once all references resolve.
    if errors
        .iter()
        .all(|e| e.kind != ValidationErrorKind::InvalidPredecessor)
        && instance.topological_order().is_err()
    {
        errors.push(ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            "precedence graph contains a cycle",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_instance() -> Instance {
        let mut inst = Instance::new(2);
        let j0 = inst.add_job("A", 0);
        inst.add_operation(j0, &[(0, 3), (1, 4)]);
        inst.add_operation(j0, &[(1, 2)]);
        let j1 = inst.add_job("B", 0);
        inst.add_operation(j1, &[(0, 5)]);
        inst
    }

    #[test]
    fn test_valid_instance() {
        assert!(validate_instance(&valid_instance()).is_ok());
    }

    #[test]
    fn test_no_compatible_machine() {
        let mut inst = valid_instance();
        let j = inst.add_job("C", 0);
        inst.add_operation(j, &[]);

        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::NoCompatibleMachine));
    }

    #[test]
    fn test_invalid_machine_reference() {
        let mut inst = valid_instance();
        let j = inst.add_job("C", 0);
        inst.add_operation(j, &[(9, 1)]);

        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidMachineReference));
    }

    #[test]
    fn test_negative_duration() {
        let mut inst = valid_instance();
        let j = inst.add_job("C", 0);
        inst.add_operation(j, &[(0, -1)]);

        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::NegativeDuration));
    }

    #[test]
    fn test_invalid_predecessor() {
        let mut inst = valid_instance();
        let j = inst.add_job("C", 0);
        inst.add_operation_dag(j, &[(0, 1)], &[99]);

        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidPredecessor));
    }

    #[test]
    fn test_empty_job() {
        let mut inst = valid_instance();
        inst.add_job("empty", 0);

        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::EmptyJob));
    }

    #[test]
    fn test_cyclic_dependency() {
        let mut inst = valid_instance();
        // Op 0 -> 1 already exists; close the loop.
        inst.add_precedence(1, 0);

        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CyclicDependency));
    }

    #[test]
    fn test_multiple_errors() {
        let mut inst = Instance::new(1);
        inst.add_job("empty", 0);
        let j = inst.add_job("C", 0);
        inst.add_operation(j, &[]);

        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
