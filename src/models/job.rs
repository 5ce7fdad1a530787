//! Job model.
//!
//! A job is an ordered collection of operations. For assembly-type
//! instances the job-internal precedence may be a DAG rather than a
//! chain; the edges themselves live on the operations.

use serde::{Deserialize, Serialize};

use super::OperationId;

/// Dense job index into the instance.
pub type JobId = usize;

/// A job to be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Dense job index.
    pub id: JobId,
    /// Setup-time family. Machines switching between families incur
    /// sequence-dependent setup time from [`SetupTimes`](super::SetupTimes).
    pub family: String,
    /// Earliest instant any operation of this job may start. 0 for static
    /// instances; the sampled arrival instant in online-arrival mode.
    pub release_time: i64,
    /// Operation ids in job order.
    pub operations: Vec<OperationId>,
}

impl Job {
    pub(crate) fn new(id: JobId, family: impl Into<String>, release_time: i64) -> Self {
        Self {
            id,
            family: family.into(),
            release_time,
            operations: Vec::new(),
        }
    }

    /// Number of operations in this job.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_fields() {
        let mut job = Job::new(3, "TypeA", 100);
        job.operations.push(7);
        job.operations.push(8);

        assert_eq!(job.id, 3);
        assert_eq!(job.family, "TypeA");
        assert_eq!(job.release_time, 100);
        assert_eq!(job.operation_count(), 2);
    }
}
