//! Online job arrival sampling.
//!
//! In online-arrival mode the shop is not known upfront: jobs appear at
//! sampled instants and decisions must be emitted without seeing future
//! arrivals. [`ArrivalProcess`] samples such a workload into a regular
//! [`Instance`] whose jobs carry arrival release times; constructing it
//! with a horizon (see
//! [`Constructor::with_horizon`](crate::scheduler::Constructor::with_horizon))
//! yields the partial-schedule result state.
//!
//! Inter-arrival gaps are exponential around the configured mean; job
//! shapes (operation count, compatible-machine count, durations) are
//! uniform within their ranges.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Instance, MachineId};

/// Parameters of the online arrival process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalProcess {
    /// Total machines in the shop.
    pub machines: usize,
    /// Mean inter-arrival gap between consecutive jobs.
    pub mean_interarrival: f64,
    /// Simulation end; no job arrives at or after it.
    pub horizon: i64,
    /// Inclusive range of operations per job.
    pub min_operations: usize,
    /// See `min_operations`.
    pub max_operations: usize,
    /// Inclusive range of per-operation durations.
    pub min_duration: i64,
    /// See `min_duration`.
    pub max_duration: i64,
    /// Inclusive range of compatible machines per operation.
    pub min_machines_per_operation: usize,
    /// See `min_machines_per_operation`.
    pub max_machines_per_operation: usize,
    /// Job families drawn uniformly per job.
    pub families: Vec<String>,
}

impl Default for ArrivalProcess {
    fn default() -> Self {
        Self {
            machines: 5,
            mean_interarrival: 10.0,
            horizon: 200,
            min_operations: 2,
            max_operations: 5,
            min_duration: 1,
            max_duration: 10,
            min_machines_per_operation: 1,
            max_machines_per_operation: 3,
            families: vec!["A".into(), "B".into()],
        }
    }
}

impl ArrivalProcess {
    /// Samples a workload: jobs with exponential inter-arrival release
    /// times, uniform shapes, and chain precedence.
    pub fn sample_instance<R: Rng>(&self, rng: &mut R) -> Instance {
        let mut instance = Instance::new(self.machines);
        let mut clock = 0.0f64;
        loop {
            clock += exponential(rng, self.mean_interarrival);
            let release = clock as i64;
            if release >= self.horizon {
                break;
            }
            let family = self
                .families
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| "A".into());
            let job = instance.add_job(family, release);

            let operations = rng.random_range(self.min_operations..=self.max_operations.max(self.min_operations));
            for _ in 0..operations.max(1) {
                let options = self.sample_options(rng);
                instance.add_operation(job, &options);
            }
        }
        instance
    }

    fn sample_options<R: Rng>(&self, rng: &mut R) -> Vec<(MachineId, i64)> {
        let upper = self.max_machines_per_operation.min(self.machines);
        let lower = self.min_machines_per_operation.clamp(1, upper.max(1));
        let count = rng.random_range(lower..=upper.max(lower));

        let mut machines: Vec<MachineId> = (0..self.machines).collect();
        machines.shuffle(rng);
        machines
            .into_iter()
            .take(count)
            .map(|machine| {
                let duration = rng.random_range(self.min_duration..=self.max_duration.max(self.min_duration));
                (machine, duration)
            })
            .collect()
    }
}

fn exponential<R: Rng>(rng: &mut R, mean: f64) -> f64 {
    let u: f64 = rng.random();
    -mean * (1.0 - u).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::{MachineRule, OperationRule, RulePolicy};
    use crate::scheduler::Constructor;
    use crate::validation::validate_instance;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_sampled_instance_respects_ranges() {
        let process = ArrivalProcess::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let instance = process.sample_instance(&mut rng);

        assert!(validate_instance(&instance).is_ok());
        for job in instance.jobs() {
            assert!(job.release_time < process.horizon);
            assert!((2..=5).contains(&job.operation_count()));
            assert!(process.families.contains(&job.family));
        }
        for op in instance.operations() {
            assert!((1..=3).contains(&op.option_count()));
            let mut machines: Vec<_> = op.options.iter().map(|o| o.machine).collect();
            machines.dedup();
            assert_eq!(machines.len(), op.option_count(), "duplicate machine option");
            for option in &op.options {
                assert!((1..=10).contains(&option.duration));
                assert!(option.machine < process.machines);
            }
        }
    }

    #[test]
    fn test_online_run_yields_partial_schedule() {
        let process = ArrivalProcess {
            mean_interarrival: 5.0,
            horizon: 60,
            ..ArrivalProcess::default()
        };
        let mut rng = SmallRng::seed_from_u64(7);
        let instance = process.sample_instance(&mut rng);
        assert!(instance.nr_of_jobs() > 0);

        let mut policy = RulePolicy::new(OperationRule::Fifo, MachineRule::Eet).unwrap();
        let schedule = Constructor::new(&instance)
            .with_horizon(process.horizon)
            .run(&mut policy)
            .unwrap();

        // Whatever was scheduled respects release times; the tail may be
        // cut off by the horizon without being an error.
        for a in schedule.assignments() {
            assert!(a.start >= instance.job(a.job).release_time);
        }
        let scheduled = schedule.scheduled_count();
        assert!(scheduled > 0);
        assert_eq!(
            scheduled + schedule.unscheduled().len(),
            instance.nr_of_operations()
        );
    }

    #[test]
    fn test_exponential_sampling_is_positive() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(exponential(&mut rng, 10.0) >= 0.0);
        }
    }
}
