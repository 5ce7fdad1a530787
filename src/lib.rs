//! Flexible job-shop scheduling engine.
//!
//! Constructs and optimizes schedules for the flexible job shop problem
//! (FJSP): jobs are chains (or DAGs, for assembly variants) of
//! operations, each operation runs on any of several compatible machines
//! at a machine-dependent duration, and machines pay sequence-dependent
//! setup time when switching between job families.
//!
//! # Modules
//!
//! - **`models`**: domain types: `Instance`, `Job`, `Operation`,
//!   `Machine`, `SetupTimes`, `Schedule`
//! - **`validation`**: structural preflight checks (compatibility, DAG
//!   cycles, references)
//! - **`scheduler`**: the discrete-event constructor and the
//!   `DecisionPolicy` seam shared by every solution method
//! - **`dispatching`**: priority-rule policies (FIFO, SPT, MOR, ...)
//! - **`ga`**: dual-vector chromosome encoding and precedence-preserving
//!   genetic operators
//! - **`search`**: NSGA-II generational loop with a running Pareto
//!   archive over (makespan, workload balance)
//! - **`arrivals`**: online-arrival workload sampling
//!
//! # Architecture
//!
//! The constructor is the single source of truth for feasibility and
//! timing. Dispatching rules, decoded chromosomes, and external
//! inference dispatchers all implement the same
//! [`scheduler::DecisionPolicy`] contract, so every solution method
//! produces schedules through identical constraint enforcement.
//! Instances are immutable per run; evaluations write only their own
//! [`models::Schedule`] and may fan out across a worker pool.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Brandimarte (1993), "Routing and scheduling in a flexible job shop"
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic
//!   Algorithm: NSGA-II"

pub mod arrivals;
pub mod dispatching;
pub mod error;
pub mod ga;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod validation;

pub use error::SchedulingError;
