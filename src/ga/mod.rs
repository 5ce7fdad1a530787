//! Genetic encoding and operators for flexible job-shop search.
//!
//! # Encoding
//!
//! An [`Individual`] carries two parallel vectors over the operation
//! arena:
//!
//! - **sequence**: a precedence-feasible permutation of operation ids
//!   (the order preference used at decision points)
//! - **assignment**: per operation, an index into its compatibility list
//!
//! Decoding produces a fixed-preference
//! [`DecisionPolicy`](crate::scheduler::DecisionPolicy) for the shared
//! constructor, so chromosome evaluation and rule-based dispatch go
//! through identical feasibility enforcement.
//!
//! # References
//!
//! - Bierwirth (1995), "A generalized permutation approach to JSSP"
//! - Cheng et al. (1996), "A Tutorial Survey of JSSP using GA"

mod chromosome;
pub mod operators;

pub use chromosome::{evaluate, Fitness, Individual, PreferencePolicy};
