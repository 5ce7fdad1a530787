//! Sequence-dependent setup times.
//!
//! Maps (from_family, to_family) per machine to a setup duration incurred
//! when a machine switches between job families. Same-family transitions
//! are free unless explicitly set.
//!
//! # Reference
//! Allahverdi et al. (2008), "A survey of scheduling problems with
//! setup times or costs"

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::MachineId;

/// Setup-time matrix for one machine.
///
/// Maps (from_family, to_family) to a setup duration in time units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupMatrix {
    /// Machine this matrix applies to.
    pub machine: MachineId,
    /// Setup durations: (from_family, to_family) -> time units.
    transitions: HashMap<(String, String), i64>,
    /// Default setup duration when no explicit transition is defined.
    pub default: i64,
}

impl SetupMatrix {
    /// Creates an empty matrix for a machine.
    pub fn new(machine: MachineId) -> Self {
        Self {
            machine,
            transitions: HashMap::new(),
            default: 0,
        }
    }

    /// Sets the default setup duration for undefined family pairs.
    pub fn with_default(mut self, default: i64) -> Self {
        self.default = default;
        self
    }

    /// Defines the setup duration between two families.
    pub fn set(&mut self, from: impl Into<String>, to: impl Into<String>, duration: i64) {
        self.transitions.insert((from.into(), to.into()), duration);
    }

    /// Setup duration between two families.
    ///
    /// Returns the explicit duration if defined, otherwise the default.
    /// Same-family transitions return 0 unless explicitly set.
    pub fn get(&self, from: &str, to: &str) -> i64 {
        let key = (from.to_string(), to.to_string());
        if from == to {
            return *self.transitions.get(&key).unwrap_or(&0);
        }
        *self.transitions.get(&key).unwrap_or(&self.default)
    }

    /// Number of explicitly defined transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }
}

/// Per-machine setup matrices for an instance.
///
/// Machines without a matrix incur no setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupTimes {
    matrices: HashMap<MachineId, SetupMatrix>,
}

impl SetupTimes {
    /// Creates an empty collection (no setup anywhere).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a matrix for a machine.
    pub fn add(&mut self, matrix: SetupMatrix) {
        self.matrices.insert(matrix.machine, matrix);
    }

    /// Builder: adds a matrix and returns self.
    pub fn with_matrix(mut self, matrix: SetupMatrix) -> Self {
        self.add(matrix);
        self
    }

    /// Setup duration on a machine between two families.
    ///
    /// Returns 0 if the machine has no matrix.
    pub fn get(&self, machine: MachineId, from: &str, to: &str) -> i64 {
        self.matrices
            .get(&machine)
            .map(|m| m.get(from, to))
            .unwrap_or(0)
    }

    /// Whether no machine has a setup matrix.
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Number of machines with a matrix.
    pub fn len(&self) -> usize {
        self.matrices.len()
    }
}
