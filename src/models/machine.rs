//! Machine model.
//!
//! A machine is a static descriptor only. Per-run timeline state
//! (next-free time, last processed family, assigned operations) lives in
//! [`MachineTimeline`](super::MachineTimeline) inside each schedule.

use serde::{Deserialize, Serialize};

/// Dense machine index into the instance.
pub type MachineId = usize;

/// A machine that processes operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Dense machine index.
    pub id: MachineId,
    /// Human-readable name.
    pub name: String,
}

impl Machine {
    /// Creates a machine with a default name (`M<id>`).
    pub fn new(id: MachineId) -> Self {
        Self {
            id,
            name: format!("M{id}"),
        }
    }

    /// Sets the machine name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_default_name() {
        let m = Machine::new(4);
        assert_eq!(m.id, 4);
        assert_eq!(m.name, "M4");

        let named = Machine::new(0).with_name("CNC-1");
        assert_eq!(named.name, "CNC-1");
    }
}
