//! Lifecycle states and the diagnostics snapshot

use crate::core::types::{Address, ProcessId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the supervisor is in its attach/poll cycle
///
/// `SearchingProcess` is reported externally as "not found" and
/// `SearchingModule` as "attaching".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LifecycleState {
    SearchingProcess = 0,
    SearchingModule = 1,
    Idle = 2,
    Active = 3,
}

impl LifecycleState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => LifecycleState::SearchingModule,
            2 => LifecycleState::Idle,
            3 => LifecycleState::Active,
            _ => LifecycleState::SearchingProcess,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::SearchingProcess => "not found",
            LifecycleState::SearchingModule => "attaching",
            LifecycleState::Idle => "idle",
            LifecycleState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Read-only view of the supervisor for UI and logging consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub state: LifecycleState,
    pub ready: bool,
    pub ticks_per_second: u32,
    pub module_base: Address,
    pub pid: Option<ProcessId>,
    pub attach_generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_state_round_trip_through_u8() {
        for state in [
            LifecycleState::SearchingProcess,
            LifecycleState::SearchingModule,
            LifecycleState::Idle,
            LifecycleState::Active,
        ] {
            assert_eq!(LifecycleState::from_u8(state as u8), state);
        }
        assert_eq!(LifecycleState::from_u8(200), LifecycleState::SearchingProcess);
    }

    #[test]
    fn test_diagnostics_json() {
        let diagnostics = Diagnostics {
            state: LifecycleState::Active,
            ready: true,
            ticks_per_second: 1200,
            module_base: Address::new(0x7FF6_1234_0000),
            pid: Some(4242),
            attach_generation: 2,
        };
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "active",
                "ready": true,
                "ticks_per_second": 1200,
                "module_base": 0x7FF6_1234_0000u64,
                "pid": 4242,
                "attach_generation": 2
            })
        );
    }
}
