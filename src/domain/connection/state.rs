//! Connection value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No connection
    Idle,
    /// Acquiring media and negotiating
    Starting,
    /// Remote description applied
    Active,
    /// Teardown scheduled, waiting for the grace delay
    Stopping,
}

impl ConnectionState {
    /// Check if state transition is valid
    pub fn can_transition_to(&self, new_state: &ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, new_state) {
            (Idle, Starting) => true,

            // Failed start falls back to Idle
            (Starting, Active) => true,
            (Starting, Idle) => true,

            (Active, Stopping) => true,

            (Stopping, Idle) => true,

            _ => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ConnectionState::Starting | ConnectionState::Stopping)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
