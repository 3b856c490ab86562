//! Negotiation value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Negotiation state
///
/// One negotiation attempt walks the happy path strictly in order; any
/// non-terminal state may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationState {
    /// Nothing has happened yet
    Idle,
    /// Local offer requested and being installed
    CreatingOffer,
    /// Waiting for ICE gathering to complete
    GatheringICE,
    /// Restricting the offer to the configured codecs
    Filtering,
    /// Offer/answer round trip with the signaling endpoint
    Signaling,
    /// Installing the remote answer
    Applying,
    /// Remote description applied
    Completed,
    /// A step failed
    Failed,
}

impl NegotiationState {
    /// Check if state transition is valid
    pub fn can_transition_to(&self, new_state: &NegotiationState) -> bool {
        use NegotiationState::*;

        match (self, new_state) {
            (Idle, CreatingOffer) => true,
            (CreatingOffer, GatheringICE) => true,
            (GatheringICE, Filtering) => true,
            (Filtering, Signaling) => true,
            (Signaling, Applying) => true,
            (Applying, Completed) => true,

            // Terminal states
            (Completed, _) | (Failed, _) => false,

            (_, Failed) => true,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NegotiationState::Completed | NegotiationState::Failed)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
