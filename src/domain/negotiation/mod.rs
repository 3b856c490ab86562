//! Negotiation bounded context - the offer/answer state machine

pub mod state;

pub use state::NegotiationState;
