//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases.
//! It's responsible for:
//! - Sequencing the negotiation steps around the SDP filter
//! - Owning the connection state cell and its start/stop use cases

pub mod lifecycle;
pub mod negotiation;

pub use lifecycle::{ConnectionLifecycle, LifecycleSettings, SessionSnapshot};
pub use negotiation::{
    wait_for_ice_gathering, NegotiationOrchestrator, NegotiationOutcome, NegotiationSettings,
};
