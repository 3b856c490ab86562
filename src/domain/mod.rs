//! Domain layer - Core session rules
//!
//! This layer contains:
//! - Value Objects: session descriptions, states, payload types
//! - Pure transforms: the SDP codec filter
//! - Ports: traits for the transport engine, media, display and signaling

pub mod connection;
pub mod negotiation;
pub mod sdp;
pub mod shared;

// Re-export commonly used types
pub use shared::{NegotiationError, Result, SessionError, TransportError};
