//! rtc-negotiator - codec-restricted WebRTC session negotiation
//!
//! Produces a local offer, restricts it to one video codec (plus its
//! retransmission payloads), exchanges it with a remote HTTP signaling
//! endpoint and applies the answer. Layered the DDD way: pure SDP rules in
//! `domain`, use cases in `application`, engine and HTTP adapters in
//! `infrastructure`, the control API in `interface`.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::SessionError;
pub use domain::shared::Result;
