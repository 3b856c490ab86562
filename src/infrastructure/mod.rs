//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Protocol implementations (WebRTC engine, media, display)
//! - Signaling transports (HTTP)

pub mod protocols;
pub mod signaling;
