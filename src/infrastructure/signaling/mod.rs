//! Signaling transports
pub mod http;

pub use http::HttpSignalingClient;
