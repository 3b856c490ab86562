//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST control API endpoints (session start/stop/status)
//! - Prometheus metrics exposition
//! - Request/response formatting

pub mod api;
