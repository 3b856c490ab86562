//! Shared kernel - Common types used across all bounded contexts

pub mod error;
pub mod value_objects;

pub use error::{NegotiationError, Result, SessionError, TransportError};
pub use value_objects::*;
