//! Session errors

use std::time::Duration;
use thiserror::Error;

/// Session result type
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by `ConnectionLifecycle::start` / `stop`
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("Media acquisition failed: {0}")]
    MediaAcquisition(String),

    #[error("Negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

/// Errors raised by a single negotiation attempt
#[derive(Error, Debug, Clone)]
pub enum NegotiationError {
    #[error("Failed to create offer: {0}")]
    CreateOffer(String),

    #[error("Local description rejected: {0}")]
    LocalDescriptionRejected(String),

    #[error("ICE gathering aborted: {0}")]
    IceGathering(String),

    #[error("ICE gathering did not complete within {0:?}")]
    IceGatheringTimeout(Duration),

    #[error("No local description available")]
    MissingLocalDescription,

    #[error("Signaling request failed: {0}")]
    Signaling(String),

    #[error("Malformed signaling response: {0}")]
    MalformedResponse(String),

    #[error("Remote description rejected: {0}")]
    RemoteDescriptionRejected(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

/// Errors reported by the underlying transport engine
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Unsupported description type: {0}")]
    UnsupportedDescription(String),

    #[error("Unsupported transport configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Connection closed")]
    Closed,
}
