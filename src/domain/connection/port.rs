//! Ports for the collaborators the session core drives
//!
//! These are defined in the domain layer as traits and implemented in the
//! infrastructure layer (webrtc engine, HTTP signaling, media sources).

use crate::domain::sdp::SessionDescription;
use crate::domain::shared::error::{NegotiationError, Result, TransportError};
use crate::domain::shared::value_objects::MediaKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// STUN server used when nothing else is configured
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// ICE gathering state as seen by the negotiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
    /// Gatherer shut down before completing
    Closed,
}

/// Reference to a media stream handed to a display sink
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaStreamRef {
    pub id: String,
}

impl MediaStreamRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A locally captured track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: String,
    pub kind: MediaKind,
}

/// Result of local media acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMedia {
    pub stream: MediaStreamRef,
    pub tracks: Vec<LocalTrack>,
}

/// Which local devices to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Track announced by the remote peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub track_id: String,
    pub kind: MediaKind,
    pub streams: Vec<MediaStreamRef>,
}

/// Callback invoked for every inbound track
pub type RemoteTrackHandler = Arc<dyn Fn(RemoteTrack) + Send + Sync>;

/// Fixed transport configuration for a new connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub ice_servers: Vec<String>,
    pub unified_plan: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
            unified_plan: true,
        }
    }
}

/// Transport connection (one per session)
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Ask the engine for a local offer
    async fn create_offer(&self) -> std::result::Result<SessionDescription, TransportError>;

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> std::result::Result<(), TransportError>;

    /// Current local description, including candidates gathered so far
    async fn local_description(&self) -> Option<SessionDescription>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> std::result::Result<(), TransportError>;

    fn ice_gathering_state(&self) -> IceGatheringState;

    /// Receiver that observes every later gathering state change
    fn subscribe_ice_gathering(&self) -> watch::Receiver<IceGatheringState>;

    async fn add_track(
        &self,
        track: &LocalTrack,
        stream: &MediaStreamRef,
    ) -> std::result::Result<(), TransportError>;

    /// Stop every locally sent track; returns how many were stopped
    async fn stop_local_tracks(&self) -> std::result::Result<usize, TransportError>;

    fn on_remote_track(&self, handler: RemoteTrackHandler);

    /// Transceiver control, when the engine exposes it
    fn transceivers(&self) -> Option<&dyn SupportsTransceivers>;

    async fn close(&self) -> std::result::Result<(), TransportError>;
}

/// Capability: the connection can enumerate and stop its transceivers
#[async_trait]
pub trait SupportsTransceivers: Send + Sync {
    /// Stop every transceiver; returns how many were stopped
    async fn stop_transceivers(&self) -> std::result::Result<usize, TransportError>;
}

/// Builds transport connections
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create(
        &self,
        config: &TransportConfig,
    ) -> std::result::Result<Arc<dyn PeerConnection>, TransportError>;
}

/// Local camera/microphone acquisition
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fails with `SessionError::MediaAcquisition`
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalMedia>;
}

/// Where a stream is shown; `None` clears it
pub trait DisplaySink: Send + Sync {
    fn attach(&self, stream: Option<MediaStreamRef>);
}

/// Offer/answer exchange with the remote signaling endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    async fn exchange(
        &self,
        offer: &SessionDescription,
    ) -> std::result::Result<SessionDescription, NegotiationError>;
}
