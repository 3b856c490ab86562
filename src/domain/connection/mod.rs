//! Connection bounded context - lifecycle state and collaborator ports

pub mod port;
pub mod state;

pub use port::{
    ConnectionFactory, DisplaySink, IceGatheringState, LocalMedia, LocalTrack, MediaConstraints,
    MediaSource, MediaStreamRef, PeerConnection, RemoteTrack, RemoteTrackHandler,
    SignalingChannel, SupportsTransceivers, TransportConfig, DEFAULT_STUN_SERVER,
};
pub use state::ConnectionState;
