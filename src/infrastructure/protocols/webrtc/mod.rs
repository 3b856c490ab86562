//! WebRTC engine adapters
pub mod display;
pub mod media;
pub mod peer;

pub use display::LoggingDisplaySink;
pub use media::StaticMediaSource;
pub use peer::{WebRtcConnectionFactory, WebRtcPeerConnection};
