//! SDP bounded context - session descriptions and codec restriction

pub mod description;
pub mod filter;
pub mod line;

pub use description::{SdpType, SessionDescription, WireDescription};
pub use filter::{filter_codec, SessionDescriptionFilter, DEFAULT_VIDEO_CODEC};
pub use line::SdpLine;
