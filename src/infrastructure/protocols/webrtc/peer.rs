/// WebRTC peer connection adapter
///
/// Implements the connection ports on top of `webrtc::RTCPeerConnection`.
/// ICE gathering is mirrored into a watch channel so callers can check the
/// current state and then subscribe without missing the completion.
use crate::domain::connection::{
    ConnectionFactory, IceGatheringState, LocalTrack, MediaStreamRef, PeerConnection, RemoteTrack,
    RemoteTrackHandler, SupportsTransceivers, TransportConfig,
};
use crate::domain::sdp::{SdpType, SessionDescription};
use crate::domain::shared::error::TransportError;
use crate::domain::shared::value_objects::MediaKind;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_H264, MIME_TYPE_OPUS};
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

type Result<T> = std::result::Result<T, TransportError>;

fn engine_error(context: &str, e: webrtc::Error) -> TransportError {
    TransportError::Engine(format!("{}: {}", context, e))
}

/// Builds webrtc-rs connections with the default codecs and interceptors
#[derive(Debug, Clone, Default)]
pub struct WebRtcConnectionFactory;

impl WebRtcConnectionFactory {
    pub fn new() -> Self {
        Self
    }

    fn build_api() -> Result<API> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| engine_error("Failed to register codecs", e))?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| engine_error("Failed to register interceptors", e))?;

        Ok(APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build())
    }
}

#[async_trait]
impl ConnectionFactory for WebRtcConnectionFactory {
    async fn create(&self, config: &TransportConfig) -> Result<Arc<dyn PeerConnection>> {
        // webrtc-rs speaks unified plan only
        if !config.unified_plan {
            return Err(TransportError::UnsupportedConfiguration(
                "plan-b SDP semantics are not available".to_string(),
            ));
        }

        let api = Self::build_api()?;

        let ice_servers = if config.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }]
        };

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let pc = api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| engine_error("Failed to create peer connection", e))?;

        info!(
            "Created peer connection with {} ICE server(s)",
            config.ice_servers.len()
        );
        Ok(Arc::new(WebRtcPeerConnection::new(Arc::new(pc))))
    }
}

pub struct WebRtcPeerConnection {
    pc: Arc<RTCPeerConnection>,
    gathering: Arc<watch::Sender<IceGatheringState>>,
}

impl WebRtcPeerConnection {
    pub fn new(pc: Arc<RTCPeerConnection>) -> Self {
        let initial = gathering_state(pc.ice_gathering_state());
        let gathering = Arc::new(watch::channel(initial).0);

        let sender = gathering.clone();
        pc.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
            let mapped = match state {
                RTCIceGathererState::New => Some(IceGatheringState::New),
                RTCIceGathererState::Gathering => Some(IceGatheringState::Gathering),
                RTCIceGathererState::Complete => Some(IceGatheringState::Complete),
                RTCIceGathererState::Closed => Some(IceGatheringState::Closed),
                _ => None,
            };
            if let Some(mapped) = mapped {
                debug!("ICE gatherer state: {:?}", state);
                sender.send_replace(mapped);
            }
            Box::pin(async {})
        }));

        Self { pc, gathering }
    }

    pub fn inner(&self) -> &Arc<RTCPeerConnection> {
        &self.pc
    }
}

fn gathering_state(state: RTCIceGatheringState) -> IceGatheringState {
    match state {
        RTCIceGatheringState::Gathering => IceGatheringState::Gathering,
        RTCIceGatheringState::Complete => IceGatheringState::Complete,
        _ => IceGatheringState::New,
    }
}

fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription> {
    let sdp = description.to_sdp_string();
    let converted = match description.sdp_type() {
        SdpType::Offer => RTCSessionDescription::offer(sdp),
        SdpType::Answer => RTCSessionDescription::answer(sdp),
    };
    converted.map_err(|e| engine_error("Invalid session description", e))
}

fn from_rtc(description: RTCSessionDescription) -> Result<SessionDescription> {
    match description.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(&description.sdp)),
        RTCSdpType::Answer | RTCSdpType::Pranswer => {
            Ok(SessionDescription::answer(&description.sdp))
        }
        other => Err(TransportError::UnsupportedDescription(format!("{:?}", other))),
    }
}

fn codec_for(kind: MediaKind) -> RTCRtpCodecCapability {
    match kind {
        MediaKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        MediaKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_H264.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    }
}

#[async_trait]
impl PeerConnection for WebRtcPeerConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| engine_error("Failed to create offer", e))?;
        from_rtc(offer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.pc
            .set_local_description(to_rtc(description)?)
            .await
            .map_err(|e| engine_error("Failed to set local description", e))
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let description = self.pc.local_description().await?;
        match from_rtc(description) {
            Ok(description) => Some(description),
            Err(e) => {
                warn!("Ignoring local description: {}", e);
                None
            }
        }
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.pc
            .set_remote_description(to_rtc(description)?)
            .await
            .map_err(|e| engine_error("Failed to set remote description", e))
    }

    fn ice_gathering_state(&self) -> IceGatheringState {
        gathering_state(self.pc.ice_gathering_state())
    }

    fn subscribe_ice_gathering(&self) -> watch::Receiver<IceGatheringState> {
        self.gathering.subscribe()
    }

    async fn add_track(&self, track: &LocalTrack, stream: &MediaStreamRef) -> Result<()> {
        let local = Arc::new(TrackLocalStaticSample::new(
            codec_for(track.kind),
            track.id.clone(),
            stream.id.clone(),
        ));

        let sender = self
            .pc
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| engine_error("Failed to add track", e))?;

        // Drain RTCP so interceptors keep running
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });

        debug!("Added {} track {} to stream {}", track.kind, track.id, stream.id);
        Ok(())
    }

    async fn stop_local_tracks(&self) -> Result<usize> {
        let mut stopped = 0;
        for sender in self.pc.get_senders().await {
            if sender.track().await.is_none() {
                continue;
            }
            sender
                .stop()
                .await
                .map_err(|e| engine_error("Failed to stop sender", e))?;
            stopped += 1;
        }
        Ok(stopped)
    }

    fn on_remote_track(&self, handler: RemoteTrackHandler) {
        self.pc
            .on_track(Box::new(move |track, _receiver, _transceiver| {
                let kind = match track.kind() {
                    RTPCodecType::Audio => Some(MediaKind::Audio),
                    RTPCodecType::Video => Some(MediaKind::Video),
                    _ => None,
                };
                match kind {
                    Some(kind) => {
                        let stream_id = track.stream_id();
                        let streams = if stream_id.is_empty() {
                            Vec::new()
                        } else {
                            vec![MediaStreamRef::new(stream_id)]
                        };
                        handler(RemoteTrack {
                            track_id: track.id(),
                            kind,
                            streams,
                        });
                    }
                    None => warn!("Remote track {} has no media kind", track.id()),
                }
                Box::pin(async {})
            }));
    }

    fn transceivers(&self) -> Option<&dyn SupportsTransceivers> {
        Some(self)
    }

    async fn close(&self) -> Result<()> {
        self.pc
            .close()
            .await
            .map_err(|e| engine_error("Failed to close peer connection", e))
    }
}

#[async_trait]
impl SupportsTransceivers for WebRtcPeerConnection {
    async fn stop_transceivers(&self) -> Result<usize> {
        let transceivers = self.pc.get_transceivers().await;
        for transceiver in &transceivers {
            transceiver
                .stop()
                .await
                .map_err(|e| engine_error("Failed to stop transceiver", e))?;
        }
        Ok(transceivers.len())
    }
}
