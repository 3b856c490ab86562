//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use rtc_negotiator::application::{ConnectionLifecycle, LifecycleSettings};
use rtc_negotiator::domain::connection::{
    ConnectionFactory, DisplaySink, IceGatheringState, LocalTrack, MediaSource, MediaStreamRef,
    PeerConnection, RemoteTrackHandler, SignalingChannel, SupportsTransceivers, TransportConfig,
};
use rtc_negotiator::domain::sdp::SessionDescription;
use rtc_negotiator::domain::shared::error::{NegotiationError, TransportError};
use rtc_negotiator::infrastructure::protocols::webrtc::StaticMediaSource;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const OFFER: &str = "v=0\r\n\
    o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
    s=-\r\n\
    t=0 0\r\n\
    m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
    a=rtpmap:111 opus/48000/2\r\n\
    m=video 9 UDP/TLS/RTP/SAVPF 96 97 98 99\r\n\
    a=rtpmap:96 H264/90000\r\n\
    a=rtcp-fb:96 nack\r\n\
    a=fmtp:96 level-asymmetry-allowed=1;packetization-mode=1\r\n\
    a=rtpmap:97 rtx/90000\r\n\
    a=fmtp:97 apt=96\r\n\
    a=rtpmap:98 VP8/90000\r\n\
    a=rtcp-fb:98 nack\r\n\
    a=rtpmap:99 rtx/90000\r\n\
    a=fmtp:99 apt=98\r\n";

pub const ANSWER: &str = "v=0\r\n\
    o=- 1 2 IN IP4 127.0.0.1\r\n\
    s=-\r\n\
    t=0 0\r\n\
    m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
    a=rtpmap:96 H264/90000\r\n";

/// Connection that offers `OFFER` and reports gathering complete
#[derive(Default)]
pub struct FakeConnection {
    pub local: Mutex<Option<SessionDescription>>,
    pub remote: Mutex<Option<SessionDescription>>,
    pub closed: AtomicUsize,
}

#[async_trait]
impl PeerConnection for FakeConnection {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        Ok(SessionDescription::offer(OFFER))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        *self.local.lock().unwrap() = Some(description);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        *self.remote.lock().unwrap() = Some(description);
        Ok(())
    }

    fn ice_gathering_state(&self) -> IceGatheringState {
        IceGatheringState::Complete
    }

    fn subscribe_ice_gathering(&self) -> watch::Receiver<IceGatheringState> {
        watch::channel(IceGatheringState::Complete).1
    }

    async fn add_track(
        &self,
        _track: &LocalTrack,
        _stream: &MediaStreamRef,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop_local_tracks(&self) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn on_remote_track(&self, _handler: RemoteTrackHandler) {}

    fn transceivers(&self) -> Option<&dyn SupportsTransceivers> {
        None
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub connections: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeFactory {
    pub fn created(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Arc<FakeConnection>> {
        self.connections.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    async fn create(
        &self,
        _config: &TransportConfig,
    ) -> Result<Arc<dyn PeerConnection>, TransportError> {
        let connection = Arc::new(FakeConnection::default());
        self.connections.lock().unwrap().push(connection.clone());
        Ok(connection)
    }
}

/// Signaling channel that answers every offer with `ANSWER`
pub struct FixedAnswer;

#[async_trait]
impl SignalingChannel for FixedAnswer {
    async fn exchange(
        &self,
        _offer: &SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        Ok(SessionDescription::answer(ANSWER))
    }
}

pub struct NullSink;

impl DisplaySink for NullSink {
    fn attach(&self, _stream: Option<MediaStreamRef>) {}
}

pub fn lifecycle_with(
    factory: Arc<FakeFactory>,
    signaling: Arc<dyn SignalingChannel>,
    teardown_grace: Duration,
) -> ConnectionLifecycle {
    let media: Arc<dyn MediaSource> = Arc::new(StaticMediaSource::new());
    let settings = LifecycleSettings {
        teardown_grace,
        ..Default::default()
    };
    ConnectionLifecycle::new(
        factory,
        media,
        signaling,
        Arc::new(NullSink),
        Arc::new(NullSink),
        settings,
    )
}

/// Serve `router` on an ephemeral port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
