/// Local media source producing static-sample track descriptors
///
/// No capture devices are opened. Each requested kind gets one track id
/// under a fresh stream id; the peer adapter backs them with
/// `TrackLocalStaticSample` (Opus for audio, H264 for video).
use crate::domain::connection::{
    LocalMedia, LocalTrack, MediaConstraints, MediaSource, MediaStreamRef,
};
use crate::domain::shared::error::{Result, SessionError};
use crate::domain::shared::value_objects::MediaKind;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct StaticMediaSource;

impl StaticMediaSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaSource for StaticMediaSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalMedia> {
        let kinds: Vec<MediaKind> = [
            (constraints.audio, MediaKind::Audio),
            (constraints.video, MediaKind::Video),
        ]
        .into_iter()
        .filter_map(|(wanted, kind)| wanted.then_some(kind))
        .collect();

        if kinds.is_empty() {
            return Err(SessionError::MediaAcquisition(
                "neither audio nor video requested".to_string(),
            ));
        }

        let stream = MediaStreamRef::new(format!("local-{}", Uuid::new_v4().simple()));
        let tracks = kinds
            .into_iter()
            .map(|kind| LocalTrack {
                id: format!("{}-{}", kind, Uuid::new_v4().simple()),
                kind,
            })
            .collect::<Vec<_>>();

        info!("Opened {} local track(s) on {}", tracks.len(), stream.id);
        Ok(LocalMedia { stream, tracks })
    }
}
