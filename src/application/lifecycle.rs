//! Connection lifecycle service
//!
//! Owns the single connection cell and its `ConnectionState`. `start()` and
//! `stop()` are the only mutators; re-entry while a start or stop is in
//! flight is rejected.

use super::negotiation::{NegotiationOrchestrator, NegotiationSettings};
use crate::config::Config;
use crate::domain::connection::{
    ConnectionFactory, ConnectionState, DisplaySink, LocalMedia, MediaConstraints, MediaSource,
    PeerConnection, RemoteTrack, SignalingChannel, TransportConfig,
};
use crate::domain::negotiation::NegotiationState;
use crate::domain::shared::error::{Result, SessionError};
use crate::domain::shared::value_objects::SessionId;
use chrono::{DateTime, Utc};
use metrics::gauge;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Fixed inputs for every session this lifecycle starts
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub transport: TransportConfig,
    pub media: MediaConstraints,
    pub negotiation: NegotiationSettings,
    /// Delay between `stop()` and closing the connection
    pub teardown_grace: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            media: MediaConstraints::default(),
            negotiation: NegotiationSettings::default(),
            teardown_grace: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for LifecycleSettings {
    fn from(config: &Config) -> Self {
        Self {
            transport: config.transport.to_transport_config(),
            media: config.media.constraints(),
            negotiation: NegotiationSettings::from(&config.negotiation),
            teardown_grace: config.session.teardown_grace(),
        }
    }
}

/// Point-in-time view of the lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Option<SessionId>,
    pub state: ConnectionState,
    pub last_negotiation: Option<NegotiationState>,
    pub started_at: Option<DateTime<Utc>>,
}

struct ActiveSession {
    id: SessionId,
    connection: Arc<dyn PeerConnection>,
    media: LocalMedia,
    started_at: DateTime<Utc>,
}

pub struct ConnectionLifecycle {
    factory: Arc<dyn ConnectionFactory>,
    media_source: Arc<dyn MediaSource>,
    signaling: Arc<dyn SignalingChannel>,
    preview: Arc<dyn DisplaySink>,
    playback: Arc<dyn DisplaySink>,
    settings: LifecycleSettings,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Mutex<Option<ActiveSession>>,
    last_negotiation: RwLock<Option<NegotiationState>>,
}

impl ConnectionLifecycle {
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        media_source: Arc<dyn MediaSource>,
        signaling: Arc<dyn SignalingChannel>,
        preview: Arc<dyn DisplaySink>,
        playback: Arc<dyn DisplaySink>,
        settings: LifecycleSettings,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            factory,
            media_source,
            signaling,
            preview,
            playback,
            settings,
            state: Arc::new(state),
            session: Mutex::new(None),
            last_negotiation: RwLock::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Final state of the most recent negotiation attempt
    pub async fn last_negotiation(&self) -> Option<NegotiationState> {
        *self.last_negotiation.read().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            session_id: session.as_ref().map(|s| s.id),
            state: self.state(),
            last_negotiation: self.last_negotiation().await,
            started_at: session.as_ref().map(|s| s.started_at),
        }
    }

    /// Wait until the state equals `target`; false on timeout
    pub async fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> bool {
        let mut receiver = self.state.subscribe();
        let reached = matches!(
            tokio::time::timeout(timeout, receiver.wait_for(|state| *state == target)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Acquire media, build the connection and negotiate it
    pub async fn start(&self) -> Result<SessionSnapshot> {
        let previous = self.begin(ConnectionState::Starting)?;
        debug!("Connection {} -> {}", previous, ConnectionState::Starting);
        *self.last_negotiation.write().await = None;

        match self.establish().await {
            Ok(session) => {
                info!("Session {} active", session.id);
                *self.session.lock().await = Some(session);
                self.set_state(ConnectionState::Active);
                gauge!("session_active").set(1.0);
                Ok(self.snapshot().await)
            }
            Err(e) => {
                warn!("Failed to start session: {}", e);
                // A media failure happens before any connection exists
                if !matches!(e, SessionError::MediaAcquisition(_)) {
                    *self.last_negotiation.write().await = Some(NegotiationState::Failed);
                }
                self.set_state(ConnectionState::Idle);
                Err(e)
            }
        }
    }

    /// Release local media and schedule the connection close.
    ///
    /// Returns as soon as teardown is scheduled; the state reads Stopping
    /// until the grace delay has elapsed and the connection is closed.
    pub async fn stop(&self) -> Result<()> {
        let mut observed = ConnectionState::Idle;
        let moved = self.state.send_if_modified(|state| {
            observed = *state;
            if *state == ConnectionState::Active {
                *state = ConnectionState::Stopping;
                true
            } else {
                false
            }
        });

        if !moved {
            if observed == ConnectionState::Idle {
                debug!("No active connection to stop");
                return Ok(());
            }
            return Err(SessionError::InvalidStateTransition(format!(
                "Cannot stop while {}",
                observed
            )));
        }

        let taken = self.session.lock().await.take();
        let Some(session) = taken else {
            debug!("No active connection to stop");
            self.set_state(ConnectionState::Idle);
            return Ok(());
        };

        info!("Stopping session {}", session.id);
        self.preview.attach(None);

        if let Some(transceivers) = session.connection.transceivers() {
            match transceivers.stop_transceivers().await {
                Ok(count) => debug!("Stopped {} transceivers", count),
                Err(e) => warn!("Failed to stop transceivers: {}", e),
            }
        }

        match session.connection.stop_local_tracks().await {
            Ok(count) => debug!(
                "Stopped {} local senders ({} tracks acquired)",
                count,
                session.media.tracks.len()
            ),
            Err(e) => warn!("Failed to stop local tracks: {}", e),
        }

        let grace = self.settings.teardown_grace;
        let state = self.state.clone();
        let playback = self.playback.clone();
        let connection = session.connection;
        let id = session.id;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(e) = connection.close().await {
                warn!("Error closing connection for session {}: {}", id, e);
            }
            playback.attach(None);
            state.send_replace(ConnectionState::Idle);
            gauge!("session_active").set(0.0);
            info!("Session {} closed", id);
        });

        Ok(())
    }

    async fn establish(&self) -> Result<ActiveSession> {
        let media = self.media_source.acquire(self.settings.media).await?;
        debug!(
            "Acquired {} local tracks on stream {}",
            media.tracks.len(),
            media.stream.id
        );

        let connection = self.factory.create(&self.settings.transport).await?;

        let playback = self.playback.clone();
        connection.on_remote_track(Arc::new(move |track: RemoteTrack| {
            info!("Remote {} track {} received", track.kind, track.track_id);
            match track.streams.into_iter().next() {
                Some(stream) => playback.attach(Some(stream)),
                None => warn!("Remote track {} has no stream", track.track_id),
            }
        }));

        self.preview.attach(Some(media.stream.clone()));

        if let Err(e) = self.negotiate(connection.as_ref(), &media).await {
            self.preview.attach(None);
            if let Err(close_err) = connection.close().await {
                warn!("Error closing failed connection: {}", close_err);
            }
            return Err(e);
        }

        Ok(ActiveSession {
            id: SessionId::new(),
            connection,
            media,
            started_at: Utc::now(),
        })
    }

    async fn negotiate(&self, connection: &dyn PeerConnection, media: &LocalMedia) -> Result<()> {
        for track in &media.tracks {
            connection.add_track(track, &media.stream).await?;
        }

        let mut orchestrator =
            NegotiationOrchestrator::new(self.signaling.clone(), self.settings.negotiation.clone());
        let outcome = orchestrator.run(connection).await;
        *self.last_negotiation.write().await = Some(orchestrator.state());

        outcome?;
        Ok(())
    }

    /// Check-and-set into `target`; returns the state that was left
    fn begin(&self, target: ConnectionState) -> Result<ConnectionState> {
        let mut observed = ConnectionState::Idle;
        let moved = self.state.send_if_modified(|state| {
            observed = *state;
            if *state == ConnectionState::Idle && state.can_transition_to(&target) {
                *state = target;
                true
            } else {
                false
            }
        });

        if moved {
            Ok(observed)
        } else {
            Err(SessionError::InvalidStateTransition(format!(
                "Cannot transition from {} to {}",
                observed, target
            )))
        }
    }

    fn set_state(&self, new_state: ConnectionState) {
        self.state.send_if_modified(|state| {
            if state.can_transition_to(&new_state) {
                debug!("Connection {} -> {}", state, new_state);
                *state = new_state;
                true
            } else {
                warn!("Ignoring connection transition {} -> {}", state, new_state);
                false
            }
        });
    }
}
