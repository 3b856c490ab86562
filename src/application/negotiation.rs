//! Negotiation orchestrator
//!
//! Drives one offer/answer attempt against a [`PeerConnection`]:
//! create offer, wait for ICE gathering, restrict codecs, signal, apply.

use crate::config::NegotiationConfig;
use crate::domain::connection::{IceGatheringState, PeerConnection, SignalingChannel};
use crate::domain::negotiation::NegotiationState;
use crate::domain::sdp::{SessionDescription, SessionDescriptionFilter};
use crate::domain::shared::error::NegotiationError;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info};

type Result<T> = std::result::Result<T, NegotiationError>;

/// What the orchestrator applies to the local offer
#[derive(Debug, Clone)]
pub struct NegotiationSettings {
    pub filters: Vec<SessionDescriptionFilter>,
    pub ice_gathering_timeout: Option<Duration>,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            filters: vec![SessionDescriptionFilter::h264()],
            ice_gathering_timeout: None,
        }
    }
}

impl From<&NegotiationConfig> for NegotiationSettings {
    fn from(config: &NegotiationConfig) -> Self {
        Self {
            filters: config.filters(),
            ice_gathering_timeout: config.ice_gathering_timeout(),
        }
    }
}

/// Descriptions exchanged by a completed negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationOutcome {
    /// Codec-restricted offer that was sent
    pub offer: SessionDescription,
    /// Remote answer that was applied
    pub answer: SessionDescription,
}

/// One negotiation attempt. Not reusable once Completed or Failed.
pub struct NegotiationOrchestrator {
    state: NegotiationState,
    history: Vec<NegotiationState>,
    settings: NegotiationSettings,
    signaling: Arc<dyn SignalingChannel>,
}

impl NegotiationOrchestrator {
    pub fn new(signaling: Arc<dyn SignalingChannel>, settings: NegotiationSettings) -> Self {
        Self {
            state: NegotiationState::Idle,
            history: vec![NegotiationState::Idle],
            settings,
            signaling,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Every state visited so far, in order
    pub fn history(&self) -> &[NegotiationState] {
        &self.history
    }

    /// Run the attempt to completion. On error the state is `Failed`.
    pub async fn run(&mut self, connection: &dyn PeerConnection) -> Result<NegotiationOutcome> {
        let started = Instant::now();
        let result = self.drive(connection).await;

        match &result {
            Ok(_) => {
                info!("Negotiation completed in {:?}", started.elapsed());
                counter!("negotiations_total", "outcome" => "completed").increment(1);
            }
            Err(e) => {
                error!("Negotiation failed during {}: {}", self.state, e);
                counter!("negotiations_total", "outcome" => "failed", "step" => self.state.to_string())
                    .increment(1);
                self.fail();
            }
        }
        histogram!("negotiation_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn drive(&mut self, connection: &dyn PeerConnection) -> Result<NegotiationOutcome> {
        self.transition_to(NegotiationState::CreatingOffer)?;
        let offer = connection
            .create_offer()
            .await
            .map_err(|e| NegotiationError::CreateOffer(e.to_string()))?;
        connection
            .set_local_description(offer)
            .await
            .map_err(|e| NegotiationError::LocalDescriptionRejected(e.to_string()))?;

        self.transition_to(NegotiationState::GatheringICE)?;
        wait_for_ice_gathering(connection, self.settings.ice_gathering_timeout).await?;

        // The engine has added candidates to the description since it was set
        self.transition_to(NegotiationState::Filtering)?;
        let local = connection
            .local_description()
            .await
            .ok_or(NegotiationError::MissingLocalDescription)?;
        let offer = self
            .settings
            .filters
            .iter()
            .fold(local, |sdp, filter| filter.apply(&sdp));

        self.transition_to(NegotiationState::Signaling)?;
        let answer = self.signaling.exchange(&offer).await?;

        self.transition_to(NegotiationState::Applying)?;
        connection
            .set_remote_description(answer.clone())
            .await
            .map_err(|e| NegotiationError::RemoteDescriptionRejected(e.to_string()))?;

        self.transition_to(NegotiationState::Completed)?;
        Ok(NegotiationOutcome { offer, answer })
    }

    fn transition_to(&mut self, new_state: NegotiationState) -> Result<()> {
        if !self.state.can_transition_to(&new_state) {
            return Err(NegotiationError::InvalidStateTransition(format!(
                "Cannot transition from {:?} to {:?}",
                self.state, new_state
            )));
        }

        debug!("Negotiation {} -> {}", self.state, new_state);
        self.state = new_state;
        self.history.push(new_state);
        Ok(())
    }

    fn fail(&mut self) {
        if self.state.can_transition_to(&NegotiationState::Failed) {
            self.state = NegotiationState::Failed;
            self.history.push(NegotiationState::Failed);
        }
    }
}

/// Resolve once ICE gathering is complete.
///
/// The current state is read before subscribing, and the subscription's
/// initial value is checked again, so a completion that lands between the
/// two is never missed.
pub async fn wait_for_ice_gathering(
    connection: &dyn PeerConnection,
    timeout: Option<Duration>,
) -> Result<()> {
    if connection.ice_gathering_state() == IceGatheringState::Complete {
        debug!("ICE gathering already complete");
        return Ok(());
    }

    let receiver = connection.subscribe_ice_gathering();
    match timeout {
        Some(limit) => tokio::time::timeout(limit, gathering_complete(receiver))
            .await
            .map_err(|_| NegotiationError::IceGatheringTimeout(limit))?,
        None => gathering_complete(receiver).await,
    }
}

async fn gathering_complete(mut receiver: watch::Receiver<IceGatheringState>) -> Result<()> {
    loop {
        match *receiver.borrow_and_update() {
            IceGatheringState::Complete => {
                debug!("ICE gathering complete");
                return Ok(());
            }
            IceGatheringState::Closed => {
                return Err(NegotiationError::IceGathering(
                    "gatherer closed before completing".to_string(),
                ));
            }
            IceGatheringState::New | IceGatheringState::Gathering => {}
        }
        receiver.changed().await.map_err(|_| {
            NegotiationError::IceGathering("connection dropped its gathering state".to_string())
        })?;
    }
}
