/// HTTP signaling client: one JSON POST per negotiation
use crate::config::SignalingConfig;
use crate::domain::connection::SignalingChannel;
use crate::domain::sdp::{SdpType, SessionDescription, WireDescription};
use crate::domain::shared::error::NegotiationError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Posts `{"sdp", "type": "offer"}` and reads `{"sdp", "type": "answer"}` back
pub struct HttpSignalingClient {
    client: reqwest::Client,
    offer_url: String,
}

impl HttpSignalingClient {
    pub fn new(offer_url: impl Into<String>, timeout: Duration) -> Result<Self, NegotiationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NegotiationError::Signaling(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            offer_url: offer_url.into(),
        })
    }

    pub fn from_config(config: &SignalingConfig) -> Result<Self, NegotiationError> {
        Self::new(config.offer_url(), config.request_timeout())
    }

    pub fn offer_url(&self) -> &str {
        &self.offer_url
    }
}

#[async_trait]
impl SignalingChannel for HttpSignalingClient {
    async fn exchange(
        &self,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        let body = WireDescription::from(offer);
        info!(
            "Sending {} ({} bytes) to {}",
            body.sdp_type.as_str(),
            body.sdp.len(),
            self.offer_url
        );

        let response = self
            .client
            .post(&self.offer_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NegotiationError::Signaling(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NegotiationError::Signaling(format!(
                "{} returned {}: {}",
                self.offer_url, status, detail
            )));
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| NegotiationError::Signaling(e.to_string()))?;

        let wire: WireDescription = serde_json::from_slice(&payload)
            .map_err(|e| NegotiationError::MalformedResponse(e.to_string()))?;

        if wire.sdp_type != SdpType::Answer {
            warn!("Signaling endpoint answered with type {}", wire.sdp_type.as_str());
        }
        debug!("Received {} bytes of remote description", wire.sdp.len());

        Ok(wire.into())
    }
}
