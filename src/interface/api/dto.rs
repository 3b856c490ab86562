//! Control API DTOs

use crate::application::SessionSnapshot;
use crate::domain::connection::ConnectionState;
use crate::domain::negotiation::NegotiationState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Session status response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Option<String>,
    pub state: ConnectionState,
    pub active: bool,
    pub last_negotiation: Option<NegotiationState>,
    pub started_at: Option<DateTime<Utc>>,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        SessionResponse {
            session_id: snapshot.session_id.map(|id| id.to_string()),
            active: snapshot.state == ConnectionState::Active,
            state: snapshot.state,
            last_negotiation: snapshot.last_negotiation,
            started_at: snapshot.started_at,
        }
    }
}
