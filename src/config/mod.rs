//! Configuration management
//!
//! Layered sources, later ones win:
//! 1. built-in defaults (`Config::default()`)
//! 2. optional TOML file (`$NEGOTIATOR_CONFIG`, default `config/negotiator.toml`)
//! 3. environment variables `NEGOTIATOR__<SECTION>__<KEY>`

use crate::domain::connection::{MediaConstraints, TransportConfig, DEFAULT_STUN_SERVER};
use crate::domain::sdp::{SessionDescriptionFilter, DEFAULT_VIDEO_CODEC};
use crate::domain::shared::value_objects::MediaKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "NEGOTIATOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/negotiator.toml";
const ENV_PREFIX: &str = "NEGOTIATOR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub signaling: SignalingConfig,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Remote signaling endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    pub base_url: String,
    pub offer_path: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    pub stun_server: String,
    pub unified_plan: bool,
}

/// Local devices to open on start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub audio: bool,
    pub video: bool,
}

/// One codec restriction applied to the local offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecPreference {
    pub kind: MediaKind,
    pub codec: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationConfig {
    pub codecs: Vec<CodecPreference>,
    /// No timeout when unset
    #[serde(default)]
    pub ice_gathering_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub teardown_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
        }
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            offer_path: "/offer".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            stun_server: DEFAULT_STUN_SERVER.to_string(),
            unified_plan: true,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            codecs: vec![CodecPreference {
                kind: MediaKind::Video,
                codec: DEFAULT_VIDEO_CODEC.to_string(),
            }],
            ice_gathering_timeout_ms: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            teardown_grace_ms: 500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from the file named by `$NEGOTIATOR_CONFIG` plus the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load with `path` as the (optional) file layer
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl SignalingConfig {
    pub fn offer_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.offer_path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl TransportSettings {
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: vec![self.stun_server.clone()],
            unified_plan: self.unified_plan,
        }
    }
}

impl MediaConfig {
    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: self.audio,
            video: self.video,
        }
    }
}

impl NegotiationConfig {
    pub fn filters(&self) -> Vec<SessionDescriptionFilter> {
        self.codecs
            .iter()
            .map(|pref| SessionDescriptionFilter::new(pref.kind, pref.codec.clone()))
            .collect()
    }

    pub fn ice_gathering_timeout(&self) -> Option<Duration> {
        self.ice_gathering_timeout_ms.map(Duration::from_millis)
    }
}

impl SessionConfig {
    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }
}
