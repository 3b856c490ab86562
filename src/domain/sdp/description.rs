//! Session description value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line terminator used when a description is serialised
pub const LINE_SEPARATOR: &str = "\r\n";

/// SDP session type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "offer" => Some(SdpType::Offer),
            "answer" => Some(SdpType::Answer),
            _ => None,
        }
    }
}

/// An SDP document held as an ordered sequence of lines.
///
/// Descriptions are never mutated in place: the codec filter and the
/// signaling layer always produce a new instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    sdp_type: SdpType,
    lines: Vec<String>,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType, lines: Vec<String>) -> Self {
        Self { sdp_type, lines }
    }

    /// Split raw SDP text into lines. Both `\r\n` and `\n` are accepted;
    /// the empty remainder after a final separator is not kept as a line.
    pub fn parse(sdp_type: SdpType, sdp: &str) -> Self {
        Self {
            sdp_type,
            lines: sdp.lines().map(str::to_string).collect(),
        }
    }

    pub fn offer(sdp: &str) -> Self {
        Self::parse(SdpType::Offer, sdp)
    }

    pub fn answer(sdp: &str) -> Self {
        Self::parse(SdpType::Answer, sdp)
    }

    pub fn sdp_type(&self) -> SdpType {
        self.sdp_type
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Every line terminated by `\r\n`, the last one included
    pub fn to_sdp_string(&self) -> String {
        let capacity = self.lines.iter().map(|l| l.len() + LINE_SEPARATOR.len()).sum();
        let mut sdp = String::with_capacity(capacity);
        for line in &self.lines {
            sdp.push_str(line);
            sdp.push_str(LINE_SEPARATOR);
        }
        sdp
    }

    /// Lines belonging to the first `m=<kind>` section, header included
    pub fn media_section(&self, kind: &str) -> Vec<&str> {
        let header = format!("m={} ", kind);
        self.lines
            .iter()
            .map(String::as_str)
            .skip_while(|line| !line.starts_with(&header))
            .enumerate()
            .take_while(|(i, line)| *i == 0 || !line.starts_with("m="))
            .map(|(_, line)| line)
            .collect()
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sdp_string())
    }
}

/// JSON shape of a description on the signaling wire: `{"sdp": ..., "type": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDescription {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
}

impl From<&SessionDescription> for WireDescription {
    fn from(desc: &SessionDescription) -> Self {
        Self {
            sdp: desc.to_sdp_string(),
            sdp_type: desc.sdp_type(),
        }
    }
}

impl From<WireDescription> for SessionDescription {
    fn from(wire: WireDescription) -> Self {
        SessionDescription::parse(wire.sdp_type, &wire.sdp)
    }
}
