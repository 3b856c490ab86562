//! Per-line SDP classification
//!
//! The codec filter never pattern-matches raw text; it works on the tagged
//! [`SdpLine`] produced here. Anything that does not parse cleanly is
//! [`SdpLine::Other`] and is copied through untouched.

use crate::domain::shared::value_objects::PayloadType;

const MEDIA_PREFIX: &str = "m=";
const RTPMAP_PREFIX: &str = "a=rtpmap:";
const FMTP_PREFIX: &str = "a=fmtp:";
const RTCP_FB_PREFIX: &str = "a=rtcp-fb:";
const APT_PARAM: &str = " apt=";

/// A classified SDP line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpLine<'a> {
    /// `m=<media> <port> <proto> <fmt>...`
    SectionHeader { media: &'a str },
    /// `a=rtpmap:<pt> <encoding>`
    CodecMap {
        payload_type: PayloadType,
        encoding: &'a str,
    },
    /// `a=fmtp:<pt> apt=<ref>` and nothing else
    RetransmissionMap {
        payload_type: PayloadType,
        apt: PayloadType,
    },
    /// Any other `a=fmtp:<pt>` or `a=rtcp-fb:<pt>` line
    FeedbackOrFormatParam { payload_type: PayloadType },
    Other,
}

impl<'a> SdpLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        if let Some(rest) = line.strip_prefix(MEDIA_PREFIX) {
            let media = rest.split(' ').next().unwrap_or_default();
            return SdpLine::SectionHeader { media };
        }

        if let Some(rest) = line.strip_prefix(RTPMAP_PREFIX) {
            return match leading_payload_type(rest) {
                Some((payload_type, tail)) => SdpLine::CodecMap {
                    payload_type,
                    encoding: tail.trim_start(),
                },
                None => SdpLine::Other,
            };
        }

        if let Some(rest) = line.strip_prefix(FMTP_PREFIX) {
            return match leading_payload_type(rest) {
                Some((payload_type, tail)) => match retransmission_reference(tail) {
                    Some(apt) => SdpLine::RetransmissionMap { payload_type, apt },
                    None => SdpLine::FeedbackOrFormatParam { payload_type },
                },
                None => SdpLine::Other,
            };
        }

        if let Some(rest) = line.strip_prefix(RTCP_FB_PREFIX) {
            // `a=rtcp-fb:*` applies to every format and has no payload type
            return match leading_payload_type(rest) {
                Some((payload_type, _)) => SdpLine::FeedbackOrFormatParam { payload_type },
                None => SdpLine::Other,
            };
        }

        SdpLine::Other
    }

    /// Payload type a codec/format/feedback line refers to
    pub fn payload_type(&self) -> Option<PayloadType> {
        match *self {
            SdpLine::CodecMap { payload_type, .. }
            | SdpLine::RetransmissionMap { payload_type, .. }
            | SdpLine::FeedbackOrFormatParam { payload_type } => Some(payload_type),
            SdpLine::SectionHeader { .. } | SdpLine::Other => None,
        }
    }

    pub fn is_section_header(&self) -> bool {
        matches!(self, SdpLine::SectionHeader { .. })
    }
}

/// Split `"<digits><tail>"` into a payload type and the tail
fn leading_payload_type(s: &str) -> Option<(PayloadType, &str)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let payload_type = s[..digits].parse().ok()?;
    Some((payload_type, &s[digits..]))
}

/// `" apt=<digits>"` with nothing after it
fn retransmission_reference(tail: &str) -> Option<PayloadType> {
    let value = tail.strip_prefix(APT_PARAM)?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
