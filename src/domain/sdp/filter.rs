//! Codec restriction of a session description
//!
//! Rewrites one media section so that it only offers a single codec plus the
//! retransmission payload types that depend on it. Two forward passes:
//!
//! 1. collect the allowed payload types in first-seen order;
//! 2. rewrite the section header and drop every codec, format or feedback
//!    line that refers to a payload type outside the allowed set.
//!
//! Lines outside the target section are copied verbatim. The filter never
//! fails: lines it cannot classify fall through unchanged.

use super::description::SessionDescription;
use super::line::SdpLine;
use crate::domain::shared::value_objects::{MediaKind, PayloadType};
use tracing::{debug, trace};

/// Codec name the negotiator pins the video section to
pub const DEFAULT_VIDEO_CODEC: &str = "H264/90000";

/// Restricts the `kind` media section of a description to `codec`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptionFilter {
    kind: MediaKind,
    codec: String,
}

impl SessionDescriptionFilter {
    pub fn new(kind: MediaKind, codec: impl Into<String>) -> Self {
        Self {
            kind,
            codec: codec.into(),
        }
    }

    /// `video` / `H264/90000`
    pub fn h264() -> Self {
        Self::new(MediaKind::Video, DEFAULT_VIDEO_CODEC)
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn codec(&self) -> &str {
        &self.codec
    }

    /// First pass: payload types of the target codec and of the
    /// retransmission formats whose base was already seen.
    pub fn allowed_payload_types(&self, sdp: &SessionDescription) -> Vec<PayloadType> {
        let mut allowed: Vec<PayloadType> = Vec::new();
        let mut section = SectionTracker::new(self.kind);

        for line in sdp.lines() {
            let classified = SdpLine::classify(line);
            if !section.advance(&classified) {
                continue;
            }

            match classified {
                SdpLine::CodecMap {
                    payload_type,
                    encoding,
                } if self.names_codec(encoding) => push_unique(&mut allowed, payload_type),
                SdpLine::RetransmissionMap { payload_type, apt } if allowed.contains(&apt) => {
                    push_unique(&mut allowed, payload_type)
                }
                _ => {}
            }
        }

        allowed
    }

    /// Second pass: produce the restricted description
    pub fn apply(&self, sdp: &SessionDescription) -> SessionDescription {
        let allowed = self.allowed_payload_types(sdp);
        let mut section = SectionTracker::new(self.kind);
        let mut lines = Vec::with_capacity(sdp.lines().len());
        let mut dropped = 0usize;

        for line in sdp.lines() {
            let classified = SdpLine::classify(line);
            if !section.advance(&classified) {
                lines.push(line.clone());
                continue;
            }

            if classified.is_section_header() {
                lines.push(rewrite_media_line(line, &allowed));
                continue;
            }

            match classified.payload_type() {
                Some(payload_type) if !allowed.contains(&payload_type) => {
                    trace!("Dropping {} line for payload type {}: {}", self.kind, payload_type, line);
                    dropped += 1;
                }
                _ => lines.push(line.clone()),
            }
        }

        debug!(
            "Restricted {} section to {} (payload types {:?}, {} lines dropped)",
            self.kind, self.codec, allowed, dropped
        );

        SessionDescription::new(sdp.sdp_type(), lines)
    }

    /// `H264/90000` names `H264/90000`; `opus/48000` also names `opus/48000/2`
    fn names_codec(&self, encoding: &str) -> bool {
        match encoding.trim_end().strip_prefix(self.codec.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Restrict `sdp` to `codec` within its `kind` section
pub fn filter_codec(sdp: &SessionDescription, kind: MediaKind, codec: &str) -> SessionDescription {
    SessionDescriptionFilter::new(kind, codec).apply(sdp)
}

/// Tracks whether the scan is inside a section of the target kind
struct SectionTracker {
    kind: MediaKind,
    inside: bool,
}

impl SectionTracker {
    fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            inside: false,
        }
    }

    fn advance(&mut self, line: &SdpLine<'_>) -> bool {
        if let SdpLine::SectionHeader { media } = line {
            self.inside = *media == self.kind.as_str();
        }
        self.inside
    }
}

fn push_unique(allowed: &mut Vec<PayloadType>, payload_type: PayloadType) {
    if !allowed.contains(&payload_type) {
        allowed.push(payload_type);
    }
}

/// Replace the trailing payload-type list of an `m=` line.
///
/// The media token and the port are always kept, so `m=video 9 96` keeps
/// `m=video 9` even though the port is numeric.
fn rewrite_media_line(line: &str, allowed: &[PayloadType]) -> String {
    let mut prefix = line.trim_end();
    while let Some((head, last)) = prefix.rsplit_once(' ') {
        let is_format = !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit());
        if !is_format || head.split_whitespace().count() < 2 {
            break;
        }
        prefix = head.trim_end();
    }

    if allowed.is_empty() {
        return prefix.to_string();
    }

    let formats: Vec<String> = allowed.iter().map(|pt| pt.to_string()).collect();
    format!("{} {}", prefix, formats.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION_LINES: &[&str] = &[
        "v=0",
        "o=- 4611731400430051336 2 IN IP4 127.0.0.1",
        "s=-",
        "t=0 0",
        "a=group:BUNDLE 0 1",
    ];

    const AUDIO_LINES: &[&str] = &[
        "m=audio 9 UDP/TLS/RTP/SAVPF 111 0",
        "c=IN IP4 0.0.0.0",
        "a=mid:0",
        "a=rtpmap:111 opus/48000/2",
        "a=rtcp-fb:111 transport-cc",
        "a=fmtp:111 minptime=10;useinbandfec=1",
        "a=rtpmap:0 PCMU/8000",
    ];

    fn offer(video: &[&str]) -> SessionDescription {
        let lines = SESSION_LINES
            .iter()
            .chain(AUDIO_LINES)
            .chain(video)
            .map(|l| l.to_string())
            .collect();
        SessionDescription::new(crate::domain::sdp::SdpType::Offer, lines)
    }

    fn chrome_like_video() -> Vec<&'static str> {
        vec![
            "m=video 9 UDP/TLS/RTP/SAVPF 96 97 98",
            "c=IN IP4 0.0.0.0",
            "a=mid:1",
            "a=rtcp-fb:* transport-cc",
            "a=rtpmap:96 H264/90000",
            "a=rtcp-fb:96 nack",
            "a=rtcp-fb:96 nack pli",
            "a=fmtp:96 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
            "a=rtpmap:97 rtx/90000",
            "a=fmtp:97 apt=96",
            "a=rtpmap:98 VP8/90000",
            "a=rtcp-fb:98 nack",
            "a=ssrc:1 cname:abc",
        ]
    }

    #[test]
    fn test_h264_with_rtx_and_unrelated_vp8() {
        let filtered = SessionDescriptionFilter::h264().apply(&offer(&chrome_like_video()));

        assert_eq!(
            filtered.media_section("video"),
            vec![
                "m=video 9 UDP/TLS/RTP/SAVPF 96 97",
                "c=IN IP4 0.0.0.0",
                "a=mid:1",
                "a=rtcp-fb:* transport-cc",
                "a=rtpmap:96 H264/90000",
                "a=rtcp-fb:96 nack",
                "a=rtcp-fb:96 nack pli",
                "a=fmtp:96 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
                "a=rtpmap:97 rtx/90000",
                "a=fmtp:97 apt=96",
                "a=ssrc:1 cname:abc",
            ]
        );
        assert!(!filtered.to_sdp_string().contains(":98 "));
        assert_eq!(filtered.media_section("audio"), AUDIO_LINES.to_vec());
    }

    #[test]
    fn test_lines_outside_target_section_are_identical() {
        let original = offer(&chrome_like_video());
        let filtered = SessionDescriptionFilter::h264().apply(&original);

        let prefix_len = SESSION_LINES.len() + AUDIO_LINES.len();
        assert_eq!(&filtered.lines()[..prefix_len], &original.lines()[..prefix_len]);
    }

    #[test]
    fn test_allowed_set_keeps_first_seen_order() {
        let sdp = offer(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 98 102 103 127 125",
            "a=rtpmap:102 H264/90000",
            "a=rtpmap:103 rtx/90000",
            "a=fmtp:103 apt=102",
            "a=rtpmap:98 VP8/90000",
            "a=rtpmap:127 H264/90000",
            "a=fmtp:127 level-asymmetry-allowed=1;packetization-mode=0",
            "a=rtpmap:125 rtx/90000",
            "a=fmtp:125 apt=127",
        ]);
        let filter = SessionDescriptionFilter::h264();

        assert_eq!(filter.allowed_payload_types(&sdp), vec![102, 103, 127, 125]);
        assert_eq!(
            filter.apply(&sdp).media_section("video")[0],
            "m=video 9 UDP/TLS/RTP/SAVPF 102 103 127 125"
        );
    }

    #[test]
    fn test_retransmission_before_base_codec_is_not_picked_up() {
        let sdp = offer(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 97 96",
            "a=rtpmap:97 rtx/90000",
            "a=fmtp:97 apt=96",
            "a=rtpmap:96 H264/90000",
        ]);
        let filtered = SessionDescriptionFilter::h264().apply(&sdp);

        assert_eq!(
            filtered.media_section("video"),
            vec!["m=video 9 UDP/TLS/RTP/SAVPF 96", "a=rtpmap:96 H264/90000"]
        );
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = SessionDescriptionFilter::h264();
        let once = filter.apply(&offer(&chrome_like_video()));
        let twice = filter.apply(&once);
        assert_eq!(once, twice);
        assert_eq!(once.to_sdp_string(), twice.to_sdp_string());
    }

    #[test]
    fn test_no_matching_codec_leaves_bare_media_line() {
        let sdp = offer(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 98 99",
            "a=mid:1",
            "a=rtpmap:98 VP8/90000",
            "a=rtpmap:99 rtx/90000",
            "a=fmtp:99 apt=98",
        ]);
        let filter = SessionDescriptionFilter::h264();
        let filtered = filter.apply(&sdp);

        assert!(filter.allowed_payload_types(&sdp).is_empty());
        assert_eq!(
            filtered.media_section("video"),
            vec!["m=video 9 UDP/TLS/RTP/SAVPF", "a=mid:1"]
        );
        assert_eq!(filter.apply(&filtered), filtered);
    }

    #[test]
    fn test_audio_section_can_be_targeted() {
        let filtered = filter_codec(&offer(&chrome_like_video()), MediaKind::Audio, "opus/48000");

        assert_eq!(
            filtered.media_section("audio"),
            vec![
                "m=audio 9 UDP/TLS/RTP/SAVPF 111",
                "c=IN IP4 0.0.0.0",
                "a=mid:0",
                "a=rtpmap:111 opus/48000/2",
                "a=rtcp-fb:111 transport-cc",
                "a=fmtp:111 minptime=10;useinbandfec=1",
            ]
        );
        assert_eq!(filtered.media_section("video"), chrome_like_video());
    }

    #[test]
    fn test_codec_name_must_match_whole_token() {
        let sdp = offer(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 96 100",
            "a=rtpmap:96 H264/900001",
            "a=rtpmap:100 H264/90000",
        ]);
        assert_eq!(SessionDescriptionFilter::h264().allowed_payload_types(&sdp), vec![100]);
    }

    #[test]
    fn test_trailing_whitespace_after_encoding_still_matches() {
        let sdp = offer(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 96 97 98",
            "a=rtpmap:96 H264/90000 ",
            "a=rtpmap:97 rtx/90000",
            "a=fmtp:97 apt=96",
            "a=rtpmap:98 VP8/90000\t",
        ]);
        let filtered = SessionDescriptionFilter::h264().apply(&sdp);

        assert_eq!(
            filtered.media_section("video"),
            vec![
                "m=video 9 UDP/TLS/RTP/SAVPF 96 97",
                "a=rtpmap:96 H264/90000 ",
                "a=rtpmap:97 rtx/90000",
                "a=fmtp:97 apt=96",
            ]
        );
    }

    #[test]
    fn test_duplicate_rtpmap_does_not_duplicate_payload_type() {
        let sdp = offer(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 96",
            "a=rtpmap:96 H264/90000",
            "a=rtpmap:96 H264/90000",
        ]);
        assert_eq!(SessionDescriptionFilter::h264().allowed_payload_types(&sdp), vec![96]);
    }

    #[test]
    fn test_malformed_lines_pass_through() {
        let sdp = offer(&[
            "m=video 9 UDP/TLS/RTP/SAVPF 96",
            "a=rtpmap:96 H264/90000",
            "a=rtpmap:x9 VP8/90000",
            "a=fmtp:400 apt=96",
            "garbage",
        ]);
        let filtered = SessionDescriptionFilter::h264().apply(&sdp);

        assert_eq!(
            filtered.media_section("video"),
            vec![
                "m=video 9 UDP/TLS/RTP/SAVPF 96",
                "a=rtpmap:96 H264/90000",
                "a=rtpmap:x9 VP8/90000",
                "a=fmtp:400 apt=96",
                "garbage",
            ]
        );
    }

    #[test]
    fn test_empty_description() {
        let empty = SessionDescription::offer("");
        assert!(SessionDescriptionFilter::h264().apply(&empty).is_empty());
    }

    #[test]
    fn test_rewrite_media_line_keeps_port() {
        assert_eq!(rewrite_media_line("m=video 9 96", &[100]), "m=video 9 100");
        assert_eq!(rewrite_media_line("m=video 9 96", &[]), "m=video 9");
        assert_eq!(
            rewrite_media_line("m=video 9 UDP/TLS/RTP/SAVPF", &[96, 97]),
            "m=video 9 UDP/TLS/RTP/SAVPF 96 97"
        );
    }

    mod properties {
        use super::*;
        use crate::domain::sdp::SdpType;
        use proptest::prelude::*;
        use proptest::sample::select;

        const CODECS: &[&str] = &["H264/90000", "VP8/90000", "VP9/90000", "AV1/90000", "h264/90000"];

        /// Codec, retransmission and feedback lines in arbitrary order
        fn video_attributes() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec((96u8..112, 0u8..4, select(CODECS), 96u8..112), 0..10)
                .prop_map(|entries| {
                    entries
                        .into_iter()
                        .flat_map(|(pt, form, codec, apt)| match form {
                            0 => vec![format!("a=rtpmap:{} {}", pt, codec)],
                            1 => vec![
                                format!("a=rtpmap:{} rtx/90000", pt),
                                format!("a=fmtp:{} apt={}", pt, apt),
                            ],
                            2 => vec![format!("a=fmtp:{} apt={}", pt, apt)],
                            _ => vec![format!("a=rtcp-fb:{} nack pli", pt)],
                        })
                        .collect::<Vec<_>>()
                })
                .prop_shuffle()
        }

        fn video_section() -> impl Strategy<Value = Vec<String>> {
            (prop::collection::vec(96u8..112, 0..6), video_attributes()).prop_map(
                |(formats, attributes)| {
                    let mut header = "m=video 9 UDP/TLS/RTP/SAVPF".to_string();
                    for pt in formats {
                        header.push_str(&format!(" {}", pt));
                    }
                    let mut lines = vec![header, "c=IN IP4 0.0.0.0".to_string(), "a=mid:1".to_string()];
                    lines.extend(attributes);
                    lines
                },
            )
        }

        /// Session lines followed by audio, video and data sections in any order
        fn description() -> impl Strategy<Value = SessionDescription> {
            let audio: Vec<String> = AUDIO_LINES.iter().map(|l| l.to_string()).collect();
            let application = vec![
                "m=application 9 UDP/DTLS/SCTP webrtc-datachannel".to_string(),
                "a=mid:2".to_string(),
                "a=rtpmap:96 H264/90000".to_string(),
            ];
            (video_section(), Just(vec![0usize, 1, 2]).prop_shuffle()).prop_map(
                move |(video, order)| {
                    let sections = [audio.clone(), video, application.clone()];
                    let mut lines: Vec<String> = SESSION_LINES.iter().map(|l| l.to_string()).collect();
                    for index in order {
                        lines.extend(sections[index].iter().cloned());
                    }
                    SessionDescription::new(SdpType::Offer, lines)
                },
            )
        }

        fn outside_section(sdp: &SessionDescription, media: &str) -> Vec<String> {
            let mut inside = false;
            sdp.lines()
                .iter()
                .filter(|line| {
                    if let SdpLine::SectionHeader { media: current } = SdpLine::classify(line) {
                        inside = current == media;
                    }
                    !inside
                })
                .cloned()
                .collect()
        }

        proptest! {
            #[test]
            fn lines_outside_video_section_are_untouched(sdp in description()) {
                let filtered = SessionDescriptionFilter::h264().apply(&sdp);
                prop_assert_eq!(outside_section(&filtered, "video"), outside_section(&sdp, "video"));
            }

            #[test]
            fn applying_twice_equals_applying_once(sdp in description()) {
                let filter = SessionDescriptionFilter::h264();
                let once = filter.apply(&sdp);
                prop_assert_eq!(filter.apply(&once), once);
            }

            #[test]
            fn video_section_refers_only_to_allowed_payload_types(sdp in description()) {
                let filter = SessionDescriptionFilter::h264();
                let allowed = filter.allowed_payload_types(&sdp);
                let filtered = filter.apply(&sdp);

                let section = filtered.media_section("video");
                let formats: Vec<PayloadType> = section[0]
                    .split(' ')
                    .skip(3)
                    .filter_map(|token| token.parse().ok())
                    .collect();
                prop_assert_eq!(&formats, &allowed);
                for line in &section[1..] {
                    if let Some(pt) = SdpLine::classify(line).payload_type() {
                        prop_assert!(allowed.contains(&pt), "{} survived", line);
                    }
                }
            }
        }
    }
}
