//! Telephony media stream message types.
//!
//! The provider sends one JSON object per WebSocket text frame, discriminated
//! by the `event` field:
//!
//! - `connected` - socket accepted, no call context yet
//! - `start` - stream metadata (call, stream and account ids)
//! - `media` - base64 μ-law audio, 8 kHz mono
//! - `mark` - playback marker acknowledgement
//! - `dtmf` - keypad digit
//! - `stop` - end of stream
//!
//! The bridge sends `media` events back with the same envelope.

use std::collections::HashMap;

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Inbound event from the telephony provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },

    Start {
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
        start: StartMetadata,
    },

    Media {
        #[serde(rename = "sequenceNumber", default)]
        sequence_number: Option<String>,
        media: MediaPayload,
    },

    Mark {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        mark: MarkPayload,
    },

    Dtmf {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        dtmf: DtmfPayload,
    },

    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },

    /// Event types added by the provider after this version
    #[serde(other)]
    Unknown,
}

impl TelephonyEvent {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            TelephonyEvent::Connected { .. } => "connected",
            TelephonyEvent::Start { .. } => "start",
            TelephonyEvent::Media { .. } => "media",
            TelephonyEvent::Mark { .. } => "mark",
            TelephonyEvent::Dtmf { .. } => "dtmf",
            TelephonyEvent::Stop { .. } => "stop",
            TelephonyEvent::Unknown => "unknown",
        }
    }
}

/// Metadata carried by the `start` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    pub account_sid: String,
    pub call_sid: String,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Audio chunk carried by the `media` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub payload: String,
}

impl MediaPayload {
    /// Decode the base64 payload into raw μ-law bytes.
    pub fn decode(&self) -> Result<Bytes, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.payload).map(Bytes::from)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DtmfPayload {
    #[serde(default)]
    pub track: Option<String>,
    pub digit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connected() {
        let event =
            TelephonyEvent::parse(r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#)
                .unwrap();
        assert!(matches!(event, TelephonyEvent::Connected { .. }));
    }

    #[test]
    fn test_parse_start() {
        let json = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "accountSid": "AC1",
                "streamSid": "MZ1",
                "callSid": "CA123",
                "tracks": ["inbound"],
                "mediaFormat": { "encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1 },
                "customParameters": {}
            },
            "streamSid": "MZ1"
        }"#;

        match TelephonyEvent::parse(json).unwrap() {
            TelephonyEvent::Start { start, .. } => {
                assert_eq!(start.call_sid, "CA123");
                assert_eq!(start.stream_sid, "MZ1");
                assert_eq!(start.account_sid, "AC1");
                assert_eq!(start.media_format.unwrap().sample_rate, 8000);
            }
            other => panic!("expected start, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_media_and_decode() {
        let json = r#"{"event":"media","sequenceNumber":"3","media":{"track":"inbound","chunk":"1","timestamp":"5","payload":"//8="},"streamSid":"MZ1"}"#;
        match TelephonyEvent::parse(json).unwrap() {
            TelephonyEvent::Media { media, .. } => {
                assert_eq!(media.decode().unwrap().as_ref(), &[0xFF, 0xFF]);
            }
            other => panic!("expected media, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_stop() {
        let event =
            TelephonyEvent::parse(r#"{"event":"stop","streamSid":"MZ1","stop":{"callSid":"CA123"}}"#)
                .unwrap();
        assert_eq!(event.kind(), "stop");
    }

    #[test]
    fn test_unknown_event_type() {
        let event = TelephonyEvent::parse(r#"{"event":"transcription","text":"hi"}"#).unwrap();
        assert!(matches!(event, TelephonyEvent::Unknown));
    }

    #[test]
    fn test_invalid_payload_base64() {
        let payload = MediaPayload {
            track: None,
            chunk: None,
            timestamp: None,
            payload: "not base64!".to_string(),
        };
        assert!(payload.decode().is_err());
    }
}
