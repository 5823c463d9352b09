//! Realtime endpoint server event types.
//!
//! Only the events the bridge acts on or logs are modelled; everything else
//! deserializes to [`ServerEvent::Other`]. Beta event names are accepted as
//! aliases of their GA counterparts.
//!
//! Server events handled:
//! - session.created / session.updated - session lifecycle
//! - input_audio_buffer.speech_started / speech_stopped - server VAD
//! - response.created / response.done - turn lifecycle
//! - response.output_audio.delta - agent audio chunk (base64 PCM16 24 kHz)
//! - response.output_audio.done - agent audio for an item complete
//! - response.output_audio_transcript.done - agent transcript
//! - conversation.item.input_audio_transcription.completed - caller transcript
//! - error

use base64::prelude::*;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

/// Error details attached to an `error` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Event received from the realtime endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error { error: ApiError },

    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Value,
    },

    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: Value,
    },

    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(default)]
        response: Value,
    },

    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: Value,
    },

    #[serde(rename = "response.output_audio.delta", alias = "response.audio.delta")]
    OutputAudioDelta {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },

    #[serde(rename = "response.output_audio.done", alias = "response.audio.done")]
    OutputAudioDone {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(
        rename = "response.output_audio_transcript.done",
        alias = "response.audio_transcript.done"
    )]
    OutputTranscriptDone {
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        transcript: String,
    },

    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted {
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        transcript: String,
    },

    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct EventType {
    #[serde(rename = "type")]
    event_type: String,
}

impl ServerEvent {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Response status from a `response.done` payload, if present.
    pub fn response_status(&self) -> Option<&str> {
        match self {
            ServerEvent::ResponseDone { response } => response.get("status")?.as_str(),
            _ => None,
        }
    }
}

/// Read only the `type` field of a raw event, for logging unmodelled events.
pub fn event_type(text: &str) -> Option<String> {
    serde_json::from_str::<EventType>(text)
        .ok()
        .map(|e| e.event_type)
}

/// Decode a base64 audio delta into raw PCM16 bytes.
pub fn decode_audio_delta(delta: &str) -> Result<Bytes, base64::DecodeError> {
    BASE64_STANDARD.decode(delta).map(Bytes::from)
}
