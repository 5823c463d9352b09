//! Outbound event templates.
//!
//! Every message the bridge sends, to either peer, is rendered from a named
//! JSON template. Templates are loaded once at startup and never mutated;
//! rendering substitutes values by key name at any depth of a private copy.
//!
//! # Built-in templates
//! - `session-update`: session initialization for the realtime endpoint
//! - `input_audio_buffer-append`: caller audio for the realtime endpoint
//! - `media`: agent audio for the telephony stream

use thiserror::Error;

mod templates;

pub use templates::EventTemplates;

/// Session initialization sent to the realtime endpoint once per call.
pub const SESSION_UPDATE: &str = "session-update";

/// Caller audio appended to the realtime input buffer.
pub const INPUT_AUDIO_APPEND: &str = "input_audio_buffer-append";

/// Agent audio sent back to the telephony stream.
pub const MEDIA: &str = "media";

/// Templates the bridge renders during a call.
pub const REQUIRED_TEMPLATES: [&str; 3] = [SESSION_UPDATE, INPUT_AUDIO_APPEND, MEDIA];

/// Errors from loading or rendering templates.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Unknown event template: {0}")]
    UnknownEvent(String),

    #[error("Failed to load event templates from '{origin}': {reason}")]
    TemplateLoad { origin: String, reason: String },

    #[error("Failed to serialize event '{name}': {reason}")]
    Serialize { name: String, reason: String },
}

/// Result type for template operations.
pub type EventResult<T> = Result<T, EventError>;
