//! Realtime conversational endpoint.
//!
//! Audio is PCM 16-bit signed little-endian at 24 kHz, base64 encoded inside
//! JSON events over one WebSocket per call.

use thiserror::Error;

pub mod connector;
pub mod messages;

pub use connector::{
    DEFAULT_REALTIME_MODEL, DEFAULT_REALTIME_URL, RealtimeConnector, RealtimeStream,
};
pub use messages::{ApiError, ServerEvent};

/// Errors that can occur while talking to the realtime endpoint.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
