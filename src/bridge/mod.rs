//! Per-call bridge between a telephony media stream and a realtime agent.
//!
//! A call runs two relay loops concurrently:
//!
//! - inbound: telephony events → session setup and `input_audio_buffer.append`
//! - outbound: agent audio deltas → telephony `media` events
//!
//! Either loop ending cancels the other. Both connections are closed before
//! [`CallBridge::run`] returns.

use thiserror::Error;

use crate::core::audio::AudioError;
use crate::core::directory::DirectoryError;
use crate::core::events::EventError;
use crate::core::realtime::RealtimeError;

mod inbound;
mod outbound;
pub mod session;
mod supervisor;
pub mod transport;

pub use session::{CallSession, SessionSlot};
pub use supervisor::CallBridge;
pub use transport::{ChannelPeer, Duplex, FrameSink, FrameSource};

/// Errors that end a call bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// Sending on one of the two connections failed
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
