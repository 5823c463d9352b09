//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `announce` - Provider voice webhook returning the stream TwiML
//! - `media_stream` - Telephony media stream WebSocket

pub mod announce;
pub mod api;
pub mod media_stream;

pub use announce::twiml_handler;
pub use media_stream::media_stream_handler;
