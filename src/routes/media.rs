//! Media stream WebSocket route

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::announce::MEDIA_STREAM_PATH;
use crate::handlers::media_stream::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// `GET /media-stream` upgrades to the provider's bidirectional media
/// stream protocol (JSON text frames, base64 μ-law 8 kHz audio).
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
