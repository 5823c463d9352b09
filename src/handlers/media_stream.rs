//! Telephony media stream WebSocket.
//!
//! Each accepted connection opens its own realtime connection and runs one
//! [`CallBridge`](crate::bridge::CallBridge) until the call ends.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::bridge::Duplex;
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let connection_id = Uuid::new_v4();
    info!(%connection_id, "Media stream upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            handle_media_stream(socket, state).instrument(info_span!("call", %connection_id))
        })
}

async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>) {
    info!("Media stream connected");
    let mut telephony = Duplex::from_axum(socket);

    let agent = match state.connector.connect().await {
        Ok(stream) => Duplex::from_tungstenite(stream),
        Err(e) => {
            error!(error = %e, "Failed to connect to realtime endpoint, dropping call");
            if let Err(e) = telephony.sink.close().await {
                debug!(error = %e, "Media stream already closed");
            }
            return;
        }
    };

    match state.bridge.run(telephony, agent).await {
        Ok(()) => info!("Call ended"),
        Err(e) => warn!(error = %e, "Call ended with error"),
    }
}
