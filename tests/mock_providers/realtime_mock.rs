//! WebSocket mock of the realtime conversational endpoint
//!
//! Accepts a single connection, checks bearer auth and the `model` query
//! parameter, and answers the first audio append with one response.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// 20 ms of 24 kHz PCM16 silence
pub const RESPONSE_AUDIO_BYTES: usize = 960;

pub struct MockRealtime {
    pub url: String,
    /// Every JSON event the mock received, in order
    pub received: mpsc::UnboundedReceiver<Value>,
    /// Fires when the client connection has ended
    pub closed: oneshot::Receiver<()>,
}

pub async fn spawn_mock_realtime(api_key: &'static str) -> MockRealtime {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events_tx, received) = mpsc::unbounded_channel();
    let (closed_tx, closed) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ = handle_connection(stream, api_key, events_tx).await;
        let _ = closed_tx.send(());
    });

    MockRealtime {
        url: format!("ws://{addr}/v1/realtime"),
        received,
        closed,
    }
}

async fn handle_connection(
    stream: TcpStream,
    api_key: &'static str,
    events: mpsc::UnboundedSender<Value>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let check_auth = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let expected = format!("Bearer {api_key}");
        let authorized = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some(expected.as_str());
        let has_model = request
            .uri()
            .query()
            .is_some_and(|q| q.contains("model=gpt-realtime"));

        if authorized && has_model {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("unauthorized".to_string()));
            *rejection.status_mut() = StatusCode::UNAUTHORIZED;
            Err(rejection)
        }
    };

    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_auth).await?;
    let (mut write, mut read) = ws_stream.split();

    let created = json!({"type": "session.created", "event_id": "evt_1", "session": {}});
    write.send(Message::Text(created.to_string().into())).await?;

    let mut answered = false;
    while let Some(msg) = read.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let event: Value = serde_json::from_str(text.as_str())?;

        match event["type"].as_str() {
            Some("session.update") => {
                let updated = json!({"type": "session.updated", "session": event["session"]});
                write.send(Message::Text(updated.to_string().into())).await?;
            }
            Some("input_audio_buffer.append") if !answered => {
                answered = true;
                let delta = json!({
                    "type": "response.output_audio.delta",
                    "response_id": "resp_1",
                    "item_id": "item_1",
                    "output_index": 0,
                    "content_index": 0,
                    "delta": BASE64_STANDARD.encode(vec![0u8; RESPONSE_AUDIO_BYTES])
                });
                write.send(Message::Text(delta.to_string().into())).await?;
                let done = json!({"type": "response.output_audio.done", "response_id": "resp_1", "item_id": "item_1"});
                write.send(Message::Text(done.to_string().into())).await?;
            }
            _ => {}
        }

        let _ = events.send(event);
    }

    Ok(())
}
