//! Text-frame transports for the two legs of a call.
//!
//! The relay loops only need "receive the next text frame" and "send a text
//! frame", so both the accepted telephony socket (axum) and the outbound
//! realtime socket (tokio-tungstenite) are adapted to [`FrameSource`] and
//! [`FrameSink`]. In-process channels implement the same traits.

use async_trait::async_trait;
use axum::extract::ws::{Message as AxumMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

use super::{BridgeError, BridgeResult};

/// Receiving half of a connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Next text frame, or `None` once the peer has gone away.
    ///
    /// Read errors count as a disconnect.
    async fn recv(&mut self) -> Option<String>;
}

/// Sending half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, text: String) -> BridgeResult<()>;

    /// Close the connection. Further sends fail.
    async fn close(&mut self) -> BridgeResult<()>;
}

/// Both halves of one connection.
pub struct Duplex {
    pub source: Box<dyn FrameSource>,
    pub sink: Box<dyn FrameSink>,
}

impl Duplex {
    pub fn new(source: Box<dyn FrameSource>, sink: Box<dyn FrameSink>) -> Self {
        Self { source, sink }
    }

    /// Adapt an accepted axum WebSocket.
    pub fn from_axum(socket: WebSocket) -> Self {
        let (sink, source) = socket.split();
        Self::new(Box::new(source), Box::new(sink))
    }

    /// Adapt a tokio-tungstenite WebSocket (client or server side).
    pub fn from_tungstenite<S>(stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, source) = stream.split();
        Self::new(Box::new(source), Box::new(sink))
    }

    /// In-process connection. The returned peer plays the remote end.
    pub fn channel(buffer: usize) -> (Self, ChannelPeer) {
        let (to_bridge, inbound) = mpsc::channel(buffer);
        let (outbound, from_bridge) = mpsc::channel(buffer);
        let duplex = Self::new(
            Box::new(ChannelSource { rx: inbound }),
            Box::new(ChannelSink { tx: Some(outbound) }),
        );
        (
            duplex,
            ChannelPeer {
                to_bridge,
                from_bridge,
            },
        )
    }
}

#[async_trait]
impl FrameSource for SplitStream<WebSocket> {
    async fn recv(&mut self) -> Option<String> {
        while let Some(message) = self.next().await {
            match message {
                Ok(AxumMessage::Text(text)) => return Some(text.as_str().to_owned()),
                Ok(AxumMessage::Close(frame)) => {
                    debug!(?frame, "Peer sent close frame");
                    return None;
                }
                Ok(AxumMessage::Binary(data)) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "WebSocket read failed");
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, AxumMessage> {
    async fn send(&mut self, text: String) -> BridgeResult<()> {
        SinkExt::send(self, AxumMessage::Text(text.into()))
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> BridgeResult<()> {
        SinkExt::close(self)
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }
}

#[async_trait]
impl<S> FrameSource for SplitStream<WebSocketStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Option<String> {
        while let Some(message) = self.next().await {
            match message {
                Ok(WsMessage::Text(text)) => return Some(text.as_str().to_owned()),
                Ok(WsMessage::Close(frame)) => {
                    debug!(?frame, "Peer sent close frame");
                    return None;
                }
                Ok(WsMessage::Binary(data)) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "WebSocket read failed");
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl<S> FrameSink for SplitSink<WebSocketStream<S>, WsMessage>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, text: String) -> BridgeResult<()> {
        SinkExt::send(self, WsMessage::Text(text.into()))
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> BridgeResult<()> {
        SinkExt::close(self)
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }
}

/// Receiving half of an in-process connection.
pub struct ChannelSource {
    rx: mpsc::Receiver<String>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Sending half of an in-process connection.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<String>>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, text: String) -> BridgeResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| BridgeError::Transport("connection closed".to_string()))?;
        tx.send(text)
            .await
            .map_err(|_| BridgeError::Transport("peer went away".to_string()))
    }

    async fn close(&mut self) -> BridgeResult<()> {
        self.tx.take();
        Ok(())
    }
}

/// Remote end of [`Duplex::channel`].
///
/// Dropping `to_bridge` is seen by the bridge as the peer disconnecting.
/// `from_bridge` yields `None` once the bridge has closed its sink.
pub struct ChannelPeer {
    pub to_bridge: mpsc::Sender<String>,
    pub from_bridge: mpsc::Receiver<String>,
}
