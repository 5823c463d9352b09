use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::inbound::InboundRelay;
use super::outbound::OutboundRelay;
use super::session::SessionSlot;
use super::transport::{Duplex, FrameSink};
use super::BridgeResult;
use crate::core::directory::SessionDirectory;
use crate::core::events::EventTemplates;

/// Runs the two relay loops for one call.
///
/// A bridge holds only shared, read-mostly services; per-call state (session
/// identity, resampler history) lives inside [`run`](Self::run), so one
/// bridge can serve any number of concurrent calls.
#[derive(Clone)]
pub struct CallBridge {
    templates: Arc<EventTemplates>,
    directory: Arc<SessionDirectory>,
    voice: Option<String>,
}

impl CallBridge {
    pub fn new(templates: Arc<EventTemplates>, directory: Arc<SessionDirectory>) -> Self {
        Self {
            templates,
            directory,
            voice: None,
        }
    }

    /// Override the agent voice in the session setup message.
    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice.filter(|v| !v.trim().is_empty());
        self
    }

    /// Bridge `telephony` and `agent` until either side ends the call.
    ///
    /// Disconnects, a telephony `stop` and an agent `error` event all end the
    /// call normally. Failures inside a loop (unknown call, send failure)
    /// are returned after both connections have been closed; if both loops
    /// fail, the inbound error wins.
    pub async fn run(&self, telephony: Duplex, agent: Duplex) -> BridgeResult<()> {
        let Duplex {
            source: mut telephony_source,
            sink: mut telephony_sink,
        } = telephony;
        let Duplex {
            source: mut agent_source,
            sink: mut agent_sink,
        } = agent;

        let session = SessionSlot::new();
        let cancel = CancellationToken::new();

        let inbound = InboundRelay {
            templates: &self.templates,
            directory: &self.directory,
            voice: self.voice.as_deref(),
            session: &session,
        };
        let outbound = OutboundRelay {
            templates: &self.templates,
            session: &session,
        };

        let (inbound_result, outbound_result) = tokio::join!(
            supervise(
                "inbound",
                &cancel,
                inbound.run(telephony_source.as_mut(), agent_sink.as_mut(), &cancel),
            ),
            supervise(
                "outbound",
                &cancel,
                outbound.run(agent_source.as_mut(), telephony_sink.as_mut(), &cancel),
            ),
        );

        close_sink("realtime", agent_sink.as_mut()).await;
        close_sink("telephony", telephony_sink.as_mut()).await;

        match session.get() {
            Some(s) => info!(call_sid = %s.call_sid, stream_sid = %s.stream_sid, "Call bridge finished"),
            None => info!("Call bridge finished before a session started"),
        }

        inbound_result.and(outbound_result)
    }
}

async fn supervise<F>(side: &'static str, cancel: &CancellationToken, relay: F) -> BridgeResult<()>
where
    F: Future<Output = BridgeResult<()>>,
{
    let result = relay.await;
    match &result {
        Ok(()) => debug!(side, "Relay loop finished"),
        Err(e) => warn!(side, error = %e, "Relay loop failed"),
    }
    cancel.cancel();
    result
}

async fn close_sink(name: &'static str, sink: &mut dyn FrameSink) {
    if let Err(e) = sink.close().await {
        debug!(connection = name, error = %e, "Close failed, peer already gone");
    }
}
