use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::session::{CallSession, SessionSlot};
use super::transport::{FrameSink, FrameSource};
use super::BridgeResult;
use crate::core::audio::{AudioError, AudioFrame, OutboundTranscoder};
use crate::core::events::{EventTemplates, MEDIA};
use crate::core::realtime::ServerEvent;
use crate::core::realtime::messages::{decode_audio_delta, event_type};

/// Agent → telephony relay.
pub(super) struct OutboundRelay<'a> {
    pub templates: &'a EventTemplates,
    pub session: &'a SessionSlot,
}

impl OutboundRelay<'_> {
    pub async fn run(
        &self,
        agent: &mut dyn FrameSource,
        telephony: &mut dyn FrameSink,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        let mut transcoder = OutboundTranscoder::new()?;

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                frame = agent.recv() => frame,
            };

            let Some(text) = frame else {
                info!("Realtime connection closed");
                return Ok(());
            };

            let event = match ServerEvent::parse(&text) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Dropping unparseable realtime event");
                    continue;
                }
            };

            match &event {
                ServerEvent::OutputAudioDelta { delta, .. } => {
                    self.forward_audio(delta, &mut transcoder, telephony).await?;
                }
                ServerEvent::OutputAudioDone { .. } => {
                    let tail = transcoder.flush()?;
                    if let Some(session) = self.session.get() {
                        self.send_media(session, tail, telephony).await?;
                    }
                }
                ServerEvent::SessionCreated { .. } => info!("Realtime session created"),
                ServerEvent::SessionUpdated { .. } => info!("Realtime session configured"),
                ServerEvent::SpeechStarted { .. } => debug!("Caller started speaking"),
                ServerEvent::SpeechStopped { .. } => debug!("Caller stopped speaking"),
                ServerEvent::ResponseCreated { .. } => debug!("Agent response started"),
                ServerEvent::ResponseDone { .. } => {
                    debug!(status = ?event.response_status(), "Agent response finished");
                }
                ServerEvent::OutputTranscriptDone { transcript, .. } => {
                    info!(
                        call_sid = self.call_sid(),
                        transcript = %transcript,
                        "Agent transcript"
                    );
                }
                ServerEvent::InputTranscriptionCompleted { transcript, .. } => {
                    info!(
                        call_sid = self.call_sid(),
                        transcript = %transcript,
                        "Caller transcript"
                    );
                }
                ServerEvent::Error { error } => {
                    error!(
                        code = ?error.code,
                        error_type = ?error.error_type,
                        message = %error.message,
                        "Realtime endpoint reported an error, ending call"
                    );
                    return Ok(());
                }
                ServerEvent::Other => {
                    debug!(event_type = ?event_type(&text), "Ignoring realtime event");
                }
            }
        }
    }

    fn call_sid(&self) -> &str {
        self.session.get().map_or("", |s| s.call_sid.as_str())
    }

    async fn forward_audio(
        &self,
        delta: &str,
        transcoder: &mut OutboundTranscoder,
        telephony: &mut dyn FrameSink,
    ) -> BridgeResult<()> {
        let Some(session) = self.session.get() else {
            warn!("Dropping agent audio received before the call session started");
            return Ok(());
        };

        let pcm = match decode_audio_delta(delta) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Dropping audio delta with invalid base64 payload");
                return Ok(());
            }
        };

        let mulaw = match transcoder.transcode(&AudioFrame::pcm16(pcm)) {
            Ok(frame) => frame,
            Err(e @ AudioError::MalformedAudio { .. }) => {
                warn!(error = %e, "Dropping malformed audio delta");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.send_media(session, mulaw, telephony).await
    }

    async fn send_media(
        &self,
        session: &CallSession,
        frame: AudioFrame,
        telephony: &mut dyn FrameSink,
    ) -> BridgeResult<()> {
        if frame.is_empty() {
            return Ok(());
        }

        let payload = BASE64_STANDARD.encode(frame.data());
        let media = self.templates.render(
            MEDIA,
            &[
                ("streamSid", Value::String(session.stream_sid.clone())),
                ("payload", Value::String(payload)),
            ],
        )?;
        telephony.send(media).await
    }
}
