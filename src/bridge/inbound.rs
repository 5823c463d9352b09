use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::{CallSession, SessionSlot};
use super::transport::{FrameSink, FrameSource};
use super::BridgeResult;
use crate::core::audio::{AudioError, AudioFrame, InboundTranscoder};
use crate::core::directory::SessionDirectory;
use crate::core::events::{EventTemplates, INPUT_AUDIO_APPEND, SESSION_UPDATE};
use crate::core::telephony::{MediaPayload, StartMetadata, TelephonyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InboundState {
    AwaitingStart,
    Streaming,
}

/// Telephony → agent relay.
pub(super) struct InboundRelay<'a> {
    pub templates: &'a EventTemplates,
    pub directory: &'a SessionDirectory,
    pub voice: Option<&'a str>,
    pub session: &'a SessionSlot,
}

impl InboundRelay<'_> {
    pub async fn run(
        &self,
        telephony: &mut dyn FrameSource,
        agent: &mut dyn FrameSink,
        cancel: &CancellationToken,
    ) -> BridgeResult<()> {
        let mut state = InboundState::AwaitingStart;
        let mut transcoder = InboundTranscoder::new()?;
        let mut early_media: u64 = 0;

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                frame = telephony.recv() => frame,
            };

            let Some(text) = frame else {
                info!("Telephony stream disconnected");
                return Ok(());
            };

            let event = match TelephonyEvent::parse(&text) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Dropping unparseable telephony message");
                    continue;
                }
            };

            match event {
                TelephonyEvent::Connected { protocol, .. } => {
                    debug!(?protocol, "Telephony stream connected");
                }
                TelephonyEvent::Start { start, .. } => {
                    if state == InboundState::Streaming {
                        warn!(call_sid = %start.call_sid, "Ignoring repeated start event");
                        continue;
                    }
                    self.start_session(start, agent).await?;
                    state = InboundState::Streaming;
                }
                TelephonyEvent::Media { media, .. } => {
                    if state == InboundState::AwaitingStart {
                        early_media += 1;
                        if early_media == 1 {
                            warn!("Dropping media received before start");
                        } else {
                            debug!(count = early_media, "Dropping media received before start");
                        }
                        continue;
                    }
                    self.forward_media(&media, &mut transcoder, agent).await?;
                }
                TelephonyEvent::Stop { stream_sid } => {
                    info!(?stream_sid, "Telephony stream stopped");
                    return Ok(());
                }
                TelephonyEvent::Mark { mark, .. } => {
                    debug!(mark = %mark.name, "Playback mark reached");
                }
                TelephonyEvent::Dtmf { .. } => {
                    debug!("Keypad digit received");
                }
                TelephonyEvent::Unknown => {
                    debug!("Ignoring unknown telephony event");
                }
            }
        }
    }

    async fn start_session(
        &self,
        start: StartMetadata,
        agent: &mut dyn FrameSink,
    ) -> BridgeResult<()> {
        let profile = self.directory.resolve_and_consume(&start.call_sid).await?;

        let mut substitutions = vec![(
            "instructions",
            Value::String(profile.instructions.clone()),
        )];
        if let Some(voice) = self.voice {
            substitutions.push(("voice", Value::String(voice.to_string())));
        }
        let session_update = self.templates.render(SESSION_UPDATE, &substitutions)?;

        info!(
            call_sid = %start.call_sid,
            stream_sid = %start.stream_sid,
            client = %profile.name,
            "Call session started"
        );
        self.session.establish(CallSession {
            call_sid: start.call_sid,
            stream_sid: start.stream_sid,
            account_sid: start.account_sid,
            profile,
        });

        agent.send(session_update).await
    }

    async fn forward_media(
        &self,
        media: &MediaPayload,
        transcoder: &mut InboundTranscoder,
        agent: &mut dyn FrameSink,
    ) -> BridgeResult<()> {
        let mulaw = match media.decode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Dropping media frame with invalid base64 payload");
                return Ok(());
            }
        };

        let pcm = match transcoder.transcode(&AudioFrame::mulaw(mulaw)) {
            Ok(frame) => frame,
            Err(e @ AudioError::MalformedAudio { .. }) => {
                warn!(error = %e, "Dropping malformed media frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if pcm.is_empty() {
            return Ok(());
        }

        let audio = BASE64_STANDARD.encode(pcm.data());
        let append = self
            .templates
            .render(INPUT_AUDIO_APPEND, &[("audio", Value::String(audio))])?;
        agent.send(append).await
    }
}
