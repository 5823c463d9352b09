//! Call announcement webhook.
//!
//! The telephony provider posts here when a call arrives. The call id is
//! correlated with the client's phone number, and the reply tells the
//! provider to open a bidirectional media stream to `/media-stream`.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::HeaderMap;
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::config::ProfileKey;
use crate::core::directory::CallRecord;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Path the media stream WebSocket is served on
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Form fields of the provider's voice webhook. Unlisted fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallWebhook {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("missing {field}")))
}

pub async fn twiml_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(webhook): Form<CallWebhook>,
) -> AppResult<Response> {
    let call_sid = required(webhook.call_sid, "CallSid")?;
    let caller = required(webhook.from, "From")?;
    let recipient = required(webhook.to, "To")?;
    let account_sid = webhook.account_sid.unwrap_or_default();

    let stream_url = stream_url(state.config.public_url.as_deref(), &headers)?;

    let client_number = match state.config.profile_key {
        ProfileKey::Caller => &caller,
        ProfileKey::Recipient => &recipient,
    };
    state.directory.announce(&call_sid, client_number).await?;

    let record = CallRecord {
        call_sid: call_sid.clone(),
        account_sid,
        recipient,
        caller,
        created_at: OffsetDateTime::now_utc(),
    };
    // Best effort: the call is already correlated, so a failed audit write
    // must not keep the caller from being connected
    if let Err(e) = state.directory.record_call(&record).await {
        warn!(call_sid = %call_sid, error = %e, "Failed to record call");
    }

    info!(call_sid = %call_sid, "Connecting call to media stream");
    Ok(([(CONTENT_TYPE, "text/xml")], connect_twiml(&stream_url)).into_response())
}

/// WebSocket URL the provider should stream to.
///
/// Uses the configured public URL when set, otherwise the request `Host`
/// header with `wss`.
fn stream_url(public_url: Option<&str>, headers: &HeaderMap) -> AppResult<String> {
    if let Some(base) = public_url {
        let base = base.trim_end_matches('/');
        let (scheme, rest) = match base.split_once("://") {
            Some(("http", rest)) | Some(("ws", rest)) => ("ws", rest),
            Some((_, rest)) => ("wss", rest),
            None => ("wss", base),
        };
        return Ok(format!("{scheme}://{rest}{MEDIA_STREAM_PATH}"));
    }

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing Host header".to_string()))?;
    Ok(format!("wss://{host}{MEDIA_STREAM_PATH}"))
}

fn connect_twiml(stream_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Connect><Stream url="{}" /></Connect></Response>"#,
        escape_xml(stream_url)
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_stream_url_from_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("bridge.example.com"));
        assert_eq!(
            stream_url(None, &headers).unwrap(),
            "wss://bridge.example.com/media-stream"
        );
    }

    #[test]
    fn test_stream_url_from_public_url() {
        let headers = HeaderMap::new();
        assert_eq!(
            stream_url(Some("https://bridge.example.com/"), &headers).unwrap(),
            "wss://bridge.example.com/media-stream"
        );
        assert_eq!(
            stream_url(Some("http://localhost:5050"), &headers).unwrap(),
            "ws://localhost:5050/media-stream"
        );
    }

    #[test]
    fn test_stream_url_requires_host() {
        assert!(matches!(
            stream_url(None, &HeaderMap::new()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_twiml_escapes_url() {
        let twiml = connect_twiml("wss://a.example.com/media-stream?x=1&y=2");
        assert!(twiml.contains(r#"url="wss://a.example.com/media-stream?x=1&amp;y=2""#));
        assert!(twiml.starts_with("<?xml"));
        assert!(twiml.ends_with("</Response>"));
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(required(Some(" CA1 ".to_string()), "CallSid").unwrap(), "CA1");
        assert!(required(Some(String::new()), "CallSid").is_err());
        assert!(required(None, "CallSid").is_err());
    }
}
