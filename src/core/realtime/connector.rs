//! Outbound connection to the realtime endpoint.

use std::fmt;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;
use zeroize::Zeroizing;

use super::{RealtimeError, RealtimeResult};

/// Default realtime endpoint
pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default realtime model, sent as the `model` query parameter
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-realtime";

/// WebSocket stream to the realtime endpoint.
pub type RealtimeStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens authenticated WebSocket connections to the realtime endpoint.
///
/// One connector is built at startup and shared; each call opens its own
/// connection with [`connect`](Self::connect).
#[derive(Clone)]
pub struct RealtimeConnector {
    endpoint: Url,
    api_key: Zeroizing<String>,
}

impl fmt::Debug for RealtimeConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConnector")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl RealtimeConnector {
    /// Build a connector for `url`, adding `model` as a query parameter
    /// unless the URL already names one.
    ///
    /// # Errors
    /// Returns [`RealtimeError::InvalidConfiguration`] if the URL does not
    /// parse, is not `ws`/`wss`, or the API key is empty.
    pub fn new(url: &str, model: &str, api_key: &str) -> RealtimeResult<Self> {
        let mut endpoint = Url::parse(url).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!("invalid realtime URL '{url}': {e}"))
        })?;

        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "realtime URL must use ws:// or wss://, got '{}'",
                endpoint.scheme()
            )));
        }

        if api_key.trim().is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "realtime API key is empty".to_string(),
            ));
        }

        let has_model = endpoint.query_pairs().any(|(key, _)| key == "model");
        if !has_model && !model.is_empty() {
            endpoint.query_pairs_mut().append_pair("model", model);
        }

        Ok(Self {
            endpoint,
            api_key: Zeroizing::new(api_key.to_string()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Open a new connection with bearer authentication.
    pub async fn connect(&self) -> RealtimeResult<RealtimeStream> {
        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key.as_str()))
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        debug!(endpoint = %self.endpoint.path(), "Connecting to realtime endpoint");
        let (stream, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(status = %response.status(), "Connected to realtime endpoint");
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_appended() {
        let connector =
            RealtimeConnector::new(DEFAULT_REALTIME_URL, DEFAULT_REALTIME_MODEL, "sk-test").unwrap();
        assert_eq!(
            connector.endpoint().as_str(),
            "wss://api.openai.com/v1/realtime?model=gpt-realtime"
        );
    }

    #[test]
    fn test_existing_model_kept() {
        let connector = RealtimeConnector::new(
            "wss://api.openai.com/v1/realtime?model=gpt-realtime-mini",
            DEFAULT_REALTIME_MODEL,
            "sk-test",
        )
        .unwrap();
        assert_eq!(
            connector.endpoint().query(),
            Some("model=gpt-realtime-mini")
        );
    }

    #[test]
    fn test_rejects_http_scheme() {
        let result = RealtimeConnector::new("https://api.openai.com/v1/realtime", "", "sk-test");
        assert!(matches!(result, Err(RealtimeError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_empty_key() {
        let result = RealtimeConnector::new(DEFAULT_REALTIME_URL, "", "  ");
        assert!(matches!(result, Err(RealtimeError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let connector = RealtimeConnector::new(DEFAULT_REALTIME_URL, "", "sk-secret").unwrap();
        let debug = format!("{connector:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector =
            RealtimeConnector::new(&format!("ws://{addr}/v1/realtime"), "", "sk-test").unwrap();
        assert!(matches!(
            connector.connect().await,
            Err(RealtimeError::ConnectionFailed(_))
        ));
    }
}
