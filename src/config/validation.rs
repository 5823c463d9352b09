use std::path::PathBuf;

use super::{ServerConfig, TlsConfig};

/// Validate a fully merged configuration.
pub(super) fn validate_config(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_api_key(&config.openai_api_key)?;
    validate_correlation_ttl(config.correlation_ttl_seconds)?;
    validate_public_url(&config.public_url)?;
    Ok(())
}

/// The realtime endpoint cannot be reached without an API key.
pub(super) fn validate_api_key(api_key: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err("OPENAI_API_KEY must be set (or realtime.api_key in the config file)".into()),
    }
}

pub(super) fn validate_correlation_ttl(ttl_seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    if ttl_seconds == 0 {
        return Err("CORRELATION_TTL_SECONDS must be greater than zero".into());
    }
    Ok(())
}

/// The public URL is combined with `/media-stream`, so it must be an
/// absolute http(s) or ws(s) URL.
pub(super) fn validate_public_url(
    public_url: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(raw) = public_url else {
        return Ok(());
    };
    let url = url::Url::parse(raw).map_err(|e| format!("Invalid PUBLIC_URL '{raw}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") || url.host_str().is_none() {
        return Err(format!("PUBLIC_URL must be an absolute http(s) URL, got '{raw}'").into());
    }
    Ok(())
}

/// Certificate and key must be configured together.
pub(super) fn validate_tls_paths(
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path,
            key_path,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err("TLS_KEY_PATH must be set when TLS_CERT_PATH is set".into()),
        (None, Some(_)) => Err("TLS_CERT_PATH must be set when TLS_KEY_PATH is set".into()),
    }
}
