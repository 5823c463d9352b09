use std::path::PathBuf;

use super::{DEFAULT_CORRELATION_TTL_SECONDS, ProfileKey, ServerConfig};
use crate::core::realtime::{DEFAULT_REALTIME_MODEL, DEFAULT_REALTIME_URL};

/// Every environment variable the server reads.
#[cfg(test)]
pub(super) const ENV_VARS: [&str; 15] = [
    "HOST",
    "PORT",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "PUBLIC_URL",
    "OPENAI_API_KEY",
    "REALTIME_URL",
    "REALTIME_MODEL",
    "REALTIME_VOICE",
    "TEMPLATES_DIR",
    "CORRELATION_TTL_SECONDS",
    "REDIS_URL",
    "DATABASE_URL",
    "CLIENTS_FILE",
    "PROFILE_KEY",
];

/// Read a variable, treating empty values as unset.
fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| format!("Invalid {name} value '{raw}': {e}").into()),
        None => Ok(default),
    }
}

/// Build a configuration from environment variables and defaults.
///
/// TLS paths are returned separately so the merge step can pair them with
/// YAML values before validation.
pub(super) fn load_from_env() -> Result<(ServerConfig, TlsPaths), Box<dyn std::error::Error>> {
    let tls_paths = TlsPaths {
        cert_path: var("TLS_CERT_PATH").map(PathBuf::from),
        key_path: var("TLS_KEY_PATH").map(PathBuf::from),
    };

    let config = ServerConfig {
        host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port: parse_var("PORT", 5050u16)?,
        tls: None,
        public_url: var("PUBLIC_URL"),
        openai_api_key: var("OPENAI_API_KEY"),
        realtime_url: var("REALTIME_URL").unwrap_or_else(|| DEFAULT_REALTIME_URL.to_string()),
        realtime_model: var("REALTIME_MODEL")
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        realtime_voice: var("REALTIME_VOICE"),
        templates_dir: var("TEMPLATES_DIR").map(PathBuf::from),
        correlation_ttl_seconds: parse_var(
            "CORRELATION_TTL_SECONDS",
            DEFAULT_CORRELATION_TTL_SECONDS,
        )?,
        redis_url: var("REDIS_URL"),
        database_url: var("DATABASE_URL"),
        clients_file: var("CLIENTS_FILE").map(PathBuf::from),
        profile_key: parse_var("PROFILE_KEY", ProfileKey::default())?,
    };

    Ok((config, tls_paths))
}

/// Unpaired TLS paths, validated after all sources are merged.
#[derive(Debug, Default)]
pub(super) struct TlsPaths {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}
