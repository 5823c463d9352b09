use std::path::PathBuf;

use super::ServerConfig;
use super::env::{TlsPaths, load_from_env};
use super::validation;
use super::yaml::YamlConfig;

/// Merge environment variables (base) with optional YAML overrides.
///
/// TLS paths are paired last so that a certificate from one source and a
/// key from the other still form a valid pair.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let (mut config, mut tls) = load_from_env()?;

    if let Some(yaml) = yaml {
        apply_yaml(&mut config, &mut tls, yaml)?;
    }

    config.tls = validation::validate_tls_paths(tls.cert_path, tls.key_path)?;
    Ok(config)
}

fn apply_yaml(
    config: &mut ServerConfig,
    tls: &mut TlsPaths,
    yaml: YamlConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if server.public_url.is_some() {
            config.public_url = server.public_url;
        }
        if let Some(tls_yaml) = server.tls {
            if let Some(cert) = tls_yaml.cert_path {
                tls.cert_path = Some(PathBuf::from(cert));
            }
            if let Some(key) = tls_yaml.key_path {
                tls.key_path = Some(PathBuf::from(key));
            }
        }
    }

    if let Some(realtime) = yaml.realtime {
        if realtime.api_key.is_some() {
            config.openai_api_key = realtime.api_key;
        }
        if let Some(url) = realtime.url {
            config.realtime_url = url;
        }
        if let Some(model) = realtime.model {
            config.realtime_model = model;
        }
        if realtime.voice.is_some() {
            config.realtime_voice = realtime.voice;
        }
    }

    if let Some(dir) = yaml.templates.and_then(|t| t.dir) {
        config.templates_dir = Some(PathBuf::from(dir));
    }

    if let Some(directory) = yaml.directory {
        if let Some(ttl) = directory.correlation_ttl_seconds {
            config.correlation_ttl_seconds = ttl;
        }
        if let Some(key) = directory.profile_key {
            config.profile_key = key.parse()?;
        }
        if directory.redis_url.is_some() {
            config.redis_url = directory.redis_url;
        }
        if directory.database_url.is_some() {
            config.database_url = directory.database_url;
        }
        if let Some(file) = directory.clients_file {
            config.clients_file = Some(PathBuf::from(file));
        }
    }

    Ok(())
}
