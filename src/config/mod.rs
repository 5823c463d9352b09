//! Configuration module for the bridge server
//!
//! Configuration comes from .env files, environment variables and an optional
//! YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use sage_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default lifetime of a pending call correlation
pub const DEFAULT_CORRELATION_TTL_SECONDS: u64 = 120;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Which side of an announced call identifies the client profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileKey {
    /// The calling number (`From`)
    #[default]
    Caller,
    /// The called number (`To`)
    Recipient,
}

impl ProfileKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKey::Caller => "caller",
            ProfileKey::Recipient => "recipient",
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "caller" | "from" => Ok(ProfileKey::Caller),
            "recipient" | "to" => Ok(ProfileKey::Recipient),
            other => Err(format!(
                "Invalid profile key '{other}', expected 'caller' or 'recipient'"
            )),
        }
    }
}

/// Server configuration
///
/// Contains everything needed to run the bridge:
/// - Server settings (host, port, TLS, public URL)
/// - Realtime endpoint settings (API key, URL, model, voice)
/// - Event template location
/// - Directory backends (correlation TTL, Redis, PostgreSQL, clients file)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Externally reachable base URL used in the TwiML stream address.
    /// When unset, the request `Host` header is used.
    pub public_url: Option<String>,

    // Realtime endpoint
    pub openai_api_key: Option<String>,
    pub realtime_url: String,
    pub realtime_model: String,
    pub realtime_voice: Option<String>,

    /// Directory of outbound event templates; built-in set when unset
    pub templates_dir: Option<PathBuf>,

    // Directory backends
    pub correlation_ttl_seconds: u64,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    pub clients_file: Option<PathBuf>,
    pub profile_key: ProfileKey,
}

/// Zeroize secrets when the configuration is dropped.
/// Backend URLs are included because they usually embed credentials.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut url) = self.redis_url {
            url.zeroize();
        }
        if let Some(ref mut url) = self.database_url {
            url.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only.
    ///
    /// The .env file is loaded in `main` before this is called.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Get the realtime API key
    pub fn api_key(&self) -> Result<&str, String> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| "OpenAI API key not configured in server environment".to_string())
    }

    pub fn correlation_ttl(&self) -> Duration {
        Duration::from_secs(self.correlation_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "localhost".to_string(),
            port: 5050,
            tls: None,
            public_url: None,
            openai_api_key: Some("sk-test".to_string()),
            realtime_url: "wss://api.openai.com/v1/realtime".to_string(),
            realtime_model: "gpt-realtime".to_string(),
            realtime_voice: None,
            templates_dir: None,
            correlation_ttl_seconds: DEFAULT_CORRELATION_TTL_SECONDS,
            redis_url: None,
            database_url: None,
            clients_file: None,
            profile_key: ProfileKey::Caller,
        }
    }

    fn cleanup_env_vars() {
        unsafe {
            for name in env::ENV_VARS {
                std::env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_address_and_tls() {
        let mut config = test_config();
        assert_eq!(config.address(), "localhost:5050");
        assert!(!config.is_tls_enabled());

        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from("/certs/cert.pem"),
            key_path: PathBuf::from("/certs/key.pem"),
        });
        assert!(config.is_tls_enabled());
    }

    #[test]
    fn test_api_key() {
        let mut config = test_config();
        assert_eq!(config.api_key(), Ok("sk-test"));

        config.openai_api_key = Some("   ".to_string());
        assert!(config.api_key().is_err());

        config.openai_api_key = None;
        assert!(config.api_key().unwrap_err().contains("not configured"));
    }

    #[test]
    fn test_profile_key_parse() {
        assert_eq!("caller".parse::<ProfileKey>(), Ok(ProfileKey::Caller));
        assert_eq!("Recipient".parse::<ProfileKey>(), Ok(ProfileKey::Recipient));
        assert_eq!(" to ".parse::<ProfileKey>(), Ok(ProfileKey::Recipient));
        assert!("callee".parse::<ProfileKey>().is_err());
        assert_eq!(ProfileKey::default().to_string(), "caller");
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
server:
  host: "127.0.0.1"
  port: 8080

realtime:
  api_key: "yaml-key"
  voice: "verse"
"#,
        )
        .unwrap();

        unsafe {
            std::env::set_var("HOST", "0.0.0.0");
            std::env::set_var("OPENAI_API_KEY", "env-key");
            std::env::set_var("CORRELATION_TTL_SECONDS", "30");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.openai_api_key.as_deref(), Some("yaml-key"));
        assert_eq!(config.realtime_voice.as_deref(), Some("verse"));
        // ENV value kept where YAML is silent
        assert_eq!(config.correlation_ttl_seconds, 30);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("OPENAI_API_KEY", "sk-env");
        }

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5050);
        assert_eq!(
            config.realtime_url,
            crate::core::realtime::DEFAULT_REALTIME_URL
        );
        assert_eq!(
            config.realtime_model,
            crate::core::realtime::DEFAULT_REALTIME_MODEL
        );
        assert_eq!(config.correlation_ttl(), Duration::from_secs(120));
        assert_eq!(config.profile_key, ProfileKey::Caller);
        assert!(config.tls.is_none());
        assert!(config.templates_dir.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_requires_api_key() {
        cleanup_env_vars();

        let result = ServerConfig::from_env();
        assert!(result.unwrap_err().to_string().contains("OPENAI_API_KEY"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = ServerConfig::from_file(Path::new("/nonexistent/config.yaml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
