//! Shared application state.
//!
//! Every service is built once at startup and injected here; handlers reach
//! them through `State<Arc<AppState>>`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::bridge::CallBridge;
use crate::config::ServerConfig;
use crate::core::directory::{
    ClientStore, CorrelationStore, DirectoryError, MemoryCorrelationStore, SessionDirectory,
    StaticClientStore,
};
use crate::core::events::{EventError, EventTemplates, REQUIRED_TEMPLATES};
use crate::core::realtime::{RealtimeConnector, RealtimeError};

/// Errors raised while building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Templates(#[from] EventError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),
}

pub struct AppState {
    pub config: ServerConfig,
    pub templates: Arc<EventTemplates>,
    pub directory: Arc<SessionDirectory>,
    pub connector: RealtimeConnector,
    pub bridge: CallBridge,
}

impl AppState {
    /// Build every service from configuration.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, StateError> {
        let templates = EventTemplates::load(config.templates_dir.as_deref())?;
        templates.require(&REQUIRED_TEMPLATES)?;
        info!(templates = ?templates.names(), "Loaded event templates");

        let correlations = correlation_store(&config)?;
        let clients = client_store(&config).await?;
        let directory = SessionDirectory::new(correlations, clients);

        let api_key = config.api_key().map_err(StateError::Config)?;
        let connector =
            RealtimeConnector::new(&config.realtime_url, &config.realtime_model, api_key)?;

        Ok(Self::with_services(
            config,
            Arc::new(templates),
            Arc::new(directory),
            connector,
        ))
    }

    /// Assemble state from already-built services.
    pub fn with_services(
        config: ServerConfig,
        templates: Arc<EventTemplates>,
        directory: Arc<SessionDirectory>,
        connector: RealtimeConnector,
    ) -> Arc<Self> {
        let bridge = CallBridge::new(templates.clone(), directory.clone())
            .with_voice(config.realtime_voice.clone());

        Arc::new(Self {
            config,
            templates,
            directory,
            connector,
            bridge,
        })
    }
}

fn correlation_store(config: &ServerConfig) -> Result<Arc<dyn CorrelationStore>, StateError> {
    let ttl = config.correlation_ttl();

    match config.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        Some(url) => {
            info!(ttl_seconds = ttl.as_secs(), "Using Redis correlation store");
            let store = crate::core::directory::RedisCorrelationStore::new(url, ttl)?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => Err(StateError::Config(
            "REDIS_URL is set but the server was built without the `redis` feature".to_string(),
        )),
        None => {
            info!(ttl_seconds = ttl.as_secs(), "Using in-memory correlation store");
            Ok(Arc::new(MemoryCorrelationStore::new(ttl)))
        }
    }
}

async fn client_store(config: &ServerConfig) -> Result<Arc<dyn ClientStore>, StateError> {
    match config.database_url.as_deref() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            info!("Using PostgreSQL client store");
            let store = crate::core::directory::PgClientStore::connect(url).await?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            return Err(StateError::Config(
                "DATABASE_URL is set but the server was built without the `postgres` feature"
                    .to_string(),
            ));
        }
        None => {}
    }

    match config.clients_file.as_deref() {
        Some(path) => {
            let store = StaticClientStore::from_file(path)?;
            info!(path = %path.display(), clients = store.len(), "Loaded clients file");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No client store configured, every call will be rejected as an unknown client");
            Ok(Arc::new(StaticClientStore::new()))
        }
    }
}
