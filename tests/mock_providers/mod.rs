//! Mock servers and shared fixtures for integration tests

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod realtime_mock;

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::json;

use sage_bridge::config::{DEFAULT_CORRELATION_TTL_SECONDS, ProfileKey};
use sage_bridge::core::directory::{
    CallerProfile, MemoryCorrelationStore, SessionDirectory, StaticClientStore,
};
use sage_bridge::core::events::EventTemplates;
use sage_bridge::core::realtime::RealtimeConnector;
use sage_bridge::{AppState, ServerConfig};

pub const TEST_API_KEY: &str = "sk-test-key";
pub const CLIENT_NUMBER: &str = "+15551234567";
pub const CLIENT_INSTRUCTIONS: &str = "You are calm and concise.";

/// Minimal configuration pointing at `realtime_url`
pub fn create_test_config(realtime_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        public_url: None,
        openai_api_key: Some(TEST_API_KEY.to_string()),
        realtime_url: realtime_url.to_string(),
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

pub fn test_clients() -> Arc<StaticClientStore> {
    Arc::new(StaticClientStore::from_profiles([CallerProfile {
        phone_number: CLIENT_NUMBER.to_string(),
        name: "Dr. Rivera".to_string(),
        instructions: CLIENT_INSTRUCTIONS.to_string(),
    }]))
}

/// State with in-memory stores; returns the client store for inspection.
pub fn create_test_state(config: ServerConfig) -> (Arc<AppState>, Arc<StaticClientStore>) {
    let clients = test_clients();
    let directory = Arc::new(SessionDirectory::new(
        Arc::new(MemoryCorrelationStore::new(Duration::from_secs(60))),
        clients.clone(),
    ));
    let connector = RealtimeConnector::new(
        &config.realtime_url,
        &config.realtime_model,
        TEST_API_KEY,
    )
    .unwrap();
    let templates = Arc::new(EventTemplates::builtin().unwrap());
    (
        AppState::with_services(config, templates, directory, connector),
        clients,
    )
}

pub fn start_event(call_sid: &str, stream_sid: &str) -> String {
    json!({
        "event": "start",
        "sequenceNumber": "1",
        "start": {
            "streamSid": stream_sid,
            "accountSid": "AC0001",
            "callSid": call_sid,
            "tracks": ["inbound"],
            "customParameters": {},
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
        },
        "streamSid": stream_sid
    })
    .to_string()
}

/// One 20 ms μ-law frame
pub fn media_event(stream_sid: &str, mulaw: &[u8]) -> String {
    json!({
        "event": "media",
        "sequenceNumber": "2",
        "media": {
            "track": "inbound",
            "chunk": "1",
            "timestamp": "20",
            "payload": BASE64_STANDARD.encode(mulaw)
        },
        "streamSid": stream_sid
    })
    .to_string()
}

pub fn stop_event(stream_sid: &str) -> String {
    json!({"event": "stop", "sequenceNumber": "3", "streamSid": stream_sid}).to_string()
}
