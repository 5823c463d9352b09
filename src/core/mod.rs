pub mod audio;
pub mod directory;
pub mod events;
pub mod realtime;
pub mod telephony;

// Re-export commonly used types for convenience
pub use audio::{
    AudioError, AudioFormat, AudioFrame, AudioResult, InboundTranscoder, OutboundTranscoder,
    decode_inbound, encode_outbound,
};

pub use directory::{
    CallRecord, CallerProfile, ClientStore, CorrelationStore, DirectoryError, DirectoryResult,
    MemoryCorrelationStore, SessionDirectory, StaticClientStore,
};

pub use events::{EventError, EventResult, EventTemplates};

pub use realtime::{RealtimeConnector, RealtimeError, RealtimeResult, ServerEvent};

pub use telephony::TelephonyEvent;
