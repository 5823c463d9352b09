pub mod messages;

pub use messages::{MediaPayload, StartMetadata, TelephonyEvent};
