use std::sync::OnceLock;

use crate::core::directory::CallerProfile;

/// Identity of one bridged call, fixed once the telephony `start` arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    pub call_sid: String,
    pub stream_sid: String,
    pub account_sid: String,
    pub profile: CallerProfile,
}

/// Write-once holder shared by the two relay loops.
///
/// The inbound loop establishes the session; the outbound loop only reads.
#[derive(Debug, Default)]
pub struct SessionSlot {
    inner: OnceLock<CallSession>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the session. Returns `false` if one was already established,
    /// in which case the stored session is unchanged.
    pub fn establish(&self, session: CallSession) -> bool {
        self.inner.set(session).is_ok()
    }

    pub fn get(&self) -> Option<&CallSession> {
        self.inner.get()
    }
}
