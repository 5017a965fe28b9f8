//! Session phase and timestamps owned by the coordinator

/// Connection phase of the device session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No live session; reconnects are gated by the retry interval
    Disconnected,
    /// A connect attempt is in progress inside the current tick
    Connecting,
    /// The link reported a live session at the last check
    Connected,
}

/// Timestamp value meaning "never happened"
pub const NEVER: u32 = 0;

/// Phase plus the two timestamps the gates read
///
/// Timestamps are wrapping milliseconds from the coordinator's clock, with
/// [`NEVER`] meaning "never". An action taken at time `0` is stored as `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub last_connect_attempt: u32,
    pub last_flush: u32,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            last_connect_attempt: 0,
            last_flush: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Connected
    }

    pub fn record_connect_attempt(&mut self, now: u32) {
        self.last_connect_attempt = stamp(now);
    }

    pub fn record_flush(&mut self, now: u32) {
        self.last_flush = stamp(now);
    }
}

/// Keep a real action from reading as [`NEVER`]
fn stamp(now: u32) -> u32 {
    now.max(1)
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
