//! Engine configuration (SPEC_FULL §C).
//!
//! Deliberately a plain data struct: loading it from a file or CLI flags is
//! out of scope (spec.md §1 Non-goals). Callers build one however they like
//! and hand it to [`crate::session::PanelSession::new`].

use std::time::Duration;

/// Product generation. Selects string encoding (§6.4, §9) and the G4/G5
/// bitmap-field precedence rule in the state record (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// CP1250 strings, single bitmap field per state.
    G4,
    /// UTF-8 strings, ordered bitmap stack per state.
    G5,
}

/// Sound file names and levels resolved from project settings, consumed by
/// the system-sound command family (`ABEEP`/`ADBEEP`/`BEEP`/`DBEEP`,
/// SPEC_FULL §E.3).
#[derive(Debug, Clone)]
pub struct SoundConfig {
    /// File played for a single beep (`BEEP`/`ABEEP`).
    pub single_beep: String,
    /// File played for a double beep (`DBEEP`/`ADBEEP`).
    pub double_beep: String,
    /// System volume, 0-100.
    pub volume: u8,
    /// System gain, 0-100.
    pub gain: u8,
}

impl Default for SoundConfig {
    fn default() -> Self {
        SoundConfig {
            single_beep: "singleBeep.wav".to_string(),
            double_beep: "doubleBeep.wav".to_string(),
            volume: 100,
            gain: 100,
        }
    }
}

/// Everything the protocol engine and session transport need to be told
/// from the outside.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Controller hostname or IP address.
    pub host: String,
    /// Controller TCP port (ICSP is conventionally 1319).
    pub port: u16,
    /// Use TLS for the transport (§4.2).
    pub use_tls: bool,
    /// Skip certificate verification. The spec calls this out explicitly as
    /// "optional and callback-driven"; when `None` the platform's default
    /// verifier is used.
    pub accept_any_cert: bool,
    /// Per-operation read/write timeout (default 10s per §4.2).
    pub io_timeout: Duration,
    /// Lower bound of the reconnect backoff (3s per §4.2).
    pub backoff_min: Duration,
    /// Upper bound of the reconnect backoff (300s per §4.2).
    pub backoff_max: Duration,
    /// Backoff used on address change (3s per §4.2).
    pub backoff_reset: Duration,
    /// Backoff used retrying the same address (15s per §4.2).
    pub backoff_reconnect: Duration,
    /// Bound on the outbound FIFO (§4.3/§5).
    pub outbound_queue_capacity: usize,
    /// G4 or G5 behavior.
    pub generation: Generation,
    /// System-id threshold above which a page id is a setup page (§3,
    /// conventionally 5000).
    pub setup_page_threshold: i32,
    /// Sound configuration for the system-sound command family.
    pub sound: SoundConfig,
    /// Stable device identity reported at handshake time.
    pub uuid: String,
    /// Free-text version string reported at handshake time.
    pub version: String,
}

impl PanelConfig {
    /// Create a configuration with the spec's documented defaults.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        PanelConfig {
            host: host.into(),
            port,
            use_tls: false,
            accept_any_cert: false,
            io_timeout: Duration::from_secs(10),
            backoff_min: Duration::from_secs(3),
            backoff_max: Duration::from_secs(300),
            backoff_reset: Duration::from_secs(3),
            backoff_reconnect: Duration::from_secs(15),
            outbound_queue_capacity: 256,
            generation: Generation::G5,
            setup_page_threshold: 5000,
            sound: SoundConfig::default(),
            uuid: String::new(),
            version: "1.0.0".to_string(),
        }
    }

    /// Builder-style TLS toggle.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Builder-style product generation.
    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = generation;
        self
    }
}
