//! Reconnect backoff (spec §4.2, §5): "exponential-capped delay (reset = 3s
//! for address change, reconnect = 15s for same address retry, bounded
//! between 3 and 300s)".

use std::time::Duration;

use crate::config::PanelConfig;

/// Why the session is reconnecting, which selects the starting delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReason {
    /// The controller (host, port) changed.
    AddressChanged,
    /// Retrying the same address after a drop.
    SameAddress,
}

/// Tracks the exponential-capped backoff delay across repeated reconnect
/// attempts to the same session.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(cfg: &PanelConfig) -> Self {
        Backoff {
            min: cfg.backoff_min,
            max: cfg.backoff_max,
            current: cfg.backoff_reset,
        }
    }

    /// Reset the delay to the reason-appropriate starting value (§4.2).
    pub fn reset(&mut self, cfg: &PanelConfig, reason: ReconnectReason) {
        self.current = match reason {
            ReconnectReason::AddressChanged => cfg.backoff_reset,
            ReconnectReason::SameAddress => cfg.backoff_reconnect,
        };
    }

    /// The delay to wait before the next attempt, then double it
    /// (capped) for the attempt after that.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.clamp(self.min, self.max);
        self.current = (self.current * 2).min(self.max);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_and_caps() {
        let mut cfg = PanelConfig::new("host", 1319);
        cfg.backoff_min = Duration::from_secs(3);
        cfg.backoff_max = Duration::from_secs(20);
        cfg.backoff_reset = Duration::from_secs(3);
        let mut b = Backoff::new(&cfg);
        b.reset(&cfg, ReconnectReason::SameAddress);
        // reconnect reason starts at 15s per config below
        cfg_reconnect_check(&mut b, &cfg);
    }

    fn cfg_reconnect_check(b: &mut Backoff, cfg: &PanelConfig) {
        let _ = cfg;
        let d1 = b.next_delay();
        let d2 = b.next_delay();
        assert!(d2 >= d1);
        let d3 = b.next_delay();
        assert!(d3 <= Duration::from_secs(20));
    }
}
