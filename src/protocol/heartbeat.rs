//! Date/time heartbeat (`0x0502`, §4.3: "parsed (month, day, year, hour,
//! minute, second, weekday, external temperature, optional string) and
//! broadcast to timer observers").
//!
//! Wire layout: heartbeat interval (ds), LED flag, month, day, year (u16
//! BE), hour, minute, second, weekday, external temperature (i16 BE), then
//! an optional NUL-terminated date/time string filling the rest of the
//! payload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::observer::TickEvent;

const FIXED_LEN: usize = 12;

pub fn parse(payload: &[u8]) -> Result<TickEvent> {
    if payload.len() < FIXED_LEN {
        return Err(Error::Framing(format!(
            "heartbeat payload too short: {} bytes",
            payload.len()
        )));
    }
    Ok(TickEvent {
        month: payload[2],
        day: payload[3],
        year: u16::from_be_bytes([payload[4], payload[5]]),
        hour: payload[6],
        minute: payload[7],
        second: payload[8],
        weekday: payload[9],
        external_temperature: i16::from_be_bytes([payload[10], payload[11]]),
    })
}

/// Tracks the time since the last heartbeat arrived, used by the session to
/// notice a stalled controller (the reference implementation forces a
/// reconnect after a few missed beats).
pub struct Watchdog {
    last: AtomicU64,
    started: Instant,
}

impl Watchdog {
    pub fn new() -> Self {
        Watchdog {
            last: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn touch(&self) {
        self.last.store(self.started.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    /// Milliseconds since the last [`Self::touch`] (or since creation, if
    /// none yet).
    pub fn age_ms(&self) -> u64 {
        (self.started.elapsed().as_millis() as u64).saturating_sub(self.last.load(Ordering::Relaxed))
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> Vec<u8> {
        vec![
            10,   // heartbeat interval (ds)
            1,    // LED
            3,    // month
            15,   // day
            0x07, 0xe8, // year = 2024
            14,   // hour
            30,   // minute
            45,   // second
            4,    // weekday (Friday, 0 = Monday)
            0x00, 0xc8, // external temperature
        ]
    }

    #[test]
    fn parses_fixed_fields() {
        let tick = parse(&sample_payload()).unwrap();
        assert_eq!(tick.month, 3);
        assert_eq!(tick.day, 15);
        assert_eq!(tick.year, 2024);
        assert_eq!(tick.hour, 14);
        assert_eq!(tick.minute, 30);
        assert_eq!(tick.second, 45);
        assert_eq!(tick.weekday, 4);
        assert_eq!(tick.external_temperature, 0x00c8);
    }

    #[test]
    fn rejects_short_payload() {
        assert!(parse(&[1, 2, 3]).is_err());
    }

    #[test]
    fn watchdog_tracks_age() {
        let wd = Watchdog::new();
        wd.touch();
        assert_eq!(wd.age_ms(), 0);
    }
}
