//! Observer registries (spec §5, §6.7): "Observer registries (online-state,
//! timer, battery, network) are copy-on-iterate." No lock is ever held
//! across a callback invocation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A date/time heartbeat tick, decoded from MC `0x0502` (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub month: u8,
    pub day: u8,
    pub year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub weekday: u8,
    /// External temperature, as reported by the controller (raw units).
    pub external_temperature: i16,
}

/// Battery state, reported by the embedding application, not derived from
/// the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryState {
    pub level: u8,
    pub charging: bool,
    pub source: u8,
}

/// Network signal level (§6.7 `on_network_state(level:int)`), range 0-6
/// (`tqnetworkinfo.cpp`'s `mLevel`: 0 when disconnected, 6 once a backend
/// reports the link up). Not part of the wire protocol; notified whenever
/// the transport connects or disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkState {
    pub level: u8,
}

/// A stable handle returned by [`ObserverRegistry::register`], used to
/// deregister later.
pub type ObserverHandle = u64;

/// A generic, thread-safe, copy-on-iterate observer list.
pub struct ObserverRegistry<T> {
    observers: Mutex<Vec<(ObserverHandle, Arc<dyn Fn(&T) + Send + Sync>)>>,
    next_handle: AtomicU64,
}

impl<T> Default for ObserverRegistry<T> {
    fn default() -> Self {
        ObserverRegistry {
            observers: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
        }
    }
}

impl<T> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, returning a handle that can later be passed to
    /// [`Self::unregister`].
    pub fn register<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().unwrap().push((handle, Arc::new(callback)));
        handle
    }

    /// Remove a previously registered callback. A no-op if the handle is
    /// unknown (already deregistered, or never existed).
    pub fn unregister(&self, handle: ObserverHandle) {
        self.observers.lock().unwrap().retain(|(h, _)| *h != handle);
    }

    /// Notify every registered observer with `value`. The callback list is
    /// snapshotted (cloning the `Arc`s) before any callback runs, so the
    /// mutex is never held across a callback, and a callback that
    /// registers or unregisters during iteration only affects the *next*
    /// notification.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<_> = {
            let guard = self.observers.lock().unwrap();
            guard.iter().map(|(_, f)| f.clone()).collect()
        };
        for callback in snapshot {
            callback(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn notifies_all_registered_observers() {
        let reg: ObserverRegistry<i32> = ObserverRegistry::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s1 = seen.clone();
        reg.register(move |v| {
            s1.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let s2 = seen.clone();
        reg.register(move |v| {
            s2.fetch_add(*v as usize, Ordering::SeqCst);
        });
        reg.notify(&5);
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn unregister_stops_future_notifications() {
        let reg: ObserverRegistry<i32> = ObserverRegistry::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s1 = seen.clone();
        let handle = reg.register(move |v| {
            s1.fetch_add(*v as usize, Ordering::SeqCst);
        });
        reg.unregister(handle);
        reg.notify(&5);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
