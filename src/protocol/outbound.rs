//! Outbound command API (§4.3): the calls an embedding application makes to
//! push panel-side events (button presses, level changes, strings) to the
//! controller.

use crate::wire::{value, Message};

use super::Engine;

pub(crate) fn channel_payload(device: u16, port: u16, system: u16, channel: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&device.to_be_bytes());
    out.extend_from_slice(&port.to_be_bytes());
    out.extend_from_slice(&system.to_be_bytes());
    out.extend_from_slice(&channel.to_be_bytes());
    out
}

fn string_payload(device: u16, port: u16, system: u16, text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + text.len());
    out.extend_from_slice(&device.to_be_bytes());
    out.extend_from_slice(&port.to_be_bytes());
    out.extend_from_slice(&system.to_be_bytes());
    out.extend_from_slice(&value::write_tagged_string(text));
    out
}

impl Engine {
    fn device(&self) -> u16 {
        self.identity.device_id
    }

    /// `push_button(port, channel)` → `0x0084`.
    pub fn push_button(&mut self, port: u16, channel: u16) -> Message {
        let device = self.device();
        let system = self.system;
        let payload = channel_payload(device, port, system, channel);
        self.build_outbound(port, 0x0084, payload)
    }

    /// `release_button(port, channel)` → `0x0085`.
    pub fn release_button(&mut self, port: u16, channel: u16) -> Message {
        let device = self.device();
        let system = self.system;
        let payload = channel_payload(device, port, system, channel);
        self.build_outbound(port, 0x0085, payload)
    }

    /// `channel_on(port, channel)` → `0x0086`.
    pub fn channel_on(&mut self, port: u16, channel: u16) -> Message {
        let device = self.device();
        let system = self.system;
        let payload = channel_payload(device, port, system, channel);
        self.build_outbound(port, 0x0086, payload)
    }

    /// `channel_off(port, channel)` → `0x0087`.
    pub fn channel_off(&mut self, port: u16, channel: u16) -> Message {
        let device = self.device();
        let system = self.system;
        let payload = channel_payload(device, port, system, channel);
        self.build_outbound(port, 0x0087, payload)
    }

    /// `level(port, level, value)` → `0x008a` with a typed unsigned-16
    /// value (§4.3).
    pub fn level(&mut self, port: u16, level: u16, value: u16) -> Message {
        let device = self.device();
        let system = self.system;
        let mut payload = Vec::with_capacity(8 + 3);
        payload.extend_from_slice(&device.to_be_bytes());
        payload.extend_from_slice(&port.to_be_bytes());
        payload.extend_from_slice(&system.to_be_bytes());
        payload.extend_from_slice(&level.to_be_bytes());
        payload.extend_from_slice(&crate::wire::Value::U16(value).encode());
        self.build_outbound(port, 0x008a, payload)
    }

    /// `string(port, text)` → `0x008b`.
    pub fn string(&mut self, port: u16, text: &str) -> Message {
        let device = self.device();
        let system = self.system;
        let payload = string_payload(device, port, system, text);
        self.build_outbound(port, 0x008b, payload)
    }

    /// `command(port, text)` → `0x008c`.
    pub fn command(&mut self, port: u16, text: &str) -> Message {
        let device = self.device();
        let system = self.system;
        let payload = string_payload(device, port, system, text);
        self.build_outbound(port, 0x008c, payload)
    }

    /// `custom_event(port, id, event_type, flag, value1, value2, value3,
    /// text)` → `0x008d`.
    #[allow(clippy::too_many_arguments)]
    pub fn custom_event(
        &mut self,
        port: u16,
        id: u16,
        event_type: u16,
        flag: u16,
        value1: u32,
        value2: u32,
        value3: u32,
        text: &str,
    ) -> Message {
        let device = self.device();
        let system = self.system;
        let mut payload = Vec::with_capacity(20 + text.len());
        payload.extend_from_slice(&device.to_be_bytes());
        payload.extend_from_slice(&port.to_be_bytes());
        payload.extend_from_slice(&system.to_be_bytes());
        payload.extend_from_slice(&id.to_be_bytes());
        payload.extend_from_slice(&event_type.to_be_bytes());
        payload.extend_from_slice(&flag.to_be_bytes());
        payload.extend_from_slice(&value1.to_be_bytes());
        payload.extend_from_slice(&value2.to_be_bytes());
        payload.extend_from_slice(&value3.to_be_bytes());
        payload.extend_from_slice(&value::write_tagged_string(text));
        self.build_outbound(port, 0x008d, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelConfig;
    use crate::protocol::identity::PanelIdentity;

    fn engine() -> Engine {
        let cfg = PanelConfig::new("127.0.0.1", 1319);
        let identity = PanelIdentity::new(0x0149, 1, 4, "Test Panel");
        Engine::new(cfg, identity, Box::new(crate::model::manager::NullProjectSource))
    }

    #[test]
    fn push_button_addresses_panel_device_id() {
        let mut e = engine();
        let msg = e.push_button(1, 42);
        assert_eq!(msg.mc, 0x0084);
        assert_eq!(msg.dev_dst, 0x0149);
        assert_eq!(msg.port_dst, 1);
        assert_eq!(u16::from_be_bytes([msg.payload[6], msg.payload[7]]), 42);
    }

    #[test]
    fn successive_sends_increment_counter() {
        let mut e = engine();
        let first = e.push_button(1, 1).counter;
        let second = e.release_button(1, 1).counter;
        assert_eq!(second, first + 1);
    }
}
