//! Inbound message-code dispatch (§4.3): one match arm per handled MC,
//! returning whatever outbound frames the handling produces.

use crate::protocol::outbound::channel_payload;
use crate::protocol::{capacity_payload, Engine, InboundEvent};
use crate::render::RenderSurface;
use crate::wire::{value, Message, TypeTag, Value};

/// `{device, port, system, channel}`, the shape shared by the channel and
/// level message families (`ANET_CHANNEL`/`ANET_LEVEL` in the reference
/// header).
fn read_channel_payload(payload: &[u8]) -> Option<(u16, u16, u16, u16)> {
    if payload.len() < 8 {
        return None;
    }
    Some((
        u16::from_be_bytes([payload[0], payload[1]]),
        u16::from_be_bytes([payload[2], payload[3]]),
        u16::from_be_bytes([payload[4], payload[5]]),
        u16::from_be_bytes([payload[6], payload[7]]),
    ))
}

fn read_message_string(payload: &[u8]) -> Option<(u16, u16, u16, String)> {
    if payload.len() < 9 {
        return None;
    }
    let device = u16::from_be_bytes([payload[0], payload[1]]);
    let port = u16::from_be_bytes([payload[2], payload[3]]);
    let system = u16::from_be_bytes([payload[4], payload[5]]);
    // payload[6] is the string-type tag (unused here; we treat all content
    // as UTF-8/CP1250-decoded text upstream in `crate::encoding`).
    let len = u16::from_be_bytes([payload[7], payload[8]]) as usize;
    let start = 9;
    let end = (start + len).min(payload.len());
    let text = String::from_utf8_lossy(&payload[start..end]).into_owned();
    Some((device, port, system, text))
}

pub fn handle(engine: &mut Engine, msg: &Message, render: &dyn RenderSurface) -> Vec<Message> {
    match msg.mc {
        0x0001 | 0x0002 => {
            tracing::trace!(mc = msg.mc, "ack/nak received");
            Vec::new()
        }

        // `0x0018`/`0x0019` are the same {device,port,system,channel} shape
        // and handling as `0x0006`/`0x0007` (§6.2; confirmed identical in
        // the reference client's channel dispatch).
        0x0006 | 0x0007 | 0x0018 | 0x0019 => {
            if let Some((_device, port, _system, channel)) = read_channel_payload(&msg.payload) {
                let on = msg.mc == 0x0006 || msg.mc == 0x0018;
                engine.commands.pages_mut().apply_channel_feedback(port, channel, on, render);
                let event = if on {
                    InboundEvent::ChannelOn { port, channel }
                } else {
                    InboundEvent::ChannelOff { port, channel }
                };
                engine.events.notify(&event);
            }
            Vec::new()
        }

        0x0084..=0x0089 => {
            if let Some((_device, port, _system, channel)) = read_channel_payload(&msg.payload) {
                engine.events.notify(&InboundEvent::ChannelStatus { mc: msg.mc, port, channel });
            }
            Vec::new()
        }

        // `0x008a` shares `0x000a`'s payload and handling (§6.2).
        0x000a | 0x008a => {
            if msg.payload.len() >= 8 {
                if let Some((_device, port, _system, channel)) = read_channel_payload(&msg.payload[..8]) {
                    if let Some(&tag_byte) = msg.payload.get(8) {
                        if let Ok(tag) = TypeTag::from_byte(tag_byte) {
                            if let Ok(value) = Value::decode(tag, &msg.payload[9..]) {
                                engine.commands.pages_mut().apply_level_feedback(
                                    port,
                                    channel,
                                    value.as_u32() as i32,
                                    render,
                                );
                                engine.events.notify(&InboundEvent::Level { port, channel, value });
                            }
                        }
                    }
                }
            }
            Vec::new()
        }

        // `0x008b`/`0x008c` share `0x000b`/`0x000c`'s payload shape (§6.2);
        // kept split notify-vs-concatenate the same way across both pairs.
        0x000b | 0x000c | 0x008b | 0x008c => {
            let Some((_device, port, _system, text)) = read_message_string(&msg.payload) else {
                return Vec::new();
            };
            if msg.mc == 0x000b || msg.mc == 0x008b {
                engine.events.notify(&InboundEvent::StringMessage { port, text });
                return Vec::new();
            }
            let mut pending = engine.take_pending_command();
            let fed = crate::command::parser::feed(&mut pending, &text);
            engine.set_pending_command(pending);
            let Some(command) = fed else {
                return Vec::new();
            };
            engine.events.notify(&InboundEvent::CommandMessage { port, text: command.clone() });
            let sound = engine.config.sound.clone();
            let result = engine.commands.execute(&command, render, &sound);
            engine.push_pending_timeouts(result.timeouts);
            result
                .replies
                .into_iter()
                .map(|reply| {
                    let payload = string_reply_payload(engine.identity.device_id, port, engine.system_id(), &reply);
                    engine.build_outbound(port, 0x008c, payload)
                })
                .collect()
        }

        // `0x000e` (request level value) and `0x000f` (request output
        // channel status) look a button up by the *feedback* port/channel
        // pair, not the command-addressing pair `find_button` uses — a
        // button fed on one pair and addressed under a different one for
        // command strings must still answer here by its feedback binding.
        0x000e => {
            let Some((_device, port, _system, channel)) = read_channel_payload(&msg.payload) else {
                return Vec::new();
            };
            let value = engine.commands.pages().find_button_by_level(port, channel).map(|b| b.level_value).unwrap_or(0);
            let payload = channel_value_payload(engine.identity.device_id, port, engine.system_id(), channel, value);
            vec![engine.build_outbound(port, 0x000a, payload)]
        }

        0x000f => {
            let Some((_device, port, _system, channel)) = read_channel_payload(&msg.payload) else {
                return Vec::new();
            };
            let on = engine
                .commands
                .pages()
                .find_button_by_channel(port, channel)
                .map(|b| b.active_sr == 2)
                .unwrap_or(false);
            let mc = if on { 0x0086 } else { 0x0087 };
            let payload = channel_payload(engine.identity.device_id, port, engine.system_id(), channel);
            vec![engine.build_outbound(port, mc, payload)]
        }

        0x0010 | 0x0017 => {
            vec![engine.build_outbound(
                1,
                0x0090,
                capacity_payload(engine.identity.device_id, 1, engine.system_id(), crate::protocol::PORT_COUNT),
            )]
        }

        0x0011..=0x0015 => {
            let (mc, value) = match msg.mc {
                0x0011 => (0x0091, crate::protocol::OUTPUT_CHANNEL_COUNT),
                0x0012 => (0x0092, crate::protocol::LEVEL_COUNT),
                0x0013 => (0x0093, crate::protocol::STRING_SIZE),
                0x0014 => (0x0094, crate::protocol::COMMAND_SIZE),
                _ => (0x0095, crate::protocol::LEVEL_SUPPORT),
            };
            let payload = capacity_payload(engine.identity.device_id, 1, engine.system_id(), value);
            vec![engine.build_outbound(1, mc, payload)]
        }

        0x0016 => {
            vec![engine.build_outbound(1, 0x0096, value::write_tagged_string("OK"))]
        }

        0x0097 => engine.identification_sequence(),

        0x00a1 => {
            tracing::debug!("status request stored");
            Vec::new()
        }

        0x0204 => crate::filetransfer::handle(engine, msg),

        0x0501 => {
            let mut payload = Vec::with_capacity(2 + 4);
            payload.push(0x02);
            payload.push(4);
            payload.extend_from_slice(&engine.identity.ipv4);
            vec![engine.build_outbound(1, 0x0581, payload)]
        }

        0x0502 => {
            engine.watchdog.touch();
            match crate::protocol::heartbeat::parse(&msg.payload) {
                Ok(tick) => {
                    engine.ticks.notify(&tick);
                    engine.online.notify(&true);
                }
                Err(err) => tracing::warn!(%err, "malformed heartbeat payload"),
            }
            Vec::new()
        }

        other => {
            tracing::trace!(mc = other, "unhandled message code");
            Vec::new()
        }
    }
}

fn string_reply_payload(device: u16, port: u16, system: u16, text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + text.len());
    out.extend_from_slice(&device.to_be_bytes());
    out.extend_from_slice(&port.to_be_bytes());
    out.extend_from_slice(&system.to_be_bytes());
    out.push(0x01);
    out.extend_from_slice(&(text.len() as u16).to_be_bytes());
    out.extend_from_slice(text.as_bytes());
    out
}

fn channel_value_payload(device: u16, port: u16, system: u16, channel: u16, value: i32) -> Vec<u8> {
    let mut out = capacity_payload(device, port, system, channel);
    out.extend_from_slice(&Value::I32(value).encode());
    out
}
