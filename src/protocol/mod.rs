//! The ICSP protocol engine (spec §4): the three-state handshake, inbound
//! message dispatch, and the outbound command API. Pure state + logic; all
//! I/O lives in [`crate::transport`] and [`crate::session`].

pub mod dispatch;
pub mod heartbeat;
pub mod identity;
pub mod outbound;

use crate::command;
use crate::config::PanelConfig;
use crate::model::ProjectSource;
use crate::observer::{BatteryState, NetworkState, ObserverRegistry, TickEvent};
use crate::wire::{Message, Value};

pub use identity::{DeviceObject, PanelIdentity};

/// Application-level events the inbound dispatch table forwards to the
/// embedder alongside (or instead of) any model mutation (§4.3 "forward to
/// command callback" / "forwarded").
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ChannelOn { port: u16, channel: u16 },
    ChannelOff { port: u16, channel: u16 },
    ChannelStatus { mc: u16, port: u16, channel: u16 },
    Level { port: u16, channel: u16, value: Value },
    StringMessage { port: u16, text: String },
    CommandMessage { port: u16, text: String },
}

/// Capacity constants reported during identification (§4.3, "capacity
/// replies `0x0090..0x0094`"). Values match the reference panel's reported
/// defaults (`tamxnet.cpp`); a deployment with different limits would need
/// to make these configurable, but the spec does not call for that.
pub const PORT_COUNT: u16 = 0x0015;
pub const OUTPUT_CHANNEL_COUNT: u16 = 0x0f75;
pub const LEVEL_COUNT: u16 = 0x000d;
pub const STRING_SIZE: u16 = 0x00c7;
pub const COMMAND_SIZE: u16 = 0x00c7;
pub const LEVEL_SUPPORT: u16 = 0x00c7;

/// Three-state machine (§4.3): `Offline --connect ok--> Identifying
/// --device info exchange complete--> Ready`, reverting to `Offline` on any
/// I/O or framing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Offline,
    Identifying,
    Ready,
}

/// The protocol engine: handshake state, the send counter, and the
/// command-string concatenation buffer (§4.3 "P9").
pub struct Engine {
    pub config: PanelConfig,
    pub identity: PanelIdentity,
    state: EngineState,
    counter: u16,
    /// Mirrored from the most recently received frame's `system` field and
    /// echoed back on every outbound message (reference behavior:
    /// "receive: system, send: system").
    system: u16,
    pending_command: String,
    /// Popup auto-hide timeouts produced by the last dispatched command
    /// string, awaiting collection by the session's scheduler.
    pending_timeouts: Vec<command::Timeout>,
    pub online: ObserverRegistry<bool>,
    pub ticks: ObserverRegistry<TickEvent>,
    pub events: ObserverRegistry<InboundEvent>,
    pub battery: ObserverRegistry<BatteryState>,
    pub network: ObserverRegistry<NetworkState>,
    pub watchdog: heartbeat::Watchdog,
    pub commands: command::Interpreter,
    pub filetransfer: crate::filetransfer::Receiver,
}

impl Engine {
    pub fn new(config: PanelConfig, mut identity: PanelIdentity, project: Box<dyn ProjectSource>) -> Self {
        let generation = config.generation;
        if identity.uuid.is_empty() {
            identity.uuid = config.uuid.clone();
        }
        Engine {
            config,
            identity,
            state: EngineState::Offline,
            counter: 0,
            system: 1,
            pending_command: String::new(),
            pending_timeouts: Vec::new(),
            online: ObserverRegistry::new(),
            ticks: ObserverRegistry::new(),
            events: ObserverRegistry::new(),
            battery: ObserverRegistry::new(),
            network: ObserverRegistry::new(),
            watchdog: heartbeat::Watchdog::new(),
            commands: command::Interpreter::new(generation, project),
            filetransfer: crate::filetransfer::Receiver::new(Box::new(crate::filetransfer::NullFileSink)),
        }
    }

    /// Builder-style inbound file-transfer sink (default: discard).
    pub fn with_file_sink(mut self, sink: Box<dyn crate::filetransfer::FileSink>) -> Self {
        self.filetransfer = crate::filetransfer::Receiver::new(sink);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The `system` id mirrored from the most recently received frame.
    pub fn system_id(&self) -> u16 {
        self.system
    }

    /// Called once the transport connects; the handshake proper only
    /// completes once the controller's `0x0097` arrives (§4.3).
    pub fn on_connected(&mut self) {
        self.state = EngineState::Identifying;
        self.counter = 0;
        self.network.notify(&NetworkState { level: 6 });
    }

    /// Report a battery reading to observers (§6.7 `on_battery`). The
    /// engine has no source of its own; the embedder feeds readings in as
    /// it learns them.
    pub fn on_battery(&self, state: BatteryState) {
        self.battery.notify(&state);
    }

    /// Called on any transport error or framing error (§4.3, §7): the
    /// engine reverts to `Offline` and publishes the state to observers.
    pub fn on_disconnected(&mut self) {
        let was_ready = self.state == EngineState::Ready;
        self.state = EngineState::Offline;
        self.pending_command.clear();
        if was_ready {
            self.online.notify(&false);
        }
        self.network.notify(&NetworkState { level: 0 });
    }

    /// Handle one decoded inbound frame, returning zero or more outbound
    /// frames to send in order. Assigns each outbound frame's send counter
    /// at construction time, so callers just need to encode and write them
    /// in the returned order (§5 "Send counter is incremented in send
    /// order").
    pub fn handle_inbound(&mut self, msg: &Message, render: &dyn crate::render::RenderSurface) -> Vec<Message> {
        self.system = msg.system;
        dispatch::handle(self, msg, render)
    }

    /// Build and counter-stamp one outbound frame addressed to the
    /// controller. Send convention (from `tamxnet.h`'s `ANET_COMMAND`):
    /// `device1=0, port1=1` on send, `device2`/`port2` carry the panel's own
    /// device id and the port this message concerns.
    pub fn build_outbound(&mut self, port: u16, mc: u16, payload: Vec<u8>) -> Message {
        let mut msg = Message::new(0, 0, 1, self.system, self.identity.device_id, port, mc, payload);
        self.counter = self.counter.wrapping_add(1);
        msg.counter = self.counter;
        msg
    }

    /// The identification sequence (§4.3): own device info for each device
    /// record, the five capacity replies, then a port-count request,
    /// transitioning to `Ready`.
    pub fn identification_sequence(&mut self) -> Vec<Message> {
        let panel_info = self.identity.encode(DeviceObject::Panel);
        let kernel_info = self.identity.kernel_record().encode(DeviceObject::Kernel);
        let device = self.identity.device_id;

        let out = vec![
            self.build_outbound(1, 0x0097, panel_info),
            self.build_outbound(1, 0x0097, kernel_info),
            self.build_outbound(1, 0x0090, capacity_payload(device, 1, self.system, PORT_COUNT)),
            self.build_outbound(
                1,
                0x0091,
                capacity_payload(device, 1, self.system, OUTPUT_CHANNEL_COUNT),
            ),
            self.build_outbound(1, 0x0092, capacity_payload(device, 1, self.system, LEVEL_COUNT)),
            self.build_outbound(1, 0x0093, capacity_payload(device, 1, self.system, STRING_SIZE)),
            self.build_outbound(1, 0x0094, capacity_payload(device, 1, self.system, COMMAND_SIZE)),
            self.build_outbound(1, 0x0098, Vec::new()),
        ];
        self.state = EngineState::Ready;
        self.online.notify(&true);
        out
    }

    pub(crate) fn take_pending_command(&mut self) -> String {
        std::mem::take(&mut self.pending_command)
    }

    pub(crate) fn set_pending_command(&mut self, s: String) {
        self.pending_command = s;
    }

    pub(crate) fn push_pending_timeouts(&mut self, timeouts: Vec<command::Timeout>) {
        self.pending_timeouts.extend(timeouts);
    }

    /// Drain the popup auto-hide timeouts produced since the last call.
    /// The session's scheduler calls this after every [`Self::handle_inbound`]
    /// and spawns one timeout task per entry.
    pub fn take_pending_timeouts(&mut self) -> Vec<command::Timeout> {
        std::mem::take(&mut self.pending_timeouts)
    }
}

/// Shared payload shape for the five capacity replies: `{device, port,
/// system, value}`, all `u16` big-endian.
pub(crate) fn capacity_payload(device: u16, port: u16, system: u16, value: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&device.to_be_bytes());
    out.extend_from_slice(&port.to_be_bytes());
    out.extend_from_slice(&system.to_be_bytes());
    out.extend_from_slice(&value.to_be_bytes());
    out
}
