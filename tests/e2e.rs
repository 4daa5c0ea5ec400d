//! End-to-end scenarios against the public API, covering the six traces
//! with literal expected outputs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use vantage_panel::config::PanelConfig;
use vantage_panel::model::animation::AnimSpec;
use vantage_panel::model::geometry::Rect;
use vantage_panel::model::manager::{ProjectSource, Ref};
use vantage_panel::model::page::Page;
use vantage_panel::model::popup::Popup;
use vantage_panel::protocol::identity::PanelIdentity;
use vantage_panel::protocol::{Engine, EngineState};
use vantage_panel::render::RenderSurface;
use vantage_panel::wire::Message;

#[derive(Default)]
struct RecordingSurface {
    calls: Mutex<Vec<String>>,
}

impl RecordingSurface {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RenderSurface for RecordingSurface {
    fn display_page(&self, handle: u32, width: i32, height: i32) {
        self.calls.lock().unwrap().push(format!("display_page({handle},{width},{height})"));
    }
    fn set_subpage(&self, handle: u32, parent: u32, left: i32, top: i32, width: i32, height: i32, _animation: AnimSpec) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_subpage({handle},{parent},{left},{top},{width},{height})"));
    }
    fn drop_page(&self, handle: u32) {
        self.calls.lock().unwrap().push(format!("drop_page({handle})"));
    }
    fn drop_subpage(&self, handle: u32, parent: u32) {
        self.calls.lock().unwrap().push(format!("drop_subpage({handle},{parent})"));
    }
    fn display_button(
        &self,
        handle: u32,
        parent: u32,
        _bitmap: Option<&str>,
        width: i32,
        height: i32,
        left: i32,
        top: i32,
        _passthrough: bool,
    ) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("display_button({handle},{parent},{width},{height},{left},{top})"));
    }
    fn set_background(&self, handle: u32, _bitmap: Option<&str>, width: i32, height: i32, color: &str, opacity: u8) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_background({handle},{width},{height},{color},{opacity})"));
    }
    fn play_video(&self, handle: u32, parent: u32, _rect: Rect, url: &str, _user: &str, _password: &str) {
        self.calls.lock().unwrap().push(format!("play_video({handle},{parent},{url})"));
    }
    fn play_sound(&self, file: &str) {
        self.calls.lock().unwrap().push(format!("play_sound({file})"));
    }
    fn stop_sound(&self) {
        self.calls.lock().unwrap().push("stop_sound()".to_string());
    }
    fn mute_sound(&self, muted: bool) {
        self.calls.lock().unwrap().push(format!("mute_sound({muted})"));
    }
    fn set_volume(&self, percent: u8) {
        self.calls.lock().unwrap().push(format!("set_volume({percent})"));
    }
}

/// A project fixture with one page ("home") and two popups in the same
/// group ("A", "B"), for the popup-group-replace scenario.
struct FixtureSource;

impl ProjectSource for FixtureSource {
    fn load_page(&self, id: i32) -> Option<Page> {
        self.load_page_by_name(&format!("page{id}"))
    }
    fn load_page_by_name(&self, name: &str) -> Option<Page> {
        if name != "home" {
            return None;
        }
        Some(Page::new(1, name, 1920, 1080))
    }
    fn load_popup(&self, id: i32) -> Option<Popup> {
        self.load_popup_by_name(&format!("popup{id}"))
    }
    fn load_popup_by_name(&self, name: &str) -> Option<Popup> {
        let (id, group) = match name {
            "A" => (101, "nav"),
            "B" => (102, "nav"),
            _ => return None,
        };
        let mut p = Popup::new(id, name);
        p.group = Some(group.to_string());
        Some(p)
    }
}

fn identity() -> PanelIdentity {
    let mut id = PanelIdentity::new(0x0149, 1, 4, "Test Panel");
    id.set_serial("ABC123XYZ00000 ");
    id
}

fn engine_with_fixture() -> Engine {
    Engine::new(PanelConfig::new("127.0.0.1", 1319), identity(), Box::new(FixtureSource))
}

/// Scenario 1: handshake.
#[test]
fn handshake_produces_the_documented_frame_sequence_and_reaches_ready() {
    let mut e = engine_with_fixture();
    e.on_connected();

    let render = RecordingSurface::default();
    let inbound = Message::new(0x01, 1, 1, 1, 0, 1, 0x0097, vec![0u8; 90]);
    let out = e.handle_inbound(&inbound, &render);

    let mcs: Vec<u16> = out.iter().map(|m| m.mc).collect();
    assert_eq!(mcs, vec![0x0097, 0x0097, 0x0090, 0x0091, 0x0092, 0x0093, 0x0094, 0x0098]);

    let capacity_value = |payload: &[u8]| u16::from_be_bytes([payload[6], payload[7]]);
    assert_eq!(capacity_value(&out[2].payload), 0x0015);
    assert_eq!(capacity_value(&out[3].payload), 0x0f75);
    assert_eq!(capacity_value(&out[4].payload), 0x000d);
    assert_eq!(capacity_value(&out[5].payload), 0x00c7);
    assert_eq!(capacity_value(&out[6].payload), 0x00c7);

    assert_eq!(e.state(), EngineState::Ready);
}

/// Scenario 2: ping reply.
#[test]
fn ping_reply_carries_the_panels_ipv4_address() {
    let mut identity = identity();
    identity.ipv4 = [192, 168, 1, 42];
    let mut e = Engine::new(PanelConfig::new("127.0.0.1", 1319), identity, Box::new(FixtureSource));

    let render = RecordingSurface::default();
    let inbound = Message::new(0x01, 1, 1, 1, 0, 1, 0x0501, vec![]);
    let out = e.handle_inbound(&inbound, &render);

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].mc, 0x0581);
    assert_eq!(&out[0].payload[2..6], &[192, 168, 1, 42]);
}

/// Scenario 3: heartbeat.
#[test]
fn heartbeat_notifies_the_tick_observer_with_no_outbound_reply() {
    let mut e = engine_with_fixture();
    let seen = std::sync::Arc::new(AtomicUsize::new(0));
    let seen2 = seen.clone();
    e.ticks.register(move |tick| {
        assert_eq!(tick.month, 3);
        assert_eq!(tick.day, 15);
        assert_eq!(tick.year, 2024);
        assert_eq!(tick.hour, 14);
        assert_eq!(tick.minute, 30);
        assert_eq!(tick.second, 45);
        assert_eq!(tick.external_temperature, 0x00c8);
        seen2.fetch_add(1, Ordering::SeqCst);
    });

    let payload = vec![
        10, 1, // heartbeat interval, LED
        3, 15, // month, day
        0x07, 0xe8, // year
        14, 30, 45, // hour, minute, second
        4, // weekday
        0x00, 0xc8, // external temperature
    ];
    let render = RecordingSurface::default();
    let inbound = Message::new(0x01, 1, 1, 1, 0, 1, 0x0502, payload);
    let out = e.handle_inbound(&inbound, &render);

    assert!(out.is_empty());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

/// Scenario 4: channel push.
#[test]
fn push_button_emits_a_channel_on_frame_with_an_increasing_counter() {
    let mut e = engine_with_fixture();
    let first = e.push_button(1, 42);
    let second = e.push_button(1, 43);

    assert_eq!(first.mc, 0x0084);
    assert_eq!(first.dev_dst, e.identity.device_id);
    assert_eq!(first.port_dst, 1);
    assert!(second.counter > first.counter);
}

/// Scenario 5: popup group replace.
#[test]
fn showing_a_popup_in_the_same_group_hides_the_previous_one_in_order() {
    let mut e = engine_with_fixture();
    let render = RecordingSurface::default();
    let sound = e.config.sound.clone();

    e.commands.pages_mut().set_page(Ref::from("home"), false, &render);
    e.commands.execute("@PPN-A", &render, &sound);
    assert_eq!(e.commands.pages().popup(101).unwrap().z_order, 1);

    e.commands.execute("@PPN-B", &render, &sound);

    let a = e.commands.pages().popup(101).unwrap();
    let b = e.commands.pages().popup(102).unwrap();
    assert!(!a.visible);
    assert_eq!(a.z_order, vantage_panel::model::popup::HIDDEN_Z);
    assert!(b.visible);
    assert_eq!(b.z_order, 2);

    let calls = render.calls();
    let hide_idx = calls.iter().position(|c| c.contains("drop_subpage(101")).expect("A hidden");
    let show_idx = calls.iter().position(|c| c.contains("set_subpage(102")).expect("B shown");
    assert!(hide_idx < show_idx, "A must be hidden before B is shown: {calls:?}");
}

/// Scenario 6: file upload.
#[test]
fn a_whole_file_arrives_across_chunks_and_is_stored_with_progress_ticks() {
    use std::sync::Arc;
    use vantage_panel::filetransfer::{FileSink, TransferProgress};

    struct RecordingSink {
        stored: Mutex<Vec<(String, Vec<u8>)>>,
    }
    impl FileSink for RecordingSink {
        fn store(&self, name: &str, data: Vec<u8>) {
            self.stored.lock().unwrap().push((name.to_string(), data));
        }
    }

    let sink = Arc::new(RecordingSink { stored: Mutex::new(Vec::new()) });
    struct Forwarding(Arc<RecordingSink>);
    impl FileSink for Forwarding {
        fn store(&self, name: &str, data: Vec<u8>) {
            self.0.store(name, data);
        }
    }
    let mut e = engine_with_fixture().with_file_sink(Box::new(Forwarding(sink.clone())));

    let progress = Arc::new(Mutex::new(Vec::new()));
    let progress2 = progress.clone();
    e.filetransfer.progress.register(move |p: &TransferProgress| {
        progress2.lock().unwrap().push(p.clone());
    });

    fn header(ftype: u16, function: u16) -> Vec<u8> {
        let mut out = vec![0u8; 24];
        out[0..2].copy_from_slice(&ftype.to_be_bytes());
        out[2..4].copy_from_slice(&function.to_be_bytes());
        out
    }

    let mut announce = header(4, 0x0102);
    announce[8..12].copy_from_slice(&5000u32.to_be_bytes());
    announce.extend_from_slice(b"test.xml");
    let msg = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, announce);
    let render = RecordingSurface::default();
    let ack = e.handle_inbound(&msg, &render);
    assert_eq!(ack[0].mc, 0x0204);
    assert_eq!(&ack[0].payload[2..4], &0x0103u16.to_be_bytes());

    let data = vec![0x41u8; 5000];
    for chunk in data.chunks(500) {
        let mut p = header(4, 0x0103);
        p.extend_from_slice(chunk);
        let msg = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, p);
        let ack = e.handle_inbound(&msg, &render);
        assert_eq!(&ack[0].payload[2..4], &0x0002u16.to_be_bytes());
    }

    let end = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, header(4, 0x0004));
    let ack = e.handle_inbound(&end, &render);
    assert_eq!(&ack[0].payload[2..4], &0x0005u16.to_be_bytes());

    let stored = sink.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, "test.xml");
    assert_eq!(stored[0].1.len(), 5000);

    let ticks = progress.lock().unwrap();
    assert_eq!(ticks[0], TransferProgress::Start { index: 1, total: 1 });
    let percents: Vec<u8> = ticks
        .iter()
        .filter_map(|p| match p {
            TransferProgress::Percent(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    assert_eq!(*ticks.last().unwrap(), TransferProgress::End);
}
