//! Thread orchestration (§5): the reader, writer, command-loop, and
//! popup-timeout threads, wired around the coarsely locked [`Engine`].
//! The rendering-caller thread (§5 item 5) is external — the embedder
//! drives it and is not modeled here.
//!
//! A fifth thread, the reconnect supervisor spawned by [`PanelSession::start`],
//! owns the session's recovery from any recoverable I/O error (§4.2): it
//! reconnects through the caller-supplied connector, backing off per
//! [`Backoff`], and respawns the reader/writer/command-loop trio for each
//! new connection generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::config::PanelConfig;
use crate::error::Result;
use crate::model::ProjectSource;
use crate::protocol::identity::PanelIdentity;
use crate::protocol::{Engine, EngineState};
use crate::render::RenderSurface;
use crate::transport::backoff::{Backoff, ReconnectReason};
use crate::transport::Transport;
use crate::wire::Message;

/// A running panel session: owns the worker threads and the shared,
/// coarsely locked engine (§5 "single coarse lock ... never held across
/// I/O").
pub struct PanelSession {
    engine: Arc<Mutex<Engine>>,
    render: Arc<dyn RenderSurface>,
    config: PanelConfig,
    outbound_tx: Sender<Message>,
    outbound_rx: Receiver<Message>,
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl PanelSession {
    pub fn new(
        config: PanelConfig,
        identity: PanelIdentity,
        project: Box<dyn ProjectSource>,
        render: Arc<dyn RenderSurface>,
    ) -> Self {
        let capacity = config.outbound_queue_capacity;
        let (outbound_tx, outbound_rx) = crossbeam_channel::bounded(capacity);
        PanelSession {
            engine: Arc::new(Mutex::new(Engine::new(config.clone(), identity, project))),
            render,
            config,
            outbound_tx,
            outbound_rx,
            stop: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        }
    }

    pub fn engine(&self) -> &Arc<Mutex<Engine>> {
        &self.engine
    }

    /// Start the session: `connect` is called once to establish the first
    /// connection and again every time the reader or writer observes a
    /// recoverable I/O error, with the exponential-capped backoff of §4.2
    /// between attempts. A failed `connect` call counts as a failed attempt
    /// and is retried the same way, not treated as fatal.
    pub fn start<F>(&mut self, connect: F)
    where
        F: Fn() -> Result<Box<dyn Transport>> + Send + Sync + 'static,
    {
        self.stop.store(false, Ordering::SeqCst);

        let engine = self.engine.clone();
        let render = self.render.clone();
        let outbound_tx = self.outbound_tx.clone();
        let outbound_rx = self.outbound_rx.clone();
        let stop = self.stop.clone();
        let config = self.config.clone();

        self.threads.push(std::thread::spawn(move || {
            let mut backoff = Backoff::new(&config);
            let mut first_attempt = true;

            while !stop.load(Ordering::SeqCst) {
                let transport = match connect() {
                    Ok(t) => t,
                    Err(err) => {
                        tracing::warn!(%err, "reconnect attempt failed");
                        sleep_respecting_stop(backoff.next_delay(), &stop);
                        continue;
                    }
                };

                if first_attempt {
                    first_attempt = false;
                } else {
                    backoff.reset(&config, ReconnectReason::SameAddress);
                }
                engine.lock().unwrap().on_connected();

                let transport = Arc::new(Mutex::new(transport));
                let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded::<Message>();
                let gen_stop = Arc::new(AtomicBool::new(false));

                let reader = spawn_reader(engine.clone(), transport.clone(), inbound_tx, stop.clone(), gen_stop.clone());
                let writer = spawn_writer(transport, outbound_rx.clone(), stop.clone(), gen_stop.clone());
                let command_loop =
                    spawn_command_loop(engine.clone(), render.clone(), outbound_tx.clone(), stop.clone(), gen_stop.clone(), inbound_rx);

                let _ = reader.join();
                gen_stop.store(true, Ordering::SeqCst);
                let _ = writer.join();
                let _ = command_loop.join();

                if stop.load(Ordering::SeqCst) {
                    break;
                }
                let delay = backoff.next_delay();
                tracing::info!(?delay, "reconnecting after disconnect");
                sleep_respecting_stop(delay, &stop);
            }
        }));
    }

    /// Enqueue an already-built outbound frame (used by the embedder's
    /// rendering-caller thread or direct API calls like `push_button`).
    pub fn send(&self, msg: Message) -> bool {
        self.outbound_tx.send(msg).is_ok()
    }

    pub fn state(&self) -> EngineState {
        self.engine.lock().unwrap().state()
    }

    /// Stop all worker threads, including the reconnect supervisor, and
    /// wait for them to exit (§5 "teardown blocks until all workers exit").
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Sleep `delay` in short slices so a shutdown request is noticed promptly
/// instead of only after the full backoff delay elapses.
fn sleep_respecting_stop(delay: Duration, stop: &AtomicBool) {
    let poll = Duration::from_millis(100);
    let mut remaining = delay;
    while !remaining.is_zero() {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let step = remaining.min(poll);
        std::thread::sleep(step);
        remaining -= step;
    }
}

/// One connection generation's reader: decodes frames until a framing or
/// transport error ends this generation (`gen_stop`), or the whole session
/// is torn down (`stop`). Never retries the connection itself — that's the
/// supervisor's job.
fn spawn_reader(
    engine: Arc<Mutex<Engine>>,
    transport: Arc<Mutex<Box<dyn Transport>>>,
    inbound_tx: Sender<Message>,
    stop: Arc<AtomicBool>,
    gen_stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::SeqCst) && !gen_stop.load(Ordering::SeqCst) {
            let decoded = {
                let mut reader = TransportReader(&transport);
                Message::decode(&mut reader)
            };
            match decoded {
                Ok(msg) => {
                    if inbound_tx.send(msg).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "network reader lost the connection");
                    engine.lock().unwrap().on_disconnected();
                    gen_stop.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }
    })
}

/// One connection generation's writer. Polls `outbound_rx` with a timeout
/// rather than blocking on `recv` forever, since the channel outlives every
/// individual connection generation and must not be torn down between
/// reconnects.
fn spawn_writer(
    transport: Arc<Mutex<Box<dyn Transport>>>,
    outbound_rx: Receiver<Message>,
    stop: Arc<AtomicBool>,
    gen_stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        if stop.load(Ordering::SeqCst) || gen_stop.load(Ordering::SeqCst) {
            break;
        }
        match outbound_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(msg) => {
                let bytes = msg.encode();
                if let Err(err) = transport.lock().unwrap().write_all(&bytes) {
                    tracing::warn!(%err, "network writer lost the connection");
                    gen_stop.store(true, Ordering::SeqCst);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    })
}

fn spawn_command_loop(
    engine: Arc<Mutex<Engine>>,
    render: Arc<dyn RenderSurface>,
    outbound_tx: Sender<Message>,
    stop: Arc<AtomicBool>,
    gen_stop: Arc<AtomicBool>,
    inbound_rx: Receiver<Message>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while let Ok(msg) = inbound_rx.recv() {
            if stop.load(Ordering::SeqCst) || gen_stop.load(Ordering::SeqCst) {
                break;
            }
            let (outbound, timeouts) = {
                let mut e = engine.lock().unwrap();
                let outbound = e.handle_inbound(&msg, render.as_ref());
                let timeouts = e.take_pending_timeouts();
                (outbound, timeouts)
            };
            for reply in outbound {
                if outbound_tx.send(reply).is_err() {
                    return;
                }
            }
            for (popup_id, deciseconds, epoch) in timeouts {
                spawn_popup_timeout(engine.clone(), render.clone(), stop.clone(), popup_id, deciseconds, epoch);
            }
        }
    })
}

impl Drop for PanelSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One popup auto-hide timeout (§5 item 4, §4.6 P7): sleeps for the
/// configured duration, then fires only if the popup's epoch has not
/// changed (no manual hide/re-show happened meanwhile).
fn spawn_popup_timeout(
    engine: Arc<Mutex<Engine>>,
    render: Arc<dyn RenderSurface>,
    stop: Arc<AtomicBool>,
    popup_id: i32,
    deciseconds: u32,
    epoch: u64,
) {
    std::thread::spawn(move || {
        let mut remaining = Duration::from_millis(deciseconds as u64 * 100);
        let poll = Duration::from_millis(100);
        while !remaining.is_zero() {
            if stop.load(Ordering::SeqCst) {
                return;
            }
            let step = remaining.min(poll);
            std::thread::sleep(step);
            remaining -= step;
        }
        let mut e = engine.lock().unwrap();
        e.commands.pages_mut().fire_timeout(popup_id, epoch, render.as_ref());
    });
}

/// Adapts the shared, mutex-protected transport to `std::io::Read` for
/// `Message::decode`, without holding the lock across the whole read loop
/// (only across each individual `read_exact`).
struct TransportReader<'a>(&'a Arc<Mutex<Box<dyn Transport>>>);

impl std::io::Read for TransportReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap()
            .read_exact(buf)
            .map(|()| buf.len())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}
