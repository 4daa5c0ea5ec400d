//! File-transfer sub-protocol (§4.4), carried inside MC `0x0204`.
//!
//! A payload is `{ftype:u16, function:u16, info1:u16, info2:u16, u32[4],
//! variable_data}`. This module speaks both directions the operation table
//! names: the controller pushing a file to the panel (`ftype=4`, receive),
//! the controller pulling a file from the panel (`ftype=4`, send, driven by
//! the panel reading its own source and chunking it out), and directory
//! listing/delete (`ftype=0`).

use std::io::Write;

use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::observer::ObserverRegistry;
use crate::protocol::Engine;
use crate::wire::Message;

/// Per-transfer-unit cap (§4.4).
pub const CHUNK_CAP: usize = 2000;
const HEADER_LEN: usize = 2 + 2 + 2 + 2 + 16;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One entry in a directory listing reply (§6.5: "counted records").
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub is_dir: bool,
    pub size: u32,
    pub last_modified_epoch: u32,
    pub name: String,
}

/// Where a fully received file ends up, and where a requested file is read
/// back from. The core never touches a real filesystem path beyond a
/// private staging temp file; everything else is the embedder's call (§1
/// Non-goals: "no on-disk project model").
pub trait FileSink: Send {
    fn store(&self, name: &str, data: Vec<u8>);

    /// Read a file back for an outbound send (`ftype=4, function=0x0104`).
    /// Default: nothing is available to send.
    fn read(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }

    /// List the entries of `path` for a directory-listing request
    /// (`ftype=0, function=0x0100`). Default: empty.
    fn list(&self, _path: &str) -> Vec<DirEntry> {
        Vec::new()
    }

    /// Delete `path` (`ftype=0, function=0x0104`), reporting whether it
    /// existed. Default: never found.
    fn delete(&self, _path: &str) -> bool {
        false
    }

    /// Whether `path` exists, for `ftype=0, function=0x0105`. Default:
    /// never exists (the core has no on-disk project tree of its own).
    fn exists(&self, _path: &str) -> bool {
        false
    }
}

/// A [`FileSink`] that discards everything and has nothing to offer back,
/// for configurations that never expect file-transfer traffic.
pub struct NullFileSink;

impl FileSink for NullFileSink {
    fn store(&self, _name: &str, _data: Vec<u8>) {}
}

/// Progress ticks emitted while a file is received or sent (§4.4, "progress
/// observer callbacks (start/per-file/per-chunk quantized-percent/
/// per-file-end)").
#[derive(Debug, Clone, PartialEq)]
pub enum TransferProgress {
    Start { index: u32, total: u32 },
    /// Quantized to the nearest 10% (§8 scenario 6: "percent ticks
    /// 10,20,...,100").
    Percent(u8),
    End,
}

struct Header {
    ftype: u16,
    function: u16,
    #[allow(dead_code)]
    info1: u16,
    #[allow(dead_code)]
    info2: u16,
    extra: [u32; 4],
}

fn read_header(payload: &[u8]) -> Option<(Header, &[u8])> {
    if payload.len() < HEADER_LEN {
        return None;
    }
    let u16_at = |o: usize| u16::from_be_bytes([payload[o], payload[o + 1]]);
    let u32_at = |o: usize| u32::from_be_bytes([payload[o], payload[o + 1], payload[o + 2], payload[o + 3]]);
    let header = Header {
        ftype: u16_at(0),
        function: u16_at(2),
        info1: u16_at(4),
        info2: u16_at(6),
        extra: [u32_at(8), u32_at(12), u32_at(16), u32_at(20)],
    };
    Some((header, &payload[HEADER_LEN..]))
}

fn write_header(ftype: u16, function: u16) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    out[0..2].copy_from_slice(&ftype.to_be_bytes());
    out[2..4].copy_from_slice(&function.to_be_bytes());
    out
}

fn write_header_extra(ftype: u16, function: u16, extra: [u32; 4], tail: &[u8]) -> Vec<u8> {
    let mut out = write_header(ftype, function);
    out[8..12].copy_from_slice(&extra[0].to_be_bytes());
    out[12..16].copy_from_slice(&extra[1].to_be_bytes());
    out[16..20].copy_from_slice(&extra[2].to_be_bytes());
    out[20..24].copy_from_slice(&extra[3].to_be_bytes());
    out.extend_from_slice(tail);
    out
}

fn path_from(body: &[u8]) -> String {
    String::from_utf8_lossy(body).trim_end_matches('\0').to_string()
}

struct Incoming {
    name: String,
    total: usize,
    received: usize,
    last_decile: u8,
    file: NamedTempFile,
}

/// State for a single in-flight outbound file send, driven by the
/// controller's `0x0104`/`0x0106`/`0x0002` requests.
struct Outgoing {
    data: Vec<u8>,
    pos: usize,
}

/// State for the file-transfer sub-protocol: at most one inbound transfer
/// and one outbound transfer in flight at a time (the reference protocol
/// never interleaves transfers on one connection).
pub struct Receiver {
    current: Option<Incoming>,
    outgoing: Option<Outgoing>,
    sink: Box<dyn FileSink>,
    pub progress: ObserverRegistry<TransferProgress>,
}

impl Receiver {
    pub fn new(sink: Box<dyn FileSink>) -> Self {
        Receiver { current: None, outgoing: None, sink, progress: ObserverRegistry::new() }
    }

    fn begin(&mut self, name: String, total: usize) -> crate::error::Result<()> {
        let file = NamedTempFile::new().map_err(|e| crate::error::Error::FileTransfer {
            file: name.clone(),
            reason: e.to_string(),
        })?;
        self.progress.notify(&TransferProgress::Start { index: 1, total: 1 });
        self.current = Some(Incoming { name, total, received: 0, last_decile: 0, file });
        Ok(())
    }

    fn write_chunk(&mut self, data: &[u8]) -> crate::error::Result<()> {
        let Some(incoming) = self.current.as_mut() else {
            return Err(crate::error::Error::FileTransfer {
                file: String::new(),
                reason: "chunk received with no transfer in progress".to_string(),
            });
        };
        incoming.file.write_all(data).map_err(|e| crate::error::Error::FileTransfer {
            file: incoming.name.clone(),
            reason: e.to_string(),
        })?;
        incoming.received += data.len();
        if incoming.total > 0 {
            let percent = ((incoming.received * 100) / incoming.total).min(100);
            let decile = (percent / 10) as u8;
            if decile > incoming.last_decile {
                incoming.last_decile = decile;
                self.progress.notify(&TransferProgress::Percent(decile * 10));
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> crate::error::Result<()> {
        let Some(incoming) = self.current.take() else {
            return Ok(());
        };
        let raw = std::fs::read(incoming.file.path()).map_err(|e| crate::error::Error::FileTransfer {
            file: incoming.name.clone(),
            reason: e.to_string(),
        })?;
        let data = if raw.len() >= 2 && raw[..2] == GZIP_MAGIC {
            let mut decoder = GzDecoder::new(&raw[..]);
            let mut out = Vec::new();
            std::io::Read::read_to_end(&mut decoder, &mut out).map_err(|e| crate::error::Error::FileTransfer {
                file: incoming.name.clone(),
                reason: format!("gzip decompress failed: {e}"),
            })?;
            out
        } else {
            raw
        };
        self.sink.store(&incoming.name, data);
        self.progress.notify(&TransferProgress::End);
        Ok(())
    }

    /// Start sending `data` back to the controller, recording `pos = 0`.
    fn begin_send(&mut self, data: Vec<u8>) {
        self.progress.notify(&TransferProgress::Start { index: 1, total: 1 });
        self.outgoing = Some(Outgoing { data, pos: 0 });
    }

    /// Read the next chunk of an in-progress send, advancing `pos`. Returns
    /// `None` once `pos == total` (the send is exhausted and the caller
    /// should emit the end marker instead).
    fn next_chunk(&mut self) -> Option<Vec<u8>> {
        let outgoing = self.outgoing.as_mut()?;
        if outgoing.pos >= outgoing.data.len() {
            return None;
        }
        let end = (outgoing.pos + CHUNK_CAP).min(outgoing.data.len());
        let chunk = outgoing.data[outgoing.pos..end].to_vec();
        outgoing.pos = end;
        if !outgoing.data.is_empty() {
            let percent = ((outgoing.pos * 100) / outgoing.data.len()).min(100) as u8;
            self.progress.notify(&TransferProgress::Percent((percent / 10) * 10));
        }
        Some(chunk)
    }

    fn send_exhausted(&self) -> bool {
        match &self.outgoing {
            Some(o) => o.pos >= o.data.len(),
            None => true,
        }
    }

    fn end_send(&mut self) {
        self.outgoing = None;
        self.progress.notify(&TransferProgress::End);
    }
}

/// A directory-entry record (`ftype=0, function=0x0102`, reusing the same
/// function code the `ftype=4` file-announce uses since the two never
/// share a namespace). `info1` carries the total entry count (the
/// original's `level` field); the four reserved `u32`s carry
/// `is_dir`/`index`/`size`/`last_modified_epoch`.
fn encode_dir_entry(index: u32, total: u32, entry: &DirEntry) -> Vec<u8> {
    let mut out = write_header(0, 0x0102);
    out[4..6].copy_from_slice(&(total as u16).to_be_bytes());
    out[8..12].copy_from_slice(&(if entry.is_dir { 1u32 } else { 0 }).to_be_bytes());
    out[12..16].copy_from_slice(&index.to_be_bytes());
    out[16..20].copy_from_slice(&entry.size.to_be_bytes());
    out[20..24].copy_from_slice(&entry.last_modified_epoch.to_be_bytes());
    out.extend_from_slice(entry.name.as_bytes());
    out
}

/// Handle one `0x0204` frame, mutating the engine's [`Receiver`] and
/// returning the outbound frame(s) the dispatch table calls for.
pub fn handle(engine: &mut Engine, msg: &Message) -> Vec<Message> {
    let Some((header, body)) = read_header(&msg.payload) else {
        tracing::warn!("truncated file-transfer payload");
        return Vec::new();
    };

    match (header.ftype, header.function) {
        // --- inbound file receive (controller pushes a file to the panel) ---
        (4, 0x0102) => {
            let size = header.extra[0] as usize;
            let name = path_from(body);
            if let Err(err) = engine.filetransfer.begin(name, size) {
                tracing::warn!(%err, "failed to start file transfer");
                return Vec::new();
            }
            vec![engine.build_outbound(1, 0x0204, write_header(4, 0x0103))]
        }
        (4, 0x0103) | (4, 0x0003) if engine.filetransfer.current.is_some() => {
            if let Err(err) = engine.filetransfer.write_chunk(body) {
                tracing::warn!(%err, "failed to write file chunk");
                return Vec::new();
            }
            vec![engine.build_outbound(1, 0x0204, write_header(4, 0x0002))]
        }
        (4, 0x0004) => {
            if let Err(err) = engine.filetransfer.finish() {
                tracing::warn!(%err, "failed to finish file transfer");
                return Vec::new();
            }
            vec![engine.build_outbound(1, 0x0204, write_header(4, 0x0005))]
        }
        (4, 0x0100) => {
            // "More files follow" precedes the next file's own 0x0102
            // announce; nothing in the per-file state needs to change.
            tracing::debug!("more files follow in this transfer session");
            Vec::new()
        }

        // --- outbound file send (controller pulls a file from the panel) ---
        (4, 0x0104) => {
            let name = path_from(body);
            match engine.filetransfer.sink.read(&name) {
                Some(data) => {
                    let size = data.len() as u32;
                    engine.filetransfer.begin_send(data);
                    vec![engine.build_outbound(1, 0x0204, write_header_extra(4, 0x0102, [size, 0, 0, 0], name.as_bytes()))]
                }
                None => {
                    tracing::debug!(name, "requested file not available to send");
                    vec![engine.build_outbound(1, 0x0204, write_header_extra(4, 0x0102, [0, 0, 0, 0], name.as_bytes()))]
                }
            }
        }
        (4, 0x0106) | (4, 0x0002) => {
            // Controller is ready for the first chunk (0x0106) or asking for
            // the next one (0x0002); both pull the same way from `Outgoing`.
            match engine.filetransfer.next_chunk() {
                Some(chunk) => {
                    let mut payload = write_header(4, 0x0103);
                    payload.extend_from_slice(&chunk);
                    vec![engine.build_outbound(1, 0x0204, payload)]
                }
                None => {
                    let exhausted = engine.filetransfer.send_exhausted();
                    engine.filetransfer.end_send();
                    if exhausted {
                        vec![engine.build_outbound(1, 0x0204, write_header(4, 0x0003))]
                    } else {
                        Vec::new()
                    }
                }
            }
        }
        (4, 0x0005) => {
            // Controller acknowledges our end-of-send marker; nothing left
            // to clean up (end_send already ran when the send exhausted).
            Vec::new()
        }
        (4, 0x0007) => {
            // End of file-transfer session: drop any leftover state from
            // either direction rather than let it linger across sessions.
            engine.filetransfer.current = None;
            if engine.filetransfer.outgoing.take().is_some() {
                engine.filetransfer.progress.notify(&TransferProgress::End);
            }
            Vec::new()
        }

        // --- directory operations ---
        (0, 0x0100) => {
            let path = path_from(body);
            let entries = engine.filetransfer.sink.list(&path);
            let total = entries.len() as u32;
            let mut out = vec![engine.build_outbound(1, 0x0204, write_header_extra(0, 0x0101, [0, 0, 0, 0], path.as_bytes()))];
            for (i, entry) in entries.iter().enumerate() {
                out.push(engine.build_outbound(1, 0x0204, encode_dir_entry(i as u32 + 1, total, entry)));
            }
            out
        }
        (0, 0x0104) => {
            let path = path_from(body);
            let existed = engine.filetransfer.sink.delete(&path);
            if !existed {
                tracing::debug!(path, "delete requested for a file that does not exist");
            }
            vec![engine.build_outbound(1, 0x0204, write_header(0, 0x0002))]
        }
        (0, 0x0105) => {
            let path = path_from(body);
            let function = if engine.filetransfer.sink.exists(&path) { 0x0002 } else { 0x0001 };
            vec![engine.build_outbound(1, 0x0204, write_header(0, function))]
        }

        (ftype, function) => {
            tracing::trace!(ftype, function, "unhandled file-transfer sub-message");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        stored: Mutex<Vec<(String, Vec<u8>)>>,
        files: Mutex<std::collections::HashMap<String, Vec<u8>>>,
    }

    impl FileSink for RecordingSink {
        fn store(&self, name: &str, data: Vec<u8>) {
            self.stored.lock().unwrap().push((name.to_string(), data));
        }
        fn read(&self, name: &str) -> Option<Vec<u8>> {
            self.files.lock().unwrap().get(name).cloned()
        }
        fn delete(&self, name: &str) -> bool {
            self.files.lock().unwrap().remove(name).is_some()
        }
        fn exists(&self, name: &str) -> bool {
            self.files.lock().unwrap().contains_key(name)
        }
        fn list(&self, _path: &str) -> Vec<DirEntry> {
            vec![DirEntry { is_dir: false, size: 42, last_modified_epoch: 1_700_000_000, name: "a.txt".to_string() }]
        }
    }

    fn announce_payload(name: &str, size: u32) -> Vec<u8> {
        let mut p = write_header(4, 0x0102);
        p[8..12].copy_from_slice(&size.to_be_bytes());
        p.extend_from_slice(name.as_bytes());
        p
    }

    fn chunk_payload(data: &[u8]) -> Vec<u8> {
        let mut p = write_header(4, 0x0103);
        p.extend_from_slice(data);
        p
    }

    fn engine_with_sink(sink: Box<dyn FileSink>) -> Engine {
        use crate::config::PanelConfig;
        use crate::model::manager::NullProjectSource;
        use crate::protocol::identity::PanelIdentity;

        Engine::new(
            PanelConfig::new("127.0.0.1", 1319),
            PanelIdentity::new(0x0149, 1, 4, "Test Panel"),
            Box::new(NullProjectSource),
        )
        .with_file_sink(sink)
    }

    #[test]
    fn receives_a_whole_file_and_stores_it() {
        let sink = std::sync::Arc::new(RecordingSink::default());
        let mut e = engine_with_sink(Box::new(ArcSink(sink.clone())));

        let data = vec![0x41u8; 5000];
        let announce = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, announce_payload("test.xml", 5000));
        let acks = handle(&mut e, &announce);
        assert_eq!(acks[0].mc, 0x0204);

        for chunk in data.chunks(500) {
            let msg = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, chunk_payload(chunk));
            handle(&mut e, &msg);
        }

        let end = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, write_header(4, 0x0004));
        handle(&mut e, &end);

        let stored = sink.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "test.xml");
        assert_eq!(stored[0].1.len(), 5000);
    }

    #[test]
    fn send_flow_drives_chunks_until_exhausted() {
        let sink = std::sync::Arc::new(RecordingSink::default());
        sink.files.lock().unwrap().insert("report.xml".to_string(), vec![0x5au8; 3000]);
        let mut e = engine_with_sink(Box::new(ArcSink(sink.clone())));

        let mut request = write_header(4, 0x0104);
        request.extend_from_slice(b"report.xml");
        let announce_reply = handle(&mut e, &Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, request));
        assert_eq!(announce_reply.len(), 1);
        assert_eq!(&announce_reply[0].payload[2..4], &0x0102u16.to_be_bytes());

        let ready = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, write_header(4, 0x0106));
        let first = handle(&mut e, &ready);
        assert_eq!(&first[0].payload[2..4], &0x0103u16.to_be_bytes());
        assert_eq!(first[0].payload.len() - HEADER_LEN, CHUNK_CAP);

        let next = Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, write_header(4, 0x0002));
        let second = handle(&mut e, &next);
        assert_eq!(&second[0].payload[2..4], &0x0103u16.to_be_bytes());
        assert_eq!(second[0].payload.len() - HEADER_LEN, 1000);

        let finish = handle(&mut e, &Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, write_header(4, 0x0002)));
        assert_eq!(&finish[0].payload[2..4], &0x0003u16.to_be_bytes());
        assert_eq!(finish[0].payload.len(), HEADER_LEN);
    }

    #[test]
    fn delete_reports_whether_the_file_existed() {
        let sink = std::sync::Arc::new(RecordingSink::default());
        sink.files.lock().unwrap().insert("old.xml".to_string(), vec![1, 2, 3]);
        let mut e = engine_with_sink(Box::new(ArcSink(sink.clone())));

        let mut p = write_header(0, 0x0104);
        p.extend_from_slice(b"old.xml");
        let reply = handle(&mut e, &Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, p));
        assert_eq!(&reply[0].payload[2..4], &0x0002u16.to_be_bytes());
        assert!(!sink.files.lock().unwrap().contains_key("old.xml"));
    }

    #[test]
    fn directory_listing_reports_one_record_per_entry() {
        let sink = std::sync::Arc::new(RecordingSink::default());
        let mut e = engine_with_sink(Box::new(ArcSink(sink.clone())));

        let mut p = write_header(0, 0x0100);
        p.extend_from_slice(b"AMXPanel/");
        let reply = handle(&mut e, &Message::new(0x01, 1, 1, 1, 0, 1, 0x0204, p));
        assert_eq!(reply.len(), 2); // listing-start + one entry
        assert_eq!(&reply[0].payload[2..4], &0x0101u16.to_be_bytes());
        assert_eq!(&reply[1].payload[2..4], &0x0102u16.to_be_bytes());
    }

    struct ArcSink(std::sync::Arc<RecordingSink>);
    impl FileSink for ArcSink {
        fn store(&self, name: &str, data: Vec<u8>) {
            self.0.store(name, data);
        }
        fn read(&self, name: &str) -> Option<Vec<u8>> {
            self.0.read(name)
        }
        fn delete(&self, name: &str) -> bool {
            self.0.delete(name)
        }
        fn exists(&self, name: &str) -> bool {
            self.0.exists(name)
        }
        fn list(&self, path: &str) -> Vec<DirEntry> {
            self.0.list(path)
        }
    }
}
