//! Session transport (spec §4.2): pure byte conveyance over TCP, optionally
//! wrapped in TLS. Never parses protocol.

pub mod backoff;
pub mod tls;

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PanelConfig;
use crate::error::{Error, Result};
use tls::{CertVerifier, TlsStream};

/// The byte-level conveyance the protocol engine reads and writes through.
/// Implementations never interpret ICSP framing; that's the wire codec's
/// job (§4.1).
pub trait Transport: Send {
    /// Fill `buf` completely, or return an error (including timeout).
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
    /// Write all of `buf`.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
    /// Close the underlying socket. Unblocks any in-flight read/write.
    fn close(&mut self);
    /// Whether the transport believes its socket is still open.
    fn is_connected(&self) -> bool;
}

enum Inner {
    Plain(TcpStream),
    Tls(TlsStream),
}

/// The concrete TCP (optionally TLS) transport used outside of tests.
pub struct TcpTransport {
    inner: Inner,
    connected: bool,
}

impl TcpTransport {
    /// Connect to `cfg.host:cfg.port`, performing a TLS handshake first if
    /// `cfg.use_tls` is set. The per-operation read/write timeout (§4.2,
    /// default 10s) is applied as a socket-level timeout, which is how the
    /// "blocking read implemented by polling" requirement is satisfied
    /// without a dedicated poll loop.
    pub fn connect(cfg: &PanelConfig, verifier: Arc<dyn CertVerifier>) -> Result<Self> {
        let stream = TcpStream::connect((cfg.host.as_str(), cfg.port)).map_err(Error::Transport)?;
        stream.set_read_timeout(Some(cfg.io_timeout)).map_err(Error::Transport)?;
        stream.set_write_timeout(Some(cfg.io_timeout)).map_err(Error::Transport)?;
        stream.set_nodelay(true).map_err(Error::Transport)?;

        let inner = if cfg.use_tls {
            Inner::Tls(TlsStream::connect(stream, &cfg.host, verifier)?)
        } else {
            Inner::Plain(stream)
        };
        Ok(TcpTransport { inner, connected: true })
    }
}

impl Transport for TcpTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = match &mut self.inner {
            Inner::Plain(s) => s.read_exact(buf),
            Inner::Tls(s) => s.read_exact(buf),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_timeout(&e) => {
                self.connected = false;
                Err(Error::Timeout(Duration::from_secs(0)))
            }
            Err(e) => {
                self.connected = false;
                Err(Error::Transport(e))
            }
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let result = match &mut self.inner {
            Inner::Plain(s) => s.write_all(buf),
            Inner::Tls(s) => s.write_all(buf),
        };
        result.map_err(|e| {
            self.connected = false;
            Error::Transport(e)
        })
    }

    fn close(&mut self) {
        if let Inner::Plain(s) = &self.inner {
            let _ = s.shutdown(std::net::Shutdown::Both);
        } else if let Inner::Tls(s) = &self.inner {
            let _ = s.get_ref().shutdown(std::net::Shutdown::Both);
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
