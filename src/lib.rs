//! A software emulation core for AMX G4/G5 touch panels: speaks the native
//! ICSP binary protocol to a NetLinx controller over TCP, maintains the
//! page/popup/button UI model the controller drives, and exposes a
//! [`render::RenderSurface`] trait for an embedder to draw it.
//!
//! The crate is split along the same seams the wire protocol has:
//!
//! - [`wire`] — frame codec (§6.1) and typed value encoding (§6.2).
//! - [`protocol`] — the handshake state machine and inbound dispatch (§4).
//! - [`model`] — the page/popup/button hierarchy (§2, §3).
//! - [`command`] — the `^`/`@`/`?` command-string interpreter (§4.3 P9).
//! - [`filetransfer`] — the file receive sub-protocol (§4.4).
//! - [`transport`] — TCP/TLS byte conveyance, reconnect backoff (§4.2).
//! - [`session`] — thread orchestration tying the above together (§5).

pub mod command;
pub mod config;
pub mod encoding;
pub mod error;
pub mod filetransfer;
pub mod model;
pub mod observer;
pub mod protocol;
pub mod render;
pub mod session;
pub mod transport;
pub mod wire;

pub use config::{Generation, PanelConfig};
pub use error::{Error, Result};
pub use protocol::{Engine, EngineState, PanelIdentity};
pub use render::RenderSurface;
pub use session::PanelSession;
