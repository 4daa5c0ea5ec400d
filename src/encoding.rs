//! Mixed string encoding across the protocol boundary (spec §9: "Mixed
//! encodings... must be carried across the full length of string handling;
//! the engine tags each string with its origin encoding at the protocol
//! boundary and converts to UTF-8 internally").
//!
//! G4 projects are CP1250, G5 projects are UTF-8 (§6.4, Glossary). Every
//! string that crosses the wire is decoded into this process's native
//! `String` (UTF-8) immediately on receipt and re-encoded only when a
//! message is serialized back out — nothing downstream of the wire codec
//! ever sees raw CP1250 bytes.

use crate::config::Generation;
use encoding_rs::WINDOWS_1250;

/// Decode bytes received from the controller into a UTF-8 `String`,
/// according to the panel's configured generation.
pub fn decode(bytes: &[u8], generation: Generation) -> String {
    match generation {
        Generation::G4 => {
            let (text, _enc, _had_errors) = WINDOWS_1250.decode(bytes);
            text.into_owned()
        }
        Generation::G5 => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Encode a UTF-8 `String` back into the wire representation the panel's
/// generation expects.
pub fn encode(text: &str, generation: Generation) -> Vec<u8> {
    match generation {
        Generation::G4 => {
            let (bytes, _enc, _had_errors) = WINDOWS_1250.encode(text);
            bytes.into_owned()
        }
        Generation::G5 => text.as_bytes().to_vec(),
    }
}
