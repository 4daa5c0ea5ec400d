//! A single ICSP frame (spec §3 `Message`, §6.1 byte layout).
//!
//! `Message::decode` performs the same strict, field-by-field read order as
//! the reference implementation (`tamxnet.cpp::start_read`/`handle_read`):
//! the 22-byte fixed header up to and including the message code, followed
//! by one combined read of `header_len + 3 - 0x15` bytes whose *last* byte
//! is the checksum and whose preceding bytes are the payload. That
//! arithmetic is preserved exactly because it is unintuitive enough (it
//! counts the checksum byte as part of the "data block") that re-deriving
//! it from the struct layout in §3 alone gets the off-by-one wrong.

use std::io::Read;

use crate::error::{Error, Result};
use crate::wire::checksum;

const FRAME_ID: u8 = 0x02;
const SEP1: u8 = 0x02;
const SEP2: u8 = 0x0f;
const FIXED_HEADER_LEN: usize = 22;
/// `data_block_len = header_len + 3 - 0x0015` (i.e. `header_len - 18`); the
/// data block is the payload plus its trailing checksum byte.
const DATA_BLOCK_BIAS: i32 = 3 - 0x0015;

/// One decoded (or to-be-encoded) ICSP message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub msg_type: u8,
    pub dev_src: u16,
    pub port_src: u16,
    pub system: u16,
    pub dev_dst: u16,
    pub port_dst: u16,
    pub counter: u16,
    pub mc: u16,
    pub payload: Vec<u8>,
}

impl Message {
    /// Build a message, leaving `counter` at 0 for the caller to assign
    /// (the protocol engine's writer assigns it just before sending, in
    /// send order — §4.3, §5 "P8").
    pub fn new(
        msg_type: u8,
        dev_src: u16,
        port_src: u16,
        system: u16,
        dev_dst: u16,
        port_dst: u16,
        mc: u16,
        payload: Vec<u8>,
    ) -> Self {
        Message {
            msg_type,
            dev_src,
            port_src,
            system,
            dev_dst,
            port_dst,
            counter: 0,
            mc,
            payload,
        }
    }

    /// Encode this message to its wire representation, computing the
    /// checksum over every preceding byte (§3, §4.1).
    pub fn encode(&self) -> Vec<u8> {
        let data_block_len = self.payload.len() as i32 + 1;
        let header_len = (data_block_len - DATA_BLOCK_BIAS) as u16;
        let mut buf = Vec::with_capacity(FIXED_HEADER_LEN + self.payload.len() + 1);
        buf.push(FRAME_ID);
        buf.extend_from_slice(&header_len.to_be_bytes());
        buf.push(SEP1);
        buf.push(self.msg_type);
        buf.extend_from_slice(&1u16.to_be_bytes()); // flag1, always 1
        buf.extend_from_slice(&self.dev_src.to_be_bytes());
        buf.extend_from_slice(&self.port_src.to_be_bytes());
        buf.extend_from_slice(&self.system.to_be_bytes());
        buf.extend_from_slice(&self.dev_dst.to_be_bytes());
        buf.extend_from_slice(&self.port_dst.to_be_bytes());
        buf.push(SEP2);
        buf.extend_from_slice(&self.counter.to_be_bytes());
        buf.extend_from_slice(&self.mc.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        let cksum = checksum::compute(&buf);
        buf.push(cksum);
        buf
    }

    /// Decode one message from a byte stream. A framing error (bad id/sep
    /// byte, or a `header_len` implying a negative data block) closes the
    /// session per §7; a checksum mismatch is only logged (§4.1: tolerant,
    /// because the original panel tolerates checksum mismatches on valid
    /// frames).
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let mut header = [0u8; FIXED_HEADER_LEN];
        r.read_exact(&mut header).map_err(Error::Transport)?;

        if header[0] != FRAME_ID {
            return Err(Error::Framing(format!("bad frame id 0x{:02x}", header[0])));
        }
        let header_len = u16::from_be_bytes([header[1], header[2]]);
        if header[3] != SEP1 {
            return Err(Error::Framing(format!("bad sep1 0x{:02x}", header[3])));
        }
        let msg_type = header[4];
        // header[5..7] is flag1; not validated on receive.
        let dev_src = u16::from_be_bytes([header[7], header[8]]);
        let port_src = u16::from_be_bytes([header[9], header[10]]);
        let system = u16::from_be_bytes([header[11], header[12]]);
        let dev_dst = u16::from_be_bytes([header[13], header[14]]);
        let port_dst = u16::from_be_bytes([header[15], header[16]]);
        if header[17] != SEP2 {
            return Err(Error::Framing(format!("bad sep2 0x{:02x}", header[17])));
        }
        let counter = u16::from_be_bytes([header[18], header[19]]);
        let mc = u16::from_be_bytes([header[20], header[21]]);

        let data_block_len = header_len as i32 + DATA_BLOCK_BIAS;
        if data_block_len < 1 {
            return Err(Error::Framing(format!(
                "header_len {header_len} implies a negative data block"
            )));
        }
        let mut block = vec![0u8; data_block_len as usize];
        r.read_exact(&mut block).map_err(Error::Transport)?;

        let checksum_received = *block.last().expect("data_block_len >= 1");
        let payload = block[..block.len() - 1].to_vec();

        let mut checked = header.to_vec();
        checked.extend_from_slice(&payload);
        let expected = checksum::compute(&checked);
        if expected != checksum_received {
            tracing::warn!(
                expected,
                received = checksum_received,
                "ICSP checksum mismatch (tolerated)"
            );
        }

        Ok(Message {
            msg_type,
            dev_src,
            port_src,
            system,
            dev_dst,
            port_dst,
            counter,
            mc,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_framing() {
        let msg = Message::new(0x01, 0, 1, 1, 0, 1, 0x0084, vec![0x00, 0x01, 0x00, 0x2a]);
        let bytes = msg.encode();
        let mut cursor = Cursor::new(bytes);
        let decoded = Message::decode(&mut cursor).unwrap();
        assert_eq!(decoded.msg_type, msg.msg_type);
        assert_eq!(decoded.mc, msg.mc);
        assert_eq!(decoded.payload, msg.payload);
        assert_eq!(decoded.dev_dst, msg.dev_dst);
    }

    #[test]
    fn round_trip_empty_payload() {
        let msg = Message::new(0x01, 0, 1, 1, 0, 1, 0x0098, vec![]);
        let bytes = msg.encode();
        let mut cursor = Cursor::new(bytes);
        let decoded = Message::decode(&mut cursor).unwrap();
        assert_eq!(decoded.payload, Vec::<u8>::new());
        assert_eq!(decoded.mc, 0x0098);
    }

    #[test]
    fn rejects_bad_frame_id() {
        let mut bytes = Message::new(0x01, 0, 1, 1, 0, 1, 0x0098, vec![]).encode();
        bytes[0] = 0xff;
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(Message::decode(&mut cursor), Err(Error::Framing(_))));
    }

    #[test]
    fn checksum_is_big_endian_sum_mod_256() {
        let msg = Message::new(0x01, 0x0001, 0x0002, 0x0001, 0x0000, 0x0001, 0x0001, vec![]);
        let bytes = msg.encode();
        let expected = checksum::compute(&bytes[..bytes.len() - 1]);
        assert_eq!(*bytes.last().unwrap(), expected);
    }

    #[test]
    fn tolerates_checksum_mismatch_on_receive() {
        let mut bytes = Message::new(0x01, 0, 1, 1, 0, 1, 0x0098, vec![]).encode();
        let last = bytes.len() - 1;
        bytes[last] = bytes[last].wrapping_add(1);
        let mut cursor = Cursor::new(bytes);
        assert!(Message::decode(&mut cursor).is_ok());
    }
}
