// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire framing and payload atom codec: every message is
//! `u8 packet_id | u8 version | u16 payload_size | u32 event_id | payload`,
//! big-endian, matching the 8-byte header `read_header`/`write_header` in
//! `original_source/src/packet_handler.c` encode, so existing clients
//! decode this crate's frames without changes.

use crate::error::IpcError;
use crate::prototype::LocalVarKind;

pub const PROTOCOL_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 8;

/// One complete, decoded message. `version` is checked (and discarded) by
/// [`Decoder::next_frame`] before a `Frame` is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_id: u8,
    pub event_id: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(packet_id: u8, event_id: u32, payload: Vec<u8>) -> Self {
        Frame {
            packet_id,
            event_id,
            payload,
        }
    }

    pub fn empty(packet_id: u8, event_id: u32) -> Self {
        Frame::new(packet_id, event_id, Vec::new())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.push(self.packet_id);
        out.push(PROTOCOL_VERSION);
        out.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.event_id.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// A frame-level decode failure, carrying the `event_id` (when recoverable)
/// so the caller can reply with a `protocol-error` (0x31) rather than
/// disconnecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameError {
    pub event_id: u32,
    pub error: IpcError,
}

/// Accumulates raw bytes read off a connection and yields whole frames as
/// they complete; a frame split across two `read()` calls just waits for
/// the rest in `buf`.
#[derive(Default)]
pub struct Decoder {
    buf: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame out of the buffer, if the header plus
    /// payload have fully arrived. A version mismatch still consumes the
    /// frame (its length is known from the header) so one bad client
    /// version doesn't desync every frame after it.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let packet_id = self.buf[0];
        let version = self.buf[1];
        let payload_size = u16::from_be_bytes([self.buf[2], self.buf[3]]) as usize;
        let event_id = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]);
        let total = HEADER_LEN + payload_size;
        if self.buf.len() < total {
            return Ok(None);
        }
        let payload = self.buf[HEADER_LEN..total].to_vec();
        self.buf.drain(0..total);

        if version != PROTOCOL_VERSION {
            return Err(FrameError {
                event_id,
                error: IpcError::PayloadMalformed(format!("unsupported protocol version {version}")),
            });
        }
        Ok(Some(Frame::new(packet_id, event_id, payload)))
    }
}

/// `value:u32 | kind:u8 | in_use:u8 | evaluated:u8 | has_backing:u8 | backing_id?:u32`
/// — the wire form of an [`crate::agent::LocalSlot`], `value`
/// carried as the slot's raw `f32` bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    pub value: f32,
    pub kind: LocalVarKind,
    pub in_use: bool,
    pub evaluated: bool,
    pub backing_id: Option<u32>,
}

/// Append-only payload builder for the wire atoms frames are built from.
#[derive(Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        PayloadWriter::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }
    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }
    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }
    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }
    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }
    pub fn write_f32(&mut self, v: f32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }
    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// `u8` length prefix, truncating silently past 255 bytes (a short
    /// identifier string never legitimately hits that).
    pub fn write_str(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        let len = bytes.len().min(u8::MAX as usize);
        self.buf.push(len as u8);
        self.buf.extend_from_slice(&bytes[..len]);
        self
    }

    pub fn write_variable(&mut self, v: &Variable) -> &mut Self {
        self.write_u32(v.value.to_bits());
        self.write_u8(matches!(v.kind, LocalVarKind::Float) as u8);
        self.write_u8(v.in_use as u8);
        self.write_u8(v.evaluated as u8);
        self.write_u8(v.backing_id.is_some() as u8);
        if let Some(id) = v.backing_id {
            self.write_u32(id);
        }
        self
    }
}

/// Cursor-style reader over one frame's payload bytes.
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        PayloadReader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], IpcError> {
        if self.pos + n > self.buf.len() {
            return Err(IpcError::PayloadMalformed("unexpected end of payload".into()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, IpcError> {
        Ok(self.take(1)?[0])
    }
    pub fn read_u16(&mut self) -> Result<u16, IpcError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }
    pub fn read_u32(&mut self) -> Result<u32, IpcError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }
    pub fn read_i32(&mut self) -> Result<i32, IpcError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }
    pub fn read_u64(&mut self) -> Result<u64, IpcError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }
    pub fn read_f32(&mut self) -> Result<f32, IpcError> {
        Ok(f32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }
    pub fn read_f64(&mut self) -> Result<f64, IpcError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }
    pub fn read_str(&mut self) -> Result<String, IpcError> {
        let len = self.read_u8()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| IpcError::PayloadMalformed("string is not valid utf-8".into()))
    }
    pub fn read_variable(&mut self) -> Result<Variable, IpcError> {
        let value = f32::from_bits(self.read_u32()?);
        let kind = if self.read_u8()? != 0 { LocalVarKind::Float } else { LocalVarKind::Int };
        let in_use = self.read_u8()? != 0;
        let evaluated = self.read_u8()? != 0;
        let has_backing = self.read_u8()? != 0;
        let backing_id = if has_backing { Some(self.read_u32()?) } else { None };
        Ok(Variable {
            value,
            kind,
            in_use,
            evaluated,
            backing_id,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_encode_and_decode() {
        let mut w = PayloadWriter::new();
        w.write_u32(42).write_str("poke");
        let frame = Frame::new(0x0F, 7, w.into_bytes());
        let encoded = frame.encode();

        let mut decoder = Decoder::new();
        decoder.feed(&encoded);
        let decoded = decoder.next_frame().unwrap().unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn decoder_waits_for_a_frame_split_across_two_feeds() {
        let frame = Frame::new(0x00, 1, vec![1, 2, 3, 4]);
        let encoded = frame.encode();
        let mut decoder = Decoder::new();
        decoder.feed(&encoded[..5]);
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.feed(&encoded[5..]);
        assert_eq!(decoder.next_frame().unwrap(), Some(frame));
    }

    #[test]
    fn mismatched_version_is_reported_without_desyncing_the_stream() {
        let mut bad = Frame::new(0x00, 3, vec![9, 9]).encode();
        bad[1] = 7; // corrupt the version byte
        let good = Frame::new(0x01, 4, vec![]).encode();
        let mut all = bad;
        all.extend_from_slice(&good);

        let mut decoder = Decoder::new();
        decoder.feed(&all);
        let err = decoder.next_frame().unwrap_err();
        assert_eq!(err.event_id, 3);
        let next = decoder.next_frame().unwrap().unwrap();
        assert_eq!(next.event_id, 4);
    }

    #[test]
    fn variable_round_trips_value_and_backing_id() {
        let v = Variable {
            value: 3.5,
            kind: LocalVarKind::Float,
            in_use: true,
            evaluated: false,
            backing_id: Some(12),
        };
        let mut w = PayloadWriter::new();
        w.write_variable(&v);
        let bytes = w.into_bytes();
        let mut r = PayloadReader::new(&bytes);
        let back = r.read_variable().unwrap();
        assert_eq!(back, v);
        assert!(r.is_empty());
    }

    #[test]
    fn reader_rejects_truncated_payload() {
        let mut r = PayloadReader::new(&[0, 0]);
        assert!(r.read_u32().is_err());
    }
}
