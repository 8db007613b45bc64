//! Git pkt-line format implementation.
//!
//! Every line of the smart HTTP protocol is prefixed with its total length as
//! four lowercase hex digits, header included. The reserved value `0000` is a
//! flush packet that terminates a section.
//!
//! Decoding works on a fully buffered body through [`PktLineCursor`], so running
//! out of bytes is a hard error rather than a request for more input.

use crate::{GitError, Result};
use bytes::BufMut;
use std::io::Write;

/// Size of the hex length prefix.
pub const HEADER_LEN: usize = 4;

/// Largest payload git accepts in a single pkt-line.
pub const MAX_PAYLOAD_LEN: usize = 65516;

/// The flush packet.
pub const FLUSH_PKT: &[u8; 4] = b"0000";

/// A pkt-line packet.
///
/// `Data` holds the payload without its trailing newline; the newline is
/// stripped on decode and appended on encode. An empty `Data` payload is a
/// blank line and is written on the wire as a flush packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (0000).
    Flush,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Creates a data packet from bytes.
    pub fn from_bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Data(b.into())
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Appends the wire form of the packet to `out`.
    pub fn encode_into<B: BufMut>(&self, out: &mut B) -> Result<()> {
        match self {
            Self::Data(data) if !data.is_empty() => {
                if data.len() > MAX_PAYLOAD_LEN {
                    return Err(GitError::InvalidPktLine(format!(
                        "payload of {} bytes exceeds {}",
                        data.len(),
                        MAX_PAYLOAD_LEN
                    )));
                }
                out.put_slice(format!("{:04x}", self.encoded_len()).as_bytes());
                out.put_slice(data);
                out.put_u8(b'\n');
            }
            _ => out.put_slice(FLUSH_PKT),
        }
        Ok(())
    }

    /// Number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Data(data) if !data.is_empty() => HEADER_LEN + data.len() + 1,
            _ => HEADER_LEN,
        }
    }

    /// Returns true if this is a flush packet.
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Returns true for flush packets and data lines without payload.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Data(data) => data.is_empty(),
            Self::Flush => true,
        }
    }

    /// Returns the data content, or None for a flush packet.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            Self::Flush => None,
        }
    }

    /// Returns the data as a string.
    pub fn as_str(&self) -> Option<&str> {
        self.data().and_then(|d| std::str::from_utf8(d).ok())
    }
}

/// Bounds-checked reader over a buffered pkt-line stream.
#[derive(Debug, Clone)]
pub struct PktLineCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PktLineCursor<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Returns true once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Reads the next packet.
    ///
    /// The cursor only advances when a whole packet was decoded.
    pub fn read(&mut self) -> Result<PktLine> {
        let rest = self.remaining();
        if rest.len() < HEADER_LEN {
            return Err(GitError::Truncated {
                needed: HEADER_LEN,
                available: rest.len(),
            });
        }

        let len = parse_len(&rest[..HEADER_LEN])?;
        if len == 0 {
            self.pos += HEADER_LEN;
            return Ok(PktLine::Flush);
        }
        if len < HEADER_LEN {
            return Err(GitError::InvalidPktLine(format!(
                "reserved length {:04x}",
                len
            )));
        }
        if rest.len() < len {
            return Err(GitError::Truncated {
                needed: len,
                available: rest.len(),
            });
        }

        let payload = &rest[HEADER_LEN..len];
        let payload = payload.strip_suffix(b"\n").unwrap_or(payload);
        self.pos += len;

        Ok(PktLine::Data(payload.to_vec()))
    }

    /// Reads all packets until a flush packet, which is consumed but not returned.
    pub fn read_until_flush(&mut self) -> Result<Vec<PktLine>> {
        let mut packets = Vec::new();
        loop {
            match self.read()? {
                PktLine::Flush => break,
                pkt => packets.push(pkt),
            }
        }
        Ok(packets)
    }
}

fn parse_len(prefix: &[u8]) -> Result<usize> {
    let invalid = || {
        GitError::InvalidPktLine(format!(
            "invalid length prefix {:?}",
            String::from_utf8_lossy(prefix)
        ))
    };

    if !prefix.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid());
    }
    let digits = std::str::from_utf8(prefix).map_err(|_| invalid())?;
    let len = u16::from_str_radix(digits, 16).map_err(|_| invalid())?;
    Ok(len as usize)
}

/// Writer for pkt-line format.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a packet.
    pub fn write(&mut self, pkt: &PktLine) -> Result<()> {
        self.writer.write_all(&pkt.encode()?)?;
        Ok(())
    }

    /// Writes a string line; the trailing newline is added on the wire.
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        self.write(&PktLine::from_string(s))
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
