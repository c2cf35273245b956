//! Multiplexed message channel (spec §4.4 "Framing protocol"): a single
//! byte stream carrying a DATA sub-stream interleaved with tagged side
//! messages, mirroring the source implementation's `io.c` multiplexing
//! (`send_msg`/`read_msg`) over one socket per logical link.

use std::io::{self, Read, Write};

use crate::wire::{decode_header, encode_header, Tag};

/// A side-channel message observed while draining for DATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideMessage {
    Log(String),
    Info(String),
    Error(String),
    /// File index that failed phase-1 verification and needs phase 2.
    Redo(u32),
}

/// Wraps a duplex byte stream with rsync's tag-length-value framing.
/// `fill_data`/`read_data` transparently skip non-DATA frames, appending
/// them to `side` instead; callers that only care about the control
/// stream use `drain_control` to read until DONE.
pub struct MessageChannel<S> {
    inner: S,
    pending: Vec<u8>,
    pub side: Vec<SideMessage>,
    pub done: bool,
}

impl<S: Read + Write> MessageChannel<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, pending: Vec::new(), side: Vec::new(), done: false }
    }

    /// Unwraps the channel, discarding any buffered-but-unread DATA.
    /// Mainly useful in tests that build up a byte stream with one
    /// channel and then read it back with another.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn read_frame(&mut self) -> io::Result<Option<(Tag, u32)>> {
        let mut header = [0u8; 4];
        match self.inner.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        decode_header(header).map(Some)
    }

    /// Reads frames until at least `self.pending` holds `want` bytes of
    /// DATA, or the stream ends. Side-channel frames are recorded in
    /// `self.side`, not returned.
    fn fill_data(&mut self, want: usize) -> io::Result<()> {
        while self.pending.len() < want {
            let Some((tag, len)) = self.read_frame()? else { break };
            let mut payload = vec![0u8; len as usize];
            self.inner.read_exact(&mut payload)?;
            match tag {
                Tag::Data => self.pending.extend_from_slice(&payload),
                Tag::Log => self.side.push(SideMessage::Log(String::from_utf8_lossy(&payload).into_owned())),
                Tag::Info => self.side.push(SideMessage::Info(String::from_utf8_lossy(&payload).into_owned())),
                Tag::Error => self.side.push(SideMessage::Error(String::from_utf8_lossy(&payload).into_owned())),
                Tag::Redo => {
                    if payload.len() != 4 {
                        return Err(io::Error::new(io::ErrorKind::InvalidData, "malformed REDO payload"));
                    }
                    let index = u32::from_le_bytes(payload.try_into().unwrap());
                    self.side.push(SideMessage::Redo(index));
                }
                Tag::Done => {
                    self.done = true;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Reads up to `buf.len()` bytes of DATA, returning the number read
    /// (0 at end of stream).
    pub fn read_data(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill_data(buf.len())?;
        let n = std::cmp::min(buf.len(), self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    /// Reads exactly `len` bytes of DATA or fails with `UnexpectedEof`.
    pub fn read_exact_data(&mut self, len: usize) -> io::Result<Vec<u8>> {
        self.fill_data(len)?;
        if self.pending.len() < len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short DATA frame"));
        }
        Ok(self.pending.drain(..len).collect())
    }

    /// Peeks ahead far enough to tell whether the stream has reached its
    /// DONE frame with no further DATA pending. Lets a reader loop with
    /// `while !channel.at_end()? { ... }` instead of special-casing EOF.
    pub fn at_end(&mut self) -> io::Result<bool> {
        self.fill_data(1)?;
        Ok(self.done && self.pending.is_empty())
    }

    /// Clears the latched DONE flag so the channel can be read across a
    /// phase boundary (the same link carries phase 1, then a second DONE,
    /// then phase 2), once the caller has reacted to the first DONE.
    pub fn reset_done(&mut self) {
        self.done = false;
    }

    pub fn write_data(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let header = encode_header(Tag::Data, bytes.len() as u32)?;
        self.inner.write_all(&header)?;
        self.inner.write_all(bytes)
    }

    fn write_side(&mut self, tag: Tag, payload: &[u8]) -> io::Result<()> {
        let header = encode_header(tag, payload.len() as u32)?;
        self.inner.write_all(&header)?;
        self.inner.write_all(payload)
    }

    pub fn write_log(&mut self, message: &str) -> io::Result<()> {
        self.write_side(Tag::Log, message.as_bytes())
    }

    pub fn write_info(&mut self, message: &str) -> io::Result<()> {
        self.write_side(Tag::Info, message.as_bytes())
    }

    pub fn write_error(&mut self, message: &str) -> io::Result<()> {
        self.write_side(Tag::Error, message.as_bytes())
    }

    pub fn write_redo(&mut self, file_index: u32) -> io::Result<()> {
        self.write_side(Tag::Redo, &file_index.to_le_bytes())
    }

    pub fn write_done(&mut self) -> io::Result<()> {
        self.write_side(Tag::Done, &[])
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.write_data(&value.to_le_bytes())
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        let bytes = self.read_exact_data(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Writes a 64-bit length, escaped behind the sentinel the way the
    /// source implementation's `write_longint` does, for values that
    /// might exceed a 32-bit `i32`.
    pub fn write_long(&mut self, value: i64) -> io::Result<()> {
        if value >= 0 && value <= i64::from(i32::MAX) {
            self.write_i32(value as i32)
        } else {
            self.write_i32(crate::wire::SENTINEL)?;
            self.write_data(&value.to_le_bytes())
        }
    }

    pub fn read_long(&mut self) -> io::Result<i64> {
        let first = self.read_i32()?;
        if first == crate::wire::SENTINEL {
            let bytes = self.read_exact_data(8)?;
            Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
        } else {
            Ok(i64::from(first))
        }
    }

    /// Drains only the control stream (no DATA expected): reads frames
    /// until DONE, recording LOG/INFO/ERROR/REDO into `self.side`.
    /// Returns the set of file indices that arrived as REDO.
    pub fn drain_control(&mut self) -> io::Result<Vec<u32>> {
        let mut redo = Vec::new();
        while !self.done {
            let Some((tag, len)) = self.read_frame()? else { break };
            let mut payload = vec![0u8; len as usize];
            self.inner.read_exact(&mut payload)?;
            match tag {
                Tag::Data => return Err(io::Error::new(io::ErrorKind::InvalidData, "unexpected DATA on control channel")),
                Tag::Log => self.side.push(SideMessage::Log(String::from_utf8_lossy(&payload).into_owned())),
                Tag::Info => self.side.push(SideMessage::Info(String::from_utf8_lossy(&payload).into_owned())),
                Tag::Error => self.side.push(SideMessage::Error(String::from_utf8_lossy(&payload).into_owned())),
                Tag::Redo => {
                    let index = u32::from_le_bytes(payload.try_into().map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "malformed REDO payload")
                    })?);
                    redo.push(index);
                    self.side.push(SideMessage::Redo(index));
                }
                Tag::Done => self.done = true,
            }
        }
        Ok(redo)
    }
}
