//! Wire-level constants and the frame header codec (spec §4.4, §6).
//!
//! Version 28 semantics: all integers little-endian, 64-bit offsets use
//! the sentinel-then-64 escape, the whole-file digest is 16 raw bytes.

use std::io;

/// Length in bytes of the (keyed MD4) strong digest, full length.
pub const MD4_SUM_LENGTH: usize = 16;

/// Strong-prefix length used in phase 1, before escalation to full length.
pub const PHASE1_STRONG_LENGTH: u32 = 2;

/// Protocol version this core assumes (spec §6).
pub const PROTOCOL_VERSION: u32 = 28;

/// Sentinel for a 32-bit field meaning "a 64-bit value follows" and for
/// terminating an index stream (phase end).
pub const SENTINEL: i32 = -1;

/// Largest payload a single frame's 24-bit length field can carry.
pub const MAX_FRAME_LEN: usize = 0x00FF_FFFF;

pub type Digest = [u8; MD4_SUM_LENGTH];

/// Multiplex frame tag (high byte of the 4-byte frame header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Data = 0,
    Error = 1,
    Info = 2,
    Log = 3,
    Redo = 4,
    Done = 5,
}

impl TryFrom<u8> for Tag {
    type Error = io::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tag::Data),
            1 => Ok(Tag::Error),
            2 => Ok(Tag::Info),
            3 => Ok(Tag::Log),
            4 => Ok(Tag::Redo),
            5 => Ok(Tag::Done),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown multiplex tag {other}"),
            )),
        }
    }
}

/// A 4-byte little-endian header: high byte is the tag, low 24 bits the
/// payload length.
pub fn encode_header(tag: Tag, len: u32) -> io::Result<[u8; 4]> {
    if len as usize > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "frame payload exceeds 24-bit length field",
        ));
    }
    let word = ((tag as u32) << 24) | (len & 0x00FF_FFFF);
    Ok(word.to_le_bytes())
}

pub fn decode_header(bytes: [u8; 4]) -> io::Result<(Tag, u32)> {
    let word = u32::from_le_bytes(bytes);
    let tag = Tag::try_from((word >> 24) as u8)?;
    let len = word & 0x00FF_FFFF;
    Ok((tag, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        for tag in [Tag::Data, Tag::Error, Tag::Info, Tag::Log, Tag::Redo, Tag::Done] {
            let bytes = encode_header(tag, 12345).unwrap();
            let (decoded_tag, len) = decode_header(bytes).unwrap();
            assert_eq!(decoded_tag, tag);
            assert_eq!(len, 12345);
        }
    }

    #[test]
    fn rejects_oversize_payload() {
        assert!(encode_header(Tag::Data, 0x0100_0000).is_err());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let bytes = (6u32 << 24).to_le_bytes();
        assert!(decode_header(bytes).is_err());
    }
}
