//! Block signatures (spec §3, §4.1): the per-block `(weak, strong)` pairs
//! the Generator computes over a basis file and the Sender matches
//! against, grounded on the source implementation's `generate_and_send_sums`
//! / `read_sum_head` pair in `sender.c`.

use std::io;
use std::io::{Read, Write};

use crate::blocklen::block_length;
use crate::channel::MessageChannel;
use crate::checksum::{strong, weak::WeakChecksum};
use crate::error::{CoreError, CoreResult};
use crate::wire::MD4_SUM_LENGTH;

/// One block's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSig {
    pub offset: u64,
    pub len: u32,
    pub weak: u32,
    pub strong: Vec<u8>,
}

/// The header rsync calls `sum_struct`: block count and geometry, sent
/// once ahead of the per-block signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureHeader {
    pub count: u32,
    pub block_length: u32,
    pub strong_len: u32,
    pub remainder: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSignature {
    pub header: SignatureHeader,
    pub blocks: Vec<BlockSig>,
}

/// Computes the full block signature set for `data`, using `strong_len`
/// bytes of the strong checksum per block (2 in phase 1, 16 in phase 2,
/// per spec §4.1's two-phase redo policy).
#[must_use]
pub fn compute_signature(data: &[u8], seed: u32, strong_len: u32) -> FileSignature {
    let file_len = data.len() as u64;
    let blen = block_length(file_len);
    let count = if data.is_empty() {
        0
    } else {
        ((file_len + u64::from(blen) - 1) / u64::from(blen)) as u32
    };
    let remainder = if count == 0 || file_len % u64::from(blen) == 0 {
        0
    } else {
        (file_len % u64::from(blen)) as u32
    };

    let mut blocks = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    while offset < file_len {
        let this_len = std::cmp::min(u64::from(blen), file_len - offset) as u32;
        let window = &data[offset as usize..(offset as usize + this_len as usize)];
        let weak = WeakChecksum::compute(window);
        let full = strong::digest(seed, window);
        let strong_bytes = full[..strong_len as usize].to_vec();
        blocks.push(BlockSig { offset, len: this_len, weak, strong: strong_bytes });
        offset += u64::from(this_len);
    }

    FileSignature {
        header: SignatureHeader { count, block_length: blen, strong_len, remainder },
        blocks,
    }
}

pub fn write_signature_header<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    header: &SignatureHeader,
) -> io::Result<()> {
    channel.write_i32(header.count as i32)?;
    channel.write_i32(header.block_length as i32)?;
    channel.write_i32(header.strong_len as i32)?;
    channel.write_i32(header.remainder as i32)
}

pub fn read_signature_header<S: Read + Write>(
    channel: &mut MessageChannel<S>,
) -> CoreResult<SignatureHeader> {
    let count = channel.read_i32()? as u32;
    let block_length = channel.read_i32()? as u32;
    let strong_len = channel.read_i32()? as u32;
    let remainder = channel.read_i32()? as u32;
    if strong_len as usize > MD4_SUM_LENGTH {
        return Err(CoreError::Protocol(format!(
            "oversize strong-prefix length {strong_len} (max {MD4_SUM_LENGTH})"
        )));
    }
    Ok(SignatureHeader { count, block_length, strong_len, remainder })
}

pub fn write_block_sig<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    block: &BlockSig,
) -> io::Result<()> {
    channel.write_i32(block.weak as i32)?;
    channel.write_data(&block.strong)
}

pub fn read_block_sig<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    offset: u64,
    len: u32,
    strong_len: u32,
) -> io::Result<BlockSig> {
    let weak = channel.read_i32()? as u32;
    let strong = channel.read_exact_data(strong_len as usize)?;
    Ok(BlockSig { offset, len, weak, strong })
}

/// Writes a full `FileSignature` (header, then one record per block) over
/// `channel`.
pub fn write_signature<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    sig: &FileSignature,
) -> io::Result<()> {
    write_signature_header(channel, &sig.header)?;
    for block in &sig.blocks {
        write_block_sig(channel, block)?;
    }
    Ok(())
}

/// Reads back a full `FileSignature` written by `write_signature`.
pub fn read_signature<S: Read + Write>(
    channel: &mut MessageChannel<S>,
) -> CoreResult<FileSignature> {
    let header = read_signature_header(channel)?;
    let mut blocks = Vec::with_capacity(header.count as usize);
    let mut offset = 0u64;
    for i in 0..header.count {
        let this_len = if i + 1 == header.count && header.remainder != 0 {
            header.remainder
        } else {
            header.block_length
        };
        blocks.push(read_block_sig(channel, offset, this_len, header.strong_len)?);
        offset += u64::from(this_len);
    }
    Ok(FileSignature { header, blocks })
}
