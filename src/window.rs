//! Windowed access to the sender's source file (spec §4.2, §9): the file
//! is memory-mapped rather than read whole into memory so large sources
//! stay O(1) to seek into at an arbitrary block offset.

use std::fs::File;
use std::io;
use std::path::Path;

/// A byte source the matcher can index into. Implementations may be
/// backed by a memory map or, for small/in-memory inputs (tests), a plain
/// `Vec<u8>` — both give O(1) amortized random access.
pub trait ByteWindow {
    fn as_slice(&self) -> &[u8];
}

pub struct InMemoryBytes(pub Vec<u8>);

impl ByteWindow for InMemoryBytes {
    fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

pub struct MappedBytes(memmap2::Mmap);

impl ByteWindow for MappedBytes {
    fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

/// Opens `path` for reading, memory-mapping it when non-empty. Empty
/// files are represented in-memory since mapping a zero-length file is
/// an error on most platforms.
pub fn open_source_window(path: &Path) -> io::Result<Box<dyn ByteWindow>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(Box::new(InMemoryBytes(Vec::new())));
    }
    // SAFETY: the mapped file is read-only for the lifetime of this
    // process's handle; callers must not rely on it surviving concurrent
    // truncation of the underlying file by another process.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(Box::new(MappedBytes(mmap)))
}
