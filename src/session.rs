//! Per-session configuration and stats (spec §3 "Lifecycle", §9 design
//! notes: process-wide flags gathered into one record).

use std::path::PathBuf;

/// One full pass over the file list. Phase 2 retransmits any file whose
/// phase-1 verification failed, with a longer strong-checksum prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    One,
    Two,
}

/// Threaded configuration replacing the source implementation's
/// process-wide mutable flags (spec §9).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Mixed into every strong checksum this session computes.
    pub seed: u32,
    /// Write directly into the destination rather than a staged temp file.
    pub in_place: bool,
    /// Invoke the backup hook before overwriting an existing target.
    pub make_backups: bool,
    /// Retain partial transfers (move to partial dir) instead of unlinking
    /// a failed staged transfer.
    pub keep_partial: bool,
    /// Directory for staged temp files; falls back to the target's parent.
    pub temp_dir: Option<PathBuf>,
    /// Directory holding prior incomplete transfers, used as a basis
    /// candidate and as the destination for retained partials.
    pub partial_dir: Option<PathBuf>,
    /// Extra basis root consulted after the in-place/partial/live target
    /// candidates are exhausted.
    pub compare_dest: Option<PathBuf>,
    /// When a staged temp file's parent directory is missing, create it
    /// (mode 0777 & ~umask) and retry once.
    pub relative_paths: bool,
    /// Announce each file's index but transfer no data.
    pub dry_run: bool,
    /// Maximum bytes per literal token before a long run is chunked.
    pub max_literal_chunk: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            in_place: false,
            make_backups: false,
            keep_partial: false,
            temp_dir: None,
            partial_dir: None,
            compare_dest: None,
            relative_paths: false,
            dry_run: false,
            max_literal_chunk: 32 * 1024,
        }
    }
}

/// Running counters for one session (spec §8's literal+matched=|S| invariant).
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub literal_data: u64,
    pub matched_data: u64,
    pub num_transferred_files: u64,
    pub total_transferred_size: u64,
    /// Index of the file currently (or, once the session returns, most
    /// recently) being processed.
    pub current_file_index: Option<usize>,
    /// Non-fatal I/O conditions observed during the session.
    pub io_errors: IoErrorFlags,
}

/// Accumulated non-fatal I/O conditions observed during a session
/// (source implementation's `io_error |= IOERR_*` accumulation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoErrorFlags(u8);

impl IoErrorFlags {
    pub const GENERAL: IoErrorFlags = IoErrorFlags(1 << 0);
    pub const VANISHED: IoErrorFlags = IoErrorFlags(1 << 1);

    pub fn set(&mut self, flag: IoErrorFlags) {
        self.0 |= flag.0;
    }

    #[must_use]
    pub fn contains(&self, flag: IoErrorFlags) -> bool {
        self.0 & flag.0 != 0
    }
}
