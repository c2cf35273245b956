//! Error taxonomy for the delta-transfer core (spec §7).
//!
//! Each variant corresponds to one row of the error taxonomy. `is_fatal`
//! tells a session driver whether to abort both peers via the cleanup
//! path or keep going to the next file index.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad index, impossible lengths, oversize strong-prefix: fatal.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Local I/O error on write or rename: fatal for the session.
    #[error("write or rename failed: {0}")]
    WriteIo(#[source] std::io::Error),

    /// Source file vanished between listing and open: non-fatal, counted in stats.
    #[error("source file vanished: {}", .0.display())]
    SourceVanished(PathBuf),

    /// Verification failed in phase 1: non-fatal, queued for redo.
    #[error("phase 1 verification failed for file index {0}")]
    VerifyFailedPhase1(usize),

    /// Verification failed in phase 2: hard, user-visible failure for that file.
    #[error("phase 2 verification failed for file index {0}")]
    VerifyFailedPhase2(usize),

    /// Incoming name matches the exclude oracle: treated as an attack, fatal.
    #[error("excluded path rejected: {}", .0.display())]
    ExcludeViolation(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error should abort the whole session (both peers) rather
    /// than being logged and the per-file state machine moving on.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::Protocol(_)
                | CoreError::WriteIo(_)
                | CoreError::ExcludeViolation(_)
                | CoreError::Io(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
