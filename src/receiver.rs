//! Receiver role (spec §4.3): consumes the Sender's token stream, opens
//! the selected basis to resolve copy tokens, stages the reconstruction
//! in a temp file (or writes in place), verifies the whole-file digest,
//! and applies the finalize table.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::basis::{FileBytesProvider, FsBasisProvider};
use crate::channel::MessageChannel;
use crate::checksum::strong;
use crate::error::{CoreError, CoreResult};
use crate::interfaces::{BackupHook, ExcludeOracle, FileList, PartialDirHook};
use crate::session::SessionConfig;
use crate::tempname::make_tmpname;
use crate::wire::MD4_SUM_LENGTH;

/// RAII guard for the staged temp file: removed on drop unless
/// explicitly defused by a successful finalize. Grounded on the source
/// implementation's per-file cleanup, reimplemented as a destructor
/// instead of a global signal handler because Rust's ownership model
/// makes per-file scoping the natural fit.
struct CurrentFileGuard {
    path: Option<PathBuf>,
}

impl CurrentFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn defuse(&mut self) {
        self.path = None;
    }
}

impl Drop for CurrentFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = fs::remove_file(path);
        }
    }
}

/// The five outcomes of finalizing one file transfer (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalize {
    VerifyOkStagedRename,
    VerifyOkInPlace,
    VerifyFailStagedPartialRetained(PathBuf),
    VerifyFailStagedUnlinked,
    VerifyFailInPlaceLeftDirty,
}

/// Result of processing one file's token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Ok(Finalize),
    NeedsRedo,
}

fn reconstruct<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    basis_bytes: &[u8],
    block_length: u32,
    out: &mut Vec<u8>,
) -> CoreResult<()> {
    loop {
        let token = channel.read_i32()?;
        if token == 0 {
            return Ok(());
        }
        if token > 0 {
            let len = token as usize;
            let bytes = channel.read_exact_data(len)?;
            out.extend_from_slice(&bytes);
        } else {
            let block_index = (-token - 1) as u64;
            let offset = block_index * u64::from(block_length);
            let end = std::cmp::min(offset + u64::from(block_length), basis_bytes.len() as u64);
            if offset > basis_bytes.len() as u64 || offset > end {
                return Err(CoreError::Protocol(format!(
                    "copy token references block {block_index} outside basis"
                )));
            }
            out.extend_from_slice(&basis_bytes[offset as usize..end as usize]);
        }
    }
}

/// Receives and finalizes one file. The block length is not transmitted
/// over the wire: it is a pure function of the basis size (spec §4.1),
/// so the Receiver recomputes the same geometry the Generator used from
/// its own copy of the basis. `final_phase` distinguishes a phase-1
/// verification failure (queued for redo) from a phase-2 one (a hard,
/// per-file failure that still runs the finalize table).
#[allow(clippy::too_many_arguments)]
pub fn receive_one_file<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    target_root: &Path,
    entry_name: &str,
    basis: &FsBasisProvider,
    config: &SessionConfig,
    exclude: &dyn ExcludeOracle,
    backup: &dyn BackupHook,
    partial: &dyn PartialDirHook,
    final_phase: bool,
) -> CoreResult<ReceiveOutcome> {
    let target = target_root.join(entry_name);
    if exclude.is_excluded(&target, false) {
        return Err(CoreError::ExcludeViolation(target));
    }

    let basis_entry = crate::interfaces::FileEntry {
        name: entry_name.to_string(),
        size: 0,
        mode: 0,
        mtime: 0,
        link_info: None,
    };
    let basis_bytes = basis.open(&basis_entry)?;
    let block_length = crate::blocklen::block_length(basis_bytes.len() as u64);

    let mut reconstructed = Vec::new();
    reconstruct(channel, &basis_bytes, block_length, &mut reconstructed)?;
    let received_digest = crate::sender::read_whole_file_digest(channel)?;
    let computed_digest = strong::digest(config.seed, &reconstructed);
    let verified = received_digest == computed_digest;

    if !verified && !final_phase {
        return Ok(ReceiveOutcome::NeedsRedo);
    }

    if config.in_place {
        crate::io_utils::write_file_creating_parent(&target, &reconstructed, config.relative_paths)
            .map_err(CoreError::WriteIo)?;
        return Ok(ReceiveOutcome::Ok(if verified {
            Finalize::VerifyOkInPlace
        } else {
            Finalize::VerifyFailInPlaceLeftDirty
        }));
    }

    let tmp_path = make_tmpname(&target, config)?;
    let mut guard = CurrentFileGuard::new(tmp_path.clone());
    crate::io_utils::write_file_creating_parent(&tmp_path, &reconstructed, config.relative_paths)
        .map_err(CoreError::WriteIo)?;

    if verified {
        // Phase 2 redos disable backups: the backup of the original was
        // already made (or skipped) during phase 1's first pass at this file.
        if config.make_backups && !final_phase {
            backup.backup(&target).map_err(CoreError::WriteIo)?;
        }
        fs::rename(&tmp_path, &target).map_err(CoreError::WriteIo)?;
        guard.defuse();
        return Ok(ReceiveOutcome::Ok(Finalize::VerifyOkStagedRename));
    }

    if config.keep_partial {
        let dest = partial.partial_path(&target);
        partial.ensure_partial_dir(&dest, 0o777).map_err(CoreError::WriteIo)?;
        fs::rename(&tmp_path, &dest).map_err(CoreError::WriteIo)?;
        guard.defuse();
        Ok(ReceiveOutcome::Ok(Finalize::VerifyFailStagedPartialRetained(dest)))
    } else {
        // guard's Drop removes the staged tmp file.
        Ok(ReceiveOutcome::Ok(Finalize::VerifyFailStagedUnlinked))
    }
}

/// Drives one full receiver session over `from_sender`: consumes phase-1
/// token streams for every file, reports the redo set to the Generator
/// over `to_generator`, then consumes the phase-2 retransmissions for
/// just those files. Files that vanished during phase 2 are absent from
/// `redo_set` entirely, per the pinned vanished-file policy (spec §4.2).
#[allow(clippy::too_many_arguments)]
pub fn run_receiver<S: Read + Write>(
    file_list: &dyn FileList,
    target_root: &Path,
    basis: &FsBasisProvider,
    config: &SessionConfig,
    exclude: &dyn ExcludeOracle,
    backup: &dyn BackupHook,
    partial: &dyn PartialDirHook,
    from_sender: &mut MessageChannel<S>,
    to_generator: &mut MessageChannel<S>,
) -> CoreResult<Vec<(usize, Finalize)>> {
    let mut results = Vec::new();
    let mut redo_set = Vec::new();

    while !from_sender.at_end()? {
        let index = from_sender.read_i32()? as usize;
        let entry_name = file_list.entry(index).name.clone();
        match receive_one_file(
            from_sender, target_root, &entry_name, basis, config, exclude, backup, partial, false,
        )? {
            ReceiveOutcome::Ok(finalize) => results.push((index, finalize)),
            ReceiveOutcome::NeedsRedo => redo_set.push(index as u32),
        }
    }

    for &index in &redo_set {
        to_generator.write_redo(index)?;
    }
    to_generator.write_done()?;
    to_generator.flush()?;
    from_sender.reset_done();

    while !from_sender.at_end()? {
        let index = from_sender.read_i32()? as usize;
        let entry_name = file_list.entry(index).name.clone();
        let outcome = receive_one_file(
            from_sender, target_root, &entry_name, basis, config, exclude, backup, partial, true,
        )?;
        if let ReceiveOutcome::Ok(finalize) = outcome {
            results.push((index, finalize));
        }
    }

    Ok(results)
}
