//! Basis selection (spec §4.1 "Basis selection order", shared by the
//! Generator and the Receiver): first hit wins among in-place target,
//! partial-dir copy, live target, compare-dest, or no basis at all.

use std::io;
use std::path::{Path, PathBuf};

use crate::interfaces::FileEntry;
use crate::io_utils;
use crate::session::SessionConfig;

/// Opens the full contents of whatever basis or source file is relevant
/// for `entry`. Returning `Ok` with empty bytes is a legitimate "no
/// basis" result, not an error.
pub trait FileBytesProvider: Send + Sync {
    fn open(&self, entry: &FileEntry) -> io::Result<Vec<u8>>;
}

/// Basis provider backed by the real filesystem, implementing the
/// five-step selection order from spec §4.1.
pub struct FsBasisProvider {
    pub target_root: PathBuf,
    pub in_place_active: bool,
    pub partial_dir: Option<PathBuf>,
    pub compare_dest: Option<PathBuf>,
}

impl FsBasisProvider {
    #[must_use]
    pub fn from_config(target_root: PathBuf, config: &SessionConfig) -> Self {
        Self {
            target_root,
            in_place_active: config.in_place,
            partial_dir: config.partial_dir.clone(),
            compare_dest: config.compare_dest.clone(),
        }
    }

    /// Resolves the basis path for `entry`, first hit wins. `None` means
    /// no basis exists (a full transfer is required).
    #[must_use]
    pub fn resolve_basis_path(&self, entry: &FileEntry) -> Option<PathBuf> {
        let live_target = self.target_root.join(&entry.name);

        if self.in_place_active && live_target.is_file() {
            return Some(live_target);
        }
        if let Some(partial_dir) = &self.partial_dir {
            let candidate = partial_dir.join(&entry.name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if live_target.is_file() {
            return Some(live_target);
        }
        if let Some(compare_dest) = &self.compare_dest {
            let candidate = compare_dest.join(&entry.name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

impl FileBytesProvider for FsBasisProvider {
    fn open(&self, entry: &FileEntry) -> io::Result<Vec<u8>> {
        match self.resolve_basis_path(entry) {
            Some(path) => io_utils::read_file(&path),
            None => Ok(Vec::new()),
        }
    }
}

/// Source-file provider for the sender: a plain read relative to the
/// source root, no basis-selection fallback chain.
pub struct FsSourceProvider {
    pub source_root: PathBuf,
}

impl FileBytesProvider for FsSourceProvider {
    fn open(&self, entry: &FileEntry) -> io::Result<Vec<u8>> {
        let window = crate::window::open_source_window(&self.source_root.join(&entry.name))?;
        Ok(window.as_slice().to_vec())
    }
}

/// An in-memory provider for tests: maps file names directly to bytes.
#[derive(Default, Clone)]
pub struct MapBytesProvider(pub std::collections::HashMap<String, Vec<u8>>);

impl FileBytesProvider for MapBytesProvider {
    fn open(&self, entry: &FileEntry) -> io::Result<Vec<u8>> {
        Ok(self.0.get(&entry.name).cloned().unwrap_or_default())
    }
}

#[must_use]
pub fn source_file_exists(source_root: &Path, entry: &FileEntry) -> bool {
    source_root.join(&entry.name).is_file()
}
