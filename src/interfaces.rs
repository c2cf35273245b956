//! Out-of-scope collaborators, specified only at their interface (spec §6).

use std::io;
use std::path::{Path, PathBuf};

/// One entry of the ordered, zero-based file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub mode: u32,
    pub mtime: i64,
    /// `(device, inode)`, present when hard-link detection is active.
    pub link_info: Option<(u64, u64)>,
}

/// The file-list enumeration/metadata-transfer phase, consumed as a
/// read-only oracle by index. `Send + Sync` because the Generator,
/// Sender, and Receiver each hold a shared reference to the same list
/// concurrently (spec §5).
pub trait FileList: Send + Sync {
    fn len(&self) -> usize;
    fn entry(&self, index: usize) -> &FileEntry;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The only `FileList` implementation the core ships: an in-memory,
/// already-ordered vector (real enumeration is out of scope per spec §1).
#[derive(Debug, Clone, Default)]
pub struct VecFileList(pub Vec<FileEntry>);

impl FileList for VecFileList {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn entry(&self, index: usize) -> &FileEntry {
        &self.0[index]
    }
}

/// `exclude(path, is_dir) -> bool`, consulted by the receiver before
/// opening any target to defeat injected paths (spec §8 scenario 6).
pub trait ExcludeOracle: Send + Sync {
    fn is_excluded(&self, path: &Path, is_dir: bool) -> bool;
}

/// The default oracle: nothing is excluded.
pub struct NoExclusions;

impl ExcludeOracle for NoExclusions {
    fn is_excluded(&self, _path: &Path, _is_dir: bool) -> bool {
        false
    }
}

/// `backup(path)`, invoked before overwriting when backups are enabled.
pub trait BackupHook: Send + Sync {
    fn backup(&self, path: &Path) -> io::Result<()>;
}

/// The default hook: backups are a no-op.
pub struct NoBackup;

impl BackupHook for NoBackup {
    fn backup(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// `partial_path(target) -> path` and `ensure_partial_dir(path, mode)`.
pub trait PartialDirHook: Send + Sync {
    fn partial_path(&self, target: &Path) -> PathBuf;
    fn ensure_partial_dir(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// Stores partials alongside the target, under a fixed subdirectory name.
pub struct SiblingPartialDir {
    pub dirname: String,
}

impl Default for SiblingPartialDir {
    fn default() -> Self {
        Self { dirname: ".rsync-partial".to_string() }
    }
}

impl PartialDirHook for SiblingPartialDir {
    fn partial_path(&self, target: &Path) -> PathBuf {
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        let name = target.file_name().unwrap_or_default();
        parent.join(&self.dirname).join(name)
    }

    fn ensure_partial_dir(&self, path: &Path, mode: u32) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(mode);
                std::fs::set_permissions(parent, perms)?;
            }
        }
        Ok(())
    }
}

/// Decides whether a file needs a transfer at all before any signature
/// work happens. The full metadata comparison (mtime/size quick-check)
/// is part of the out-of-scope file-list/metadata phase; this trait is
/// the seam the generator calls into.
pub trait QuickCheck: Send + Sync {
    fn unchanged(&self, entry: &FileEntry) -> bool;
}

/// Conservative default: every file is considered for transfer.
pub struct AlwaysTransfer;

impl QuickCheck for AlwaysTransfer {
    fn unchanged(&self, _entry: &FileEntry) -> bool {
        false
    }
}
