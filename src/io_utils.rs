//! Small filesystem helpers shared by the basis providers and the demo
//! binary. The teacher's version of this module panicked on a missing
//! file; a library has no business aborting the process just because a
//! basis candidate doesn't exist, so these return `io::Result` instead.

use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
}

pub fn write_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)
}

/// Writes `content` to `path`; if creation fails because a parent
/// directory doesn't exist and `create_missing_dirs` is set, creates the
/// parent directory and retries once. Mirrors
/// `SiblingPartialDir::ensure_partial_dir`'s directory-creation pattern.
pub fn write_file_creating_parent(
    path: &Path,
    content: &[u8],
    create_missing_dirs: bool,
) -> io::Result<()> {
    match write_file(path, content) {
        Err(e) if create_missing_dirs && e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(parent, fs::Permissions::from_mode(0o777))?;
                }
            }
            write_file(path, content)
        }
        other => other,
    }
}
