//! Staged temp-file naming (spec §4.3), grounded on the source
//! implementation's `get_tmpname()`: a dot-prefixed, `.XXXXXX`-suffixed
//! sibling of the target, truncated to fit the platform's path/name
//! limits.

use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::session::SessionConfig;

#[cfg(target_os = "linux")]
const NAME_MAX: usize = 255;
#[cfg(not(target_os = "linux"))]
const NAME_MAX: usize = 255;

/// Builds a unique staged temp-file path for `target`, in `config.temp_dir`
/// if set, otherwise alongside `target`. The visible basename is
/// truncated (not the random suffix) if the full name would exceed
/// `NAME_MAX`.
pub fn make_tmpname(target: &Path, config: &SessionConfig) -> CoreResult<PathBuf> {
    let file_name = target
        .file_name()
        .ok_or_else(|| CoreError::Protocol("target path has no file name".to_string()))?
        .to_string_lossy()
        .into_owned();

    let dir = match &config.temp_dir {
        Some(dir) => dir.clone(),
        None => target.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    // ".<basename>.<suffix>" — reserve room for the leading dot and the suffix.
    let reserved = 1 + 1 + suffix.len();
    let max_basename = NAME_MAX.saturating_sub(reserved);
    if max_basename == 0 {
        return Err(CoreError::Protocol(format!(
            "temporary filename too long: {}",
            target.display()
        )));
    }
    let truncated: String = file_name.chars().take(max_basename).collect();

    Ok(dir.join(format!(".{truncated}.{suffix}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_shape() {
        let cfg = SessionConfig::default();
        let tmp = make_tmpname(Path::new("/tmp/dest/file.txt"), &cfg).unwrap();
        assert_eq!(tmp.parent(), Some(Path::new("/tmp/dest")));
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with('.'));
        assert!(name.contains("file.txt"));
    }

    #[test]
    fn uses_configured_temp_dir() {
        let mut cfg = SessionConfig::default();
        cfg.temp_dir = Some(PathBuf::from("/var/tmp/staging"));
        let tmp = make_tmpname(Path::new("/tmp/dest/file.txt"), &cfg).unwrap();
        assert_eq!(tmp.parent(), Some(Path::new("/var/tmp/staging")));
    }

    #[test]
    fn truncates_long_basenames() {
        let cfg = SessionConfig::default();
        let long_name = "x".repeat(400);
        let target = PathBuf::from(format!("/tmp/{long_name}"));
        let tmp = make_tmpname(&target, &cfg).unwrap();
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.len() <= NAME_MAX);
    }
}
