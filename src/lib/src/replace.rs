//! Atomic replacement of an artifact with its signed version
//!
//! The signed bytes are first written to a temporary file next to the
//! original, so the final step is a rename on the same volume. The original
//! is only touched once the temporary file has been validated, and the
//! temporary file is removed on every exit path (it is owned by a
//! [`tempfile::NamedTempFile`], which deletes it on drop).
//!
//! A symlinked artifact is resolved first, so the signed output lands on the
//! link target and the link itself is kept. Hard links to the original are
//! not updated.

use crate::error::WSError;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Suffix prefix of the temporary files, followed by the artifact extension
pub const TEMP_SUFFIX_PREFIX: &str = ".signed-";

/// Replace the content of `original` with `signed`
///
/// When `original` is a symbolic link, the file it points to is replaced.
///
/// # Errors
/// - `IOError` if the temporary file cannot be created, written or moved
/// - `SignValidationError` if the written temporary file is missing,
///   unreadable or empty; `original` is left untouched in that case
pub fn replace_with_signed(original: &Path, signed: &[u8]) -> Result<(), WSError> {
    let target = fs::canonicalize(original)?;
    if target.as_path() != original {
        log::debug!("{} resolves to {}", original.display(), target.display());
    }

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            WSError::InternalError(format!("Not a file path: {}", target.display()))
        })?;
    let extension = crate::candidate::file_extension(&file_name).unwrap_or("bin");

    let mut temp = tempfile::Builder::new()
        .prefix(&format!("{}.", file_name))
        .suffix(&format!("{}{}", TEMP_SUFFIX_PREFIX, extension))
        .tempfile_in(dir)?;
    log::debug!("Writing signed output to {}", temp.path().display());

    temp.write_all(signed)?;
    temp.as_file().sync_all()?;

    validate_signed(&temp)?;

    // Keep the artifact's permission bits (executables stay executable)
    let permissions = fs::metadata(&target)?.permissions();
    fs::set_permissions(temp.path(), permissions)?;

    temp.persist(&target).map_err(|e| WSError::IOError(e.error))?;
    Ok(())
}

/// Check that the temporary file can stand in for the original
fn validate_signed(temp: &NamedTempFile) -> Result<(), WSError> {
    let path = temp.path();
    let metadata = fs::metadata(path).map_err(|e| {
        WSError::SignValidationError(format!("{} is missing: {}", path.display(), e))
    })?;
    if !metadata.is_file() {
        return Err(WSError::SignValidationError(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    if metadata.len() == 0 {
        return Err(WSError::SignValidationError(format!(
            "{} is empty",
            path.display()
        )));
    }
    File::open(path).map_err(|e| {
        WSError::SignValidationError(format!("{} is not readable: {}", path.display(), e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_replace_writes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.exe");
        fs::write(&path, b"UNSIGNED").unwrap();

        replace_with_signed(&path, b"SIGNED_APP").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"SIGNED_APP");
        assert_eq!(dir_names(dir.path()), vec!["app.exe"]);
    }

    #[test]
    fn test_replace_rejects_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.exe");
        fs::write(&path, b"UNSIGNED").unwrap();

        let result = replace_with_signed(&path, b"");
        assert!(matches!(result, Err(WSError::SignValidationError(_))));

        assert_eq!(fs::read(&path).unwrap(), b"UNSIGNED");
        assert_eq!(dir_names(dir.path()), vec!["app.exe"]);
    }

    #[test]
    fn test_replace_missing_original_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vanished.exe");

        let result = replace_with_signed(&path, b"SIGNED");
        assert!(matches!(result, Err(WSError::IOError(_))));
        assert!(dir_names(dir.path()).is_empty());
    }

    #[test]
    fn test_replace_large_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.exe");
        fs::write(&path, b"small").unwrap();

        let data: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        replace_with_signed(&path, &data).unwrap();
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.exe");
        fs::write(&path, b"UNSIGNED").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        replace_with_signed(&path, b"SIGNED").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let out = dir.path().join("out");
        fs::create_dir(&store).unwrap();
        fs::create_dir(&out).unwrap();
        let real = store.join("real.exe");
        let link = out.join("link.exe");
        fs::write(&real, b"UNSIGNED").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        replace_with_signed(&link, b"SIGNED").unwrap();

        assert_eq!(fs::read(&real).unwrap(), b"SIGNED");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&link).unwrap(), b"SIGNED");
        assert_eq!(dir_names(&store), vec!["real.exe"]);
        assert_eq!(dir_names(&out), vec!["link.exe"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_dangling_symlink_fails() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("gone.exe");
        std::os::unix::fs::symlink(dir.path().join("missing.exe"), &link).unwrap();

        let result = replace_with_signed(&link, b"SIGNED");
        assert!(matches!(result, Err(WSError::IOError(_))));
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(dir_names(dir.path()), vec!["gone.exe"]);
    }

    #[test]
    fn test_temp_file_lives_next_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let temp = tempfile::Builder::new()
            .prefix("app.exe.")
            .suffix(".signed-exe")
            .tempfile_in(dir.path())
            .unwrap();
        assert_eq!(temp.path().parent(), Some(dir.path()));
        assert!(validate_signed(&temp).is_err());
    }
}
