//! Atomic file operations for crash-safe persistence.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{PersistenceError, Result};

/// Replaces the contents of `path` with `data` atomically.
///
/// The bytes go to a temporary file in the target's directory, are synced to
/// disk, and the temporary file is then renamed over the target. Readers see
/// either the previous contents or the new contents, never a mix. On error
/// the temporary file is removed and the previous contents stay in place.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| PersistenceError::DirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let write_err = |source| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    // Same directory as the target so the rename never crosses filesystems
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(data).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    temp_file.as_file().sync_all().map_err(write_err)?;

    temp_file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

/// Reads and deserializes JSON from a file.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|source| PersistenceError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

/// Reads JSON from a file, returning `None` if the file doesn't exist.
pub fn read_json_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        atomic_write(&path, b"{\"a\": 1, \"b\": 2, \"c\": 3}").unwrap();
        atomic_write(&path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state/nested/baseline.json");

        atomic_write(&path, b"{}").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");

        atomic_write(&path, b"{}").unwrap();
        atomic_write(&path, b"{\"x\": 1}").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("baseline.json")]);
    }

    #[test]
    fn test_failed_write_keeps_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        atomic_write(&path, b"{\"kept\": 1}").unwrap();

        // Renaming a file over a directory fails on every platform
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("inner"), b"x").unwrap();
        assert!(atomic_write(&blocked, b"{}").is_err());

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"kept\": 1}");
    }

    #[test]
    fn test_json_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        let mut data = BTreeMap::new();
        data.insert("show-a".to_string(), 1000_i64);

        atomic_write_json(&path, &data).unwrap();
        let loaded: BTreeMap<String, i64> = read_json(&path).unwrap();

        assert_eq!(data, loaded);
    }

    #[test]
    fn test_read_json_optional_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let result: Option<BTreeMap<String, i64>> = read_json_optional(&path).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_json_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let result: Result<BTreeMap<String, i64>> = read_json(&path);
        assert!(matches!(result, Err(PersistenceError::SerializeError(_))));
    }
}
