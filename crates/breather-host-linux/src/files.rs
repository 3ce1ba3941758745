//! Atomic file replacement and cross-process locking shared by the
//! file-backed adapters

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Path next to `path` with `suffix` appended to the file name
pub fn companion_path(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("breather");
    path.with_file_name(format!("{file_name}{suffix}"))
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Replace `path` with `contents` so readers never observe a partial file.
///
/// Each call writes through its own temporary file in the target directory,
/// so concurrent writers from different processes never collide.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a file, mapping "not found" to `None`
pub fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

/// Exclusive advisory lock on `<path>.lock`, released on drop
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

/// Block until this handle holds the lock guarding `path`.
///
/// The lock is held per open file, so it excludes other processes as well
/// as other handles in this one.
pub fn lock_exclusive(path: &Path) -> io::Result<FileLock> {
    let lock_path = companion_path(path, ".lock");
    fs::create_dir_all(parent_dir(&lock_path))?;

    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;
    FileExt::lock_exclusive(&file)?;
    Ok(FileLock { _file: file })
}
