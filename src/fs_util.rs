use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::deadline::Deadline;
use crate::error::LiftError;

const COPY_CHUNK: usize = 64 * 1024;

pub fn is_csv_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Returns the first regular file in `dir` (by name) that starts with `prefix`
/// and has a `.csv` extension. A missing directory yields `None`.
pub fn find_csv_file(dir: &Path, prefix: &str) -> Result<Option<PathBuf>, LiftError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(LiftError::Filesystem(format!(
                "read {}: {err}",
                dir.display()
            )));
        }
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| LiftError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.starts_with(prefix) && is_csv_name(name) {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Deletes every `.csv` file directly inside `dir`.
pub fn remove_csv_files(dir: &Path) -> Result<Vec<PathBuf>, LiftError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(LiftError::Filesystem(err.to_string())),
    };

    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| LiftError::Filesystem(err.to_string()))?;
        let path = entry.path();
        let is_csv = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(is_csv_name)
            .unwrap_or(false);
        if path.is_file() && is_csv {
            fs::remove_file(&path).map_err(|err| {
                LiftError::Filesystem(format!("remove {}: {err}", path.display()))
            })?;
            tracing::info!(path = %path.display(), "removed existing CSV file");
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Creates a temp file next to `dest` so the final rename stays on one filesystem.
pub fn temp_file_beside(dest: &Path) -> Result<NamedTempFile, LiftError> {
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|err| LiftError::Filesystem(err.to_string()))?;
    Builder::new()
        .prefix(".liftmetrics-")
        .tempfile_in(parent)
        .map_err(|err| LiftError::Filesystem(err.to_string()))
}

pub fn persist(temp: NamedTempFile, dest: &Path) -> Result<(), LiftError> {
    temp.persist(dest)
        .map_err(|err| LiftError::Filesystem(format!("persist {}: {err}", dest.display())))?;
    Ok(())
}

pub fn write_bytes_atomic(dest: &Path, content: &[u8]) -> Result<(), LiftError> {
    let mut temp = temp_file_beside(dest)?;
    temp.write_all(content)
        .map_err(|err| LiftError::Filesystem(err.to_string()))?;
    temp.flush()
        .map_err(|err| LiftError::Filesystem(err.to_string()))?;
    persist(temp, dest)
}

/// Copies `reader` into `writer` in fixed chunks, stopping as soon as the
/// deadline expires or is cancelled.
pub fn copy_with_deadline<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    deadline: &Deadline,
    operation: &str,
) -> Result<u64, LiftError> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut written = 0u64;
    loop {
        deadline.check(operation)?;
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(read_error(err, deadline, operation)),
        };
        writer
            .write_all(&buf[..read])
            .map_err(|err| LiftError::Filesystem(format!("{operation}: {err}")))?;
        written += read as u64;
    }
    writer
        .flush()
        .map_err(|err| LiftError::Filesystem(err.to_string()))?;
    Ok(written)
}

/// HTTP body readers surface their own timeout as an opaque I/O error, so an
/// expired deadline takes precedence over the error kind.
fn read_error(err: io::Error, deadline: &Deadline, operation: &str) -> LiftError {
    if let Err(stopped) = deadline.check(operation) {
        return stopped;
    }
    match err.kind() {
        io::ErrorKind::TimedOut => LiftError::Timeout(format!("{operation}: {err}")),
        _ => LiftError::Network(format!("{operation}: {err}")),
    }
}
