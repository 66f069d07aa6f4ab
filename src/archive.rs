use std::fs;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::deadline::Deadline;
use crate::error::LiftError;
use crate::fs_util;

/// Extracts the first `.csv` member (in archive order) into `dest_dir` under
/// its base name and returns the written path.
pub fn extract_first_csv(
    archive_path: &Path,
    dest_dir: &Path,
    deadline: &Deadline,
) -> Result<PathBuf, LiftError> {
    let file = fs::File::open(archive_path).map_err(|err| {
        LiftError::Archive(format!("open {}: {err}", archive_path.display()))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|err| LiftError::Archive(err.to_string()))?;

    fs::create_dir_all(dest_dir).map_err(|err| LiftError::Filesystem(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| LiftError::Archive(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let Some(base_name) = entry
            .enclosed_name()
            .and_then(|path| path.file_name().map(|name| name.to_os_string()))
        else {
            continue;
        };
        if !base_name.to_str().map(fs_util::is_csv_name).unwrap_or(false) {
            continue;
        }

        let dest = dest_dir.join(&base_name);
        let mut temp = fs_util::temp_file_beside(&dest)?;
        let written =
            fs_util::copy_with_deadline(&mut entry, temp.as_file_mut(), deadline, "extract CSV")
                .map_err(|err| match err {
                    LiftError::Network(message) => LiftError::Archive(message),
                    other => other,
                })?;
        fs_util::persist(temp, &dest)?;
        tracing::info!(entry = entry.name(), bytes = written, dest = %dest.display(), "extracted CSV");
        return Ok(dest);
    }

    Err(LiftError::CsvNotFound(archive_path.display().to_string()))
}
