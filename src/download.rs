use std::io::Read;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::client::DatasetClient;
use crate::deadline::Deadline;
use crate::error::LiftError;
use crate::fs_util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadInfo {
    pub bytes_written: u64,
    pub content_length: Option<u64>,
    pub streamed: bool,
}

impl DownloadInfo {
    /// A declared length must match what landed on disk.
    pub fn verify(&self) -> Result<(), LiftError> {
        match self.content_length {
            Some(expected) if expected != self.bytes_written => Err(LiftError::Network(format!(
                "truncated download: expected {expected} bytes, wrote {}",
                self.bytes_written
            ))),
            _ => Ok(()),
        }
    }
}

/// Clears cached CSVs next to `destination`, then downloads the archive.
pub fn fetch_archive<C: DatasetClient + ?Sized>(
    client: &C,
    url: &str,
    destination: &Path,
    deadline: &Deadline,
) -> Result<DownloadInfo, LiftError> {
    if let Some(dir) = destination.parent() {
        fs_util::remove_csv_files(dir)?;
    }

    let started = Instant::now();
    tracing::info!(url, destination = %destination.display(), "downloading archive");
    let info = client.download(url, destination, deadline)?;
    tracing::info!(
        bytes = info.bytes_written,
        streamed = info.streamed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "archive downloaded"
    );
    Ok(info)
}

/// Copies `reader` to `destination` through a sibling temp file, so a failed,
/// cancelled or truncated transfer never leaves a partial archive behind.
pub fn stream_to_file<R: Read>(
    reader: &mut R,
    destination: &Path,
    content_length: Option<u64>,
    deadline: &Deadline,
) -> Result<DownloadInfo, LiftError> {
    let mut temp = fs_util::temp_file_beside(destination)?;
    let written = fs_util::copy_with_deadline(reader, temp.as_file_mut(), deadline, "download archive")?;
    let info = DownloadInfo {
        bytes_written: written,
        content_length,
        streamed: true,
    };
    info.verify()?;
    fs_util::persist(temp, destination)?;
    Ok(info)
}

pub fn write_buffered(destination: &Path, body: &[u8]) -> Result<(), LiftError> {
    fs_util::write_bytes_atomic(destination, body)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn streamed_and_buffered_writes_match() {
        let temp = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let streamed = temp.path().join("streamed.zip");
        let mut reader = payload.as_slice();
        let info = stream_to_file(
            &mut reader,
            &streamed,
            Some(payload.len() as u64),
            &Deadline::none(),
        )
        .unwrap();
        assert_eq!(info.bytes_written, payload.len() as u64);

        let buffered = temp.path().join("buffered.zip");
        write_buffered(&buffered, &payload).unwrap();

        assert_eq!(fs::read(&streamed).unwrap(), fs::read(&buffered).unwrap());
    }

    #[test]
    fn cancelled_stream_leaves_no_file() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("archive.zip");
        let deadline = Deadline::none();
        deadline.cancel_flag().cancel();

        let mut reader: &[u8] = b"abc";
        let err = stream_to_file(&mut reader, &dest, None, &deadline).unwrap_err();
        assert_matches!(err, LiftError::Cancelled(_));
        assert!(!dest.exists());
    }

    #[test]
    fn truncated_stream_leaves_no_file() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("archive.zip");

        let mut reader: &[u8] = b"only part";
        let err = stream_to_file(&mut reader, &dest, Some(1000), &Deadline::none()).unwrap_err();
        assert_matches!(err, LiftError::Network(_));
        assert!(!dest.exists());
    }

    #[test]
    fn verify_rejects_short_body() {
        let info = DownloadInfo {
            bytes_written: 10,
            content_length: Some(12),
            streamed: true,
        };
        assert_matches!(info.verify(), Err(LiftError::Network(_)));
    }
}
