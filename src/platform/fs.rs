// NeuroSuite - platform/fs.rs
//
// Filesystem access for uploads: describe a file on disk without reading
// it (so validation can reject a 2 GB file cheaply), and load the bytes
// only when the submission actually happens.

use crate::core::model::{FileSource, UploadFile, UploadPayload};
use crate::util::error::ValidationError;
use std::io;
use std::path::Path;

/// Describe the file at `path` as an upload candidate.
///
/// Only metadata is read. Directories are rejected as `InvalidInput`.
pub fn candidate_from_path(path: &Path) -> io::Result<UploadFile> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a regular file", path.display()),
        ));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadFile::from_path(name, meta.len(), path.to_path_buf()))
}

/// Load the bytes of a selected file for a multipart upload.
pub async fn load_payload(file: &UploadFile) -> Result<UploadPayload, ValidationError> {
    let data = match &file.source {
        FileSource::Memory(bytes) => bytes.clone(),
        FileSource::Path(path) => tokio::fs::read(path)
            .await
            .map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read upload");
                ValidationError::FileUnreadable {
                    file_name: file.name.clone(),
                    reason: e.to_string(),
                }
            })?
            .into(),
    };
    Ok(UploadPayload {
        file_name: file.name.clone(),
        data,
    })
}
