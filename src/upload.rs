/*
 *     Copyright (C) 2023  Fritz Ochsmann
 *
 *     This program is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU Affero General Public License as published
 *     by the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     This program is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU Affero General Public License for more details.
 *
 *     You should have received a copy of the GNU Affero General Public License
 *     along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use crate::prelude::*;
use axum::body::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// 5 MiB
pub const MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

/// Accepted extensions and the content type each one must arrive with.
const ALLOWED_TYPES: [(&str, &str); 3] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

/// Stores task attachments below a directory that is served under `/uploads`.
#[derive(Debug, Clone)]
pub struct Uploads {
    directory: PathBuf,
}

/// A file that passed the type and size checks but is not written yet.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    extension: String,
    data: Bytes,
}

impl Uploads {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    pub fn accept(
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<PendingUpload> {
        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| {
                ApplicationError::UploadRejected(format!("file name {file_name:?}"))
            })?;
        let expected = ALLOWED_TYPES
            .iter()
            .find(|(allowed, _)| *allowed == extension)
            .map(|(_, content_type)| *content_type)
            .ok_or_else(|| ApplicationError::UploadRejected(format!("extension {extension}")))?;

        if content_type != Some(expected) {
            return Err(ApplicationError::UploadRejected(format!(
                "content type {content_type:?}"
            )));
        }

        if data.len() > MAX_UPLOAD_SIZE {
            return Err(ApplicationError::UploadRejected(format!(
                "{} bytes exceed the limit",
                data.len()
            )));
        }

        Ok(PendingUpload { extension, data })
    }

    /// Writes the file and returns its public path.
    #[instrument(skip_all)]
    pub async fn store(&self, upload: PendingUpload) -> Result<String> {
        let name = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            nanoid::nanoid!(),
            upload.extension
        );
        tokio::fs::write(self.directory.join(&name), &upload.data).await?;
        info!("Stored upload {name}");

        Ok(format!("uploads/{name}"))
    }

    /// Removes a file returned by [`Uploads::store`].
    #[instrument(skip(self))]
    pub async fn discard(&self, path: &str) {
        let Some(name) = path.strip_prefix("uploads/") else {
            warn!("Refusing to discard {path}");
            return;
        };

        match tokio::fs::remove_file(self.directory.join(name)).await {
            Ok(()) => info!("Discarded upload {name}"),
            Err(error) => warn!("Unable to discard upload {name}: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept() {
        assert!(Uploads::accept(Some("a.png"), Some("image/png"), Bytes::from_static(b"png")).is_ok());
        assert!(Uploads::accept(Some("A.JPG"), Some("image/jpeg"), Bytes::from_static(b"jpg")).is_ok());

        assert!(matches!(
            Uploads::accept(Some("a.gif"), Some("image/gif"), Bytes::from_static(b"gif")),
            Err(ApplicationError::UploadRejected(_))
        ));
        assert!(matches!(
            Uploads::accept(Some("a.png"), Some("text/plain"), Bytes::from_static(b"png")),
            Err(ApplicationError::UploadRejected(_))
        ));
        assert!(matches!(
            Uploads::accept(Some("a.png"), Some("image/jpeg"), Bytes::from_static(b"png")),
            Err(ApplicationError::UploadRejected(_))
        ));
        assert!(matches!(
            Uploads::accept(None, Some("image/png"), Bytes::from_static(b"png")),
            Err(ApplicationError::UploadRejected(_))
        ));
        assert!(matches!(
            Uploads::accept(
                Some("a.png"),
                Some("image/png"),
                Bytes::from(vec![0u8; MAX_UPLOAD_SIZE + 1])
            ),
            Err(ApplicationError::UploadRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_store() -> Result<()> {
        let directory = tempfile::tempdir()?;
        let uploads = Uploads::new(directory.path());
        uploads.prepare().await?;

        let upload = Uploads::accept(Some("a.png"), Some("image/png"), Bytes::from_static(b"png"))?;
        let path = uploads.store(upload).await?;

        assert!(path.starts_with("uploads/") && path.ends_with(".png"));
        let name = path.trim_start_matches("uploads/");
        assert_eq!(b"png".to_vec(), tokio::fs::read(directory.path().join(name)).await?);

        uploads.discard(&path).await;
        assert!(!directory.path().join(name).exists());

        Ok(())
    }
}
