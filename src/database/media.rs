use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use super::error::{Error, ValidationError};

/*
Images arrive as data urls

data:image/png;base64,iVBORw0KGgo...
           ext        payload
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Image {
    pub extension: String,
    pub data: Vec<u8>,
}

impl TryFrom<&str> for Base64Image {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let rest = value.trim().strip_prefix("data:image/").ok_or_else(|| {
            ValidationError::InvalidImage("expected a data:image/<ext>;base64 url".to_string())
        })?;

        let (extension, payload) = rest.split_once(";base64,").ok_or_else(|| {
            ValidationError::InvalidImage("image payload must be base64 encoded".to_string())
        })?;

        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidImage(format!(
                "unsupported image type '{extension}'"
            )));
        }

        let data = STANDARD
            .decode(payload)
            .map_err(|e| ValidationError::InvalidImage(format!("{e}")))?;
        if data.is_empty() {
            return Err(ValidationError::InvalidImage("image is empty".to_string()));
        }

        Ok(Self {
            extension: extension.to_ascii_lowercase(),
            data,
        })
    }
}

/// Stores uploaded images on disk and hands out the urls they are served from.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{url}/")
        };

        Self {
            root: root.into(),
            url,
        }
    }

    /// Writes the image to `<root>/<folder>/<uuid>/image.<ext>` and returns its url.
    pub async fn save(&self, folder: &str, image: &Base64Image) -> Result<String, Error> {
        let name = format!("{folder}/{}/image.{}", Uuid::new_v4(), image.extension);
        let path = self.root.join(&name);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Internal(format!("Could not create media folder: {e}")))?;
        }
        tokio::fs::write(&path, &image.data)
            .await
            .map_err(|e| Error::Internal(format!("Could not write image: {e}")))?;

        log::debug!("Stored {} bytes at {}", image.data.len(), path.display());

        Ok(format!("{}{name}", self.url))
    }

    /// Resolves a url handed out by [`MediaStore::save`] back to its file.
    pub fn path_of(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(&self.url)?;
        if name.split('/').any(|part| part == ".." || part.is_empty()) {
            return None;
        }
        Some(self.root.join(name))
    }

    /// Best effort; a file that can't be removed is only logged.
    pub async fn remove(&self, url: &str) {
        let Some(path) = self.path_of(url) else {
            log::warn!("Refusing to remove media outside of the media root: {url}");
            return;
        };

        if let Err(e) = tokio::fs::remove_file(&path).await {
            log::warn!("Could not remove {}: {e}", path.display());
            return;
        }
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::remove_dir(parent).await;
        }
    }
}
