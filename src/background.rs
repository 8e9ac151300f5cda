//! Background image loading
//!
//! Mirrors the upload flow of the drawing tool: a user-selected file is read
//! and turned into a data URL, which is what the UI keeps as its background.
//! Decoding into a bitmap happens lazily, at export time.

use std::path::Path;

use image::DynamicImage;
use log::debug;

use crate::data_url::{self, DataUrlError};
use crate::Result;

/// A background image as held by the UI: an encoded data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundImage {
    data_url: String,
}

impl BackgroundImage {
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self { data_url: data_url.into() }
    }

    /// Wrap already-encoded image bytes; the MIME type is sniffed from them.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_data_url(data_url::encode(data_url::sniff_mime(bytes), bytes))
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Decode the bitmap. Its natural size is the decoded image's size.
    pub fn decode(&self) -> std::result::Result<DynamicImage, DataUrlError> {
        data_url::decode_image(&self.data_url)
    }

    /// Decode on the blocking pool so the caller's task can yield meanwhile.
    pub async fn decode_async(&self) -> std::result::Result<DynamicImage, String> {
        let url = self.data_url.clone();
        tokio::task::spawn_blocking(move || data_url::decode_image(&url))
            .await
            .map_err(|e| format!("decode task failed: {}", e))?
            .map_err(|e| e.to_string())
    }
}

/// Read a user-selected file and surface it as a background image.
///
/// Only reading can fail here; an unreadable image format is detected when
/// the background is decoded for export.
pub async fn load_file(path: impl AsRef<Path>) -> Result<BackgroundImage> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    debug!("Loaded background {} ({} bytes)", path.display(), bytes.len());
    Ok(BackgroundImage::from_bytes(&bytes))
}
