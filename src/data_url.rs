//! `data:` URL encoding and decoding for in-memory images
//!
//! Both the drawing surface's stroke export and the background loader hand
//! images around as base64 data URLs, the same representation a browser
//! canvas produces with `toDataURL`.

use base64::Engine as Base64Engine;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataUrlError {
    #[error("not a data URL")]
    NotDataUrl,

    #[error("data URL is not base64-encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("undecodable image ({mime}): {source}")]
    Image {
        mime: String,
        #[source]
        source: image::ImageError,
    },
}

/// Build a base64 data URL for `bytes` with the given MIME type.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    let b64 = Base64Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
    format!("data:{};base64,{}", mime, b64)
}

/// Split a data URL into its MIME type and raw payload bytes.
pub fn decode_bytes(url: &str) -> Result<(String, Vec<u8>), DataUrlError> {
    let rest = url.trim().strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotDataUrl)?;
    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().trim().to_string();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(DataUrlError::NotBase64);
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    Ok((mime, bytes))
}

/// Decode a data URL all the way to a bitmap.
///
/// The image format is sniffed from the payload; the declared MIME type is
/// only used in error messages.
pub fn decode_image(url: &str) -> Result<DynamicImage, DataUrlError> {
    let (mime, bytes) = decode_bytes(url)?;
    image::load_from_memory(&bytes).map_err(|source| DataUrlError::Image { mime, source })
}

/// MIME type for an encoded image, falling back to octet-stream when the
/// format cannot be recognized.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}
