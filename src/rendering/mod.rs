//! Rendering: layer placement, paint list, rasterization and PNG encoding

pub mod layout;
pub mod paint;
pub mod raster;

pub use layout::{contain_fit, PixelRect, Rect};
pub use paint::{Layer, PaintCommand};

use sha2::{Digest, Sha256};

/// An encoded composite, ready to be delivered as a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl ExportedImage {
    /// SHA-256 of the PNG bytes, hex-encoded. Identical composites share a digest.
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.png_data))
    }
}
