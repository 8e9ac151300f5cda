/// Rasterizer: executes a paint list into an RGBA buffer and encodes it

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageEncoder, RgbaImage};

use super::paint::PaintCommand;
use super::ExportedImage;
use crate::{Compression, DisplayDimensions, Error, Result};

/// The output raster for a single export. Owned by exactly one export call.
pub struct Canvas {
    buf: RgbaImage,
    filter: FilterType,
}

impl Canvas {
    /// Allocate a fully transparent raster of the given size.
    pub fn new(dims: DisplayDimensions, filter: FilterType) -> Self {
        Self {
            buf: RgbaImage::new(dims.width, dims.height),
            filter,
        }
    }

    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    pub fn paint(&mut self, cmd: &PaintCommand<'_>) {
        match cmd {
            PaintCommand::Fill { color } => {
                let px = color.to_pixel();
                for p in self.buf.pixels_mut() {
                    *p = px;
                }
            }
            PaintCommand::DrawImage { image, dest, .. } => self.draw_image(image, dest.to_pixels()),
        }
    }

    fn draw_image(&mut self, src: &DynamicImage, dest: super::layout::PixelRect) {
        let rgba = src.to_rgba8();
        let scaled = if rgba.dimensions() == (dest.width, dest.height) {
            rgba
        } else {
            imageops::resize(&rgba, dest.width, dest.height, self.filter)
        };
        // overlay clips to the canvas and blends source-over per pixel
        imageops::overlay(&mut self.buf, &scaled, dest.x, dest.y);
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.buf
    }

    /// Encode as PNG. Lossless at every compression level.
    pub fn encode_png(&self, compression: Compression) -> Result<Vec<u8>> {
        let level = match compression {
            Compression::Fast => CompressionType::Fast,
            Compression::Default => CompressionType::Default,
            Compression::Best => CompressionType::Best,
        };
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, level, PngFilter::Adaptive)
            .write_image(
                self.buf.as_raw(),
                self.buf.width(),
                self.buf.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| Error::EncodeFailed(e.to_string()))?;
        if out.is_empty() {
            return Err(Error::EncodeFailed("encoder produced no bytes".into()));
        }
        Ok(out)
    }
}

/// Execute a paint list onto a fresh raster.
pub fn rasterize(dims: DisplayDimensions, cmds: &[PaintCommand<'_>], filter: FilterType) -> Canvas {
    let mut canvas = Canvas::new(dims, filter);
    for cmd in cmds {
        canvas.paint(cmd);
    }
    canvas
}

/// Rasterize and encode in one step.
pub fn render_png(
    dims: DisplayDimensions,
    cmds: &[PaintCommand<'_>],
    filter: FilterType,
    compression: Compression,
) -> Result<ExportedImage> {
    let canvas = rasterize(dims, cmds, filter);
    let png_data = canvas.encode_png(compression)?;
    Ok(ExportedImage {
        width: canvas.width(),
        height: canvas.height(),
        png_data,
    })
}
