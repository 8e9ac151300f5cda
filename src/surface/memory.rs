/// In-memory drawing surface with undo/redo history and a disc-stamping rasterizer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Pixel, Rgba, RgbaImage};
use log::debug;

use super::{DrawingSurface, ExportFormat, Stroke, SurfaceContainer};
use crate::{data_url, BrushSettings, Color, Error, Result};

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Default)]
struct History {
    strokes: Vec<Stroke>,
    redo: Vec<Stroke>,
}

/// A drawing surface that keeps its strokes in memory
///
/// The internal raster resolution is fixed at construction, while the
/// displayed size can change with `resize`, the way a canvas element keeps its
/// backing store while CSS stretches it.
pub struct InMemorySurface {
    resolution: (u32, u32),
    display: Mutex<(u32, u32)>,
    history: Mutex<History>,
    fail_exports: AtomicBool,
}

impl InMemorySurface {
    /// A surface whose internal resolution equals its displayed size
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_resolution((width, height), (width, height))
    }

    pub fn with_resolution(display: (u32, u32), resolution: (u32, u32)) -> Self {
        Self {
            resolution,
            display: Mutex::new(display),
            history: Mutex::new(History::default()),
            fail_exports: AtomicBool::new(false),
        }
    }

    /// Change the displayed size; the internal resolution stays put.
    pub fn resize(&self, width: u32, height: u32) {
        *lock(&self.display) = (width, height);
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Make subsequent `export_image` calls fail, for failure injection.
    pub fn fail_exports(&self, fail: bool) {
        self.fail_exports.store(fail, Ordering::SeqCst);
    }

    pub fn strokes(&self) -> Vec<Stroke> {
        lock(&self.history).strokes.clone()
    }

    pub fn can_undo(&self) -> bool {
        !lock(&self.history).strokes.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !lock(&self.history).redo.is_empty()
    }

    /// Convenience for callers holding the toolbar state
    pub fn draw_with(&self, brush: BrushSettings, points: Vec<(f32, f32)>) {
        self.draw_stroke(Stroke::new(brush, points));
    }

    /// Rasterize the current strokes onto a transparent canvas.
    pub fn rasterize(&self) -> RgbaImage {
        let (w, h) = self.resolution;
        rasterize_strokes(w, h, &self.strokes())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl DrawingSurface for InMemorySurface {
    fn draw_stroke(&self, stroke: Stroke) {
        let mut h = lock(&self.history);
        h.strokes.push(stroke);
        h.redo.clear();
    }

    fn clear(&self) {
        let mut h = lock(&self.history);
        h.strokes.clear();
        h.redo.clear();
    }

    fn undo(&self) {
        let mut h = lock(&self.history);
        if let Some(s) = h.strokes.pop() {
            h.redo.push(s);
        }
    }

    fn redo(&self) {
        let mut h = lock(&self.history);
        if let Some(s) = h.redo.pop() {
            h.strokes.push(s);
        }
    }

    async fn export_image(&self, format: ExportFormat) -> Result<String> {
        if self.fail_exports.load(Ordering::SeqCst) {
            return Err(Error::StrokeExportFailed("surface export disabled".into()));
        }
        let (w, h) = self.resolution;
        if w == 0 || h == 0 {
            return Err(Error::StrokeExportFailed(format!("surface has no backing store ({}x{})", w, h)));
        }
        let strokes = self.strokes();
        debug!("Rasterizing {} strokes at {}x{}", strokes.len(), w, h);

        tokio::task::spawn_blocking(move || {
            let raster = rasterize_strokes(w, h, &strokes);
            let bytes = encode(raster, format)?;
            Ok::<_, Error>(data_url::encode(format.mime(), &bytes))
        })
        .await
        .map_err(|e| Error::StrokeExportFailed(format!("export task failed: {}", e)))?
    }
}

impl SurfaceContainer for InMemorySurface {
    fn offset_size(&self) -> (u32, u32) {
        *lock(&self.display)
    }
}

fn encode(raster: RgbaImage, format: ExportFormat) -> Result<Vec<u8>> {
    let mut out = std::io::Cursor::new(Vec::new());
    match format {
        ExportFormat::Png => DynamicImage::ImageRgba8(raster)
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::StrokeExportFailed(e.to_string()))?,
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel; flatten onto white first.
            let mut flat = RgbaImage::from_pixel(raster.width(), raster.height(), Color::WHITE.to_pixel());
            image::imageops::overlay(&mut flat, &raster, 0, 0);
            let rgb = DynamicImage::ImageRgba8(flat).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                .encode_image(&rgb)
                .map_err(|e| Error::StrokeExportFailed(e.to_string()))?
        }
    }
    Ok(out.into_inner())
}

/// Rasterize strokes as round-capped polylines onto a transparent canvas.
pub fn rasterize_strokes(width: u32, height: u32, strokes: &[Stroke]) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, Color::TRANSPARENT.to_pixel());
    for stroke in strokes {
        stamp_stroke(&mut canvas, stroke);
    }
    canvas
}

fn stamp_stroke(canvas: &mut RgbaImage, stroke: &Stroke) {
    let Some(&first) = stroke.points.first() else {
        return;
    };
    let radius = stroke.size.max(1) as f32 / 2.0;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for &(x, y) in &stroke.points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    // Float-to-int casts saturate, so off-canvas strokes produce empty ranges.
    let x0 = (min_x - radius - 1.0).floor().max(0.0) as u32;
    let y0 = (min_y - radius - 1.0).floor().max(0.0) as u32;
    let x1 = ((max_x + radius + 1.0).ceil() as u32).min(canvas.width());
    let y1 = ((max_y + radius + 1.0).ceil() as u32).min(canvas.height());

    let [r, g, b, a] = stroke.color.to_pixel().0;
    for y in y0..y1 {
        for x in x0..x1 {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let d = distance_to_polyline(p, &stroke.points);
            // One pixel of linear falloff at the edge
            let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }
            let alpha = (f32::from(a) * coverage).round() as u8;
            canvas.get_pixel_mut(x, y).blend(&Rgba([r, g, b, alpha]));
        }
    }
}

fn distance_to_polyline(p: (f32, f32), points: &[(f32, f32)]) -> f32 {
    if points.len() == 1 {
        return distance(p, points[0]);
    }
    points
        .windows(2)
        .map(|seg| distance_to_segment(p, seg[0], seg[1]))
        .fold(f32::INFINITY, f32::min)
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(p, a);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, (a.0 + t * dx, a.1 + t * dy))
}

fn distance(p: (f32, f32), q: (f32, f32)) -> f32 {
    ((p.0 - q.0).powi(2) + (p.1 - q.1).powi(2)).sqrt()
}
