//! The export pipeline
//!
//! One export is a linear async pipeline:
//!
//! 1. measure the surface container (fatal if it has no area)
//! 2. ask the drawing surface for its stroke raster (fatal on failure)
//! 3. decode the background and the stroke raster (each best effort)
//! 4. paint base, background (contain-fit) and strokes (stretched) onto a
//!    fresh raster at exactly the measured size
//! 5. encode PNG (fatal on failure) and deliver it under a timestamped name
//!
//! The raster is owned by the single in-flight call. Concurrent exports do
//! not coordinate; each produces its own file.

use std::sync::Arc;

use image::DynamicImage;
use log::{debug, error, info, warn};

use crate::delivery::{self, Delivered, FileSink};
use crate::rendering::paint::{self, Layer};
use crate::rendering::{raster, ExportedImage, Rect};
use crate::surface::{DrawingSurface, ExportFormat, SurfaceContainer};
use crate::{data_url, DisplayDimensions, Error, ExportConfig, Result, SketchState};

type OnFailureHandler = Arc<dyn Fn(&Error) + Send + Sync>;
type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// A composite that has been encoded but not yet delivered
#[derive(Debug)]
pub struct Composition {
    pub dimensions: DisplayDimensions,
    pub image: ExportedImage,
    /// Where the background landed, if one was drawn
    pub background_placement: Option<Rect>,
    /// Layers actually painted, bottom to top
    pub layers: Vec<Layer>,
    /// Non-fatal failures encountered along the way
    pub warnings: Vec<Error>,
}

/// Outcome of a delivered export
#[derive(Debug)]
pub struct ExportReport {
    pub composition: Composition,
    pub delivered: Delivered,
}

impl std::ops::Deref for ExportReport {
    type Target = Composition;

    fn deref(&self) -> &Composition {
        &self.composition
    }
}

/// Produces flattened PNG exports of a drawing surface
pub struct Exporter {
    config: ExportConfig,
    clock: Clock,
    on_failure: Option<OnFailureHandler>,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            clock: Arc::new(delivery::unix_millis),
            on_failure: None,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Replace the millisecond clock used for file names.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Register a callback invoked once per fatal failure in `download`.
    /// This is where a UI shows its "export failed" notice.
    pub fn on_failure<F>(&mut self, cb: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(cb));
    }

    /// Remove a previously registered failure callback
    pub fn clear_on_failure(&mut self) {
        self.on_failure = None;
    }

    /// File name for an export started now
    pub fn next_filename(&self) -> String {
        delivery::export_filename(&self.config.filename_prefix, &self.config.app_tag, (self.clock)())
    }

    /// Build and encode the composite without delivering it.
    pub async fn compose(
        &self,
        container: &dyn SurfaceContainer,
        surface: &dyn DrawingSurface,
        state: &SketchState,
    ) -> Result<Composition> {
        let dims = DisplayDimensions::measure(container)?;
        info!("Canvas dimensions: {}x{}", dims.width, dims.height);

        let sketch_url = surface.export_image(ExportFormat::Png).await.map_err(|e| match e {
            Error::StrokeExportFailed(_) => e,
            other => Error::StrokeExportFailed(other.to_string()),
        })?;

        let mut warnings = Vec::new();

        let background = async {
            match &state.background {
                Some(bg) => Some(bg.decode_async().await),
                None => None,
            }
        };
        let (background, sketch) = futures::join!(background, decode_blocking(sketch_url));

        let background = match background {
            Some(Ok(img)) => Some(img),
            Some(Err(msg)) => {
                let e = Error::BackgroundLoadFailed(msg);
                warn!("{}", e);
                warnings.push(e);
                None
            }
            None => None,
        };
        let sketch = match sketch {
            Ok(img) => Some(img),
            Err(msg) => {
                let e = Error::SketchDecodeFailed(msg);
                error!("{}", e);
                warnings.push(e);
                None
            }
        };

        let base = self.config.base_color;
        let filter = self.config.resample_filter.to_image_filter();
        let compression = self.config.compression;

        let (image, background_placement, layers) = tokio::task::spawn_blocking(move || {
            let cmds = paint::plan(dims, base, background.as_ref(), sketch.as_ref());
            let placement = cmds.iter().find_map(|c| match c {
                paint::PaintCommand::DrawImage { layer: Layer::Background, dest, .. } => Some(*dest),
                _ => None,
            });
            if let Some(r) = placement {
                debug!(
                    "Background image drawn at ({}, {}) with size {}x{}",
                    r.x, r.y, r.width, r.height
                );
            }
            let layers: Vec<Layer> = cmds.iter().map(paint::PaintCommand::layer).collect();
            let image = raster::render_png(dims, &cmds, filter, compression)?;
            Ok::<_, Error>((image, placement, layers))
        })
        .await
        .map_err(|e| Error::EncodeFailed(format!("composite task failed: {}", e)))??;

        Ok(Composition {
            dimensions: dims,
            image,
            background_placement,
            layers,
            warnings,
        })
    }

    /// Compose and deliver one export.
    ///
    /// Fatal errors propagate; non-fatal ones are logged and listed in the
    /// report's `warnings`.
    pub async fn export(
        &self,
        container: &dyn SurfaceContainer,
        surface: &dyn DrawingSurface,
        state: &SketchState,
        sink: &dyn FileSink,
    ) -> Result<ExportReport> {
        let composition = self.compose(container, surface, state).await?;
        let filename = self.next_filename();
        let delivered = sink.deliver(&filename, &composition.image.png_data).await.map_err(|e| match e {
            Error::DeliveryFailed(_) => e,
            other => Error::DeliveryFailed(other.to_string()),
        })?;
        info!("Download completed successfully: {}", delivered.filename);
        Ok(ExportReport { composition, delivered })
    }

    /// Top-level entry point for a user-initiated export.
    ///
    /// Same as `export`, but a fatal failure is also logged and reported to
    /// the `on_failure` callback exactly once.
    pub async fn download(
        &self,
        container: &dyn SurfaceContainer,
        surface: &dyn DrawingSurface,
        state: &SketchState,
        sink: &dyn FileSink,
    ) -> Result<ExportReport> {
        let res = self.export(container, surface, state, sink).await;
        if let Err(e) = &res {
            error!("Download failed: {}", e);
            if let Some(cb) = &self.on_failure {
                cb(e);
            }
        }
        res
    }
}

async fn decode_blocking(url: String) -> std::result::Result<DynamicImage, String> {
    tokio::task::spawn_blocking(move || data_url::decode_image(&url))
        .await
        .map_err(|e| format!("decode task failed: {}", e))?
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::MemorySink;
    use crate::surface::{FixedContainer, InMemorySurface, Stroke};
    use crate::{BackgroundImage, BrushSettings, Color};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct GarbageSurface;

    #[async_trait]
    impl DrawingSurface for GarbageSurface {
        fn draw_stroke(&self, _stroke: Stroke) {}
        fn clear(&self) {}
        fn undo(&self) {}
        fn redo(&self) {}
        async fn export_image(&self, _format: ExportFormat) -> Result<String> {
            Ok(data_url::encode("image/png", b"not a png"))
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl FileSink for BrokenSink {
        async fn deliver(&self, _filename: &str, _bytes: &[u8]) -> Result<Delivered> {
            Err(Error::Other("disk full".into()))
        }
    }

    fn png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn exporter() -> Exporter {
        Exporter::new(ExportConfig::default()).with_clock(|| 1234)
    }

    #[tokio::test]
    async fn filename_uses_prefix_tag_and_clock() {
        assert_eq!(exporter().next_filename(), "sketch-padavinodam-1234.png");
    }

    #[tokio::test]
    async fn sketch_decode_failure_is_not_fatal() {
        let sink = MemorySink::new();
        let c = FixedContainer { width: 40, height: 30 };
        let report = exporter()
            .export(&c, &GarbageSurface, &SketchState::default(), &sink)
            .await
            .unwrap();
        assert_eq!(report.layers, vec![Layer::Base]);
        assert!(matches!(report.warnings[..], [Error::SketchDecodeFailed(_)]));
        assert_eq!(sink.files().len(), 1);
    }

    #[tokio::test]
    async fn background_placement_is_reported() {
        let surface = InMemorySurface::new(800, 600);
        let state = SketchState::default().with_background(BackgroundImage::from_bytes(&png(1600, 800, [0, 0, 255, 255])));
        let comp = exporter().compose(&surface, &surface, &state).await.unwrap();
        assert_eq!(
            comp.background_placement,
            Some(Rect { x: 0.0, y: 100.0, width: 800.0, height: 400.0 })
        );
        assert_eq!(comp.layers, vec![Layer::Base, Layer::Background, Layer::Strokes]);
    }

    #[tokio::test]
    async fn non_stroke_surface_errors_are_wrapped() {
        struct Unmounted;
        #[async_trait]
        impl DrawingSurface for Unmounted {
            fn draw_stroke(&self, _stroke: Stroke) {}
            fn clear(&self) {}
            fn undo(&self) {}
            fn redo(&self) {}
            async fn export_image(&self, _format: ExportFormat) -> Result<String> {
                Err(Error::Other("canvas ref missing".into()))
            }
        }
        let c = FixedContainer { width: 10, height: 10 };
        let err = exporter().compose(&c, &Unmounted, &SketchState::default()).await.unwrap_err();
        assert!(matches!(err, Error::StrokeExportFailed(ref m) if m.contains("canvas ref missing")));
    }

    #[tokio::test]
    async fn delivery_failure_notifies_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut ex = exporter();
        ex.on_failure(move |e| {
            assert!(matches!(e, Error::DeliveryFailed(_)));
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let surface = InMemorySurface::new(10, 10);
        surface.draw_stroke(Stroke::new(BrushSettings::new(Color::BLACK, 2), vec![(1.0, 1.0)]));
        let res = ex.download(&surface, &surface, &SketchState::default(), &BrokenSink).await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cleared_callback_is_not_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut ex = exporter();
        ex.on_failure(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        ex.clear_on_failure();
        let c = FixedContainer { width: 0, height: 0 };
        let surface = InMemorySurface::new(10, 10);
        let sink = MemorySink::new();
        assert!(ex.download(&c, &surface, &SketchState::default(), &sink).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
