//! Sketch Export
//!
//! Flattens a freehand sketch and its optional background image into a single
//! PNG whose pixel size matches the on-screen drawing surface exactly.
//!
//! # Layers
//!
//! The composite is drawn in a fixed z-order:
//!
//! - **Base**: opaque white (configurable) so transparent regions never leak
//! - **Background**: contain-fit and centered, the way a CSS
//!   `background-size: contain; background-position: center` box shows it
//! - **Strokes**: the surface's stroke raster stretched over the whole box
//!
//! # Example
//!
//! ```no_run
//! use sketch_export::delivery::DirectorySink;
//! use sketch_export::surface::InMemorySurface;
//! use sketch_export::{ExportConfig, SketchState};
//!
//! # async fn run() -> sketch_export::Result<()> {
//! let exporter = sketch_export::new_exporter(ExportConfig::default())?;
//! let surface = InMemorySurface::new(800, 600);
//! let state = SketchState::default();
//! surface.draw_with(state.brush, vec![(10.0, 10.0), (200.0, 150.0)]);
//!
//! let sink = DirectorySink::new("exports");
//! let report = exporter.export(&surface, &surface, &state, &sink).await?;
//! println!("wrote {}", report.delivered.filename);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod error;
pub use error::{Error, Result};

pub mod color;
pub use color::Color;

// Data URL codec shared by the surface and background loaders
pub mod data_url;

// Background image loading (file -> data URL -> bitmap)
pub mod background;
pub use background::BackgroundImage;

// Drawing surface collaborators plus an in-memory implementation
pub mod surface;

// Layout, paint list and rasterizer for the composite
pub mod rendering;

// Scoped file delivery
pub mod delivery;

pub mod exporter;
pub use exporter::{Composition, ExportReport, Exporter};

// Stderr backend for the `log` facade used by the binary
pub mod logger;

/// Resampling filter used when a layer is scaled into the output box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    pub(crate) fn to_image_filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// PNG compression effort. Every level is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    Fast,
    Default,
    Best,
}

/// Configuration for the exporter
///
/// The defaults reproduce the browser tool's output: a white base, files
/// named `sketch-padavinodam-<millis>.png`, and the best lossless
/// compression.
///
/// # Examples
///
/// ```
/// let cfg = sketch_export::ExportConfig::default();
/// assert_eq!(cfg.app_tag, "padavinodam");
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Application tag embedded in every exported filename
    pub app_tag: String,
    /// Leading filename component
    pub filename_prefix: String,
    /// Opaque base layer painted before any other layer
    pub base_color: Color,
    /// Filter used to resample background and stroke layers
    pub resample_filter: ResampleFilter,
    /// PNG compression effort
    pub compression: Compression,
    /// Directory used by the CLI's directory sink
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            app_tag: "padavinodam".to_string(),
            filename_prefix: "sketch".to_string(),
            base_color: Color::WHITE,
            resample_filter: ResampleFilter::Triangle,
            compression: Compression::Best,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExportConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let cfg: ExportConfig = serde_json::from_str(&text)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would produce an unusable filename or a
    /// translucent base layer.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("app_tag", &self.app_tag), ("filename_prefix", &self.filename_prefix)] {
            if value.trim().is_empty() {
                return Err(Error::ConfigError(format!("{} must not be empty", name)));
            }
            if value.contains(['/', '\\']) || value.contains("..") {
                return Err(Error::ConfigError(format!(
                    "{} must not contain path components: {:?}",
                    name, value
                )));
            }
        }
        if self.base_color.alpha() != 255 {
            return Err(Error::ConfigError(format!(
                "base_color must be opaque, got {}",
                self.base_color
            )));
        }
        Ok(())
    }
}

/// On-screen size of the drawing surface, measured at export time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayDimensions {
    pub width: u32,
    pub height: u32,
}

impl DisplayDimensions {
    /// Both sides must be positive; anything else means the surface is not laid out.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::LayoutUnavailable { width, height });
        }
        Ok(Self { width, height })
    }

    /// Measure the container right now. Never cached: the surface can be
    /// resized between exports.
    pub fn measure(container: &dyn surface::SurfaceContainer) -> Result<Self> {
        let (width, height) = container.offset_size();
        Self::new(width, height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Brush color and size as chosen in the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    pub color: Color,
    pub size: u32,
}

impl BrushSettings {
    pub const MIN_SIZE: u32 = 1;
    pub const MAX_SIZE: u32 = 40;

    /// Build brush settings, clamping the size into the slider's range.
    pub fn new(color: Color, size: u32) -> Self {
        Self {
            color,
            size: size.clamp(Self::MIN_SIZE, Self::MAX_SIZE),
        }
    }
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self::new(Color::BLACK, 4)
    }
}

/// UI state the exporter reads at call time
///
/// Passed in explicitly rather than read from globals, so an export is a
/// function of its arguments.
#[derive(Debug, Clone, Default)]
pub struct SketchState {
    pub brush: BrushSettings,
    pub background: Option<BackgroundImage>,
}

impl SketchState {
    pub fn with_background(mut self, background: BackgroundImage) -> Self {
        self.background = Some(background);
        self
    }
}

/// Create an exporter with a validated configuration
pub fn new_exporter(config: ExportConfig) -> Result<Exporter> {
    config.validate()?;
    Ok(Exporter::new(config))
}
