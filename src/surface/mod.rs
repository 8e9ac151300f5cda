//! Drawing surface collaborators
//!
//! The exporter only needs two things from the live UI: the container's
//! on-screen size and a rasterized copy of the strokes. Both are expressed as
//! traits here so a browser canvas, a native widget or the in-memory surface
//! used by tests and the CLI can sit behind them.

pub mod memory;

pub use memory::InMemorySurface;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{BrushSettings, Color, Result};

/// Encoded image format a surface can export its strokes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }
}

/// A freehand stroke in surface coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub size: u32,
    pub points: Vec<(f32, f32)>,
}

impl Stroke {
    /// A stroke drawn with the given brush
    pub fn new(brush: BrushSettings, points: Vec<(f32, f32)>) -> Self {
        Self {
            color: brush.color,
            size: brush.size,
            points,
        }
    }
}

/// Capability set of a stroke-capturing canvas
#[async_trait]
pub trait DrawingSurface: Send + Sync {
    fn draw_stroke(&self, stroke: Stroke);
    fn clear(&self);
    fn undo(&self);
    fn redo(&self);

    /// Rasterize every stroke drawn so far and return it as a data URL.
    ///
    /// The raster uses the surface's internal resolution, which may differ
    /// from the on-screen size.
    async fn export_image(&self, format: ExportFormat) -> Result<String>;
}

/// The element that hosts the drawing surface on screen
pub trait SurfaceContainer: Send + Sync {
    /// Current laid-out size in pixels; `(0, 0)` when not mounted.
    fn offset_size(&self) -> (u32, u32);
}

/// A container with a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedContainer {
    pub width: u32,
    pub height: u32,
}

impl SurfaceContainer for FixedContainer {
    fn offset_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DisplayDimensions;

    #[test]
    fn fixed_container_measures() {
        let c = FixedContainer { width: 640, height: 480 };
        let d = DisplayDimensions::measure(&c).unwrap();
        assert_eq!((d.width, d.height), (640, 480));
    }

    #[test]
    fn unmounted_container_is_unavailable() {
        let c = FixedContainer { width: 0, height: 0 };
        assert!(DisplayDimensions::measure(&c).is_err());
    }

    #[test]
    fn stroke_deserializes_from_point_arrays() {
        let s: Stroke =
            serde_json::from_str(r##"{"color": "#ff0000", "size": 8, "points": [[1, 2], [3.5, 4]]}"##).unwrap();
        assert_eq!(s.color, Color::rgb(255, 0, 0));
        assert_eq!(s.points, vec![(1.0, 2.0), (3.5, 4.0)]);
    }
}
