//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing or delivering an export
#[derive(Error, Debug)]
pub enum Error {
    /// The surface container has no measurable size (not mounted or zero area)
    #[error("Surface layout unavailable: container measured {width}x{height}")]
    LayoutUnavailable { width: u32, height: u32 },

    /// The drawing surface could not rasterize its strokes
    #[error("Stroke export failed: {0}")]
    StrokeExportFailed(String),

    /// The background image could not be decoded
    #[error("Failed to load background image: {0}")]
    BackgroundLoadFailed(String),

    /// The rasterized stroke image could not be decoded for compositing
    #[error("Failed to load sketch image: {0}")]
    SketchDecodeFailed(String),

    /// The composite raster could not be serialized
    #[error("Failed to encode output image: {0}")]
    EncodeFailed(String),

    /// The encoded file could not be handed to its destination
    #[error("Failed to deliver file: {0}")]
    DeliveryFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error aborts an export.
    ///
    /// Background and sketch decode failures are best effort: the composite
    /// proceeds with whatever layers were drawn.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::BackgroundLoadFailed(_) | Error::SketchDecodeFailed(_)
        )
    }
}
