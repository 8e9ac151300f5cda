/// Paint list for the composite: what gets drawn, where, in which order

use image::DynamicImage;

use super::layout::{contain_fit, Rect};
use crate::{Color, DisplayDimensions};

/// The three layers of a composite, bottom to top
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Base,
    Background,
    Strokes,
}

#[derive(Debug, Clone)]
pub enum PaintCommand<'a> {
    /// Fill the whole output with a solid color
    Fill { color: Color },
    /// Resample `image` into `dest` and blend it source-over
    DrawImage {
        layer: Layer,
        image: &'a DynamicImage,
        dest: Rect,
    },
}

impl PaintCommand<'_> {
    pub fn layer(&self) -> Layer {
        match self {
            PaintCommand::Fill { .. } => Layer::Base,
            PaintCommand::DrawImage { layer, .. } => *layer,
        }
    }
}

/// Build the paint list for one composite.
///
/// The background (if any) is contain-fit; the stroke raster is stretched
/// over the full box with no aspect correction, since the stroke surface
/// already covers the whole box on screen.
pub fn plan<'a>(
    dims: DisplayDimensions,
    base: Color,
    background: Option<&'a DynamicImage>,
    strokes: Option<&'a DynamicImage>,
) -> Vec<PaintCommand<'a>> {
    let mut cmds = vec![PaintCommand::Fill { color: base }];

    if let Some(bg) = background {
        if let Some(dest) = contain_fit(bg.width(), bg.height(), dims) {
            cmds.push(PaintCommand::DrawImage {
                layer: Layer::Background,
                image: bg,
                dest,
            });
        }
    }

    if let Some(sketch) = strokes {
        cmds.push(PaintCommand::DrawImage {
            layer: Layer::Strokes,
            image: sketch,
            dest: Rect::full(dims),
        });
    }

    cmds
}
