/// Placement math for the composite layers

use crate::DisplayDimensions;

/// A destination rectangle in output pixels. Coordinates may be fractional,
/// exactly like canvas `drawImage` arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A destination rectangle snapped to whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// The whole output box
    pub fn full(dims: DisplayDimensions) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: f64::from(dims.width),
            height: f64::from(dims.height),
        }
    }

    /// Snap edges to the nearest pixel boundary. Never collapses below 1x1.
    pub fn to_pixels(&self) -> PixelRect {
        let x0 = self.x.round();
        let y0 = self.y.round();
        let x1 = (self.x + self.width).round();
        let y1 = (self.y + self.height).round();
        PixelRect {
            x: x0 as i64,
            y: y0 as i64,
            width: ((x1 - x0) as u32).max(1),
            height: ((y1 - y0) as u32).max(1),
        }
    }
}

/// Contain-fit an image of natural size `natural_width` x `natural_height`
/// into the display box and center it.
///
/// When the image is relatively wider than the box it spans the full width
/// and is centered vertically; otherwise it spans the full height and is
/// centered horizontally. Returns `None` for a zero-sized image, which has
/// no aspect ratio.
pub fn contain_fit(natural_width: u32, natural_height: u32, dims: DisplayDimensions) -> Option<Rect> {
    if natural_width == 0 || natural_height == 0 {
        return None;
    }
    let box_w = f64::from(dims.width);
    let box_h = f64::from(dims.height);
    let ar_img = f64::from(natural_width) / f64::from(natural_height);
    let ar_box = dims.aspect_ratio();

    let (scaled_w, scaled_h) = if ar_img > ar_box {
        (box_w, box_w / ar_img)
    } else {
        (box_h * ar_img, box_h)
    };

    Some(Rect {
        x: (box_w - scaled_w) / 2.0,
        y: (box_h - scaled_h) / 2.0,
        width: scaled_w,
        height: scaled_h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(w: u32, h: u32) -> DisplayDimensions {
        DisplayDimensions::new(w, h).unwrap()
    }

    #[test]
    fn wide_image_spans_width_and_centers_vertically() {
        let r = contain_fit(1600, 800, dims(800, 600)).unwrap();
        assert_eq!(r, Rect { x: 0.0, y: 100.0, width: 800.0, height: 400.0 });
    }

    #[test]
    fn tall_image_spans_height_and_centers_horizontally() {
        let r = contain_fit(400, 800, dims(800, 600)).unwrap();
        assert_eq!(r, Rect { x: 250.0, y: 0.0, width: 300.0, height: 600.0 });
    }

    #[test]
    fn equal_aspect_fills_box() {
        let r = contain_fit(400, 300, dims(800, 600)).unwrap();
        assert_eq!(r, Rect::full(dims(800, 600)));
    }

    #[test]
    fn small_image_is_scaled_up() {
        let r = contain_fit(10, 10, dims(800, 600)).unwrap();
        assert_eq!(r, Rect { x: 100.0, y: 0.0, width: 600.0, height: 600.0 });
        assert_eq!(r.to_pixels(), PixelRect { x: 100, y: 0, width: 600, height: 600 });

        let r = contain_fit(4, 1, dims(800, 600)).unwrap();
        assert_eq!(r, Rect { x: 0.0, y: 200.0, width: 800.0, height: 200.0 });
    }

    #[test]
    fn zero_sized_image_has_no_placement() {
        assert!(contain_fit(0, 10, dims(800, 600)).is_none());
    }

    #[test]
    fn fractional_rect_snaps_to_pixels() {
        // 3:1 image in a 100x100 box -> height 33.33, y 33.33
        let r = contain_fit(300, 100, dims(100, 100)).unwrap();
        let p = r.to_pixels();
        assert_eq!(p, PixelRect { x: 0, y: 33, width: 100, height: 34 });
    }

    #[test]
    fn sliver_never_collapses() {
        let r = contain_fit(10_000, 1, dims(50, 50)).unwrap();
        assert_eq!(r.to_pixels().height, 1);
    }
}
