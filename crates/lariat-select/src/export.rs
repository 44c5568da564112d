//! Rendering a finished selection to a transparent-backed PNG.
//!
//! The selection's segments are joined into a polygon, the polygon's
//! bounding box sizes the output, and every pixel whose center falls
//! inside the polygon (even-odd rule) copies the source image; everything
//! else stays fully transparent.

use std::io::Write;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::polyline::{make_polygon, Polyline};
use crate::types::{Point, SelectError};

/// Extract the region enclosed by `segments` from `image`.
///
/// The output is sized to the polygon's bounding box; pixels outside the
/// polygon (or outside the source image) are transparent black.
#[must_use]
pub fn render_selection(image: &RgbaImage, segments: &[Polyline]) -> RgbaImage {
    let polygon = make_polygon(segments);
    let Some((min, max)) = bounding_box(&polygon) else {
        return RgbaImage::new(0, 0);
    };

    let width = (max.x - min.x).max(0) as u32;
    let height = (max.y - min.y).max(0) as u32;
    let mut out = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let px = min.x + x as i32;
            let py = min.y + y as i32;
            if !contains(&polygon, px, py) {
                continue;
            }
            if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                out.put_pixel(x, y, *image.get_pixel(px as u32, py as u32));
            }
        }
    }
    out
}

/// Encode `image` as a PNG and write it to `out`.
///
/// # Errors
///
/// Returns [`SelectError::Io`] if encoding or the underlying write fails.
pub fn write_png(image: &RgbaImage, out: &mut dyn Write) -> Result<(), SelectError> {
    let encoder = PngEncoder::new(out);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Axis-aligned bounding box of a polygon, or `None` when it is empty.
fn bounding_box(polygon: &[Point]) -> Option<(Point, Point)> {
    let first = *polygon.first()?;
    let mut min = first;
    let mut max = first;
    for p in polygon {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

/// Even-odd insideness test for the pixel at `(x, y)`, evaluated at the
/// pixel's center.
fn contains(polygon: &[Point], x: i32, y: i32) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let px = f64::from(x) + 0.5;
    let py = f64::from(y) + 0.5;

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        let (ax, ay) = (f64::from(a.x), f64::from(a.y));
        let (bx, by) = (f64::from(b.x), f64::from(b.y));
        if (ay > py) != (by > py) {
            let x_cross = (bx - ax) * (py - ay) / (by - ay) + ax;
            if px < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
