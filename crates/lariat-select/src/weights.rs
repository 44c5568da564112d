//! Edge weight functions for the intelligent-scissors search.
//!
//! The "edge-ness" of a pixel-to-pixel step is scored by the intensity
//! gradient *perpendicular* to it (the cross-gradient), scaled by the
//! step's geometric length. A strong perpendicular gradient means the step
//! runs along an image edge. Subtracting that reward from a per-direction
//! ceiling turns it into a non-negative cost, so the shortest-paths solver
//! is drawn toward strong edges.
//!
//! Two weighers are available through [`make_weigher`]: one on a
//! band-averaged grayscale plane, and one that takes the strongest
//! gradient across the color channels (which sees hue boundaries between
//! equally bright regions).

use image::RgbaImage;
use lariat_graph::EdgeWeigher;

use crate::grid::{GridEdge, PixelGrid};
use crate::types::SelectError;

/// Fixed cost substituted for axis-aligned edges that touch the image's
/// outermost rows or columns. Slightly below the axis-aligned ceiling, so
/// paths can run along the border to reach subjects the frame cuts off
/// without the border outcompeting real image edges.
const BORDER_WEIGHT: i32 = 180 - 64;

/// Cross-gradient ceiling for axis-aligned (even) directions.
const GRAD_MAX_AXIS: i32 = 180;

/// Cross-gradient ceiling for diagonal (odd) directions.
const GRAD_MAX_DIAGONAL: i32 = 255;

/// Weigher names recognized by [`make_weigher`], in presentation order.
const WEIGHT_NAMES: [&str; 2] = ["CrossGradMono", "ColoredWeight"];

/// The names of weight functions the factory can create.
#[must_use]
pub fn weight_names() -> &'static [&'static str] {
    &WEIGHT_NAMES
}

/// Create the weigher named `name` for edges of `grid`.
///
/// # Errors
///
/// Returns [`SelectError::UnknownWeigher`] for an unrecognized name.
pub fn make_weigher(
    name: &str,
    grid: &PixelGrid,
) -> Result<Box<dyn EdgeWeigher<GridEdge> + Send>, SelectError> {
    match name {
        "CrossGradMono" => Ok(Box::new(GradMonoWeigher::new(grid))),
        "ColoredWeight" => Ok(Box::new(ColorMaxWeigher::new(grid))),
        other => Err(SelectError::UnknownWeigher(other.to_owned())),
    }
}

/// One 8-bit sample plane extracted from an image, addressable by pixel
/// location. Weighers pull their planes out once at construction so that
/// per-edge weighing is a handful of array reads.
struct Channel {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl Channel {
    /// Extract color band `band` (0 = red, 1 = green, 2 = blue).
    fn from_band(image: &RgbaImage, band: usize) -> Self {
        debug_assert!(band < 3);
        Self {
            width: image.width(),
            height: image.height(),
            samples: image.pixels().map(|px| px.0[band]).collect(),
        }
    }

    /// Build a luminance plane by averaging the three color bands with
    /// equal weights (alpha excluded).
    fn luminance(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            samples: image
                .pixels()
                .map(|px| {
                    let sum = u16::from(px.0[0]) + u16::from(px.0[1]) + u16::from(px.0[2]);
                    (sum / 3) as u8
                })
                .collect(),
        }
    }

    fn sample(&self, x: u32, y: u32) -> i32 {
        i32::from(self.samples[x as usize + self.width as usize * y as usize])
    }

    /// Decompose a vertex id into its pixel coordinates.
    fn locate(&self, id: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((id % w) as u32, (id / w) as u32)
    }
}

/// Magnitude of the intensity slope in `ch` perpendicular to direction
/// `dir` at the edge leaving pixel `(x, y)`, multiplied by the edge's
/// geometric length.
///
/// Axis-aligned directions average the two finite differences straddling
/// the edge (hence the division by 4: two sums of two samples, one pixel
/// apart in the perpendicular axis, two pixels apart along it). When such
/// an edge hugs the image border the perpendicular neighbors do not
/// exist and the fixed [`BORDER_WEIGHT`] is returned instead. Diagonal
/// directions difference the two opposite corners of the 2x2 block the
/// edge spans; the factor sqrt(2) edge length cancels against the
/// sqrt(2)-longer sampling distance.
///
/// Requires that the edge `(x, y, dir)` is valid for the plane's bounds.
fn cross_grad(ch: &Channel, x: u32, y: u32, dir: u8) -> i32 {
    let (w, h) = (ch.width, ch.height);
    let s = |x: u32, y: u32| ch.sample(x, y);
    match dir {
        0 => {
            if y == 0 || y == h - 1 {
                BORDER_WEIGHT
            } else {
                ((s(x, y + 1) + s(x + 1, y + 1)) - (s(x, y - 1) + s(x + 1, y - 1))).abs() / 4
            }
        }
        1 => (s(x + 1, y) - s(x, y - 1)).abs(),
        2 => {
            if x == 0 || x == w - 1 {
                BORDER_WEIGHT
            } else {
                ((s(x + 1, y - 1) + s(x + 1, y)) - (s(x - 1, y - 1) + s(x - 1, y))).abs() / 4
            }
        }
        3 => (s(x, y - 1) - s(x - 1, y)).abs(),
        4 => {
            if y == 0 || y == h - 1 {
                BORDER_WEIGHT
            } else {
                ((s(x, y - 1) + s(x - 1, y - 1)) - (s(x, y + 1) + s(x - 1, y + 1))).abs() / 4
            }
        }
        5 => (s(x - 1, y) - s(x, y + 1)).abs(),
        6 => {
            if x == 0 || x == w - 1 {
                BORDER_WEIGHT
            } else {
                ((s(x - 1, y + 1) + s(x - 1, y)) - (s(x + 1, y + 1) + s(x + 1, y))).abs() / 4
            }
        }
        7 => (s(x, y + 1) - s(x + 1, y)).abs(),
        _ => unreachable!("direction code out of range: {dir}"),
    }
}

/// Ceiling on the cross-gradient for a direction class. Subtracting the
/// measured gradient from this converts reward into cost and guarantees a
/// non-negative result for byte-valued planes.
fn grad_max(dir: u8) -> i32 {
    if dir % 2 == 0 {
        GRAD_MAX_AXIS
    } else {
        GRAD_MAX_DIAGONAL
    }
}

/// Weighs edges cheaper when they run perpendicular to a strong brightness
/// gradient in a band-averaged grayscale view of the image.
pub struct GradMonoWeigher {
    gray: Channel,
}

impl GradMonoWeigher {
    /// Build the grayscale plane for `grid`'s image.
    #[must_use]
    pub fn new(grid: &PixelGrid) -> Self {
        Self {
            gray: Channel::luminance(grid.image()),
        }
    }
}

impl EdgeWeigher<GridEdge> for GradMonoWeigher {
    fn weight(&self, edge: &GridEdge) -> u32 {
        let (x, y) = self.gray.locate(edge.start_id);
        (grad_max(edge.dir) - cross_grad(&self.gray, x, y, edge.dir)) as u32
    }
}

/// Weighs edges by the strongest cross-gradient across the three color
/// bands, so boundaries between differently colored regions of similar
/// brightness still attract the path.
pub struct ColorMaxWeigher {
    bands: [Channel; 3],
}

impl ColorMaxWeigher {
    /// Extract the three color planes from `grid`'s image.
    #[must_use]
    pub fn new(grid: &PixelGrid) -> Self {
        let image = grid.image();
        Self {
            bands: [
                Channel::from_band(image, 0),
                Channel::from_band(image, 1),
                Channel::from_band(image, 2),
            ],
        }
    }
}

impl EdgeWeigher<GridEdge> for ColorMaxWeigher {
    fn weight(&self, edge: &GridEdge) -> u32 {
        let (x, y) = self.bands[0].locate(edge.start_id);
        let strongest = self
            .bands
            .iter()
            .map(|band| cross_grad(band, x, y, edge.dir))
            .max()
            .unwrap_or(0);
        (grad_max(edge.dir) - strongest) as u32
    }
}
