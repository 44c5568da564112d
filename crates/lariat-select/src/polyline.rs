//! Compact integer-coordinate path primitives.
//!
//! A [`Polyline`] is an immutable run of straight segments between pixel
//! locations; a selection is an ordered sequence of them. The mutable
//! [`PolylineBuffer`] accumulates points (suppressing consecutive
//! duplicates) while a path is reconstructed from search results, then
//! freezes into a `Polyline`. [`make_polygon`] joins a closed selection's
//! segments into a single polygon vertex list.

use serde::{Deserialize, Serialize};

use crate::types::{Point, SelectError};

/// An immutable path of straight line segments through pixel locations.
///
/// Always holds at least two points; the first is the start and the last
/// is the end. Equality is component-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// A single straight segment from `start` to `end`. The two endpoints
    /// may coincide (a degenerate segment).
    #[must_use]
    pub fn line(start: Point, end: Point) -> Self {
        Self(vec![start, end])
    }

    fn from_points(points: Vec<Point>) -> Self {
        debug_assert!(points.len() >= 2);
        Self(points)
    }

    /// Number of points along the path, including both endpoints. At
    /// least 2; the number of straight segments is `len() - 1`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A polyline never has fewer than two points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All points in start-to-end order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// The first point.
    #[must_use]
    pub fn start(&self) -> Point {
        self.0[0]
    }

    /// The last point.
    #[must_use]
    pub fn end(&self) -> Point {
        self.0[self.0.len() - 1]
    }

    /// A copy of this polyline with its points in the opposite order.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut points = self.0.clone();
        points.reverse();
        Self(points)
    }
}

/// A growable builder for [`Polyline`]s.
///
/// Appending a point equal to the current last point is a no-op, so paths
/// reconstructed pixel-by-pixel come out duplicate-free.
#[derive(Debug, Default)]
pub struct PolylineBuffer {
    points: Vec<Point>,
}

impl PolylineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` points.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Number of points accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no points have been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append `p`, unless it equals the point appended most recently.
    pub fn push(&mut self, p: Point) {
        if self.points.last() == Some(&p) {
            return;
        }
        self.points.push(p);
    }

    /// Reverse the accumulated points in place.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Freeze the buffer into a [`Polyline`].
    ///
    /// A single accumulated point produces a degenerate two-point line.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidArgument`] if the buffer is empty.
    pub fn into_polyline(mut self) -> Result<Polyline, SelectError> {
        match self.points.len() {
            0 => Err(SelectError::InvalidArgument(
                "cannot build a polyline from an empty buffer".into(),
            )),
            1 => {
                let p = self.points[0];
                self.points.push(p);
                Ok(Polyline::from_points(self.points))
            }
            _ => Ok(Polyline::from_points(self.points)),
        }
    }
}

/// Concatenate a closed selection's segments into one polygon vertex list.
///
/// Where consecutive segments share a join point the duplicate is
/// dropped, including the wrap-around join from the last segment's end to
/// the first segment's start. Duplicates *interior* to a segment are the
/// segment's own business and are preserved. Returns an empty list for an
/// empty segment sequence.
#[must_use]
pub fn make_polygon(segments: &[Polyline]) -> Vec<Point> {
    let Some(last) = segments.last() else {
        return Vec::new();
    };

    let mut polygon = Vec::with_capacity(segments.iter().map(Polyline::len).sum());
    let mut prev_end = last.end();
    for segment in segments {
        let skip = usize::from(segment.start() == prev_end);
        polygon.extend_from_slice(&segment.points()[skip..]);
        prev_end = segment.end();
    }
    polygon
}
