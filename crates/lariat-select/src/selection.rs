//! The selection state machine and the straight-line selection tool.
//!
//! A selection is built by committing points: between consecutive points a
//! segment is appended, and the finished selection closes back on its
//! starting point. The state-machine bookkeeping (states, the segment
//! sequence, events) lives once in [`ModelCore`]; the concrete tools
//! ([`PointToPointModel`] here, `ScissorsModel` in the sibling module)
//! decide what path a committed segment takes.

use std::io::Write;
use std::sync::Arc;

use image::RgbaImage;

use crate::events::{EventKind, Listeners, SelectionEvent};
use crate::export;
use crate::polyline::Polyline;
use crate::types::{Point, SelectError, SelectionState};

/// The operations every selection tool supports.
///
/// The variant-specific hooks are `add_point` (how a segment is routed),
/// `live_wire` (the provisional segment to the cursor), `move_point`
/// (re-routing around a moved control point), and `cancel_processing`.
pub trait SelectionModel {
    /// The model's current state.
    fn state(&self) -> SelectionState;

    /// Read-only view of the committed segments, in order.
    fn selection(&self) -> &[Polyline];

    /// The raster being selected from, if one has been set.
    fn image(&self) -> Option<&Arc<RgbaImage>>;

    /// Replace the raster (or clear it) and fully reset the selection.
    fn set_image(&mut self, image: Option<Arc<RgbaImage>>);

    /// Register `listener` for every event this model fires.
    fn subscribe(&mut self, listener: Box<dyn FnMut(&SelectionEvent)>);

    /// Register `listener` for events of `kind` only.
    fn subscribe_kind(&mut self, kind: EventKind, listener: Box<dyn FnMut(&SelectionEvent)>);

    /// Start a selection at `p`, or append a segment ending at `p`.
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] unless the model is in
    /// `NoSelection` or `Selecting`; variant-specific errors for points
    /// outside the image.
    fn add_point(&mut self, p: Point) -> Result<(), SelectError>;

    /// The endpoint of the selection path: the last segment's end, or the
    /// starting point if no segments exist yet.
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] in `NoSelection`.
    fn last_point(&self) -> Result<Point, SelectError>;

    /// The segment that `add_point(p)` would commit, without committing it.
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] when no selection is in progress.
    fn live_wire(&self, p: Point) -> Result<Polyline, SelectError>;

    /// Cancel an in-flight solve, or remove the most recent segment; with
    /// no segments left, clears the starting point too.
    ///
    /// # Errors
    ///
    /// Variant-specific; the straight-line tool never fails.
    fn undo(&mut self) -> Result<(), SelectError>;

    /// Close the selection back to its starting point.
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] if the selection is already finished
    /// or a solve is running.
    fn finish_selection(&mut self) -> Result<(), SelectError>;

    /// Clear everything and return to `NoSelection`.
    fn reset(&mut self);

    /// Index of the control point closest to `p`, if its squared distance
    /// is within `max_dist_sq`. Control point `i` is the start of segment
    /// `i`.
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] unless the selection is finished.
    fn closest_point(&self, p: Point, max_dist_sq: i64) -> Result<Option<usize>, SelectError>;

    /// Move control point `index` to `new_pos`, re-routing the two
    /// segments that meet there (wrapping around the closed path).
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] unless the selection is finished;
    /// [`SelectError::InvalidArgument`] for an out-of-range index.
    fn move_point(&mut self, index: usize, new_pos: Point) -> Result<(), SelectError>;

    /// Cancel the in-flight background solve.
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] when nothing is processing.
    fn cancel_processing(&mut self) -> Result<(), SelectError>;

    /// Write a PNG of the selected region to `out`: sized to the
    /// selection's bounding box, image pixels inside the selection,
    /// transparent pixels outside.
    ///
    /// # Errors
    ///
    /// [`SelectError::IllegalState`] unless the selection is finished;
    /// [`SelectError::NoImage`] without an image; [`SelectError::Io`] if
    /// encoding or writing fails.
    fn save_selection(&self, out: &mut dyn Write) -> Result<(), SelectError>;
}

/// State shared by every selection tool: the state machine, the segment
/// sequence, the raster, and the listener registry.
///
/// Invariants: in any state other than `NoSelection`, `start` is set and
/// `segments[0]` (if present) starts at it; each further segment starts
/// where its predecessor ends; in `Selected` the last segment additionally
/// ends at `start`.
#[derive(Debug)]
pub(crate) struct ModelCore {
    state: SelectionState,
    start: Option<Point>,
    segments: Vec<Polyline>,
    image: Option<Arc<RgbaImage>>,
    listeners: Listeners,
}

impl ModelCore {
    pub(crate) fn new() -> Self {
        Self {
            state: SelectionState::NoSelection,
            start: None,
            segments: Vec::new(),
            image: None,
            listeners: Listeners::default(),
        }
    }

    pub(crate) fn state(&self) -> SelectionState {
        self.state
    }

    pub(crate) fn segments(&self) -> &[Polyline] {
        &self.segments
    }

    pub(crate) fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    pub(crate) fn start(&self) -> Option<Point> {
        self.start
    }

    pub(crate) fn subscribe(&mut self, listener: Box<dyn FnMut(&SelectionEvent)>) {
        self.listeners.subscribe(listener);
    }

    pub(crate) fn subscribe_kind(
        &mut self,
        kind: EventKind,
        listener: Box<dyn FnMut(&SelectionEvent)>,
    ) {
        self.listeners.subscribe_kind(kind, listener);
    }

    pub(crate) fn notify(&mut self, event: &SelectionEvent) {
        self.listeners.notify(event);
    }

    /// Transition to `new_state` and notify. The caller is responsible
    /// for only requesting valid transitions.
    pub(crate) fn set_state(&mut self, new_state: SelectionState) {
        let old = self.state;
        self.state = new_state;
        self.notify(&SelectionEvent::State {
            old,
            new: new_state,
        });
    }

    pub(crate) fn notify_selection(&mut self) {
        let event = SelectionEvent::Selection(self.segments.clone());
        self.notify(&event);
    }

    /// Record the starting point without changing state. Used by tools
    /// that defer the `Selecting` transition until processing completes.
    pub(crate) fn set_start_point(&mut self, p: Point) {
        self.start = Some(p);
    }

    pub(crate) fn clear_start(&mut self) {
        self.start = None;
    }

    /// Begin a selection at `p`: record the start and enter `Selecting`.
    pub(crate) fn start_selection(&mut self, p: Point) {
        debug_assert_eq!(self.state, SelectionState::NoSelection);
        self.start = Some(p);
        self.set_state(SelectionState::Selecting);
    }

    pub(crate) fn push_segment(&mut self, segment: Polyline) {
        self.segments.push(segment);
        self.notify_selection();
    }

    /// Overwrite segment `index` without notifying; callers batch their
    /// own `notify_selection` after all replacements.
    pub(crate) fn replace_segment(&mut self, index: usize, segment: Polyline) {
        self.segments[index] = segment;
    }

    /// Drop the most recent segment (the rollback and undo primitive).
    /// With no segments, clears the start instead. Fires `Selected` ->
    /// `Selecting` when undoing out of a finished selection.
    pub(crate) fn undo_point(&mut self) {
        if self.segments.is_empty() {
            self.reset();
        } else {
            self.segments.pop();
            if self.state == SelectionState::Selected {
                self.set_state(SelectionState::Selecting);
            }
            self.notify_selection();
        }
    }

    /// Remove the just-committed segment during solve cancellation. The
    /// state stays untouched; the caller restores it afterwards.
    pub(crate) fn rollback_segment(&mut self) {
        debug_assert!(!self.segments.is_empty());
        self.segments.pop();
        self.notify_selection();
    }

    pub(crate) fn reset(&mut self) {
        self.start = None;
        self.segments.clear();
        self.set_state(SelectionState::NoSelection);
        self.notify_selection();
    }

    pub(crate) fn set_image(&mut self, image: Option<Arc<RgbaImage>>) {
        let old = self.image.take();
        self.image = image;
        let new = self.image.clone();
        self.reset();
        self.notify(&SelectionEvent::Image { old, new });
    }

    pub(crate) fn last_point(&self) -> Result<Point, SelectError> {
        if self.state == SelectionState::NoSelection {
            return Err(SelectError::IllegalState {
                operation: "query the last point",
                state: self.state,
            });
        }
        match (self.segments.last(), self.start) {
            (Some(segment), _) => Ok(segment.end()),
            (None, Some(start)) => Ok(start),
            (None, None) => Err(SelectError::IllegalState {
                operation: "query the last point",
                state: self.state,
            }),
        }
    }

    pub(crate) fn closest_point(
        &self,
        p: Point,
        max_dist_sq: i64,
    ) -> Result<Option<usize>, SelectError> {
        if self.state != SelectionState::Selected {
            return Err(SelectError::IllegalState {
                operation: "find the closest control point",
                state: self.state,
            });
        }
        let mut best: Option<(usize, i64)> = None;
        for (i, segment) in self.segments.iter().enumerate() {
            let d = segment.start().distance_sq(p);
            if d <= max_dist_sq && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        Ok(best.map(|(i, _)| i))
    }

    pub(crate) fn save_selection(&self, out: &mut dyn Write) -> Result<(), SelectError> {
        if self.state != SelectionState::Selected {
            return Err(SelectError::IllegalState {
                operation: "save the selection",
                state: self.state,
            });
        }
        let image = self.image.as_ref().ok_or(SelectError::NoImage)?;
        let rendered = export::render_selection(image, &self.segments);
        export::write_png(&rendered, out)
    }
}

/// A selection tool that connects each committed point to the previous
/// one with a straight line segment.
pub struct PointToPointModel {
    core: ModelCore,
}

impl PointToPointModel {
    /// Create an empty model with no image.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: ModelCore::new(),
        }
    }
}

impl Default for PointToPointModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionModel for PointToPointModel {
    fn state(&self) -> SelectionState {
        self.core.state()
    }

    fn selection(&self) -> &[Polyline] {
        self.core.segments()
    }

    fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.core.image()
    }

    fn set_image(&mut self, image: Option<Arc<RgbaImage>>) {
        self.core.set_image(image);
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&SelectionEvent)>) {
        self.core.subscribe(listener);
    }

    fn subscribe_kind(&mut self, kind: EventKind, listener: Box<dyn FnMut(&SelectionEvent)>) {
        self.core.subscribe_kind(kind, listener);
    }

    fn add_point(&mut self, p: Point) -> Result<(), SelectError> {
        match self.core.state() {
            SelectionState::NoSelection => {
                self.core.start_selection(p);
                Ok(())
            }
            SelectionState::Selecting => {
                let segment = Polyline::line(self.core.last_point()?, p);
                self.core.push_segment(segment);
                Ok(())
            }
            state => Err(SelectError::IllegalState {
                operation: "add a point",
                state,
            }),
        }
    }

    fn last_point(&self) -> Result<Point, SelectError> {
        self.core.last_point()
    }

    fn live_wire(&self, p: Point) -> Result<Polyline, SelectError> {
        Ok(Polyline::line(self.core.last_point()?, p))
    }

    fn undo(&mut self) -> Result<(), SelectError> {
        self.core.undo_point();
        Ok(())
    }

    fn finish_selection(&mut self) -> Result<(), SelectError> {
        match self.core.state() {
            SelectionState::Selected => Err(SelectError::IllegalState {
                operation: "finish a finished selection",
                state: SelectionState::Selected,
            }),
            _ if self.core.segments().is_empty() => {
                self.core.reset();
                Ok(())
            }
            _ => {
                let last = self.core.last_point()?;
                let Some(start) = self.core.start() else {
                    return Err(SelectError::IllegalState {
                        operation: "finish a selection",
                        state: self.core.state(),
                    });
                };
                self.core.push_segment(Polyline::line(last, start));
                self.core.set_state(SelectionState::Selected);
                Ok(())
            }
        }
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn closest_point(&self, p: Point, max_dist_sq: i64) -> Result<Option<usize>, SelectError> {
        self.core.closest_point(p, max_dist_sq)
    }

    fn move_point(&mut self, index: usize, new_pos: Point) -> Result<(), SelectError> {
        if self.core.state() != SelectionState::Selected {
            return Err(SelectError::IllegalState {
                operation: "move a control point",
                state: self.core.state(),
            });
        }
        let len = self.core.segments().len();
        if index >= len {
            return Err(SelectError::InvalidArgument(format!(
                "segment index {index} out of range for {len} segments"
            )));
        }

        let prev = (index + len - 1) % len;
        let pred_start = self.core.segments()[prev].start();
        let succ_end = self.core.segments()[index].end();
        self.core
            .replace_segment(prev, Polyline::line(pred_start, new_pos));
        self.core
            .replace_segment(index, Polyline::line(new_pos, succ_end));
        if index == 0 {
            self.core.set_start_point(new_pos);
        }
        self.core.notify_selection();
        Ok(())
    }

    fn cancel_processing(&mut self) -> Result<(), SelectError> {
        Err(SelectError::IllegalState {
            operation: "cancel processing",
            state: self.core.state(),
        })
    }

    fn save_selection(&self, out: &mut dyn Write) -> Result<(), SelectError> {
        self.core.save_selection(out)
    }
}
