//! Typed change notifications from selection models to their observers.
//!
//! Models fire a [`SelectionEvent`] for every observable change; listeners
//! register globally or for a single [`EventKind`]. Notification is
//! synchronous and in firing order on the thread that mutated the model
//! (the UI thread), and events are fired *after* the change they describe,
//! so a listener reading model state inside its callback sees the
//! post-transition values.

use std::sync::Arc;

use image::RgbaImage;
use lariat_graph::PathfindingSnapshot;

use crate::polyline::Polyline;
use crate::types::SelectionState;

/// A property change fired by a selection model.
#[derive(Clone)]
pub enum SelectionEvent {
    /// The model transitioned between states.
    State {
        /// State before the transition.
        old: SelectionState,
        /// State after the transition.
        new: SelectionState,
    },
    /// The segment sequence changed; carries a read-only copy.
    Selection(Vec<Polyline>),
    /// The backing raster was replaced.
    Image {
        /// Previous raster, if any.
        old: Option<Arc<RgbaImage>>,
        /// New raster, if any.
        new: Option<Arc<RgbaImage>>,
    },
    /// A background solve reported progress, as a percentage in `0..=100`.
    Progress(u8),
    /// A background solve published a preliminary snapshot (for progress
    /// shading).
    PendingPaths(Arc<PathfindingSnapshot>),
}

impl SelectionEvent {
    /// The property this event belongs to.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::State { .. } => EventKind::State,
            Self::Selection(_) => EventKind::Selection,
            Self::Image { .. } => EventKind::Image,
            Self::Progress(_) => EventKind::Progress,
            Self::PendingPaths(_) => EventKind::PendingPaths,
        }
    }
}

impl std::fmt::Debug for SelectionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State { old, new } => write!(f, "State {{ {old} -> {new} }}"),
            Self::Selection(segments) => write!(f, "Selection({} segments)", segments.len()),
            Self::Image { .. } => f.write_str("Image"),
            Self::Progress(pct) => write!(f, "Progress({pct})"),
            Self::PendingPaths(_) => f.write_str("PendingPaths"),
        }
    }
}

/// Discriminant of [`SelectionEvent`], for per-property subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `State` events.
    State,
    /// `Selection` events.
    Selection,
    /// `Image` events.
    Image,
    /// `Progress` events.
    Progress,
    /// `PendingPaths` events.
    PendingPaths,
}

type Listener = Box<dyn FnMut(&SelectionEvent)>;

/// Registry of event listeners for one model.
#[derive(Default)]
pub(crate) struct Listeners {
    global: Vec<Listener>,
    by_kind: Vec<(EventKind, Listener)>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("global", &self.global.len())
            .field("by_kind", &self.by_kind.len())
            .finish()
    }
}

impl Listeners {
    /// Register `listener` for every event.
    pub(crate) fn subscribe(&mut self, listener: Listener) {
        self.global.push(listener);
    }

    /// Register `listener` for events of `kind` only.
    pub(crate) fn subscribe_kind(&mut self, kind: EventKind, listener: Listener) {
        self.by_kind.push((kind, listener));
    }

    /// Deliver `event` to every matching listener, in registration order
    /// (global listeners first).
    pub(crate) fn notify(&mut self, event: &SelectionEvent) {
        for listener in &mut self.global {
            listener(event);
        }
        let kind = event.kind();
        for (k, listener) in &mut self.by_kind {
            if *k == kind {
                listener(event);
            }
        }
    }
}
