//! Shared value types and errors for the selection core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A pixel location in image coordinates (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from the left edge).
    pub x: i32,
    /// Vertical position (pixels from the top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Widened to `i64` so distant points cannot overflow.
    #[must_use]
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        dx * dx + dy * dy
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A selection model's current mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionState {
    /// No selection is in progress; no starting point has been chosen.
    NoSelection,
    /// A starting point exists and segments may be appended.
    Selecting,
    /// The selection is a closed path ending at its starting point.
    /// Control points may be moved, but no points added.
    Selected,
    /// A background solve is extending or editing the selection.
    Processing,
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoSelection => "NO_SELECTION",
            Self::Selecting => "SELECTING",
            Self::Selected => "SELECTED",
            Self::Processing => "PROCESSING",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the selection core.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// An operation was invoked in a state where it is not permitted.
    #[error("cannot {operation} in state {state}")]
    IllegalState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the model was in.
        state: SelectionState,
    },

    /// An argument was out of range (e.g. a segment index).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A point fell outside the image bounds.
    #[error("point {0} is outside the image")]
    OutOfImage(Point),

    /// The weigher factory does not recognize the requested name.
    #[error("unknown weigher: {0}")]
    UnknownWeigher(String),

    /// No image has been set on the model.
    #[error("no image has been set")]
    NoImage,

    /// A path was requested to a pixel the search has not reached.
    #[error("no path known to the requested pixel")]
    NotDiscovered,

    /// Writing the selection PNG failed.
    #[error("failed to write selection: {0}")]
    Io(#[from] image::ImageError),

    /// The background solver crashed. This indicates a bug and is
    /// surfaced unchanged at the boundary where completion is consumed.
    #[error("background solve failed: {0}")]
    Worker(String),
}

impl From<lariat_graph::GraphError> for SelectError {
    fn from(err: lariat_graph::GraphError) -> Self {
        match err {
            lariat_graph::GraphError::NotDiscovered(_) => Self::NotDiscovered,
            lariat_graph::GraphError::Empty => {
                Self::InvalidArgument("queue unexpectedly empty".into())
            }
        }
    }
}
