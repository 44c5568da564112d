//! lariat-select: interactive image-selection core.
//!
//! Lets a host application trace the contour of an object in a raster
//! image by committing waypoints. Between waypoints a segment is either a
//! literal straight line ([`PointToPointModel`]) or an "intelligent
//! scissors" least-cost path that snaps to strong image edges
//! ([`ScissorsModel`]), computed by the incremental solver in
//! `lariat-graph` over an implicit 8-connected pixel graph.
//!
//! Long scissors solves run on a background thread in bounded batches,
//! publishing progress and preliminary path snapshots back to the owning
//! (UI) thread; models notify observers of every state, selection, image,
//! and progress change through a typed event registry.
//!
//! The GUI shell, image decoding, and file handling are the host's
//! business -- this crate operates on in-memory rasters and produces
//! structured data plus an optional PNG of the selected region.

pub mod events;
pub mod export;
pub mod grid;
pub mod polyline;
pub mod scissors;
pub mod selection;
pub mod types;
pub mod weights;
mod worker;

pub use events::{EventKind, SelectionEvent};
pub use grid::{GridEdge, PixelGrid};
pub use polyline::{make_polygon, Polyline, PolylineBuffer};
pub use scissors::{ImagePaths, ScissorsModel};
pub use selection::{PointToPointModel, SelectionModel};
pub use types::{Point, SelectError, SelectionState};
pub use weights::{make_weigher, weight_names};
