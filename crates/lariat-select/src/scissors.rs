//! The intelligent-scissors selection tool.
//!
//! Committed points are connected by least-cost paths over the pixel
//! graph, so segments snap to strong image edges. Whenever the selection's
//! endpoint changes (a point is added, undone, or moved), a background
//! solve computes shortest paths from the new endpoint; until it
//! completes the model sits in `Processing` and republishes the solve's
//! progress to its listeners. The most recently *completed* solve is what
//! answers [`live_wire`](SelectionModel::live_wire) queries and routes the
//! next committed segment.
//!
//! Completion and cancellation are handled on the owning thread: hosts
//! call [`pump`](ScissorsModel::pump) from their event loop (or
//! [`wait_for_solve`](ScissorsModel::wait_for_solve) when blocking is
//! fine) to consume worker messages.

use std::io::Write;
use std::sync::mpsc::TryRecvError;
use std::sync::Arc;

use image::RgbaImage;
use lariat_graph::PathfindingSnapshot;

use crate::events::{EventKind, SelectionEvent};
use crate::grid::PixelGrid;
use crate::polyline::Polyline;
use crate::selection::{ModelCore, SelectionModel};
use crate::types::{Point, SelectError, SelectionState};
use crate::weights::{make_weigher, weight_names};
use crate::worker::{self, SolveHandle, SolveMsg};

/// What the in-flight solve is for: extending from a new endpoint, or
/// re-routing around a moved control point once it completes.
#[derive(Debug, Clone, Copy)]
enum SolveGoal {
    Endpoint,
    Move { index: usize, new_pos: Point },
}

/// Pixel-level view of a published in-flight snapshot, for progress
/// shading in a host UI.
pub struct ImagePaths {
    grid: PixelGrid,
    snapshot: Arc<PathfindingSnapshot>,
}

impl ImagePaths {
    /// Whether the solve has found any path to the pixel at `p`.
    ///
    /// # Errors
    ///
    /// [`SelectError::OutOfImage`] if `p` lies outside the image.
    pub fn discovered(&self, p: Point) -> Result<bool, SelectError> {
        Ok(self.snapshot.discovered(self.grid.id_at(p)?))
    }

    /// Whether the best path to the pixel at `p` is final.
    ///
    /// # Errors
    ///
    /// [`SelectError::OutOfImage`] if `p` lies outside the image.
    pub fn settled(&self, p: Point) -> Result<bool, SelectError> {
        Ok(self.snapshot.settled(self.grid.id_at(p)?))
    }
}

/// A selection tool that routes committed segments along least-cost paths
/// through the image ("intelligent scissors").
#[derive(Debug)]
pub struct ScissorsModel {
    core: ModelCore,
    /// Graph view of the current image; rebuilt whenever the image is
    /// replaced. `None` iff no image is set.
    graph: Option<PixelGrid>,
    /// Name of the weight function, validated against the factory at
    /// construction.
    weigher_name: String,
    /// Shortest paths from the last committed endpoint. Present whenever
    /// the model is in `Selecting` (and kept through `Processing`).
    paths: Option<Arc<PathfindingSnapshot>>,
    /// Latest in-flight snapshot published by the running solve.
    pending: Option<Arc<PathfindingSnapshot>>,
    /// The running solve, if any. Present iff the state is `Processing`.
    solve: Option<SolveHandle>,
    /// What the running solve is for.
    goal: SolveGoal,
    /// State to return to when the running solve ends.
    previous_state: SelectionState,
    /// Monotonic solve counter; identifies solves in logs and messages.
    generation: u64,
}

impl ScissorsModel {
    /// Create a model using the weight function named `weigher_name`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::UnknownWeigher`] if the factory does not
    /// recognize the name.
    pub fn new(weigher_name: &str) -> Result<Self, SelectError> {
        if !weight_names().contains(&weigher_name) {
            return Err(SelectError::UnknownWeigher(weigher_name.to_owned()));
        }
        Ok(Self {
            core: ModelCore::new(),
            graph: None,
            weigher_name: weigher_name.to_owned(),
            paths: None,
            pending: None,
            solve: None,
            goal: SolveGoal::Endpoint,
            previous_state: SelectionState::NoSelection,
            generation: 0,
        })
    }

    /// Whether a background solve is currently running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.solve.is_some()
    }

    /// The in-flight snapshot for progress shading, while `Processing`.
    #[must_use]
    pub fn processing_progress(&self) -> Option<ImagePaths> {
        match (self.core.state(), &self.pending, &self.graph) {
            (SelectionState::Processing, Some(pending), Some(graph)) => Some(ImagePaths {
                grid: graph.clone(),
                snapshot: Arc::clone(pending),
            }),
            _ => None,
        }
    }

    /// Deliver any messages the running solve has published since the
    /// last call. Progress deliveries coalesce: only the latest published
    /// snapshot reaches the listeners. Call this from the host's event
    /// loop; it never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::Worker`] if the solve crashed. This
    /// indicates a bug in the solver and is fatal.
    pub fn pump(&mut self) -> Result<(), SelectError> {
        let mut latest: Option<(u8, Arc<PathfindingSnapshot>)> = None;
        let mut terminal: Option<SolveMsg> = None;
        let mut crashed = false;
        {
            let Some(solve) = &self.solve else {
                return Ok(());
            };
            loop {
                match solve.try_recv() {
                    Ok(SolveMsg::Progress {
                        percent, snapshot, ..
                    }) => latest = Some((percent, snapshot)),
                    Ok(msg) => {
                        terminal = Some(msg);
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        crashed = true;
                        break;
                    }
                }
            }
        }

        if let Some((percent, snapshot)) = latest {
            self.publish_pending(percent, snapshot);
        }
        match terminal {
            Some(SolveMsg::Done { snapshot, .. }) => self.complete_solve(&snapshot),
            Some(SolveMsg::Cancelled { generation }) => {
                // A detached solve cannot reach us; a cancelled solve we
                // still hold means someone cancelled the token directly.
                log::debug!("dropping cancellation of solve {generation}");
                self.solve = None;
                Ok(())
            }
            Some(SolveMsg::Progress { .. }) => Ok(()),
            None if crashed => self.fail_solve(),
            None => Ok(()),
        }
    }

    /// Block until the running solve completes (delivering its messages
    /// as they arrive), then return. Returns immediately when nothing is
    /// processing. Intended for tests and headless hosts; interactive
    /// hosts should prefer [`pump`](Self::pump).
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::Worker`] if the solve crashed.
    pub fn wait_for_solve(&mut self) -> Result<(), SelectError> {
        loop {
            let received = match &self.solve {
                None => return Ok(()),
                Some(solve) => solve.recv(),
            };
            match received {
                Ok(SolveMsg::Progress {
                    percent, snapshot, ..
                }) => self.publish_pending(percent, snapshot),
                Ok(SolveMsg::Done { snapshot, .. }) => return self.complete_solve(&snapshot),
                Ok(SolveMsg::Cancelled { .. }) => {
                    self.solve = None;
                    return Ok(());
                }
                Err(_) => return self.fail_solve(),
            }
        }
    }

    /// Record and republish an in-flight snapshot.
    fn publish_pending(&mut self, percent: u8, snapshot: Arc<PathfindingSnapshot>) {
        self.pending = Some(Arc::clone(&snapshot));
        self.core.notify(&SelectionEvent::Progress(percent));
        self.core.notify(&SelectionEvent::PendingPaths(snapshot));
    }

    /// Detach the running solve, asking it to stop. Never blocks; any
    /// messages it already published are discarded with its channel.
    fn detach_solve(&mut self) {
        if let Some(solve) = self.solve.take() {
            solve.cancel();
            log::debug!("detached solve {}", solve.generation());
        }
        self.pending = None;
    }

    /// Transition into `Processing` and start a solve from `start_id`.
    fn launch_solve(&mut self, start_id: usize, goal: SolveGoal) -> Result<(), SelectError> {
        let graph = self.graph.clone().ok_or(SelectError::NoImage)?;
        let weigher = make_weigher(&self.weigher_name, &graph)?;

        self.previous_state = self.core.state();
        self.core.set_state(SelectionState::Processing);
        self.pending = None;
        self.goal = goal;
        self.generation += 1;
        log::debug!(
            "launching solve {} from vertex {start_id} ({:?})",
            self.generation,
            goal
        );
        self.solve = Some(worker::spawn_solve(
            self.generation,
            graph,
            weigher,
            start_id,
        ));
        Ok(())
    }

    /// Handle a successful solve on the owning thread: store the result
    /// as the committed paths, apply a pending move, and leave
    /// `Processing`.
    fn complete_solve(&mut self, snapshot: &Arc<PathfindingSnapshot>) -> Result<(), SelectError> {
        self.solve = None;
        self.pending = None;
        self.paths = Some(Arc::clone(snapshot));

        let (result, next) = match self.goal {
            SolveGoal::Endpoint => {
                let next = if self.previous_state == SelectionState::NoSelection {
                    SelectionState::Selecting
                } else {
                    self.previous_state
                };
                (Ok(()), next)
            }
            SolveGoal::Move { index, new_pos } => {
                (self.apply_move(index, new_pos), self.previous_state)
            }
        };

        // Leave `Processing` and drop the goal even when applying a move
        // failed; a latched goal would corrupt a later solve.
        self.goal = SolveGoal::Endpoint;
        self.core.set_state(next);
        result
    }

    /// Surface a crashed solve as a fatal error.
    fn fail_solve(&mut self) -> Result<(), SelectError> {
        let report = match self.solve.take() {
            Some(solve) => solve.crash_report(),
            None => "worker state lost".to_owned(),
        };
        log::error!("background solve failed: {report}");
        Err(SelectError::Worker(report))
    }

    /// Replace the two segments meeting at control point `index` using
    /// the freshly committed paths from the moved position.
    fn apply_move(&mut self, index: usize, new_pos: Point) -> Result<(), SelectError> {
        let (new_before, new_after, prev) = {
            let graph = self.graph.as_ref().ok_or(SelectError::NoImage)?;
            let paths = self.paths.as_ref().ok_or_else(|| SelectError::Worker(
                "solve completed without committed paths".to_owned(),
            ))?;
            let segments = self.core.segments();
            let len = segments.len();
            let prev = (index + len - 1) % len;

            // The "after" segment runs from the moved point to its
            // original successor.
            let succ_end = segments[index].end();
            let after_ids = paths.path_to(graph.id_at(succ_end)?)?;
            let new_after = graph.path_to_polyline(&after_ids)?;

            // The "before" segment is the reversed path from the moved
            // point back to its original predecessor.
            let pred_start = segments[prev].start();
            let mut before_ids = paths.path_to(graph.id_at(pred_start)?)?;
            before_ids.reverse();
            let new_before = graph.path_to_polyline(&before_ids)?;

            (new_before, new_after, prev)
        };

        self.core.replace_segment(prev, new_before);
        self.core.replace_segment(index, new_after);
        if index == 0 {
            self.core.set_start_point(new_pos);
        }
        self.core.notify_selection();
        Ok(())
    }

    /// The committed paths snapshot, routed through the pixel graph, from
    /// the selection endpoint to `p`.
    fn committed_path_to(&self, p: Point) -> Result<Polyline, SelectError> {
        let graph = self.graph.as_ref().ok_or(SelectError::NoImage)?;
        let paths = match (self.core.state(), &self.paths) {
            (SelectionState::Selecting | SelectionState::Processing, Some(paths)) => paths,
            (state, _) => {
                return Err(SelectError::IllegalState {
                    operation: "trace a path from the selection endpoint",
                    state,
                })
            }
        };
        let ids = paths.path_to(graph.id_at(p)?)?;
        graph.path_to_polyline(&ids)
    }
}

impl Drop for ScissorsModel {
    fn drop(&mut self) {
        self.detach_solve();
    }
}

impl SelectionModel for ScissorsModel {
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
        self.detach_solve();
        self.paths = None;
        self.graph = image.as_ref().map(|img| PixelGrid::new(Arc::clone(img)));
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
                let start_id = self
                    .graph
                    .as_ref()
                    .ok_or(SelectError::NoImage)?
                    .id_at(p)?;
                // Record the start but defer the `Selecting` transition
                // until the first solve completes.
                self.core.set_start_point(p);
                self.launch_solve(start_id, SolveGoal::Endpoint)
            }
            SelectionState::Selecting => {
                let end_id = self
                    .graph
                    .as_ref()
                    .ok_or(SelectError::NoImage)?
                    .id_at(p)?;
                let segment = self.committed_path_to(p)?;
                self.core.push_segment(segment);
                self.launch_solve(end_id, SolveGoal::Endpoint)
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
        self.committed_path_to(p)
    }

    fn undo(&mut self) -> Result<(), SelectError> {
        if self.core.state() == SelectionState::Processing {
            return self.cancel_processing();
        }
        self.core.undo_point();
        if self.core.state() == SelectionState::Selecting {
            // The endpoint changed; solve from it so the next segment and
            // live wire measure from the right place.
            let endpoint = self.core.last_point()?;
            let start_id = self
                .graph
                .as_ref()
                .ok_or(SelectError::NoImage)?
                .id_at(endpoint)?;
            self.launch_solve(start_id, SolveGoal::Endpoint)?;
        }
        Ok(())
    }

    fn finish_selection(&mut self) -> Result<(), SelectError> {
        match self.core.state() {
            state @ (SelectionState::Selected | SelectionState::Processing) => {
                Err(SelectError::IllegalState {
                    operation: "finish the selection",
                    state,
                })
            }
            _ if self.core.segments().is_empty() => {
                self.reset();
                Ok(())
            }
            _ => {
                let Some(start) = self.core.start() else {
                    return Err(SelectError::IllegalState {
                        operation: "finish the selection",
                        state: self.core.state(),
                    });
                };
                let closing = self.committed_path_to(start)?;
                self.core.push_segment(closing);
                self.core.set_state(SelectionState::Selected);
                Ok(())
            }
        }
    }

    fn reset(&mut self) {
        self.detach_solve();
        self.paths = None;
        self.goal = SolveGoal::Endpoint;
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
        let start_id = self
            .graph
            .as_ref()
            .ok_or(SelectError::NoImage)?
            .id_at(new_pos)?;
        // Solving from the moved point yields both replacement segments
        // when it completes.
        self.launch_solve(start_id, SolveGoal::Move { index, new_pos })
    }

    fn cancel_processing(&mut self) -> Result<(), SelectError> {
        if self.core.state() != SelectionState::Processing {
            return Err(SelectError::IllegalState {
                operation: "cancel processing",
                state: self.core.state(),
            });
        }
        self.detach_solve();

        // A solve launched by appending a point committed its segment
        // before launching; remove it again. The previous endpoint's
        // committed paths are still valid.
        if self.previous_state == SelectionState::Selecting
            && matches!(self.goal, SolveGoal::Endpoint)
        {
            self.core.rollback_segment();
        }
        if self.previous_state == SelectionState::NoSelection {
            self.core.clear_start();
        }
        self.goal = SolveGoal::Endpoint;
        self.core.set_state(self.previous_state);
        Ok(())
    }

    fn save_selection(&self, out: &mut dyn Write) -> Result<(), SelectError> {
        self.core.save_selection(out)
    }
}
