//! Cancellable background shortest-paths solves.
//!
//! Each solve runs on its own thread and owns its solver exclusively; the
//! only things it shares with the owning model are an outward message
//! channel and a cancellation token it checks between batches. A solve
//! that has been detached from its model keeps no way to reach it -- the
//! model drops the receiving end, so late messages simply vanish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use lariat_graph::{EdgeWeigher, PathfindingSnapshot, ShortestPaths};

use crate::grid::{GridEdge, PixelGrid};

/// Vertices settled per batch. Small enough that progress updates stay
/// smooth on large images.
pub(crate) const SOLVE_BATCH: usize = 1000;

/// Cooperative cancellation token backed by an [`AtomicBool`].
#[derive(Clone, Debug, Default)]
pub(crate) struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    fn new() -> Self {
        Self::default()
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// A message published by a running solve.
pub(crate) enum SolveMsg {
    /// A batch finished: overall progress and the latest snapshot.
    Progress {
        generation: u64,
        percent: u8,
        snapshot: Arc<PathfindingSnapshot>,
    },
    /// The solve ran to completion; `snapshot` is final.
    Done {
        generation: u64,
        snapshot: Arc<PathfindingSnapshot>,
    },
    /// The solve observed its cancellation flag and stopped.
    Cancelled { generation: u64 },
}

/// The model's handle to a running solve.
///
/// Dropping the handle detaches the solve: its channel closes and any
/// remaining messages are discarded. Call [`cancel`](Self::cancel) first
/// so the thread also stops working.
#[derive(Debug)]
pub(crate) struct SolveHandle {
    generation: u64,
    rx: Receiver<SolveMsg>,
    cancel: CancelToken,
    join: Option<JoinHandle<()>>,
}

impl SolveHandle {
    /// The identity of this solve (monotonic per model).
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Ask the solve to stop at its next batch boundary. Never blocks.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking poll for the next message.
    pub(crate) fn try_recv(&self) -> Result<SolveMsg, TryRecvError> {
        self.rx.try_recv()
    }

    /// Blocking wait for the next message.
    pub(crate) fn recv(&self) -> Result<SolveMsg, RecvError> {
        self.rx.recv()
    }

    /// Join the worker thread and report how it died, if it panicked.
    /// Used after the channel disconnects without a terminal message.
    pub(crate) fn crash_report(mut self) -> String {
        let Some(join) = self.join.take() else {
            return "worker thread already joined".to_owned();
        };
        match join.join() {
            Ok(()) => "worker thread exited without reporting a result".to_owned(),
            Err(panic) => {
                if let Some(msg) = panic.downcast_ref::<&str>() {
                    (*msg).to_owned()
                } else if let Some(msg) = panic.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "worker thread panicked".to_owned()
                }
            }
        }
    }
}

/// Spawn a solve from `start_id` over `graph` under `weigher`.
///
/// The solve settles [`SOLVE_BATCH`] vertices at a time, publishing a
/// progress percentage and a snapshot after every batch, then a final
/// `Done`. It checks its cancellation token at each batch boundary.
pub(crate) fn spawn_solve(
    generation: u64,
    graph: PixelGrid,
    weigher: Box<dyn EdgeWeigher<GridEdge> + Send>,
    start_id: usize,
) -> SolveHandle {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let (tx, rx) = mpsc::channel();
    let join = thread::spawn(move || run_solve(generation, graph, weigher, start_id, &token, &tx));
    SolveHandle {
        generation,
        rx,
        cancel,
        join: Some(join),
    }
}

fn run_solve(
    generation: u64,
    graph: PixelGrid,
    weigher: Box<dyn EdgeWeigher<GridEdge> + Send>,
    start_id: usize,
    token: &CancelToken,
    tx: &Sender<SolveMsg>,
) {
    let mut solver = ShortestPaths::new(graph, weigher);
    solver.set_start(start_id);
    let total = solver.vertex_count();

    loop {
        if token.is_cancelled() {
            log::debug!("solve {generation} cancelled at {} settled", solver.settled_count());
            let _ = tx.send(SolveMsg::Cancelled { generation });
            return;
        }

        let snapshot = Arc::new(solver.extend_search(SOLVE_BATCH));
        let percent = (100 * solver.settled_count() / total) as u8;
        log::trace!("solve {generation}: {percent}% settled");

        // Sends fail only when the model detached us; stopping early is
        // the right response either way.
        if tx
            .send(SolveMsg::Progress {
                generation,
                percent,
                snapshot: Arc::clone(&snapshot),
            })
            .is_err()
        {
            return;
        }

        if solver.all_paths_found() {
            log::debug!("solve {generation} complete: {total} vertices");
            let _ = tx.send(SolveMsg::Done {
                generation,
                snapshot,
            });
            return;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::types::Point;
    use crate::weights::make_weigher;

    fn small_grid() -> PixelGrid {
        PixelGrid::new(Arc::new(RgbaImage::new(8, 8)))
    }

    #[test]
    fn solve_publishes_progress_then_done() {
        let grid = small_grid();
        let weigher = make_weigher("CrossGradMono", &grid).unwrap();
        let start = grid.id_at(Point::new(0, 0)).unwrap();
        let handle = spawn_solve(1, grid, weigher, start);

        let mut saw_done = false;
        let mut last_percent = 0u8;
        while let Ok(msg) = handle.recv() {
            match msg {
                SolveMsg::Progress {
                    generation,
                    percent,
                    ..
                } => {
                    assert_eq!(generation, 1);
                    assert!(percent >= last_percent, "progress went backwards");
                    last_percent = percent;
                }
                SolveMsg::Done {
                    generation,
                    snapshot,
                } => {
                    assert_eq!(generation, 1);
                    assert_eq!(snapshot.settled_count(), 64);
                    saw_done = true;
                    break;
                }
                SolveMsg::Cancelled { .. } => panic!("solve was not cancelled"),
            }
        }
        assert!(saw_done);
        assert_eq!(last_percent, 100);
    }

    #[test]
    fn cancelled_solve_stops_reporting() {
        let grid = small_grid();
        let weigher = make_weigher("CrossGradMono", &grid).unwrap();
        let start = grid.id_at(Point::new(0, 0)).unwrap();
        let handle = spawn_solve(2, grid, weigher, start);

        handle.cancel();
        // The solve either finished a batch before observing the flag or
        // reports cancellation; it must never hang.
        loop {
            match handle.recv() {
                Ok(SolveMsg::Cancelled { generation }) => {
                    assert_eq!(generation, 2);
                    break;
                }
                Ok(SolveMsg::Progress { .. } | SolveMsg::Done { .. }) => continue,
                Err(_) => break,
            }
        }
    }
}
