//! Loop tracer: counts closed loops of 8-connected marked cells.
//!
//! The grid doubles as the visited set. Every walk clears each cell it
//! steps on, so a full scan touches each cell at most once and leaves the
//! grid exhausted.
//!
//! A walk keeps going only through cells of degree 2. The degree of a
//! non-start cell carries one extra unit for its predecessor, which has
//! already been cleared and can no longer be seen. A walk closes a loop when,
//! after its first step, it lands next to its start cell.

mod report;

use crate::grid::Grid;

pub use report::{TerminationCounts, TraceReport};

/// Neighbour offsets `(dx, dy)` with `y` growing downward:
/// S, SE, E, W, NW, N, NE, SW.
///
/// Degree counting and move selection both walk this table; the first
/// marked entry is the next step.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 1),
];

/// How a single contour walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// The walk re-entered the neighbourhood of its start.
    Loop { length: usize },
    /// The walk hit a cell whose degree is not 2.
    Terminated { degree: usize, length: usize },
}

impl WalkOutcome {
    pub fn is_loop(&self) -> bool {
        matches!(self, WalkOutcome::Loop { .. })
    }

    /// Cells cleared by the walk.
    pub fn length(&self) -> usize {
        match *self {
            WalkOutcome::Loop { length } | WalkOutcome::Terminated { length, .. } => length,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Walk {
    start: (isize, isize),
    current: (isize, isize),
    length: usize,
}

impl Walk {
    fn new(x: isize, y: isize) -> Self {
        Self {
            start: (x, y),
            current: (x, y),
            length: 0,
        }
    }

    fn at_start(&self) -> bool {
        self.current == self.start
    }

    fn touches_start(&self) -> bool {
        let dx = self.current.0 - self.start.0;
        let dy = self.current.1 - self.start.1;
        dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0)
    }
}

/// Count closed loops, consuming the grid.
///
/// Every cell is unmarked when this returns; a second call on the same grid
/// yields 0.
pub fn count_loops(grid: &mut Grid) -> usize {
    trace_grid(grid).loops
}

/// Count closed loops on a copy, leaving `grid` untouched.
pub fn count_loops_preserving(grid: &Grid) -> usize {
    let mut scratch = grid.clone();
    count_loops(&mut scratch)
}

/// Scan the grid row-major and walk from every cell still marked.
pub fn trace_grid(grid: &mut Grid) -> TraceReport {
    let mut report = TraceReport::new(grid);

    for y in 0..grid.height() as isize {
        for x in 0..grid.width() as isize {
            if !grid.get(x, y) {
                continue;
            }

            let outcome = trace_walk(grid, x, y);
            log::debug!("walk from ({}, {}): {:?}", x, y, outcome);
            report.record(&outcome);
        }
    }

    log::info!(
        "Traced {}x{} grid: {} loops from {} walks over {} marked cells",
        report.width,
        report.height,
        report.loops,
        report.walks_started,
        report.marked_cells
    );

    report
}

/// Run one contour walk starting at `(x, y)`.
///
/// An unmarked start cell leaves the grid as it is.
pub fn trace_walk(grid: &mut Grid, x: isize, y: isize) -> WalkOutcome {
    if !grid.get(x, y) {
        return WalkOutcome::Terminated {
            degree: 0,
            length: 0,
        };
    }

    let mut walk = Walk::new(x, y);

    loop {
        let (cx, cy) = walk.current;

        let mut degree = if walk.at_start() { 0 } else { 1 };
        degree += NEIGHBOR_OFFSETS
            .iter()
            .filter(|&&(dx, dy)| grid.get(cx + dx, cy + dy))
            .count();

        grid.clear(cx, cy);
        walk.length += 1;

        if degree != 2 {
            return WalkOutcome::Terminated {
                degree,
                length: walk.length,
            };
        }

        // Degree 2 at the start means two marked neighbours, and one
        // elsewhere means one, so a next step always exists here.
        let Some(&(dx, dy)) = NEIGHBOR_OFFSETS
            .iter()
            .find(|&&(dx, dy)| grid.get(cx + dx, cy + dy))
        else {
            return WalkOutcome::Terminated {
                degree,
                length: walk.length,
            };
        };
        walk.current = (cx + dx, cy + dy);

        if walk.length > 1 && walk.touches_start() {
            return WalkOutcome::Loop {
                length: walk.length,
            };
        }
    }
}
