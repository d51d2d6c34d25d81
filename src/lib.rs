//! amoeba: counts closed loops in a grid of marked cells
//!
//! A grid of marked (`#`) and unmarked cells is scanned row-major. Each
//! marked cell still present starts a destructive contour walk through
//! 8-connected cells; a walk that comes back next to its start counts as one
//! loop. The grid is consumed by the scan.
//!
//! # Architecture
//!
//! ## Loop Tracing ([`tracer`])
//! - [`tracer::count_loops`]: count loops, consuming the grid
//! - [`tracer::count_loops_preserving`]: count loops on a copy
//! - [`tracer::trace_grid`]: full scan with walk statistics
//! - [`tracer::trace_walk`]: a single contour walk
//!
//! ## Grid ([`grid`])
//! - [`grid::Grid`]: row-major boolean grid, out-of-range reads are unmarked
//! - [`grid::parse`]: `M N` header followed by `M` rows
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::seccomp`]: hosted-program syscall policy and one-time install
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: structured audit events
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: error type and run configuration
//!
//! # Example
//!
//! ```
//! use amoeba::{count_loops, Grid};
//!
//! let mut grid = Grid::from_rows(&[".#.", "#.#", ".#."]).unwrap();
//! assert_eq!(count_loops(&mut grid), 1);
//! assert_eq!(count_loops(&mut grid), 0);
//! ```

// Loop tracing
pub mod tracer;

// Grid model and input
pub mod grid;

// Kernel Primitives
pub mod kernel;

// Observability
pub mod observability;

// Configuration
pub mod config;

// CLI entrypoint
pub mod cli;

pub use config::types::{AmoebaError, OutputFormat, Result, RunConfig};
pub use grid::Grid;
pub use kernel::seccomp;
pub use tracer::{
    count_loops, count_loops_preserving, trace_grid, trace_walk, TraceReport, WalkOutcome,
};
