use super::WalkOutcome;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// Walks that ended without a loop, by the degree of the cell that stopped them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationCounts {
    /// Degree 0
    pub isolated: usize,
    /// Degree 1
    pub dead_end: usize,
    /// Degree 3 or more
    pub junction: usize,
}

/// Summary of one full scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceReport {
    pub width: usize,
    pub height: usize,
    /// Marked cells before the scan
    pub marked_cells: usize,
    pub walks_started: usize,
    pub loops: usize,
    pub terminations: TerminationCounts,
    /// Input fingerprint, taken before the grid is consumed
    pub fingerprint: String,
}

impl TraceReport {
    pub(super) fn new(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            marked_cells: grid.marked_count(),
            walks_started: 0,
            loops: 0,
            terminations: TerminationCounts::default(),
            fingerprint: grid.fingerprint(),
        }
    }

    pub(super) fn record(&mut self, outcome: &WalkOutcome) {
        self.walks_started += 1;
        match *outcome {
            WalkOutcome::Loop { .. } => self.loops += 1,
            WalkOutcome::Terminated { degree: 0, .. } => self.terminations.isolated += 1,
            WalkOutcome::Terminated { degree: 1, .. } => self.terminations.dead_end += 1,
            WalkOutcome::Terminated { .. } => self.terminations.junction += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_buckets_by_degree() {
        let grid = Grid::from_rows(&["#."]).unwrap();
        let mut report = TraceReport::new(&grid);
        assert_eq!(report.marked_cells, 1);

        report.record(&WalkOutcome::Loop { length: 4 });
        report.record(&WalkOutcome::Terminated { degree: 0, length: 1 });
        report.record(&WalkOutcome::Terminated { degree: 1, length: 2 });
        report.record(&WalkOutcome::Terminated { degree: 3, length: 1 });
        report.record(&WalkOutcome::Terminated { degree: 5, length: 6 });

        assert_eq!(report.walks_started, 5);
        assert_eq!(report.loops, 1);
        assert_eq!(
            report.terminations,
            TerminationCounts {
                isolated: 1,
                dead_end: 1,
                junction: 2,
            }
        );
    }

    #[test]
    fn test_report_serializes_to_json() {
        let grid = Grid::from_rows(&["##"]).unwrap();
        let report = TraceReport::new(&grid);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["width"], 2);
        assert_eq!(value["marked_cells"], 2);
        assert_eq!(value["terminations"]["junction"], 0);
        assert_eq!(value["fingerprint"].as_str().unwrap().len(), 64);
    }
}
