//! Grid input: a header with the row count M and column count N, followed by
//! M rows of N symbols. Tokens are whitespace separated.

use super::Grid;
use crate::config::types::{AmoebaError, Result};
use std::io::Read;

/// Symbol for a marked cell; every other symbol is unmarked.
pub const MARKED: char = '#';

/// Parse a grid from its text form.
pub fn parse_grid(input: &str) -> Result<Grid> {
    let mut tokens = input.split_whitespace();

    let rows = parse_dimension(tokens.next(), "row count")?;
    let cols = parse_dimension(tokens.next(), "column count")?;

    let expected = rows.checked_mul(cols).ok_or_else(|| {
        AmoebaError::Input(format!("grid of {}x{} cells is too large", rows, cols))
    })?;
    // Every cell takes at least one input byte, so the header cannot
    // reserve more than the input could fill.
    let mut cells = Vec::with_capacity(expected.min(input.len()));

    for y in 0..rows {
        let row = tokens.next().ok_or_else(|| {
            AmoebaError::Input(format!("expected {} rows, found {}", rows, y))
        })?;

        let len = row.chars().count();
        if len != cols {
            return Err(AmoebaError::Input(format!(
                "row {} has {} cells, expected {}",
                y, len, cols
            )));
        }

        cells.extend(row.chars().map(|c| c == MARKED));
    }

    if tokens.next().is_some() {
        log::debug!("Ignoring trailing input after {} rows", rows);
    }

    Grid::from_cells(cols, rows, cells)
}

/// Read the whole stream and parse it as a grid.
pub fn read_grid<R: Read>(mut reader: R) -> Result<Grid> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    parse_grid(&input)
}

fn parse_dimension(token: Option<&str>, what: &str) -> Result<usize> {
    let token = token.ok_or_else(|| AmoebaError::Input(format!("missing {}", what)))?;
    token
        .parse::<usize>()
        .map_err(|e| AmoebaError::Input(format!("invalid {} '{}': {}", what, token, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_and_columns() {
        let grid = parse_grid("2 3\n#.#\n.#.\n").unwrap();
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 3);
        assert!(grid.get(0, 0));
        assert!(!grid.get(1, 0));
        assert!(grid.get(2, 0));
        assert!(grid.get(1, 1));
        assert_eq!(grid.marked_count(), 3);
    }

    #[test]
    fn test_parse_accepts_any_whitespace() {
        let grid = parse_grid("  1\t2   ##  ").unwrap();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.marked_count(), 2);
    }

    #[test]
    fn test_parse_missing_header() {
        let err = parse_grid("").unwrap_err();
        assert!(matches!(err, AmoebaError::Input(ref msg) if msg.contains("row count")));

        let err = parse_grid("3").unwrap_err();
        assert!(matches!(err, AmoebaError::Input(ref msg) if msg.contains("column count")));
    }

    #[test]
    fn test_parse_non_numeric_header() {
        let err = parse_grid("x 3\n###").unwrap_err();
        assert!(matches!(err, AmoebaError::Input(ref msg) if msg.contains("invalid row count")));
    }

    #[test]
    fn test_parse_too_few_rows() {
        let err = parse_grid("3 2\n##\n##\n").unwrap_err();
        assert!(matches!(err, AmoebaError::Input(ref msg) if msg.contains("expected 3 rows, found 2")));
    }

    #[test]
    fn test_parse_header_larger_than_input() {
        let err = parse_grid("1000000000 1000000000\n#").unwrap_err();
        assert!(matches!(err, AmoebaError::Input(ref msg) if msg.contains("row 0 has 1 cells")));

        let err = parse_grid("100000 1\n#").unwrap_err();
        assert!(matches!(err, AmoebaError::Input(ref msg) if msg.contains("expected 100000 rows, found 1")));
    }

    #[test]
    fn test_parse_wrong_row_length() {
        let err = parse_grid("2 3\n###\n##\n").unwrap_err();
        assert!(matches!(err, AmoebaError::Input(ref msg) if msg.contains("row 1 has 2 cells")));
    }

    #[test]
    fn test_parse_ignores_trailing_tokens() {
        let grid = parse_grid("1 1\n#\nextra tokens").unwrap();
        assert_eq!(grid.marked_count(), 1);
    }

    #[test]
    fn test_parse_zero_sized_grid() {
        let grid = parse_grid("0 0").unwrap();
        assert_eq!(grid.width(), 0);
        assert_eq!(grid.height(), 0);
        assert!(grid.is_exhausted());
    }

    #[test]
    fn test_read_grid_from_reader() {
        let input = b"1 4\n#..#\n";
        let grid = read_grid(&input[..]).unwrap();
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.marked_count(), 2);
    }
}
