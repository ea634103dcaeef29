//! Plain-text map persistence.
//!
//! One line per grid row, row 0 first. Each cell value is written in column
//! order and followed by a single space. There is no header: the height is
//! the number of lines and the width is the token count of the first line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::MappingError;
use crate::map::{CellValue, OccupancyGrid};

/// Writes `grid` to `writer` in the plain-text map format.
pub fn write_grid<W: Write>(grid: &OccupancyGrid, mut writer: W) -> std::io::Result<()> {
    for row in grid.rows() {
        for value in row {
            write!(writer, "{} ", value)?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// Writes `grid` to the file at `path`, creating or truncating it.
///
/// If the file cannot be opened or written the error names the path. A
/// failed write may leave a partial file behind.
pub fn save_grid(grid: &OccupancyGrid, path: &Path) -> Result<(), MappingError> {
    let record_err = |source| MappingError::Record {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(record_err)?;
    write_grid(grid, BufWriter::new(file)).map_err(record_err)
}

/// Parses a grid from the plain-text map format.
///
/// Blank lines are ignored. Every row must have as many values as the first.
pub fn read_grid<R: BufRead>(reader: R) -> Result<OccupancyGrid, MappingError> {
    let mut rows: Vec<Vec<CellValue>> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;

        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<CellValue>().map_err(|e| MappingError::Parse {
                    line: line_no,
                    reason: format!("invalid cell value {:?}: {}", token, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(MappingError::Parse {
                    line: line_no,
                    reason: format!("expected {} values, found {}", first.len(), row.len()),
                });
            }
        }
        rows.push(row);
    }

    OccupancyGrid::from_rows(rows)
}

/// Reads a grid from the file at `path`.
pub fn load_grid(path: &Path) -> Result<OccupancyGrid, MappingError> {
    let file = File::open(path)?;
    read_grid(BufReader::new(file))
}
