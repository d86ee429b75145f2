//! Grid reader and checkpoint writer.
//!
//! Grounded in `main()`'s parsing loop in `examples/original_source/main.cpp`
//! and `FluidSimulation::save_to_file`, reimplemented with `BufRead`/typed
//! [`crate::error::IoError`] instead of `errno`/`strerror` and a bare
//! `std::exit`.

use crate::error::IoError;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// A grid and its associated scalar parameters, loaded from the input file.
#[derive(Debug, Clone)]
pub struct LoadedGrid {
    pub rows: usize,
    pub cols: usize,
    /// Row-major field characters, with the `C+1`-wide sentinel column
    /// already stripped; the simulator treats the border as `#`-equivalent.
    pub field: Vec<Vec<u8>>,
    pub rho_air: f64,
    pub rho_fluid: f64,
    pub g: f64,
}

/// Parse the input grid file format: `R C` on the first line, `R` lines of
/// `C+1` characters, then `rho_air rho_fluid g`.
pub fn read_grid(path: &Path) -> Result<LoadedGrid, IoError> {
    let file = std::fs::File::open(path).map_err(|source| IoError::InputOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines = BufReader::new(file).lines();

    let malformed = |reason: &str| IoError::InputMalformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let header = lines
        .next()
        .ok_or_else(|| malformed("missing R C header line"))?
        .map_err(|source| IoError::InputOpen {
            path: path.to_path_buf(),
            source,
        })?;
    let mut header_parts = header.split_whitespace();
    let rows: usize = header_parts
        .next()
        .ok_or_else(|| malformed("missing row count"))?
        .parse()
        .map_err(|_| malformed("row count is not an integer"))?;
    let cols: usize = header_parts
        .next()
        .ok_or_else(|| malformed("missing column count"))?
        .parse()
        .map_err(|_| malformed("column count is not an integer"))?;
    if rows < 3 || cols < 3 {
        return Err(malformed("grid has fewer than 3 rows or columns"));
    }

    let mut field = Vec::with_capacity(rows);
    for row_idx in 0..rows {
        let line = lines
            .next()
            .ok_or_else(|| malformed(&format!("expected {rows} field rows, found {row_idx}")))?
            .map_err(|source| IoError::InputOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let bytes = line.as_bytes();
        if bytes.len() < cols {
            return Err(malformed(&format!(
                "row {row_idx} has {} characters, expected at least {cols}",
                bytes.len()
            )));
        }
        // The C+1'th character is the sentinel the original overwrites with
        // NUL; we simply don't store it, since field access never reaches
        // column `cols` in a well-formed (bordered) grid.
        field.push(bytes[..cols].to_vec());
    }

    let tail = lines
        .next()
        .ok_or_else(|| malformed("missing rho_air rho_fluid g line"))?
        .map_err(|source| IoError::InputOpen {
            path: path.to_path_buf(),
            source,
        })?;
    let mut tail_parts = tail.split_whitespace();
    let rho_air: f64 = tail_parts
        .next()
        .ok_or_else(|| malformed("missing rho_air"))?
        .parse()
        .map_err(|_| malformed("rho_air is not a number"))?;
    let rho_fluid: f64 = tail_parts
        .next()
        .ok_or_else(|| malformed("missing rho_fluid"))?
        .parse()
        .map_err(|_| malformed("rho_fluid is not a number"))?;
    let g: f64 = tail_parts
        .next()
        .ok_or_else(|| malformed("missing g"))?
        .parse()
        .map_err(|_| malformed("g is not a number"))?;

    Ok(LoadedGrid {
        rows,
        cols,
        field,
        rho_air,
        rho_fluid,
        g,
    })
}

/// Write a checkpoint: `R C`, then `R` field rows (non-NUL characters
/// only, since the sentinel was never stored, so these are just the stored
/// rows), then `rho_air`, `rho_fluid`, `g` each on their own line. Atomic replace
/// is not required, so a plain overwrite suffices.
pub fn write_checkpoint(
    path: &Path,
    rows: usize,
    cols: usize,
    field_rows: &[String],
    rho_air: f64,
    rho_fluid: f64,
    g: f64,
) -> Result<(), IoError> {
    let mut out = String::new();
    out.push_str(&format!("{rows} {cols}\n"));
    for row in field_rows {
        out.push_str(row);
        out.push('\n');
    }
    out.push_str(&format!("{rho_air}\n{rho_fluid}\n{g}\n"));

    let mut file = std::fs::File::create(path).map_err(|source| IoError::CheckpointWrite {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(out.as_bytes())
        .map_err(|source| IoError::CheckpointWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Default checkpoint path, mirroring the original's hardcoded
/// `../state.txt` relative-to-build-dir convention loosely: we take it as a
/// CLI-configurable path instead (see [`crate::config::Cli`]) and only fall
/// back to this literal when the user doesn't override it.
pub fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("state.txt")
}
