//! Error taxonomy: configuration errors, I/O errors, and invariant
//! violations.
//!
//! Grounded in the `thiserror`-based error enums used across the corpus
//! (e.g. `examples/other_examples/manifests/jgraef-fdtd`); bare
//! `Box<dyn std::error::Error>` at the `main` boundary is kept only as the
//! top-level `main()` return type while every internal failure gets a
//! concrete variant here.

use std::path::PathBuf;
use thiserror::Error;

/// A bad or unrecognized scalar type tag, or a dimension mismatch, detected
/// before any ticks run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unrecognized scalar type tag {tag:?}; expected FLOAT, DOUBLE, FIXED(N,K), or FAST_FIXED(N,K)")]
    UnknownTypeTag { tag: String },

    #[error("type tag FIXED({n},{k}) is not wired to a concrete Scalar impl; only FIXED(32,16) is")]
    UnsupportedFixedParams { n: u32, k: u32 },

    #[error("grid has fewer than 3 rows or 3 columns including the border: {rows}x{cols}")]
    GridTooSmall { rows: usize, cols: usize },
}

/// Input or checkpoint I/O failure, tagged with which one failed so `main`
/// can select the matching exit code.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to open input grid file {path}: {source}")]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input grid file {path}: {reason}")]
    InputMalformed { path: PathBuf, reason: String },

    #[error("failed to write checkpoint file {path}: {source}")]
    CheckpointWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type returned by the library surface.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] IoError),

    /// A propagator-internal invariant was violated: flow exceeded capacity,
    /// negative capacity appeared during positive-flow reconciliation, or a
    /// zero-weighted direction was chosen during migration. These represent
    /// numerical/programmer bugs, not recoverable runtime states. The hot
    /// path still `debug_assert!`s and panics directly; this variant exists
    /// so library callers (tests) have something typed to
    /// match on when they drive propagators directly rather than through
    /// the panicking CLI path.
    #[error("invariant violated: {0}")]
    Invariant(String),
}
