//! Configuration layer: CLI arguments and the scalar type-tag dispatch
//! harness.
//!
//! `examples/original_source/main.cpp` resolves type tags through a
//! recursive template (`TypeSelector`) that can represent an arbitrary
//! ordered list of candidate types and pick among them at runtime via
//! string comparison, instantiating one concrete
//! `FluidSimulation<P, V, FV, rows, cols>` per reachable combination. This
//! crate only ever wires up four concrete scalar types
//! (`f32`, `f64`, `Fixed<32,16>`, `FastFixed<32,16>`) and two registered
//! static dimension pairs, so the same "parse a tag, then monomorphize"
//! shape is expressed directly as nested `match`es over [`TypeTag`] calling
//! a generic function, rather than rebuilding the arbitrary-arity template
//! machinery (three tags, positionally `P`, `V`, `FV`).

use crate::error::{ConfigError, SimError};
use crate::grid::{Dynamic, Static};
use crate::io::LoadedGrid;
use clap::Parser;
use std::path::PathBuf;

/// A parsed scalar type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Float,
    Double,
    Fixed(u32, u32),
    FastFixed(u32, u32),
}

/// Parse one of `FLOAT`, `DOUBLE`, `FIXED(N,K)`, `FAST_FIXED(N,K)`.
pub fn parse_type_tag(tag: &str) -> Result<TypeTag, ConfigError> {
    let trimmed = tag.trim();
    match trimmed {
        "FLOAT" => return Ok(TypeTag::Float),
        "DOUBLE" => return Ok(TypeTag::Double),
        _ => {}
    }

    if let Some(args) = trimmed
        .strip_prefix("FAST_FIXED(")
        .and_then(|s| s.strip_suffix(')'))
    {
        let (n, k) = parse_nk(args, tag)?;
        return Ok(TypeTag::FastFixed(n, k));
    }
    if let Some(args) = trimmed
        .strip_prefix("FIXED(")
        .and_then(|s| s.strip_suffix(')'))
    {
        let (n, k) = parse_nk(args, tag)?;
        return Ok(TypeTag::Fixed(n, k));
    }

    Err(ConfigError::UnknownTypeTag {
        tag: tag.to_string(),
    })
}

fn parse_nk(args: &str, original_tag: &str) -> Result<(u32, u32), ConfigError> {
    let mut parts = args.split(',').map(str::trim);
    let err = || ConfigError::UnknownTypeTag {
        tag: original_tag.to_string(),
    };
    let n: u32 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let k: u32 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    Ok((n, k))
}

/// Dimension pairs registered for the compile-time-sized storage path,
/// ported from the `DIMENSIONS` macro in `examples/original_source/main.cpp`.
pub const STATIC_DIMENSIONS: [(usize, usize); 2] = [(10, 10), (36, 84)];

/// CLI arguments, grounded in `examples/Brandnewson-LGR_2D_CFD`'s
/// `clap::Command` builder style, converted to `clap`'s derive API
/// (equivalent surface, less boilerplate for a fixed argument set).
#[derive(Debug, Parser)]
#[command(name = "cellfluid", version, about = "Recursive-DFS cellular fluid simulator")]
pub struct Cli {
    /// Input grid file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Checkpoint output path, written every 10 ticks.
    #[arg(short = 'o', long, default_value = "state.txt")]
    pub checkpoint: PathBuf,

    /// Number of ticks to run.
    #[arg(short, long, default_value_t = 1)]
    pub ticks: u64,

    /// Pressure scalar type tag.
    #[arg(long = "p", default_value = "FLOAT")]
    pub p_tag: String,

    /// Velocity scalar type tag.
    #[arg(long = "v", default_value = "FIXED(32, 16)")]
    pub v_tag: String,

    /// Flow scalar type tag.
    #[arg(long = "fv", default_value = "FAST_FIXED(32, 16)")]
    pub fv_tag: String,

    /// Log verbosity, forwarded to `tracing_subscriber::EnvFilter`.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Expand to a `match` over `TypeTag` that introduces a local type alias
/// `$name` bound to the matching concrete [`crate::scalar::Scalar`] impl,
/// then runs `$body`. Unsupported `FIXED`/`FAST_FIXED` parameter pairs
/// return a [`ConfigError`] (only `(32, 16)` is wired up); configuration
/// errors are reported before any ticks run.
macro_rules! with_scalar_type {
    ($tag:expr, $name:ident, $body:block) => {
        match $tag {
            TypeTag::Float => {
                type $name = f32;
                $body
            }
            TypeTag::Double => {
                type $name = f64;
                $body
            }
            TypeTag::Fixed(32, 16) => {
                type $name = crate::fixed::Fixed32_16;
                $body
            }
            TypeTag::FastFixed(32, 16) => {
                type $name = crate::fixed::FastFixed32_16;
                $body
            }
            TypeTag::Fixed(n, k) => {
                return Err(ConfigError::UnsupportedFixedParams { n, k }.into());
            }
            TypeTag::FastFixed(n, k) => {
                return Err(ConfigError::UnsupportedFixedParams { n, k }.into());
            }
        }
    };
}

/// Resolve `cli`'s three scalar-type tags and the loaded grid's dimensions
/// into one concrete `Simulation<P, V, FV, Backend>` instantiation, then
/// hand off to `run`.
pub fn dispatch(cli: &Cli, grid: LoadedGrid) -> Result<(), SimError> {
    let p_tag = parse_type_tag(&cli.p_tag)?;
    let v_tag = parse_type_tag(&cli.v_tag)?;
    let fv_tag = parse_type_tag(&cli.fv_tag)?;

    with_scalar_type!(p_tag, P, {
        with_scalar_type!(v_tag, V, {
            with_scalar_type!(fv_tag, FV, {
                return dispatch_backend::<P, V, FV>(cli, grid);
            })
        })
    })
}

fn dispatch_backend<P, V, FV>(cli: &Cli, grid: LoadedGrid) -> Result<(), SimError>
where
    P: crate::scalar::Scalar,
    V: crate::scalar::Scalar,
    FV: crate::scalar::Scalar,
{
    match (grid.rows, grid.cols) {
        (10, 10) => crate::run::run::<P, V, FV, Static<10, 10>>(cli, grid),
        (36, 84) => crate::run::run::<P, V, FV, Static<36, 84>>(cli, grid),
        _ => crate::run::run::<P, V, FV, Dynamic>(cli, grid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_float_and_double() {
        assert_eq!(parse_type_tag("FLOAT").unwrap(), TypeTag::Float);
        assert_eq!(parse_type_tag("DOUBLE").unwrap(), TypeTag::Double);
    }

    #[test]
    fn parses_fixed_and_fast_fixed() {
        assert_eq!(
            parse_type_tag("FIXED(32, 16)").unwrap(),
            TypeTag::Fixed(32, 16)
        );
        assert_eq!(
            parse_type_tag("FAST_FIXED(32,16)").unwrap(),
            TypeTag::FastFixed(32, 16)
        );
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(parse_type_tag("INT32").is_err());
    }
}
