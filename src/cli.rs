// In: src/cli.rs

//! Positional command-line parsing for the `mgard-verify` binary.
//!
//! ```text
//! mgard-verify <input> <s|d> <num_dims> <dim1> .. <dimN> <rel|abs> <tolerance> <s> <cpu|gpu>
//!              [--enforce-size] [--json]
//! ```
//!
//! Malformed arguments are reported as configuration errors; the binary turns
//! those into the usage message and exit code 0, as the legacy tool did.

use std::str::FromStr;

use crate::config::RunConfig;
use crate::error::VerifyError;
use crate::types::{Shape, MAX_DIMS, MIN_DIMS};

const ENFORCE_SIZE_FLAG: &str = "--enforce-size";
const JSON_FLAG: &str = "--json";

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Help,
    Run { config: RunConfig, json: bool },
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {} <input file|random> <s|d> <num. of dimensions> <1st dim.> <2nd dim.> ... \
         <rel|abs> <tolerance> <s> <cpu|gpu> [{}] [{}]",
        program, ENFORCE_SIZE_FLAG, JSON_FLAG
    )
}

/// Parses the arguments following the program name.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<CliCommand, VerifyError> {
    let mut tokens = args.iter().map(|a| a.as_ref());

    if args.len() == 1 && matches!(args[0].as_ref(), "--help" | "-h") {
        return Ok(CliCommand::Help);
    }

    let input = next(&mut tokens, "input")?.to_string();
    let precision = parse_next(&mut tokens, "precision")?;

    let num_dims: usize = parse_next(&mut tokens, "num_dims")?;
    if !(MIN_DIMS..=MAX_DIMS).contains(&num_dims) {
        return Err(VerifyError::UnsupportedDimensionality(num_dims));
    }
    let dims = (0..num_dims)
        .map(|_| parse_next::<usize>(&mut tokens, "dim"))
        .collect::<Result<Vec<_>, _>>()?;
    let shape = Shape::new(dims)?;

    let mode = parse_next(&mut tokens, "mode")?;
    let tolerance: f64 = parse_next(&mut tokens, "tolerance")?;
    if tolerance.is_nan() || tolerance < 0.0 {
        return Err(VerifyError::InvalidArgument {
            name: "tolerance",
            value: tolerance.to_string(),
        });
    }
    let smoothness: f64 = parse_next(&mut tokens, "s")?;
    if smoothness.is_nan() {
        return Err(VerifyError::InvalidArgument {
            name: "s",
            value: smoothness.to_string(),
        });
    }
    let device = parse_next(&mut tokens, "device")?;

    let mut enforce_size = false;
    let mut json = false;
    for extra in tokens {
        match extra {
            ENFORCE_SIZE_FLAG => enforce_size = true,
            JSON_FLAG => json = true,
            other => log::warn!("Ignoring extra argument '{}'", other),
        }
    }

    Ok(CliCommand::Run {
        config: RunConfig {
            input,
            precision,
            shape,
            mode,
            tolerance,
            smoothness,
            device,
            enforce_size,
        },
        json,
    })
}

fn next<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<&'a str, VerifyError> {
    tokens.next().ok_or(VerifyError::MissingArgument(name))
}

fn parse_next<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<T, VerifyError> {
    let raw = next(tokens, name)?;
    raw.trim().parse().map_err(|_| VerifyError::InvalidArgument {
        name,
        value: raw.to_string(),
    })
}
