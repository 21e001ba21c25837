//! The fixed error taxonomy for this tool.
//!
//! Every fatal path in the pipeline produces one of these variants. Propagation is
//! surface-only: internal functions return `Result<T, Error>`, and `main` is the only
//! place that prints the message and calls `process::exit`. There are no retries.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Malformed net file, unbalanced parentheses in a constraint, or a bad label.
    InputParse(String),
    /// Non-zero exit from the net-to-PNML translator, the XSLT processor, or the
    /// acceleration engine.
    ExternalTool(String),
    /// The accelerator's output was missing an expected marker, or referenced a
    /// transition id that does not exist in the net.
    AcceleratorOutput(String),
    /// A write or read against the SMT solver's pipes failed.
    SolverPipe(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InputParse(msg) => write!(f, "input parse error: {msg}"),
            Error::ExternalTool(msg) => write!(f, "external tool failed: {msg}"),
            Error::AcceleratorOutput(msg) => write!(f, "accelerator output error: {msg}"),
            Error::SolverPipe(msg) => write!(f, "solver pipe failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
