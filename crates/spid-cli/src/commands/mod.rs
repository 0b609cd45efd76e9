//! Command implementations.

pub mod config;
pub mod request;
pub mod response;
pub mod xml;

pub use config::run_config;
pub use request::run_request;
pub use response::run_validate;
pub use xml::{run_canonicalize, run_verify};

use std::io::Read;
use std::path::Path;

/// Reads a file, or stdin when the path is `-`.
///
/// # Errors
///
/// Returns an IO error if the input cannot be read.
pub fn read_input(path: &Path) -> crate::CliResult<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        Ok(input)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
