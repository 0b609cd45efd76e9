//! # spid-cli
//!
//! Command-line tools for a SPID service provider.
//!
//! This crate provides command-line utilities for:
//! - Building signed AuthnRequests for a configured identity provider
//! - Validating base64 SAMLResponses and printing the identity claims
//! - Verifying XML signatures against an identity provider's certificates
//! - Printing the canonical form of an XML document

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with
/// `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
