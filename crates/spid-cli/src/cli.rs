//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::CONFIG_ENV;
use crate::output::OutputFormat;

/// SPID CLI - build requests, validate responses and inspect XML signatures.
#[derive(Debug, Parser)]
#[command(name = "spid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory).
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a signed AuthnRequest.
    Request(RequestArgs),

    /// Validate a base64 SAMLResponse.
    Validate(ValidateArgs),

    /// Verify every signature in an XML document.
    Verify(VerifyArgs),

    /// Print the canonical form of an XML document.
    Canonicalize(CanonicalizeArgs),

    /// Configuration management.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Arguments of `request`.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Identity provider name.
    #[arg(long)]
    pub idp: String,

    /// Request ID (random when omitted).
    #[arg(long)]
    pub id: Option<String>,

    /// SPID level, 0 to 3.
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=3))]
    pub level: Option<i32>,
}

/// Arguments of `validate`.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Identity provider name.
    #[arg(long)]
    pub idp: String,

    /// ID of the request this response answers.
    #[arg(long)]
    pub request_id: String,

    /// Expected recipient (defaults to the configured ACS URL).
    #[arg(long)]
    pub recipient: Option<String>,

    /// File holding the base64 response, or `-` for stdin.
    pub input: PathBuf,
}

/// Arguments of `verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Identity provider whose certificates are trusted.
    #[arg(long)]
    pub idp: String,

    /// Allow SHA-1 signatures.
    #[arg(long)]
    pub allow_sha1: bool,

    /// XML file, or `-` for stdin.
    pub input: PathBuf,
}

/// Arguments of `canonicalize`.
#[derive(Debug, Args)]
pub struct CanonicalizeArgs {
    /// Canonicalization algorithm.
    #[arg(long, value_enum, default_value = "exc-c14n")]
    pub algorithm: C14nMethod,

    /// Keep comments.
    #[arg(long)]
    pub with_comments: bool,

    /// XML file, or `-` for stdin.
    pub input: PathBuf,
}

/// Canonicalization method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum C14nMethod {
    /// Canonical XML 1.0.
    C14n,
    /// Exclusive XML Canonicalization 1.0.
    ExcC14n,
}

/// Config commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path.
    Path,

    /// Show the loaded configuration.
    Show,
}
