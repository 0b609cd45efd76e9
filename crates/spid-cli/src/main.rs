//! # SPID CLI
//!
//! Main entry point for the `spid` command.

#![forbid(unsafe_code)]

use clap::Parser;
use spid_cli::{
    cli::{Cli, Command},
    commands::{run_canonicalize, run_config, run_request, run_validate, run_verify},
    config::CliConfig,
    init_tracing,
    output::error,
    CliResult,
};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Request(args) => run_request(args, &CliConfig::load(config_path)?, cli.output),
        Command::Validate(args) => run_validate(args, &CliConfig::load(config_path)?, cli.output),
        Command::Verify(args) => run_verify(args, &CliConfig::load(config_path)?, cli.output),
        Command::Canonicalize(args) => run_canonicalize(args),
        Command::Config(cmd) => run_config(cmd, config_path, cli.output),
    }
}
