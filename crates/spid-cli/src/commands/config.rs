//! Configuration management commands.

use serde::Serialize;

use crate::cli::ConfigCommand;
use crate::config::CliConfig;
use crate::output::{info, output_single, OutputFormat};

/// Identity provider summary printed by `config show`.
#[derive(Debug, Serialize)]
struct IdpSummary<'a> {
    name: &'a str,
    entity_id: &'a str,
    sso_url: &'a str,
    certificates: usize,
    clock_skew_seconds: u32,
}

/// What `config show` prints. Key material is referenced by path only.
#[derive(Debug, Serialize)]
struct ConfigSummary<'a> {
    path: String,
    entity_id: &'a str,
    acs_url: &'a str,
    private_key_path: String,
    certificate_path: String,
    identity_providers: Vec<IdpSummary<'a>>,
}

/// Runs a config command.
pub fn run_config(
    cmd: ConfigCommand,
    config_path: Option<&std::path::Path>,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let path = CliConfig::effective_path(config_path)?;
    match cmd {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let config = CliConfig::load(Some(&path))?;
            info(&format!("Configuration file: {}", path.display()));
            output_single(&summary(&config, path.display().to_string()), format)
        }
    }
}

fn summary(config: &CliConfig, path: String) -> ConfigSummary<'_> {
    let sp = &config.service_provider;
    ConfigSummary {
        path,
        entity_id: &sp.entity_id,
        acs_url: &sp.acs_url,
        private_key_path: config.resolve(&sp.private_key_path).display().to_string(),
        certificate_path: config.resolve(&sp.certificate_path).display().to_string(),
        identity_providers: config
            .identity_providers
            .iter()
            .map(|idp| IdpSummary {
                name: &idp.name,
                entity_id: &idp.entity_id,
                sso_url: &idp.sso_url,
                certificates: idp.certificate_paths.len(),
                clock_skew_seconds: idp.clock_skew_seconds,
            })
            .collect(),
    }
}
