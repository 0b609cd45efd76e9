//! CLI configuration.
//!
//! A TOML file describing this service provider and the identity providers
//! it trusts. Relative paths are resolved against the file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spid_saml::{IdentityProviderProfile, TimestampPolicy, XmlSigner};

use crate::{CliError, CliResult};

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "SPID_CONFIG";

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// This service provider.
    pub service_provider: ServiceProviderConfig,

    /// Trusted identity providers.
    #[serde(default)]
    pub identity_providers: Vec<IdentityProviderConfig>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Service provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProviderConfig {
    /// Entity ID, the audience responses must be addressed to.
    pub entity_id: String,

    /// Assertion consumer service URL.
    pub acs_url: String,

    /// PEM private key used to sign requests.
    pub private_key_path: PathBuf,

    /// PEM certificate embedded in request signatures.
    pub certificate_path: PathBuf,

    /// Assertion consumer service index.
    #[serde(default)]
    pub acs_index: u16,

    /// Attribute consuming service index.
    #[serde(default = "default_attribute_index")]
    pub attribute_index: u16,

    /// SPID level requested when none is given.
    #[serde(default = "default_level")]
    pub default_level: i32,
}

/// Identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// Short name used on the command line.
    pub name: String,

    /// Entity ID.
    pub entity_id: String,

    /// Single sign-on URL.
    pub sso_url: String,

    /// PEM certificates trusted for response signatures.
    pub certificate_paths: Vec<PathBuf>,

    /// Clock skew tolerance.
    #[serde(default)]
    pub clock_skew_seconds: u32,

    /// Request timestamp rendering.
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,
}

const fn default_attribute_index() -> u16 {
    1
}

const fn default_level() -> i32 {
    2
}

impl CliConfig {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file is missing or invalid.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        if !config_path.exists() {
            return Err(CliError::Config(format!(
                "configuration file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config = Self::parse(&content)?;
        config.base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::debug!(path = %config_path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the TOML is invalid.
    pub fn parse(content: &str) -> CliResult<Self> {
        toml::from_str(content).map_err(|e| CliError::Config(format!("failed to parse config: {e}")))
    }

    /// Gets the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the platform has no config directory.
    pub fn default_path() -> CliResult<PathBuf> {
        let config_dir = dirs_next::config_dir().ok_or_else(|| {
            CliError::Config("could not determine configuration directory".to_string())
        })?;
        Ok(config_dir.join("spid").join("spid.toml"))
    }

    /// Resolves the effective configuration path.
    ///
    /// # Errors
    ///
    /// See [`CliConfig::default_path`].
    pub fn effective_path(arg_path: Option<&Path>) -> CliResult<PathBuf> {
        arg_path.map_or_else(Self::default_path, |path| Ok(path.to_path_buf()))
    }

    /// Looks up an identity provider by name.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::IdpNotFound`] for an unknown name.
    pub fn identity_provider(&self, name: &str) -> CliResult<&IdentityProviderConfig> {
        self.identity_providers
            .iter()
            .find(|idp| idp.name == name)
            .ok_or_else(|| CliError::IdpNotFound(name.to_string()))
    }

    /// Builds the trust profile of the named identity provider.
    ///
    /// # Errors
    ///
    /// Fails if the provider is unknown or a certificate cannot be read.
    pub fn idp_profile(&self, name: &str) -> CliResult<IdentityProviderProfile> {
        let idp = self.identity_provider(name)?;
        let mut profile = IdentityProviderProfile::new(&idp.entity_id)
            .with_name(&idp.name)
            .with_sso_url(&idp.sso_url)
            .with_clock_skew(idp.clock_skew_seconds)
            .with_timestamp_policy(idp.timestamp_policy);
        for path in &idp.certificate_paths {
            profile = profile.with_certificate(self.read(path)?);
        }
        Ok(profile)
    }

    /// Loads the service provider's request signer.
    ///
    /// # Errors
    ///
    /// Fails if the key or certificate cannot be read or parsed.
    pub fn signer(&self) -> CliResult<XmlSigner> {
        let key = self.read(&self.service_provider.private_key_path)?;
        let certificate = self.read(&self.service_provider.certificate_path)?;
        Ok(XmlSigner::from_pem(&key, Some(&certificate))?)
    }

    /// Resolves a configured path.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn read(&self, path: &Path) -> CliResult<String> {
        let resolved = self.resolve(path);
        std::fs::read_to_string(&resolved).map_err(|e| {
            CliError::Config(format!("cannot read {}: {e}", resolved.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[service_provider]
entity_id = "https://sp.example.it"
acs_url = "https://sp.example.it/acs"
private_key_path = "keys/sp.key.pem"
certificate_path = "/etc/spid/sp.cert.pem"

[[identity_providers]]
name = "test"
entity_id = "https://idp.example.it"
sso_url = "https://idp.example.it/sso"
certificate_paths = ["idp.cert.pem"]
clock_skew_seconds = 30

[identity_providers.timestamp_policy]
precision = "milliseconds"
not_before_skew_seconds = 120
"#;

    #[test]
    fn parses_config_with_defaults() {
        let config = CliConfig::parse(CONFIG).unwrap();
        assert_eq!(config.service_provider.acs_index, 0);
        assert_eq!(config.service_provider.attribute_index, 1);
        assert_eq!(config.service_provider.default_level, 2);

        let idp = config.identity_provider("test").unwrap();
        assert_eq!(idp.clock_skew_seconds, 30);
        assert_eq!(idp.timestamp_policy.not_before_skew_seconds, 120);
        assert_eq!(
            idp.timestamp_policy.precision,
            spid_saml::TimestampPrecision::Milliseconds
        );
    }

    #[test]
    fn unknown_idp() {
        let config = CliConfig::parse(CONFIG).unwrap();
        assert!(matches!(
            config.identity_provider("other"),
            Err(CliError::IdpNotFound(_))
        ));
    }

    #[test]
    fn resolves_relative_paths() {
        let mut config = CliConfig::parse(CONFIG).unwrap();
        config.base_dir = PathBuf::from("/srv/spid");
        assert_eq!(
            config.resolve(&config.service_provider.private_key_path),
            PathBuf::from("/srv/spid/keys/sp.key.pem")
        );
        assert_eq!(
            config.resolve(&config.service_provider.certificate_path),
            PathBuf::from("/etc/spid/sp.cert.pem")
        );
    }

    #[test]
    fn invalid_toml_is_config_error() {
        assert!(matches!(CliConfig::parse("[service_provider"), Err(CliError::Config(_))));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/spid.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
