//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Identity provider missing from the configuration.
    #[error("identity provider not found: {0}")]
    IdpNotFound(String),

    /// SAML engine error.
    #[error(transparent)]
    Saml(#[from] spid_saml::SamlError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<spid_saml::ValidationFailure> for CliError {
    fn from(failure: spid_saml::ValidationFailure) -> Self {
        Self::Saml(failure.into_reason())
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
