//! SAML error types.
//!
//! Every failure names the check that tripped and, where one exists, the
//! expected and actual values, so callers can log the cause and tests can pin
//! it down. None of these errors is retried internally.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::Status;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML engine errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// A required input was missing, empty or out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Base64 or UTF-8 decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// XML could not be parsed, or a required element or attribute is missing.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// The identity provider reported a non-success status.
    #[error("identity provider returned status {status}")]
    StatusFailure {
        /// The status carried by the response.
        status: Status,
    },

    /// The current time falls outside a validity window.
    #[error("{check} violated: now is {now}, bound is {bound}")]
    TemporalViolation {
        /// The bound that was checked.
        check: TimeCheck,
        /// The instant used as "now", before skew is applied.
        now: DateTime<Utc>,
        /// The bound found in the document.
        bound: DateTime<Utc>,
    },

    /// The assertion is not addressed to this service provider.
    #[error("invalid audience: expected {expected}, got {actual}")]
    AudienceMismatch {
        /// Our entity ID.
        expected: String,
        /// The audiences listed in the assertion.
        actual: String,
    },

    /// The response does not correlate with the request the caller sent.
    #[error("{field} mismatch: expected {expected}, got {actual}")]
    CorrelationMismatch {
        /// The field that failed to correlate.
        field: CorrelationField,
        /// The value the caller expected.
        expected: String,
        /// The value found in the response.
        actual: String,
    },

    /// The issuer is not the configured identity provider.
    #[error("invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer {
        /// The configured entity ID.
        expected: String,
        /// The issuer found in the document.
        actual: String,
    },

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns a stable, machine-readable code for this error.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Encoding(_) => "encoding",
            Self::MalformedDocument(_) => "malformed_document",
            Self::SignatureInvalid(_) => "signature_invalid",
            Self::SignatureCreation(_) => "signature_creation",
            Self::StatusFailure { .. } => "status_failure",
            Self::TemporalViolation { .. } => "temporal_violation",
            Self::AudienceMismatch { .. } => "audience_mismatch",
            Self::CorrelationMismatch { .. } => "correlation_mismatch",
            Self::InvalidIssuer { .. } => "invalid_issuer",
            Self::Crypto(_) => "crypto",
        }
    }

    pub(crate) fn missing(what: &str) -> Self {
        Self::MalformedDocument(format!("missing required {what}"))
    }
}

/// Time bounds enforced during response validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeCheck {
    /// `Conditions/@NotBefore`.
    ConditionsNotBefore,
    /// `Conditions/@NotOnOrAfter`.
    ConditionsNotOnOrAfter,
    /// `SubjectConfirmationData/@NotOnOrAfter`.
    SubjectConfirmationNotOnOrAfter,
}

impl fmt::Display for TimeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConditionsNotBefore => "Conditions NotBefore",
            Self::ConditionsNotOnOrAfter => "Conditions NotOnOrAfter",
            Self::SubjectConfirmationNotOnOrAfter => "SubjectConfirmationData NotOnOrAfter",
        })
    }
}

/// Fields compared by the correlation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationField {
    /// `SubjectConfirmationData/@InResponseTo`, or the LogoutResponse's.
    InResponseTo,
    /// `SubjectConfirmationData/@Recipient`.
    Recipient,
}

impl fmt::Display for CorrelationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InResponseTo => "InResponseTo",
            Self::Recipient => "Recipient",
        })
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for SamlError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Encoding(format!("invalid base64: {err}"))
    }
}

impl From<std::string::FromUtf8Error> for SamlError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Encoding(format!("invalid UTF-8: {err}"))
    }
}

impl From<spid_crypto::SignatureError> for SamlError {
    fn from(err: spid_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}
