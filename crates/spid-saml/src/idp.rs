//! Identity provider trust configuration.
//!
//! A profile is loaded once from configuration and shared read-only by every
//! request built for, and response received from, that identity provider.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use spid_crypto::Certificate;

use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSignatureValidator;

/// Precision of the timestamps written into outgoing requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPrecision {
    /// Whole seconds: `2026-03-01T09:30:00Z`.
    #[default]
    Seconds,
    /// Milliseconds: `2026-03-01T09:30:00.000Z`.
    Milliseconds,
}

/// How an identity provider wants request timestamps rendered.
///
/// Some providers reject instants without fractional seconds, others want
/// `NotBefore` moved back to absorb their own clock drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampPolicy {
    /// Rendering precision.
    pub precision: TimestampPrecision,
    /// Seconds subtracted from the request's `NotBefore`.
    pub not_before_skew_seconds: u32,
}

impl TimestampPolicy {
    /// Renders an instant as ISO-8601 UTC with a `Z` suffix.
    #[must_use]
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        let format = match self.precision {
            TimestampPrecision::Seconds => SecondsFormat::Secs,
            TimestampPrecision::Milliseconds => SecondsFormat::Millis,
        };
        instant.to_rfc3339_opts(format, true)
    }

    /// Applies the `NotBefore` skew.
    #[must_use]
    pub fn not_before(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        instant - Duration::seconds(i64::from(self.not_before_skew_seconds))
    }
}

/// Identity provider profile.
///
/// Certificates are PEM blocks or bare base64 DER. A signature is accepted
/// when any one of them verifies it, which lets an IdP roll its key over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderProfile {
    /// Short name used to select the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Entity ID the provider puts in `Issuer`.
    pub entity_id: String,

    /// Trusted signing certificates.
    pub certificates: Vec<String>,

    /// Single sign-on endpoint, the `Destination` of requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_url: Option<String>,

    /// Tolerance applied to every time-window check.
    #[serde(default)]
    pub clock_skew_seconds: u32,

    /// Request timestamp rendering.
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,
}

impl IdentityProviderProfile {
    /// Creates a profile with no certificates, no skew and default timestamps.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            name: None,
            entity_id: entity_id.into(),
            certificates: Vec::new(),
            sso_url: None,
            clock_skew_seconds: 0,
            timestamp_policy: TimestampPolicy::default(),
        }
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a trusted certificate.
    #[must_use]
    pub fn with_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.certificates.push(certificate.into());
        self
    }

    /// Sets the SSO endpoint.
    #[must_use]
    pub fn with_sso_url(mut self, url: impl Into<String>) -> Self {
        self.sso_url = Some(url.into());
        self
    }

    /// Sets the clock skew tolerance.
    #[must_use]
    pub const fn with_clock_skew(mut self, seconds: u32) -> Self {
        self.clock_skew_seconds = seconds;
        self
    }

    /// Sets the timestamp policy.
    #[must_use]
    pub const fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    /// Returns the clock skew as a duration.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::seconds(i64::from(self.clock_skew_seconds))
    }

    /// Parses the trusted certificates.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidInput`] if no certificate is configured
    /// and [`SamlError::Crypto`] if one cannot be parsed.
    pub fn trusted_certificates(&self) -> SamlResult<Vec<Certificate>> {
        if self.certificates.is_empty() {
            return Err(SamlError::InvalidInput(format!(
                "identity provider '{}' has no trusted certificate",
                self.entity_id
            )));
        }
        self.certificates
            .iter()
            .map(|text| Certificate::parse(text).map_err(SamlError::from))
            .collect()
    }

    /// Builds a signature validator anchored on this provider's certificates.
    ///
    /// # Errors
    ///
    /// See [`IdentityProviderProfile::trusted_certificates`].
    pub fn signature_validator(&self) -> SamlResult<XmlSignatureValidator> {
        Ok(XmlSignatureValidator::new(self.trusted_certificates()?))
    }
}
