//! SAML Response validation.
//!
//! Turns the base64 `SAMLResponse` posted back by an identity provider into
//! identity claims. Every stage is fatal and nothing is read from the
//! document before its signature has been verified. Logout responses go
//! through the same decoding and signature stages.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{CorrelationField, SamlError, SamlResult, TimeCheck};
use crate::idp::IdentityProviderProfile;
use crate::profile::SpidProfile;
use crate::request::request_element_id;
use crate::signature::XmlSignatureValidator;
use crate::types::{
    Assertion, Conditions, LogoutResponse, NameId, Response, SpidLevel, SAML_NS, SAML_VERSION,
};
use crate::xml::Document;

/// Identity claims extracted from a valid response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthnClaims {
    /// Entity ID of the asserting identity provider.
    pub issuer: String,
    /// The authenticated subject.
    pub subject: NameId,
    /// IdP session index, needed for logout.
    pub session_index: String,
    /// Attribute name to value.
    pub attributes: BTreeMap<String, String>,
    /// Response metadata.
    pub response: Response,
    /// The full assertion.
    pub assertion: Assertion,
}

impl AuthnClaims {
    /// Returns an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns the SPID level the user authenticated with.
    #[must_use]
    pub fn spid_level(&self) -> Option<SpidLevel> {
        self.assertion.authn_statement.spid_level()
    }

    /// Maps the attributes onto the SPID profile.
    #[must_use]
    pub fn profile(&self) -> SpidProfile {
        SpidProfile::from_attributes(&self.attributes)
    }

    /// Checks the claims against the request the caller sent.
    ///
    /// `expected_request_id` may be given as passed to the request builder
    /// or already `_` prefixed.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::CorrelationMismatch`] naming the first field
    /// that differs.
    pub fn check_correlation(
        &self,
        expected_request_id: &str,
        expected_recipient_url: &str,
    ) -> SamlResult<()> {
        let data = &self.assertion.subject.confirmation.data;

        let expected_id = request_element_id(expected_request_id);
        if data.in_response_to != expected_id {
            return Err(SamlError::CorrelationMismatch {
                field: CorrelationField::InResponseTo,
                expected: expected_id,
                actual: data.in_response_to.clone(),
            });
        }

        let expected_recipient = expected_recipient_url.trim();
        if data.recipient != expected_recipient {
            return Err(SamlError::CorrelationMismatch {
                field: CorrelationField::Recipient,
                expected: expected_recipient.to_string(),
                actual: data.recipient.clone(),
            });
        }
        Ok(())
    }
}

/// A failed validation.
///
/// The decoded response text is kept for forensic logging by the caller. It
/// never appears in `Display` or `Debug` output.
#[derive(Error)]
#[error("{reason}")]
pub struct ValidationFailure {
    /// Why validation failed.
    pub reason: SamlError,
    /// The decoded response, when decoding got that far.
    pub raw_response: Option<String>,
}

impl ValidationFailure {
    /// Creates a failure without raw content.
    #[must_use]
    pub const fn new(reason: SamlError) -> Self {
        Self {
            reason,
            raw_response: None,
        }
    }

    /// Returns the failure reason, dropping the raw content.
    #[must_use]
    pub fn into_reason(self) -> SamlError {
        self.reason
    }
}

impl fmt::Debug for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationFailure")
            .field("reason", &self.reason)
            .field("raw_response_len", &self.raw_response.as_ref().map(String::len))
            .finish()
    }
}

impl From<ValidationFailure> for SamlError {
    fn from(failure: ValidationFailure) -> Self {
        failure.reason
    }
}

/// Result of [`ResponseValidator::parse_and_validate`].
pub type ValidationResult = Result<AuthnClaims, ValidationFailure>;

/// Result of [`ResponseValidator::validate_logout_response`].
pub type LogoutValidationResult = Result<LogoutResponse, ValidationFailure>;

/// Returns true iff `result` holds claims that correlate with the request.
#[must_use]
pub fn validate_correlation(
    result: &ValidationResult,
    expected_request_id: &str,
    expected_recipient_url: &str,
) -> bool {
    result.as_ref().is_ok_and(|claims| {
        claims
            .check_correlation(expected_request_id, expected_recipient_url)
            .is_ok()
    })
}

/// Validates responses from one identity provider for one service provider.
///
/// Immutable once built; share it between threads freely.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    idp: IdentityProviderProfile,
    audience: String,
    signatures: XmlSignatureValidator,
}

impl ResponseValidator {
    /// Creates a validator.
    ///
    /// # Arguments
    ///
    /// * `idp` - The identity provider whose responses are accepted
    /// * `audience` - This service provider's entity ID
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidInput`] if the audience is blank or the
    /// IdP has no certificate, and [`SamlError::Crypto`] if a certificate
    /// does not parse.
    pub fn new(idp: &IdentityProviderProfile, audience: impl Into<String>) -> SamlResult<Self> {
        let audience = audience.into().trim().to_string();
        if audience.is_empty() {
            return Err(SamlError::InvalidInput("audience is required".to_string()));
        }
        Ok(Self {
            signatures: idp.signature_validator()?,
            idp: idp.clone(),
            audience,
        })
    }

    /// Allows SHA-1 signatures from this IdP.
    #[must_use]
    pub fn allow_sha1(mut self, allow: bool) -> Self {
        self.signatures = self.signatures.allow_sha1(allow);
        self
    }

    /// Returns the identity provider profile.
    #[must_use]
    pub const fn identity_provider(&self) -> &IdentityProviderProfile {
        &self.idp
    }

    /// Validates a base64 `SAMLResponse` against the current time.
    pub fn parse_and_validate(&self, encoded: &str) -> ValidationResult {
        self.parse_and_validate_at(encoded, Utc::now())
    }

    /// Validates a base64 `SAMLResponse` as of `now`.
    pub fn parse_and_validate_at(&self, encoded: &str, now: DateTime<Utc>) -> ValidationResult {
        self.decode_and_run("Response", encoded, |xml| self.validate_xml(xml, now))
    }

    /// Validates a base64 `SAMLResponse` answering a logout request.
    ///
    /// The LogoutResponse root must carry a verified signature from the IdP,
    /// report success and answer `expected_request_id`, given raw or already
    /// `_` prefixed.
    pub fn validate_logout_response(
        &self,
        encoded: &str,
        expected_request_id: &str,
    ) -> LogoutValidationResult {
        self.decode_and_run("LogoutResponse", encoded, |xml| {
            self.validate_logout_xml(xml, expected_request_id)
        })
    }

    fn decode_and_run<T>(
        &self,
        kind: &'static str,
        encoded: &str,
        validate: impl FnOnce(&str) -> SamlResult<T>,
    ) -> Result<T, ValidationFailure> {
        let xml = decode(encoded).map_err(|reason| {
            warn!(reason = reason.reason_code(), kind, "response rejected before parsing");
            ValidationFailure::new(reason)
        })?;

        validate(&xml).map_err(|reason| {
            warn!(
                reason = reason.reason_code(),
                idp = %self.idp.entity_id,
                kind,
                error = %reason,
                "response rejected"
            );
            ValidationFailure {
                reason,
                raw_response: Some(xml),
            }
        })
    }

    fn validate_xml(&self, xml: &str, now: DateTime<Utc>) -> SamlResult<AuthnClaims> {
        let document = Document::parse(xml)?;
        let verified = self.signatures.verify_document(&document)?;
        debug!(verified = ?verified, "response signatures verified");

        let root = document.root();
        let response = Response::from_element(root)?;
        check_version("Response", &response.version)?;
        if let Some(issuer) = &response.issuer {
            self.check_issuer(&issuer.value)?;
        }

        if !response.is_success() {
            return Err(SamlError::StatusFailure {
                status: response.status,
            });
        }

        let root_signed = verified.iter().any(|id| *id == response.id);
        if !root_signed {
            for assertion in root.elements().filter(|el| el.is(SAML_NS, "Assertion")) {
                let covered = assertion
                    .id()
                    .is_some_and(|id| verified.iter().any(|verified| verified == id));
                if !covered {
                    return Err(SamlError::SignatureInvalid(
                        "assertion is not covered by a verified signature".to_string(),
                    ));
                }
            }
        }

        let assertion = Assertion::from_element(Response::assertion_element(root)?)?;
        check_version("Assertion", &assertion.version)?;
        self.check_issuer(&assertion.issuer.value)?;
        if !assertion.subject.confirmation.is_bearer() {
            return Err(SamlError::MalformedDocument(format!(
                "unsupported subject confirmation method {}",
                assertion.subject.confirmation.method
            )));
        }

        self.check_time(&assertion, now)?;
        self.check_audience(&assertion.conditions)?;

        debug!(
            response_id = %response.id,
            assertion_id = %assertion.id,
            attributes = assertion.attributes.len(),
            "response validated"
        );
        Ok(AuthnClaims {
            issuer: assertion.issuer.value.clone(),
            subject: assertion.subject.name_id.clone(),
            session_index: assertion.authn_statement.session_index.clone(),
            attributes: assertion.attributes.clone(),
            response,
            assertion,
        })
    }

    fn validate_logout_xml(
        &self,
        xml: &str,
        expected_request_id: &str,
    ) -> SamlResult<LogoutResponse> {
        let document = Document::parse(xml)?;
        let verified = self.signatures.verify_document(&document)?;

        let response = LogoutResponse::from_element(document.root())?;
        if !verified.iter().any(|id| *id == response.id) {
            return Err(SamlError::SignatureInvalid(
                "logout response is not covered by a verified signature".to_string(),
            ));
        }
        check_version("LogoutResponse", &response.version)?;
        if let Some(issuer) = &response.issuer {
            self.check_issuer(&issuer.value)?;
        }

        if !response.is_success() {
            return Err(SamlError::StatusFailure {
                status: response.status,
            });
        }

        let expected = request_element_id(expected_request_id);
        let actual = response.in_response_to.as_deref().unwrap_or_default();
        if actual != expected {
            return Err(SamlError::CorrelationMismatch {
                field: CorrelationField::InResponseTo,
                expected,
                actual: actual.to_string(),
            });
        }

        debug!(response_id = %response.id, in_response_to = %expected, "logout response validated");
        Ok(response)
    }

    fn check_issuer(&self, actual: &str) -> SamlResult<()> {
        if actual != self.idp.entity_id {
            return Err(SamlError::InvalidIssuer {
                expected: self.idp.entity_id.clone(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Both bounds are inclusive and widened by the IdP's clock skew.
    fn check_time(&self, assertion: &Assertion, now: DateTime<Utc>) -> SamlResult<()> {
        let skew = self.idp.clock_skew();
        let conditions = &assertion.conditions;
        let confirmation = &assertion.subject.confirmation.data;

        let violation = |check, bound| SamlError::TemporalViolation { check, now, bound };

        if now + skew < conditions.not_before {
            return Err(violation(TimeCheck::ConditionsNotBefore, conditions.not_before));
        }
        if now - skew > conditions.not_on_or_after {
            return Err(violation(
                TimeCheck::ConditionsNotOnOrAfter,
                conditions.not_on_or_after,
            ));
        }
        if now - skew > confirmation.not_on_or_after {
            return Err(violation(
                TimeCheck::SubjectConfirmationNotOnOrAfter,
                confirmation.not_on_or_after,
            ));
        }
        Ok(())
    }

    fn check_audience(&self, conditions: &Conditions) -> SamlResult<()> {
        if conditions.audience_restrictions.is_empty() {
            return Err(SamlError::AudienceMismatch {
                expected: self.audience.clone(),
                actual: String::new(),
            });
        }
        match conditions
            .audience_restrictions
            .iter()
            .find(|restriction| !restriction.allows(&self.audience))
        {
            Some(restriction) => Err(SamlError::AudienceMismatch {
                expected: self.audience.clone(),
                actual: restriction.audiences.join(", "),
            }),
            None => Ok(()),
        }
    }
}

fn decode(encoded: &str) -> SamlResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(SamlError::InvalidInput("response is empty".to_string()));
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

fn check_version(element: &str, version: &str) -> SamlResult<()> {
    if version != SAML_VERSION {
        return Err(SamlError::MalformedDocument(format!(
            "{element} version {version} is not supported"
        )));
    }
    Ok(())
}
