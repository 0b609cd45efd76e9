//! AuthnRequest and LogoutRequest building.
//!
//! Produces the signed, base64 encoded `SAMLRequest` value for the HTTP-POST
//! binding.

use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SamlError, SamlResult};
use crate::idp::TimestampPolicy;
use crate::signature::XmlSigner;
use crate::types::{AuthnRequest, LogoutRequest, NameId, SpidLevel};
use crate::xml::{Document, Element};

/// XML declaration prefixed to serialized requests.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Returns the on-wire identifier for a caller-supplied request ID.
///
/// XML IDs may not start with a digit, so the ID is prefixed with `_` unless
/// it already is. Responses are correlated against this value.
#[must_use]
pub fn request_element_id(id: &str) -> String {
    let id = id.trim();
    if id.starts_with('_') {
        id.to_string()
    } else {
        format!("_{id}")
    }
}

/// Generates a fresh random request ID, without the `_` prefix.
#[must_use]
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a signed AuthnRequest and returns it base64 encoded.
///
/// # Arguments
///
/// * `id` - Request ID chosen by the caller
/// * `destination` - IdP SSO endpoint
/// * `consumer_url` - The service provider's assertion consumer URL
/// * `assurance_level` - SPID level, 0 to 3
/// * `issue_time` - Issue instant; the request is valid for ten minutes
/// * `signer` - Service provider signing key
///
/// # Errors
///
/// Returns [`SamlError::InvalidInput`] if a string is blank, the signer is
/// missing or the level is out of range.
pub fn build_request(
    id: &str,
    destination: &str,
    consumer_url: &str,
    assurance_level: i32,
    issue_time: DateTime<Utc>,
    signer: Option<&XmlSigner>,
) -> SamlResult<String> {
    let signer = signer.ok_or_else(|| SamlError::InvalidInput("signing key is required".to_string()))?;
    AuthnRequestBuilder::new(id, destination, consumer_url, assurance_level)
        .with_signer(signer)
        .build_at(issue_time)
}

/// Builder for SPID authentication requests.
#[derive(Debug, Clone)]
pub struct AuthnRequestBuilder<'a> {
    id: String,
    destination: String,
    consumer_url: String,
    assurance_level: i32,
    acs_index: u16,
    attribute_index: u16,
    timestamp_policy: TimestampPolicy,
    signer: Option<&'a XmlSigner>,
}

impl<'a> AuthnRequestBuilder<'a> {
    /// Creates a builder. Inputs are checked when the request is built.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        destination: impl Into<String>,
        consumer_url: impl Into<String>,
        assurance_level: i32,
    ) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            consumer_url: consumer_url.into(),
            assurance_level,
            acs_index: 0,
            attribute_index: 1,
            timestamp_policy: TimestampPolicy::default(),
            signer: None,
        }
    }

    /// Sets the assertion consumer service index.
    #[must_use]
    pub const fn with_acs_index(mut self, index: u16) -> Self {
        self.acs_index = index;
        self
    }

    /// Sets the attribute consuming service index.
    #[must_use]
    pub const fn with_attribute_index(mut self, index: u16) -> Self {
        self.attribute_index = index;
        self
    }

    /// Sets the IdP's timestamp rendering policy.
    #[must_use]
    pub const fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    /// Sets the signer.
    #[must_use]
    pub const fn with_signer(mut self, signer: &'a XmlSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Returns the on-wire request identifier.
    #[must_use]
    pub fn element_id(&self) -> String {
        request_element_id(&self.id)
    }

    /// Builds the unsigned request model.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidInput`] if a string is blank or the level
    /// is not 0, 1, 2 or 3.
    pub fn request_at(&self, issue_time: DateTime<Utc>) -> SamlResult<AuthnRequest> {
        require("request ID", &self.id)?;
        require("destination", &self.destination)?;
        require("consumer URL", &self.consumer_url)?;
        let level = SpidLevel::from_level(self.assurance_level).ok_or_else(|| {
            SamlError::InvalidInput(format!(
                "assurance level must be between 0 and 3, got {}",
                self.assurance_level
            ))
        })?;

        Ok(AuthnRequest::new(
            self.element_id(),
            self.destination.trim(),
            &self.consumer_url,
            level,
            issue_time,
        )
        .with_acs_index(self.acs_index)
        .with_attribute_index(self.attribute_index))
    }

    /// Builds, signs and encodes the request issued at `issue_time`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidInput`] for bad inputs or a missing
    /// signer, and [`SamlError::SignatureCreation`] if signing fails.
    pub fn build_at(&self, issue_time: DateTime<Utc>) -> SamlResult<String> {
        let request = match self.request_at(issue_time) {
            Ok(request) => request,
            Err(e) => {
                warn!(reason = e.reason_code(), error = %e, "rejected authn request input");
                return Err(e);
            }
        };
        let encoded = sign_and_encode(
            self.signer,
            request.to_element(&self.timestamp_policy),
            &request.id,
        )?;

        debug!(
            request_id = %request.id,
            destination = %request.destination,
            force_authn = request.force_authn,
            "built authn request"
        );
        Ok(encoded)
    }

    /// Builds the request issued now.
    ///
    /// # Errors
    ///
    /// See [`AuthnRequestBuilder::build_at`].
    pub fn build(&self) -> SamlResult<String> {
        self.build_at(Utc::now())
    }
}

/// Builder for SPID logout requests.
///
/// Takes the subject and session index from the claims of the login being
/// terminated. IDs, timestamps and signing follow [`AuthnRequestBuilder`].
#[derive(Debug, Clone)]
pub struct LogoutRequestBuilder<'a> {
    id: String,
    destination: String,
    sp_entity_id: String,
    name_id: NameId,
    session_index: Option<String>,
    reason: Option<String>,
    timestamp_policy: TimestampPolicy,
    signer: Option<&'a XmlSigner>,
}

impl<'a> LogoutRequestBuilder<'a> {
    /// Creates a builder. Inputs are checked when the request is built.
    ///
    /// # Arguments
    ///
    /// * `id` - Request ID chosen by the caller
    /// * `destination` - IdP single logout endpoint
    /// * `sp_entity_id` - This service provider's entity ID
    /// * `name_id` - The subject returned at login
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        destination: impl Into<String>,
        sp_entity_id: impl Into<String>,
        name_id: NameId,
    ) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            sp_entity_id: sp_entity_id.into(),
            name_id,
            session_index: None,
            reason: None,
            timestamp_policy: TimestampPolicy::default(),
            signer: None,
        }
    }

    /// Sets the session index returned at login.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Sets the logout reason URI.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the IdP's timestamp rendering policy.
    #[must_use]
    pub const fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    /// Sets the signer.
    #[must_use]
    pub const fn with_signer(mut self, signer: &'a XmlSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Returns the on-wire request identifier.
    #[must_use]
    pub fn element_id(&self) -> String {
        request_element_id(&self.id)
    }

    /// Builds the unsigned request model.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidInput`] if the ID, destination, entity ID
    /// or subject is blank.
    pub fn request_at(&self, issue_time: DateTime<Utc>) -> SamlResult<LogoutRequest> {
        require("request ID", &self.id)?;
        require("destination", &self.destination)?;
        require("service provider entity ID", &self.sp_entity_id)?;
        require("subject name ID", &self.name_id.value)?;

        let mut request = LogoutRequest::new(
            self.element_id(),
            self.destination.trim(),
            &self.sp_entity_id,
            self.name_id.clone(),
            issue_time,
        );
        if let Some(index) = self.session_index.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
            request = request.with_session_index(index);
        }
        if let Some(reason) = &self.reason {
            request = request.with_reason(reason.clone());
        }
        Ok(request)
    }

    /// Builds, signs and encodes the request issued at `issue_time`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidInput`] for bad inputs or a missing
    /// signer, and [`SamlError::SignatureCreation`] if signing fails.
    pub fn build_at(&self, issue_time: DateTime<Utc>) -> SamlResult<String> {
        let request = match self.request_at(issue_time) {
            Ok(request) => request,
            Err(e) => {
                warn!(reason = e.reason_code(), error = %e, "rejected logout request input");
                return Err(e);
            }
        };
        let encoded = sign_and_encode(
            self.signer,
            request.to_element(&self.timestamp_policy),
            &request.id,
        )?;

        debug!(
            request_id = %request.id,
            destination = %request.destination,
            sessions = request.session_indexes.len(),
            "built logout request"
        );
        Ok(encoded)
    }

    /// Builds the request issued now.
    ///
    /// # Errors
    ///
    /// See [`LogoutRequestBuilder::build_at`].
    pub fn build(&self) -> SamlResult<String> {
        self.build_at(Utc::now())
    }
}

fn sign_and_encode(signer: Option<&XmlSigner>, root: Element, id: &str) -> SamlResult<String> {
    let signer = signer.ok_or_else(|| SamlError::InvalidInput("signing key is required".to_string()))?;
    let mut document = Document::new(root);
    signer.sign_document(&mut document, id)?;
    let xml = format!("{XML_DECLARATION}{}", document.to_xml());
    Ok(base64::engine::general_purpose::STANDARD.encode(xml.as_bytes()))
}

fn require(what: &str, value: &str) -> SamlResult<()> {
    if value.trim().is_empty() {
        return Err(SamlError::InvalidInput(format!("{what} is required")));
    }
    Ok(())
}
