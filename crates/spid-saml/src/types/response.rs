//! SAML Response types.
//!
//! Response messages sent by an identity provider to a service provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parse::{
    instant_attribute, optional_attribute, optional_single_child, required_attribute, single_child,
};
use super::{NameId, Status, SAMLP_NS, SAML_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// SAML Response metadata.
///
/// Everything in a `samlp:Response` except the assertion, which is only
/// read once the status says the authentication succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The identity provider that issued this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<NameId>,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The status of the response.
    pub status: Status,
}

impl Response {
    /// Reads the metadata and status of a `samlp:Response` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedDocument`] if the element is not a
    /// Response, or a required attribute or the status is missing.
    pub fn from_element(element: &Element) -> SamlResult<Self> {
        if !element.is(SAMLP_NS, "Response") {
            return Err(SamlError::MalformedDocument(format!(
                "expected samlp:Response, found {}",
                element.qualified_name()
            )));
        }

        Ok(Self {
            id: required_attribute(element, "ID")?.to_string(),
            version: required_attribute(element, "Version")?.to_string(),
            issue_instant: instant_attribute(element, "IssueInstant")?,
            issuer: optional_single_child(element, SAML_NS, "Issuer")?.map(NameId::from_element),
            in_response_to: optional_attribute(element, "InResponseTo"),
            destination: optional_attribute(element, "Destination"),
            status: Status::from_element(single_child(element, SAMLP_NS, "Status")?)?,
        })
    }

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the response's only assertion element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedDocument`] for encrypted assertions and
    /// for zero or several assertions.
    pub fn assertion_element(element: &Element) -> SamlResult<&Element> {
        if element.child(SAML_NS, "EncryptedAssertion").is_some() {
            return Err(SamlError::MalformedDocument(
                "encrypted assertions are not supported".to_string(),
            ));
        }
        single_child(element, SAML_NS, "Assertion")
    }
}
