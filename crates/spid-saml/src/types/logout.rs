//! SAML Single Logout types.
//!
//! The service provider sends a `LogoutRequest` naming the subject and
//! session it received at login; the IdP answers with a `LogoutResponse`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::parse::{
    instant_attribute, optional_attribute, optional_single_child, required_attribute, single_child,
};
use super::{
    NameId, Status, REQUEST_VALIDITY_MINUTES, SAMLP_NS, SAMLP_PREFIX, SAML_NS, SAML_PREFIX,
    SAML_VERSION,
};
use crate::error::{SamlError, SamlResult};
use crate::idp::TimestampPolicy;
use crate::xml::Element;

/// Logout reason: user-initiated logout.
pub const REASON_USER: &str = "urn:oasis:names:tc:SAML:2.0:logout:user";

/// SAML LogoutRequest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// On-wire identifier, always starting with `_`.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// Identity provider logout endpoint.
    pub destination: String,

    /// Issuer: the service provider entity ID, entity format.
    pub issuer: NameId,

    /// The subject being logged out, as received in the assertion.
    pub name_id: NameId,

    /// Session indexes to terminate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub session_indexes: Vec<String>,

    /// Reason for the logout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// End of the validity window.
    pub not_on_or_after: DateTime<Utc>,
}

impl LogoutRequest {
    /// Creates a logout request for `name_id`, issued at `issue_instant`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        destination: impl Into<String>,
        sp_entity_id: &str,
        name_id: NameId,
        issue_instant: DateTime<Utc>,
    ) -> Self {
        let sp_entity_id = sp_entity_id.trim();
        Self {
            id: id.into(),
            version: SAML_VERSION.to_string(),
            issue_instant,
            destination: destination.into(),
            issuer: NameId::entity(sp_entity_id).with_name_qualifier(sp_entity_id),
            name_id,
            session_indexes: Vec::new(),
            reason: None,
            not_on_or_after: issue_instant + Duration::minutes(REQUEST_VALIDITY_MINUTES),
        }
    }

    /// Adds a session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_indexes.push(index.into());
        self
    }

    /// Sets the logout reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Builds the `saml2p:LogoutRequest` element.
    #[must_use]
    pub fn to_element(&self, policy: &TimestampPolicy) -> Element {
        let mut root = Element::new(Some(SAMLP_PREFIX), "LogoutRequest", Some(SAMLP_NS))
            .with_namespace_declaration(Some(SAMLP_PREFIX), SAMLP_NS)
            .with_namespace_declaration(Some(SAML_PREFIX), SAML_NS)
            .with_attribute("ID", self.id.clone())
            .with_attribute("Version", self.version.clone())
            .with_attribute("IssueInstant", policy.format(self.issue_instant))
            .with_attribute("Destination", self.destination.clone())
            .with_attribute("NotOnOrAfter", policy.format(self.not_on_or_after));
        if let Some(reason) = &self.reason {
            root = root.with_attribute("Reason", reason.clone());
        }

        let root = root
            .with_child(self.issuer.to_element("Issuer"))
            .with_child(self.name_id.to_element("NameID"));
        self.session_indexes.iter().fold(root, |root, index| {
            root.with_child(
                Element::new(Some(SAMLP_PREFIX), "SessionIndex", Some(SAMLP_NS))
                    .with_text(index.clone()),
            )
        })
    }
}

/// SAML LogoutResponse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The identity provider that issued this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<NameId>,

    /// The ID of the logout request this response answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The status of the logout.
    pub status: Status,
}

impl LogoutResponse {
    /// Reads a `samlp:LogoutResponse` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedDocument`] if the element is not a
    /// LogoutResponse, or a required attribute or the status is missing.
    pub fn from_element(element: &Element) -> SamlResult<Self> {
        if !element.is(SAMLP_NS, "LogoutResponse") {
            return Err(SamlError::MalformedDocument(format!(
                "expected samlp:LogoutResponse, found {}",
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

    /// Returns true if the IdP terminated the session.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::{status_codes, NameIdFormat};
    use crate::xml::Document;

    fn issue_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
    }

    fn subject() -> NameId {
        NameId::new("_subject")
            .with_format(NameIdFormat::Transient)
            .with_name_qualifier("https://idp.example.it")
    }

    #[test]
    fn request_element_layout() {
        let element = LogoutRequest::new(
            "_lo1",
            "https://idp.example.it/slo",
            " https://sp.example.it ",
            subject(),
            issue_time(),
        )
        .with_session_index("_session")
        .with_reason(REASON_USER)
        .to_element(&TimestampPolicy::default());

        assert_eq!(element.qualified_name(), "saml2p:LogoutRequest");
        assert_eq!(element.id(), Some("_lo1"));
        assert_eq!(element.attribute("IssueInstant"), Some("2026-03-01T10:00:00Z"));
        assert_eq!(element.attribute("NotOnOrAfter"), Some("2026-03-01T10:10:00Z"));
        assert_eq!(element.attribute("Reason"), Some(REASON_USER));

        let names: Vec<_> = element.elements().map(Element::qualified_name).collect();
        assert_eq!(names, ["saml2:Issuer", "saml2:NameID", "saml2p:SessionIndex"]);

        let issuer = element.child(SAML_NS, "Issuer").unwrap();
        assert_eq!(issuer.text(), "https://sp.example.it");
        assert_eq!(issuer.attribute("Format"), Some(NameIdFormat::Entity.uri()));

        let name_id = element.child(SAML_NS, "NameID").unwrap();
        assert_eq!(name_id.text(), "_subject");
        assert_eq!(name_id.attribute("NameQualifier"), Some("https://idp.example.it"));
        assert_eq!(element.child(SAMLP_NS, "SessionIndex").unwrap().text(), "_session");
    }

    #[test]
    fn request_without_session_or_reason() {
        let element = LogoutRequest::new("_lo2", "https://idp/slo", "https://sp", subject(), issue_time())
            .to_element(&TimestampPolicy::default());
        assert!(element.attribute("Reason").is_none());
        assert!(element.child(SAMLP_NS, "SessionIndex").is_none());
    }

    const LOGOUT_RESPONSE: &str = r#"<samlp:LogoutResponse xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_lr1" Version="2.0" IssueInstant="2026-03-01T10:00:05Z" InResponseTo="_lo1" Destination="https://sp.example.it/slo">
  <saml:Issuer>https://idp.example.it</saml:Issuer>
  <samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>
</samlp:LogoutResponse>"#;

    #[test]
    fn response_metadata() {
        let doc = Document::parse(LOGOUT_RESPONSE).unwrap();
        let response = LogoutResponse::from_element(doc.root()).unwrap();

        assert_eq!(response.id, "_lr1");
        assert_eq!(response.in_response_to.as_deref(), Some("_lo1"));
        assert_eq!(response.destination.as_deref(), Some("https://sp.example.it/slo"));
        assert_eq!(response.issuer.unwrap().value, "https://idp.example.it");
        assert_eq!(response.status.status_code.value, status_codes::SUCCESS);
        assert!(response.status.is_success());
    }

    #[test]
    fn authn_response_is_not_a_logout_response() {
        let doc = Document::parse(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_r" Version="2.0" IssueInstant="2026-03-01T10:00:05Z"/>"#,
        )
        .unwrap();
        assert!(matches!(
            LogoutResponse::from_element(doc.root()),
            Err(SamlError::MalformedDocument(ref m)) if m.contains("LogoutResponse")
        ));
    }

    #[test]
    fn missing_status_is_malformed() {
        let without = LOGOUT_RESPONSE.replace(
            r#"<samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>"#,
            "",
        );
        let doc = Document::parse(&without).unwrap();
        assert!(LogoutResponse::from_element(doc.root()).is_err());
    }
}
