//! SAML AuthnRequest types.
//!
//! Authentication requests sent by a service provider to a SPID identity
//! provider.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AuthnContextComparison, NameId, NameIdPolicy, SpidLevel, SAMLP_NS, SAMLP_PREFIX, SAML_NS,
    SAML_PREFIX, SAML_VERSION,
};
use crate::idp::TimestampPolicy;
use crate::xml::Element;

/// Lifetime of an authentication request, in minutes.
pub const REQUEST_VALIDITY_MINUTES: i64 = 10;

/// SAML AuthnRequest.
///
/// Carries everything that goes on the wire. No state is kept after the
/// request is built; the caller remembers `id` and the consumer URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// On-wire identifier, always starting with `_`.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// Identity provider SSO endpoint.
    pub destination: String,

    /// Issuer: the consumer URL, entity format, self-qualified.
    pub issuer: NameId,

    /// Index of the assertion consumer service in SP metadata.
    pub assertion_consumer_service_index: u16,

    /// Index of the attribute consuming service in SP metadata.
    pub attribute_consuming_service_index: u16,

    /// Whether the IdP must re-authenticate the user.
    pub force_authn: bool,

    /// Name ID policy.
    pub name_id_policy: NameIdPolicy,

    /// Start of the validity window.
    pub not_before: DateTime<Utc>,

    /// End of the validity window.
    pub not_on_or_after: DateTime<Utc>,

    /// Requested authentication context.
    pub requested_authn_context: RequestedAuthnContext,
}

impl AuthnRequest {
    /// Creates a request for `level`, issued at `issue_instant`.
    ///
    /// `id` is used as given; see [`crate::request::request_element_id`] for
    /// the `_` prefix rule.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        destination: impl Into<String>,
        consumer_url: &str,
        level: SpidLevel,
        issue_instant: DateTime<Utc>,
    ) -> Self {
        let consumer_url = consumer_url.trim();
        Self {
            id: id.into(),
            version: SAML_VERSION.to_string(),
            issue_instant,
            destination: destination.into(),
            issuer: NameId::entity(consumer_url).with_name_qualifier(consumer_url),
            assertion_consumer_service_index: 0,
            attribute_consuming_service_index: 1,
            force_authn: level.force_authn(),
            name_id_policy: NameIdPolicy::default(),
            not_before: issue_instant,
            not_on_or_after: issue_instant + Duration::minutes(REQUEST_VALIDITY_MINUTES),
            requested_authn_context: RequestedAuthnContext::minimum(level),
        }
    }

    /// Sets the assertion consumer service index.
    #[must_use]
    pub const fn with_acs_index(mut self, index: u16) -> Self {
        self.assertion_consumer_service_index = index;
        self
    }

    /// Sets the attribute consuming service index.
    #[must_use]
    pub const fn with_attribute_index(mut self, index: u16) -> Self {
        self.attribute_consuming_service_index = index;
        self
    }

    /// Builds the `saml2p:AuthnRequest` element.
    ///
    /// Timestamps are rendered with the precision the IdP expects, and
    /// `NotBefore` is moved back by the policy's skew.
    #[must_use]
    pub fn to_element(&self, policy: &TimestampPolicy) -> Element {
        let mut root = Element::new(Some(SAMLP_PREFIX), "AuthnRequest", Some(SAMLP_NS))
            .with_namespace_declaration(Some(SAMLP_PREFIX), SAMLP_NS)
            .with_namespace_declaration(Some(SAML_PREFIX), SAML_NS)
            .with_attribute("ID", self.id.clone())
            .with_attribute("Version", self.version.clone())
            .with_attribute("IssueInstant", policy.format(self.issue_instant))
            .with_attribute("Destination", self.destination.clone());
        if self.force_authn {
            root = root.with_attribute("ForceAuthn", "true");
        }
        root.with_attribute(
            "AssertionConsumerServiceIndex",
            self.assertion_consumer_service_index.to_string(),
        )
        .with_attribute(
            "AttributeConsumingServiceIndex",
            self.attribute_consuming_service_index.to_string(),
        )
        .with_child(self.issuer.to_element("Issuer"))
        .with_child(self.name_id_policy.to_element())
        .with_child(
            Element::new(Some(SAML_PREFIX), "Conditions", Some(SAML_NS))
                .with_attribute("NotBefore", policy.format(policy.not_before(self.not_before)))
                .with_attribute("NotOnOrAfter", policy.format(self.not_on_or_after)),
        )
        .with_child(self.requested_authn_context.to_element())
    }
}

/// Requested authentication context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAuthnContext {
    /// Comparison method for the authentication context.
    #[serde(default)]
    pub comparison: AuthnContextComparison,

    /// List of acceptable authentication context class references.
    #[serde(default)]
    pub authn_context_class_refs: Vec<String>,
}

impl RequestedAuthnContext {
    /// Requests at least the given SPID level.
    #[must_use]
    pub fn minimum(level: SpidLevel) -> Self {
        Self {
            comparison: AuthnContextComparison::Minimum,
            authn_context_class_refs: vec![level.uri().to_string()],
        }
    }

    /// Sets the comparison method.
    #[must_use]
    pub const fn with_comparison(mut self, comparison: AuthnContextComparison) -> Self {
        self.comparison = comparison;
        self
    }

    fn to_element(&self) -> Element {
        self.authn_context_class_refs.iter().fold(
            Element::new(Some(SAMLP_PREFIX), "RequestedAuthnContext", Some(SAMLP_NS))
                .with_attribute("Comparison", self.comparison.as_str()),
            |element, class_ref| {
                element.with_child(
                    Element::new(Some(SAML_PREFIX), "AuthnContextClassRef", Some(SAML_NS))
                        .with_text(class_ref.clone()),
                )
            },
        )
    }
}
