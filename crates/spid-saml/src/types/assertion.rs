//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer. These
//! types only capture structure; time, audience and correlation checks live
//! in [`crate::validation`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parse::{
    instant_attribute, optional_instant_attribute, optional_single_child, required_attribute,
    single_child,
};
use super::{NameId, SpidLevel, SAML_NS, SUBJECT_CONFIRMATION_BEARER};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The identity provider that issued this assertion.
    pub issuer: NameId,

    /// The subject of this assertion.
    pub subject: Subject,

    /// Conditions that must be evaluated for the assertion to be valid.
    pub conditions: Conditions,

    /// Authentication statement describing how the subject authenticated.
    pub authn_statement: AuthnStatement,

    /// Attribute name to trimmed value.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Assertion {
    /// Reads a `saml:Assertion` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedDocument`] if a required element or
    /// attribute is missing or repeated, a timestamp does not parse, or an
    /// attribute is repeated or multi-valued.
    pub fn from_element(element: &Element) -> SamlResult<Self> {
        let attributes = match optional_single_child(element, SAML_NS, "AttributeStatement")? {
            Some(statement) => parse_attributes(statement)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            id: required_attribute(element, "ID")?.to_string(),
            version: required_attribute(element, "Version")?.to_string(),
            issue_instant: instant_attribute(element, "IssueInstant")?,
            issuer: NameId::from_element(single_child(element, SAML_NS, "Issuer")?),
            subject: Subject::from_element(single_child(element, SAML_NS, "Subject")?)?,
            conditions: Conditions::from_element(single_child(element, SAML_NS, "Conditions")?)?,
            authn_statement: AuthnStatement::from_element(single_child(
                element,
                SAML_NS,
                "AuthnStatement",
            )?)?,
            attributes,
        })
    }

    /// Returns an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Subject of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier of the subject.
    pub name_id: NameId,

    /// How the subject was confirmed.
    pub confirmation: SubjectConfirmation,
}

impl Subject {
    fn from_element(element: &Element) -> SamlResult<Self> {
        let name_id = NameId::from_element(single_child(element, SAML_NS, "NameID")?);
        if name_id.value.is_empty() {
            return Err(SamlError::missing("NameID value"));
        }
        Ok(Self {
            name_id,
            confirmation: SubjectConfirmation::from_element(single_child(
                element,
                SAML_NS,
                "SubjectConfirmation",
            )?)?,
        })
    }
}

/// Subject confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The confirmation method URI.
    pub method: String,

    /// Confirmation data.
    pub data: SubjectConfirmationData,
}

impl SubjectConfirmation {
    /// Returns true for the bearer method.
    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.method == SUBJECT_CONFIRMATION_BEARER
    }

    fn from_element(element: &Element) -> SamlResult<Self> {
        Ok(Self {
            method: required_attribute(element, "Method")?.to_string(),
            data: SubjectConfirmationData::from_element(single_child(
                element,
                SAML_NS,
                "SubjectConfirmationData",
            )?)?,
        })
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// The request this assertion answers.
    pub in_response_to: String,

    /// Latest instant at which the subject can be confirmed.
    pub not_on_or_after: DateTime<Utc>,

    /// The URL the assertion was delivered to.
    pub recipient: String,
}

impl SubjectConfirmationData {
    fn from_element(element: &Element) -> SamlResult<Self> {
        Ok(Self {
            in_response_to: required_attribute(element, "InResponseTo")?.to_string(),
            not_on_or_after: instant_attribute(element, "NotOnOrAfter")?,
            recipient: required_attribute(element, "Recipient")?.to_string(),
        })
    }
}

/// Assertion validity conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Start of the validity window.
    pub not_before: DateTime<Utc>,

    /// End of the validity window.
    pub not_on_or_after: DateTime<Utc>,

    /// Audience restrictions; each must list the consumer.
    #[serde(default)]
    pub audience_restrictions: Vec<AudienceRestriction>,
}

impl Conditions {
    fn from_element(element: &Element) -> SamlResult<Self> {
        let audience_restrictions = element
            .children_named(SAML_NS, "AudienceRestriction")
            .map(|restriction| AudienceRestriction {
                audiences: restriction
                    .children_named(SAML_NS, "Audience")
                    .map(|audience| audience.text().trim().to_string())
                    .collect(),
            })
            .collect();

        Ok(Self {
            not_before: instant_attribute(element, "NotBefore")?,
            not_on_or_after: instant_attribute(element, "NotOnOrAfter")?,
            audience_restrictions,
        })
    }
}

/// Audience restriction condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRestriction {
    /// Allowed audiences (entity IDs).
    pub audiences: Vec<String>,
}

impl AudienceRestriction {
    /// Returns true if `audience` is listed.
    #[must_use]
    pub fn allows(&self, audience: &str) -> bool {
        self.audiences.iter().any(|a| a == audience)
    }
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// When the user authenticated.
    pub authn_instant: DateTime<Utc>,

    /// The IdP session this assertion belongs to.
    pub session_index: String,

    /// When the IdP session ends, if the IdP bounds it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_not_on_or_after: Option<DateTime<Utc>>,

    /// Authentication context class actually used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_class_ref: Option<String>,
}

impl AuthnStatement {
    /// Returns the SPID level the IdP asserted, if it named one.
    #[must_use]
    pub fn spid_level(&self) -> Option<SpidLevel> {
        self.authn_context_class_ref
            .as_deref()
            .and_then(SpidLevel::from_uri)
    }

    fn from_element(element: &Element) -> SamlResult<Self> {
        let authn_context_class_ref = optional_single_child(element, SAML_NS, "AuthnContext")?
            .and_then(|context| context.child(SAML_NS, "AuthnContextClassRef"))
            .map(|class_ref| class_ref.text().trim().to_string())
            .filter(|class_ref| !class_ref.is_empty());

        Ok(Self {
            authn_instant: instant_attribute(element, "AuthnInstant")?,
            session_index: required_attribute(element, "SessionIndex")?.to_string(),
            session_not_on_or_after: optional_instant_attribute(element, "SessionNotOnOrAfter")?,
            authn_context_class_ref,
        })
    }
}

fn parse_attributes(statement: &Element) -> SamlResult<BTreeMap<String, String>> {
    let mut attributes = BTreeMap::new();
    for attribute in statement.children_named(SAML_NS, "Attribute") {
        let name = required_attribute(attribute, "Name")?;
        let mut values = attribute.children_named(SAML_NS, "AttributeValue");
        let value = values
            .next()
            .ok_or_else(|| SamlError::MalformedDocument(format!("attribute {name} has no value")))?;
        if values.next().is_some() {
            return Err(SamlError::MalformedDocument(format!(
                "attribute {name} is multi-valued"
            )));
        }
        if attributes
            .insert(name.to_string(), value.text().trim().to_string())
            .is_some()
        {
            return Err(SamlError::MalformedDocument(format!(
                "attribute {name} is repeated"
            )));
        }
    }
    Ok(attributes)
}
