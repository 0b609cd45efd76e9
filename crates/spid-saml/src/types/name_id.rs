//! SAML Name ID types.
//!
//! Name identifiers are used to identify subjects in SAML assertions.

use serde::{Deserialize, Serialize};

use super::{NameIdFormat, SAMLP_NS, SAMLP_PREFIX, SAML_NS, SAML_PREFIX};
use crate::xml::Element;

/// SAML Name ID.
///
/// Represents the identifier of a subject in a SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
        }
    }

    /// Creates an entity name ID, as used for `Issuer`.
    #[must_use]
    pub fn entity(entity_id: impl Into<String>) -> Self {
        Self::new(entity_id).with_format(NameIdFormat::Entity)
    }

    /// Sets the format for this name ID.
    #[must_use]
    pub fn with_format(mut self, format: NameIdFormat) -> Self {
        self.format = Some(format.uri().to_string());
        self
    }

    /// Sets the name qualifier.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Returns the parsed name ID format.
    #[must_use]
    pub fn parsed_format(&self) -> NameIdFormat {
        self.format
            .as_deref()
            .and_then(NameIdFormat::from_uri)
            .unwrap_or_default()
    }

    /// Reads a name identifier (`NameID` or `Issuer`) element.
    #[must_use]
    pub fn from_element(element: &Element) -> Self {
        Self {
            value: element.text().trim().to_string(),
            format: element.attribute("Format").map(str::to_string),
            name_qualifier: element.attribute("NameQualifier").map(str::to_string),
        }
    }

    /// Builds a `saml2:<local>` element carrying this identifier.
    #[must_use]
    pub fn to_element(&self, local_name: &str) -> Element {
        let mut element = Element::new(Some(SAML_PREFIX), local_name, Some(SAML_NS));
        if let Some(format) = &self.format {
            element = element.with_attribute("Format", format.clone());
        }
        if let Some(qualifier) = &self.name_qualifier {
            element = element.with_attribute("NameQualifier", qualifier.clone());
        }
        element.with_text(self.value.clone())
    }
}

/// Name ID policy for authentication requests.
///
/// Specifies constraints on the name identifier to be returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// The requested name ID format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Whether a new identifier should be created for this request.
    #[serde(default)]
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Creates a policy requesting a specific format.
    #[must_use]
    pub fn with_format(format: NameIdFormat) -> Self {
        Self {
            format: Some(format.uri().to_string()),
            allow_create: false,
        }
    }

    /// Sets whether new identifiers can be created.
    #[must_use]
    pub const fn allow_create(mut self, allow: bool) -> Self {
        self.allow_create = allow;
        self
    }

    /// Returns the parsed name ID format.
    #[must_use]
    pub fn parsed_format(&self) -> Option<NameIdFormat> {
        self.format.as_deref().and_then(NameIdFormat::from_uri)
    }

    /// Builds the `saml2p:NameIDPolicy` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut element = Element::new(Some(SAMLP_PREFIX), "NameIDPolicy", Some(SAMLP_NS));
        if let Some(format) = &self.format {
            element = element.with_attribute("Format", format.clone());
        }
        element.with_attribute("AllowCreate", self.allow_create.to_string())
    }
}

impl Default for NameIdPolicy {
    /// SPID requests transient identifiers and lets the IdP create them.
    fn default() -> Self {
        Self::with_format(NameIdFormat::Transient).allow_create(true)
    }
}
