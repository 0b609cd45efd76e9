//! Helpers for reading SAML elements.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// Returns a non-blank unqualified attribute.
pub(crate) fn required_attribute<'a>(element: &'a Element, name: &str) -> SamlResult<&'a str> {
    element
        .attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SamlError::missing(&format!("{} attribute on {}", name, element.name)))
}

/// Returns an optional attribute, treating a blank value as absent.
pub(crate) fn optional_attribute(element: &Element, name: &str) -> Option<String> {
    element
        .attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Parses a mandatory `xs:dateTime` attribute.
pub(crate) fn instant_attribute(element: &Element, name: &str) -> SamlResult<DateTime<Utc>> {
    parse_instant(required_attribute(element, name)?)
}

/// Parses an optional `xs:dateTime` attribute.
pub(crate) fn optional_instant_attribute(
    element: &Element,
    name: &str,
) -> SamlResult<Option<DateTime<Utc>>> {
    optional_attribute(element, name)
        .map(|value| parse_instant(&value))
        .transpose()
}

/// Parses an ISO-8601 timestamp with an explicit offset.
pub(crate) fn parse_instant(value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| SamlError::MalformedDocument(format!("invalid timestamp {value:?}: {e}")))
}

/// Returns the only child with the given name, failing on zero or several.
pub(crate) fn single_child<'a>(
    element: &'a Element,
    namespace: &str,
    name: &str,
) -> SamlResult<&'a Element> {
    optional_single_child(element, namespace, name)?.ok_or_else(|| SamlError::missing(name))
}

/// Returns the child with the given name if present, failing on several.
pub(crate) fn optional_single_child<'a>(
    element: &'a Element,
    namespace: &str,
    name: &str,
) -> SamlResult<Option<&'a Element>> {
    let mut matches = element.elements().filter(|child| child.is(namespace, name));
    let first = matches.next();
    if matches.next().is_some() {
        return Err(SamlError::MalformedDocument(format!(
            "{} has more than one {name}",
            element.name
        )));
    }
    Ok(first)
}
