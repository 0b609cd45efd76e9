//! XML canonicalization.
//!
//! Implements Canonical XML 1.0 and Exclusive XML Canonicalization 1.0, each
//! with and without comments, over the subtree rooted at an element. The
//! subtree is canonicalized in the context of its ancestors: the caller passes
//! the namespace scope inherited from the parent, so a subtree canonicalizes
//! the same whether it is processed in place or on its own.

use std::collections::BTreeSet;

use crate::types::canonicalization_algorithms;

use super::dom::{qualified, write_pi, Attribute, Element, NamespaceScope, Node, XML_NS};

/// Canonicalization algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments (recommended).
    #[default]
    ExclusiveC14N,
    /// Exclusive C14N with comments.
    ExclusiveC14NWithComments,
    /// C14N without comments.
    C14N,
    /// C14N with comments.
    C14NWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
            Self::C14N => canonicalization_algorithms::C14N,
            Self::C14NWithComments => canonicalization_algorithms::C14N_WITH_COMMENTS,
        }
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::ExclusiveC14N),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveC14NWithComments)
            }
            canonicalization_algorithms::C14N => Some(Self::C14N),
            canonicalization_algorithms::C14N_WITH_COMMENTS => Some(Self::C14NWithComments),
            _ => None,
        }
    }

    /// Returns true for the exclusive variants.
    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        matches!(self, Self::ExclusiveC14N | Self::ExclusiveC14NWithComments)
    }

    /// Returns true if comments are kept.
    #[must_use]
    pub const fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveC14NWithComments | Self::C14NWithComments)
    }
}

/// Canonicalizes the subtree rooted at `element`.
///
/// `inherited` is the namespace scope in effect at the element's parent; pass
/// an empty scope for a document element.
#[must_use]
pub fn canonicalize(
    element: &Element,
    inherited: &NamespaceScope,
    algorithm: CanonicalizationAlgorithm,
) -> String {
    Canonicalizer::new(algorithm).canonicalize(element, inherited)
}

/// Configurable canonicalizer.
#[derive(Debug, Clone)]
pub struct Canonicalizer<'a> {
    algorithm: CanonicalizationAlgorithm,
    inclusive_prefixes: BTreeSet<Option<String>>,
    excluded: Option<&'a Element>,
}

impl<'a> Canonicalizer<'a> {
    /// Creates a canonicalizer for `algorithm`.
    #[must_use]
    pub fn new(algorithm: CanonicalizationAlgorithm) -> Self {
        Self {
            algorithm,
            inclusive_prefixes: BTreeSet::new(),
            excluded: None,
        }
    }

    /// Sets the exclusive C14N `InclusiveNamespaces` prefix list.
    ///
    /// The list is whitespace separated; `#default` names the default namespace.
    /// Ignored by the inclusive algorithms.
    #[must_use]
    pub fn with_inclusive_prefixes(mut self, prefix_list: &str) -> Self {
        self.inclusive_prefixes = prefix_list
            .split_ascii_whitespace()
            .map(|p| (p != "#default").then(|| p.to_string()))
            .collect();
        self
    }

    /// Omits `element` (compared by identity) and its subtree from the output.
    ///
    /// This is the enveloped-signature transform.
    #[must_use]
    pub fn excluding(mut self, element: &'a Element) -> Self {
        self.excluded = Some(element);
        self
    }

    /// Canonicalizes the subtree rooted at `element`.
    #[must_use]
    pub fn canonicalize(&self, element: &Element, inherited: &NamespaceScope) -> String {
        let mut out = String::new();
        self.write_element(&mut out, element, inherited, &NamespaceScope::new(), true);
        out
    }

    fn is_excluded(&self, element: &Element) -> bool {
        self.excluded
            .is_some_and(|excluded| std::ptr::eq(excluded, element))
    }

    fn write_element(
        &self,
        out: &mut String,
        element: &Element,
        parent_scope: &NamespaceScope,
        rendered: &NamespaceScope,
        apex: bool,
    ) {
        if self.is_excluded(element) {
            return;
        }

        let scope = parent_scope.enter(element);
        let candidates = if self.algorithm.is_exclusive() {
            self.visibly_utilized(element, &scope)
        } else {
            scope
                .iter()
                .map(|(prefix, uri)| (prefix.map(str::to_string), uri.to_string()))
                .collect()
        };

        let mut declarations: Vec<(Option<String>, String)> = candidates
            .into_iter()
            .filter(|(prefix, uri)| needs_rendering(prefix.as_deref(), uri, rendered))
            .collect();
        declarations.sort();

        let mut now_rendered = rendered.clone();
        for (prefix, uri) in &declarations {
            now_rendered.declare(prefix.as_deref(), uri);
        }

        // Inclusive C14N imports xml:* attributes from outside the subset.
        let imported: Vec<Attribute> = if apex && !self.algorithm.is_exclusive() {
            parent_scope
                .xml_attributes()
                .filter(|(name, _)| {
                    !element
                        .attributes
                        .iter()
                        .any(|a| a.namespace.as_deref() == Some(XML_NS) && a.name == *name)
                })
                .map(|(name, value)| Attribute {
                    prefix: Some("xml".to_string()),
                    name: name.to_string(),
                    namespace: Some(XML_NS.to_string()),
                    value: value.to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut attributes: Vec<_> = element.attributes.iter().chain(&imported).collect();
        attributes.sort_by(|a, b| {
            (a.namespace.as_deref().unwrap_or(""), a.name.as_str())
                .cmp(&(b.namespace.as_deref().unwrap_or(""), b.name.as_str()))
        });

        let qname = element.qualified_name();
        out.push('<');
        out.push_str(&qname);
        for (prefix, uri) in &declarations {
            out.push_str(" xmlns");
            if let Some(prefix) = prefix {
                out.push(':');
                out.push_str(prefix);
            }
            out.push_str("=\"");
            escape_attribute(out, uri);
            out.push('"');
        }
        for attr in attributes {
            out.push(' ');
            out.push_str(&qualified(attr.prefix.as_deref(), &attr.name));
            out.push_str("=\"");
            escape_attribute(out, &attr.value);
            out.push('"');
        }
        out.push('>');

        for node in &element.children {
            match node {
                Node::Element(child) => {
                    self.write_element(out, child, &scope, &now_rendered, false);
                }
                Node::Text(text) => escape_text(out, text),
                Node::Comment(body) => {
                    if self.algorithm.with_comments() {
                        out.push_str("<!--");
                        out.push_str(body);
                        out.push_str("-->");
                    }
                }
                Node::ProcessingInstruction { target, data } => write_pi(out, target, data),
            }
        }

        out.push_str("</");
        out.push_str(&qname);
        out.push('>');
    }

    /// Prefixes used by the element's name or attributes, plus the inclusive list.
    fn visibly_utilized(&self, element: &Element, scope: &NamespaceScope) -> Vec<(Option<String>, String)> {
        let mut prefixes: BTreeSet<Option<String>> = BTreeSet::new();
        prefixes.insert(element.prefix.clone());
        for attr in &element.attributes {
            if attr.prefix.is_some() {
                prefixes.insert(attr.prefix.clone());
            }
        }
        for prefix in &self.inclusive_prefixes {
            if scope.binding(prefix.as_deref()).is_some() {
                prefixes.insert(prefix.clone());
            }
        }

        prefixes
            .into_iter()
            .filter_map(|prefix| {
                let uri = match prefix.as_deref() {
                    None => scope.binding(None).unwrap_or(""),
                    Some(p) => scope.binding(Some(p))?,
                };
                Some((prefix, uri.to_string()))
            })
            .collect()
    }
}

fn needs_rendering(prefix: Option<&str>, uri: &str, rendered: &NamespaceScope) -> bool {
    if prefix == Some("xml") {
        return false;
    }
    let current = rendered.binding(prefix);
    match prefix {
        None if uri.is_empty() => current.is_some_and(|u| !u.is_empty()),
        _ => current != Some(uri),
    }
}

/// Escapes character data.
pub(crate) fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

/// Escapes an attribute value for a double-quoted attribute.
pub(crate) fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}
