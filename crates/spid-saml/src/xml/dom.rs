//! Owned XML tree.
//!
//! Parsing keeps everything canonicalization depends on: element prefixes,
//! namespace declarations in document order, comments, processing
//! instructions and every whitespace-only text node. Line endings are
//! normalized and attribute values whitespace-normalized as an XML 1.0
//! processor would. DOCTYPE declarations are rejected, so no entity is ever
//! expanded.

use std::borrow::Cow;
use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};

use super::c14n::{escape_attribute, escape_text};

/// Namespace bound to the `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace bindings in scope at some point of a document.
///
/// The default namespace is keyed by `None`; an empty URI records an
/// explicit `xmlns=""` undeclaration. The scope also carries the `xml:*`
/// attributes (such as `xml:lang`) inherited from ancestors, which inclusive
/// canonicalization copies onto the apex of a subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceScope {
    bindings: BTreeMap<Option<String>, String>,
    xml_attributes: BTreeMap<String, String>,
}

impl NamespaceScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this scope extended with `declarations`.
    #[must_use]
    pub fn with_declarations(&self, declarations: &[NamespaceDeclaration]) -> Self {
        let mut scope = self.clone();
        for decl in declarations {
            scope.declare(decl.prefix.as_deref(), &decl.uri);
        }
        scope
    }

    /// Returns the scope in effect inside `element`.
    ///
    /// Applies the element's namespace declarations and records its `xml:*`
    /// attributes, which override any inherited value.
    #[must_use]
    pub fn enter(&self, element: &Element) -> Self {
        let mut scope = self.with_declarations(&element.namespace_declarations);
        for attr in element
            .attributes
            .iter()
            .filter(|attr| attr.namespace.as_deref() == Some(XML_NS))
        {
            scope
                .xml_attributes
                .insert(attr.name.clone(), attr.value.clone());
        }
        scope
    }

    /// Iterates inherited `xml:*` attributes as (local name, value), sorted by name.
    pub fn xml_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.xml_attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Binds `prefix` to `uri`.
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        self.bindings.insert(prefix.map(str::to_string), uri.to_string());
    }

    /// Resolves a prefix to its namespace URI.
    ///
    /// The `xml` prefix is always bound. An undeclared or undeclared-empty
    /// default namespace resolves to `None`.
    #[must_use]
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        self.binding(prefix).filter(|uri| !uri.is_empty())
    }

    /// Returns the raw binding, including an empty default namespace.
    #[must_use]
    pub fn binding(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .get(&prefix.map(str::to_string))
            .map(String::as_str)
    }

    /// Iterates bindings ordered by prefix, default namespace first.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.bindings
            .iter()
            .map(|(prefix, uri)| (prefix.as_deref(), uri.as_str()))
    }
}

/// A namespace declaration attribute (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// Declared prefix, `None` for the default namespace.
    pub prefix: Option<String>,
    /// Namespace URI.
    pub uri: String,
}

/// A regular (non namespace-declaring) attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix as written.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Namespace URI; unprefixed attributes have none.
    pub namespace: Option<String>,
    /// Normalized, unescaped value.
    pub value: String,
}

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element node.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
    /// Comment body.
    Comment(String),
    /// Processing instruction.
    ProcessingInstruction {
        /// PI target.
        target: String,
        /// PI content, possibly empty.
        data: String,
    },
}

/// An element with its namespace context and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix as written.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Namespace declarations carried by this element.
    pub namespace_declarations: Vec<NamespaceDeclaration>,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element without attributes or children.
    #[must_use]
    pub fn new(prefix: Option<&str>, name: &str, namespace: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            namespace_declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a namespace declaration.
    #[must_use]
    pub fn with_namespace_declaration(mut self, prefix: Option<&str>, uri: &str) -> Self {
        self.namespace_declarations.push(NamespaceDeclaration {
            prefix: prefix.map(str::to_string),
            uri: uri.to_string(),
        });
        self
    }

    /// Adds an unqualified attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Returns the name as written, `prefix:local` or `local`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified(self.prefix.as_deref(), &self.name)
    }

    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Returns the value of an unqualified attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.prefix.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Sets an unqualified attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.prefix.is_none() && a.name == name)
        {
            existing.value = value;
        } else {
            self.attributes.push(Attribute {
                prefix: None,
                name: name.to_string(),
                namespace: None,
                value,
            });
        }
    }

    /// Returns the identifier attribute (`ID`, then `Id`).
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attribute("ID").or_else(|| self.attribute("Id"))
    }

    /// Iterates child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Iterates child elements with the given namespace and local name.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |el| el.is(namespace, name))
    }

    /// Returns the first child element with the given namespace and local name.
    #[must_use]
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.is(namespace, name))
    }

    /// Collects every descendant element (excluding `self`) with the given name.
    #[must_use]
    pub fn descendants_named(&self, namespace: &str, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_descendants(self, namespace, name, &mut found);
        found
    }

    /// Returns the concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::new();
        collect_text(self, &mut text);
        text
    }

    /// Returns the element reached by following child-node indexes.
    #[must_use]
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &index in path {
            match current.children.get(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Mutable variant of [`Element::element_at`].
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            match current.children.get_mut(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Finds every element in this subtree (including `self`) matching `predicate`.
    ///
    /// `inherited` is the scope in effect at this element's parent.
    pub fn find_all<'a, F>(&'a self, inherited: &NamespaceScope, predicate: F) -> Vec<Located<'a>>
    where
        F: Fn(&Element) -> bool,
    {
        let mut found = Vec::new();
        let mut path = Vec::new();
        locate(self, inherited, &predicate, &mut path, &mut found);
        found
    }
}

/// An element found in a tree, with the information needed to canonicalize it.
#[derive(Debug, Clone)]
pub struct Located<'a> {
    /// The element.
    pub element: &'a Element,
    /// Child-node indexes leading from the search root to the element.
    pub path: Vec<usize>,
    /// Namespace scope in effect at the element's parent.
    pub inherited: NamespaceScope,
}

impl Located<'_> {
    /// Returns the scope in effect inside the element.
    #[must_use]
    pub fn scope(&self) -> NamespaceScope {
        self.inherited.enter(self.element)
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Wraps an element as a document.
    #[must_use]
    pub const fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parses XML text.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedDocument`] for syntax errors, unbound
    /// prefixes, DOCTYPE declarations, or a missing or repeated document element.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let text = normalize_line_endings(xml);
        let mut reader = Reader::from_str(&text);

        let mut stack: Vec<(Element, NamespaceScope)> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                SamlError::MalformedDocument(format!(
                    "XML syntax error near byte {}: {e}",
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(start) => {
                    let parent_scope = stack.last().map(|(_, s)| s.clone()).unwrap_or_default();
                    stack.push(open_element(&start, &parent_scope)?);
                }
                Event::Empty(start) => {
                    let parent_scope = stack.last().map(|(_, s)| s.clone()).unwrap_or_default();
                    let (element, _) = open_element(&start, &parent_scope)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let (element, _) = stack.pop().ok_or_else(|| {
                        SamlError::MalformedDocument("unexpected end tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let content = text.unescape()?;
                    push_text(&mut stack, &content)?;
                }
                Event::CData(cdata) => {
                    let content = String::from_utf8(cdata.into_inner().into_owned())?;
                    push_text(&mut stack, &content)?;
                }
                Event::Comment(comment) => {
                    if let Some((parent, _)) = stack.last_mut() {
                        let body = String::from_utf8(comment.into_inner().into_owned())?;
                        parent.children.push(Node::Comment(body));
                    }
                }
                Event::PI(pi) => {
                    if let Some((parent, _)) = stack.last_mut() {
                        let raw = String::from_utf8(pi.to_vec())?;
                        let (target, data) = match raw.split_once(|c: char| c.is_ascii_whitespace()) {
                            Some((target, data)) => (target.to_string(), data.trim_start().to_string()),
                            None => (raw.clone(), String::new()),
                        };
                        parent
                            .children
                            .push(Node::ProcessingInstruction { target, data });
                    }
                }
                Event::DocType(_) => {
                    return Err(SamlError::MalformedDocument(
                        "DOCTYPE declarations are not allowed".to_string(),
                    ));
                }
                Event::Decl(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(SamlError::MalformedDocument(
                "unexpected end of document".to_string(),
            ));
        }
        root.map(Self::new)
            .ok_or_else(|| SamlError::MalformedDocument("no document element".to_string()))
    }

    /// Returns the document element.
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// Returns the document element mutably.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Consumes the document, returning its element.
    #[must_use]
    pub fn into_root(self) -> Element {
        self.root
    }

    /// Finds every element whose `ID` or `Id` attribute equals `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Vec<Located<'_>> {
        self.root
            .find_all(&NamespaceScope::new(), |el| el.id() == Some(id))
    }

    /// Finds every element matching `predicate`.
    pub fn find_all<F>(&self, predicate: F) -> Vec<Located<'_>>
    where
        F: Fn(&Element) -> bool,
    {
        self.root.find_all(&NamespaceScope::new(), predicate)
    }

    /// Serializes the document element, without an XML declaration.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, &self.root);
        out
    }
}

fn open_element(
    start: &BytesStart<'_>,
    parent_scope: &NamespaceScope,
) -> SamlResult<(Element, NamespaceScope)> {
    let raw_name = start.name();
    let qname = utf8(raw_name.as_ref())?;
    let (prefix, name) = split_qname(qname)?;
    if prefix == Some("xmlns") {
        return Err(SamlError::MalformedDocument(format!(
            "element {qname} uses the reserved xmlns prefix"
        )));
    }

    let mut declarations = Vec::new();
    let mut raw_attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            SamlError::MalformedDocument(format!("invalid attribute on {qname}: {e}"))
        })?;
        let key = utf8(attr.key.as_ref())?;
        let value = normalize_attribute_value(utf8(&attr.value)?)?;

        if key == "xmlns" {
            declarations.push(NamespaceDeclaration { prefix: None, uri: value });
        } else if let Some(declared) = key.strip_prefix("xmlns:") {
            if value.is_empty() {
                return Err(SamlError::MalformedDocument(format!(
                    "prefix {declared} cannot be undeclared"
                )));
            }
            declarations.push(NamespaceDeclaration {
                prefix: Some(declared.to_string()),
                uri: value,
            });
        } else {
            raw_attributes.push((key.to_string(), value));
        }
    }

    let scope = parent_scope.with_declarations(&declarations);
    let namespace = match prefix {
        Some(p) => Some(scope.resolve(Some(p)).ok_or_else(|| unbound(p))?.to_string()),
        None => scope.resolve(None).map(str::to_string),
    };

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (attr_prefix, attr_name) = split_qname(&key)?;
        let attr_namespace = match attr_prefix {
            Some(p) => Some(scope.resolve(Some(p)).ok_or_else(|| unbound(p))?.to_string()),
            None => None,
        };
        attributes.push(Attribute {
            prefix: attr_prefix.map(str::to_string),
            name: attr_name.to_string(),
            namespace: attr_namespace,
            value,
        });
    }

    let element = Element {
        prefix: prefix.map(str::to_string),
        name: name.to_string(),
        namespace,
        namespace_declarations: declarations,
        attributes,
        children: Vec::new(),
    };
    Ok((element, scope))
}

fn attach(
    stack: &mut [(Element, NamespaceScope)],
    root: &mut Option<Element>,
    element: Element,
) -> SamlResult<()> {
    if let Some((parent, _)) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        Ok(())
    } else if root.is_some() {
        Err(SamlError::MalformedDocument(
            "more than one document element".to_string(),
        ))
    } else {
        *root = Some(element);
        Ok(())
    }
}

fn push_text(stack: &mut [(Element, NamespaceScope)], content: &str) -> SamlResult<()> {
    match stack.last_mut() {
        Some((parent, _)) => {
            if let Some(Node::Text(existing)) = parent.children.last_mut() {
                existing.push_str(content);
            } else if !content.is_empty() {
                parent.children.push(Node::Text(content.to_string()));
            }
            Ok(())
        }
        None if content.trim().is_empty() => Ok(()),
        None => Err(SamlError::MalformedDocument(
            "text outside the document element".to_string(),
        )),
    }
}

fn locate<'a, F>(
    element: &'a Element,
    inherited: &NamespaceScope,
    predicate: &F,
    path: &mut Vec<usize>,
    found: &mut Vec<Located<'a>>,
) where
    F: Fn(&Element) -> bool,
{
    if predicate(element) {
        found.push(Located {
            element,
            path: path.clone(),
            inherited: inherited.clone(),
        });
    }

    let scope = inherited.enter(element);
    for (index, child) in element.children.iter().enumerate() {
        if let Node::Element(child) = child {
            path.push(index);
            locate(child, &scope, predicate, path, found);
            path.pop();
        }
    }
}

fn collect_descendants<'a>(element: &'a Element, namespace: &str, name: &str, found: &mut Vec<&'a Element>) {
    for child in element.elements() {
        if child.is(namespace, name) {
            found.push(child);
        }
        collect_descendants(child, namespace, name, found);
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
            _ => {}
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    let qname = element.qualified_name();
    out.push('<');
    out.push_str(&qname);
    for decl in &element.namespace_declarations {
        out.push_str(" xmlns");
        if let Some(prefix) = &decl.prefix {
            out.push(':');
            out.push_str(prefix);
        }
        out.push_str("=\"");
        escape_attribute(out, &decl.uri);
        out.push('"');
    }
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&qualified(attr.prefix.as_deref(), &attr.name));
        out.push_str("=\"");
        escape_attribute(out, &attr.value);
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for node in &element.children {
        match node {
            Node::Element(child) => write_element(out, child),
            Node::Text(text) => escape_text(out, text),
            Node::Comment(body) => {
                out.push_str("<!--");
                out.push_str(body);
                out.push_str("-->");
            }
            Node::ProcessingInstruction { target, data } => write_pi(out, target, data),
        }
    }
    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
}

pub(crate) fn write_pi(out: &mut String, target: &str, data: &str) {
    out.push_str("<?");
    out.push_str(target);
    if !data.is_empty() {
        out.push(' ');
        out.push_str(data);
    }
    out.push_str("?>");
}

pub(crate) fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}

fn split_qname(qname: &str) -> SamlResult<(Option<&str>, &str)> {
    match qname.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() && !local.contains(':') => {
            Ok((Some(prefix), local))
        }
        Some(_) => Err(SamlError::MalformedDocument(format!(
            "invalid qualified name {qname}"
        ))),
        None => Ok((None, qname)),
    }
}

fn unbound(prefix: &str) -> SamlError {
    SamlError::MalformedDocument(format!("namespace prefix {prefix} is not bound"))
}

fn utf8(bytes: &[u8]) -> SamlResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| SamlError::Encoding(format!("invalid UTF-8: {e}")))
}

fn normalize_line_endings(xml: &str) -> Cow<'_, str> {
    if xml.contains('\r') {
        Cow::Owned(xml.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(xml)
    }
}

fn normalize_attribute_value(raw: &str) -> SamlResult<String> {
    let spaced: String = raw
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    Ok(quick_xml::escape::unescape(&spaced)?.into_owned())
}
