//! XML document model and canonicalization.
//!
//! [`Document`] is an owned tree produced by a `quick-xml` event reader. It is
//! the common representation for everything the engine signs, verifies or
//! inspects; [`c14n`] turns any subtree of it into canonical bytes.

pub mod c14n;
mod dom;

pub use c14n::{canonicalize, CanonicalizationAlgorithm, Canonicalizer};
pub use dom::{
    Attribute, Document, Element, Located, NamespaceDeclaration, NamespaceScope, Node, XML_NS,
};
