//! XML Signature support for SAML.
//!
//! This module provides enveloped XML Digital Signature (XML-DSig) support
//! for signing requests and verifying responses against configured trust
//! anchors.
//!
//! # Signing Algorithms
//!
//! The following signature algorithms are supported:
//! - RSA-SHA256 (recommended)
//! - RSA-SHA384
//! - RSA-SHA512
//! - ECDSA-SHA256
//! - ECDSA-SHA384
//! - ECDSA-SHA512
//!
//! RSA-SHA1 is accepted for verification only, and only when explicitly
//! allowed.

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

pub use crate::xml::CanonicalizationAlgorithm;

use spid_crypto::pem::decode_base64_body;
use spid_crypto::{Certificate, HashAlgorithm};

use crate::error::{SamlError, SamlResult};
use crate::types::{
    canonicalization_algorithms, digest_algorithms, signature_algorithms, transform_algorithms,
    XMLDSIG_NS,
};
use crate::xml::Element;

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (recommended).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// ECDSA with SHA-256.
    EcdsaSha256,
    /// ECDSA with SHA-384.
    EcdsaSha384,
    /// ECDSA with SHA-512.
    EcdsaSha512,
    /// Legacy RSA with SHA-1 (not recommended).
    RsaSha1,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::EcdsaSha256 => signature_algorithms::ECDSA_SHA256,
            Self::EcdsaSha384 => signature_algorithms::ECDSA_SHA384,
            Self::EcdsaSha512 => signature_algorithms::ECDSA_SHA512,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
        }
    }

    /// Returns the digest algorithm paired with this signature algorithm.
    #[must_use]
    pub const fn digest_algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::RsaSha256 | Self::EcdsaSha256 => DigestAlgorithm::Sha256,
            Self::RsaSha384 | Self::EcdsaSha384 => DigestAlgorithm::Sha384,
            Self::RsaSha512 | Self::EcdsaSha512 => DigestAlgorithm::Sha512,
            Self::RsaSha1 => DigestAlgorithm::Sha1,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            signature_algorithms::ECDSA_SHA256 => Some(Self::EcdsaSha256),
            signature_algorithms::ECDSA_SHA384 => Some(Self::EcdsaSha384),
            signature_algorithms::ECDSA_SHA512 => Some(Self::EcdsaSha512),
            signature_algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            _ => None,
        }
    }

    /// Returns true if this algorithm uses RSA.
    #[must_use]
    pub const fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaSha256 | Self::RsaSha384 | Self::RsaSha512 | Self::RsaSha1
        )
    }

    /// Returns true if this algorithm uses ECDSA.
    #[must_use]
    pub const fn is_ecdsa(&self) -> bool {
        matches!(
            self,
            Self::EcdsaSha256 | Self::EcdsaSha384 | Self::EcdsaSha512
        )
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }

    /// Maps to the primitive used by `spid-crypto`.
    #[must_use]
    pub const fn to_crypto(&self) -> spid_crypto::SignatureAlgorithm {
        match self {
            Self::RsaSha256 => spid_crypto::SignatureAlgorithm::Rs256,
            Self::RsaSha384 => spid_crypto::SignatureAlgorithm::Rs384,
            Self::RsaSha512 => spid_crypto::SignatureAlgorithm::Rs512,
            Self::EcdsaSha256 => spid_crypto::SignatureAlgorithm::Es256,
            Self::EcdsaSha384 => spid_crypto::SignatureAlgorithm::Es384,
            Self::EcdsaSha512 => spid_crypto::SignatureAlgorithm::Es512,
            Self::RsaSha1 => spid_crypto::SignatureAlgorithm::Rs1,
        }
    }

    /// Maps from the primitive used by `spid-crypto`.
    #[must_use]
    pub const fn from_crypto(algorithm: spid_crypto::SignatureAlgorithm) -> Self {
        match algorithm {
            spid_crypto::SignatureAlgorithm::Rs1 => Self::RsaSha1,
            spid_crypto::SignatureAlgorithm::Rs256 => Self::RsaSha256,
            spid_crypto::SignatureAlgorithm::Rs384 => Self::RsaSha384,
            spid_crypto::SignatureAlgorithm::Rs512 => Self::RsaSha512,
            spid_crypto::SignatureAlgorithm::Es256 => Self::EcdsaSha256,
            spid_crypto::SignatureAlgorithm::Es384 => Self::EcdsaSha384,
            spid_crypto::SignatureAlgorithm::Es512 => Self::EcdsaSha512,
        }
    }
}

/// Reference digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// Legacy SHA-1 (not recommended).
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// Returns the URI for this digest algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => digest_algorithms::SHA1,
            Self::Sha256 => digest_algorithms::SHA256,
            Self::Sha384 => digest_algorithms::SHA384,
            Self::Sha512 => digest_algorithms::SHA512,
        }
    }

    /// Parses a digest algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            digest_algorithms::SHA1 => Some(Self::Sha1),
            digest_algorithms::SHA256 => Some(Self::Sha256),
            digest_algorithms::SHA384 => Some(Self::Sha384),
            digest_algorithms::SHA512 => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Returns true for SHA-1.
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::Sha1)
    }

    /// Maps to the hash used by `spid-crypto`.
    #[must_use]
    pub const fn to_crypto(&self) -> HashAlgorithm {
        match self {
            Self::Sha1 => HashAlgorithm::Sha1,
            Self::Sha256 => HashAlgorithm::Sha256,
            Self::Sha384 => HashAlgorithm::Sha384,
            Self::Sha512 => HashAlgorithm::Sha512,
        }
    }
}

/// A `ds:Transform` permitted on a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Removes the signature being verified from the referenced element.
    EnvelopedSignature,
    /// Canonicalizes the referenced element.
    Canonicalize {
        /// Canonicalization method.
        algorithm: CanonicalizationAlgorithm,
        /// `InclusiveNamespaces/@PrefixList`, exclusive methods only.
        inclusive_prefixes: Option<String>,
    },
}

impl Transform {
    /// Returns the algorithm URI of this transform.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::EnvelopedSignature => transform_algorithms::ENVELOPED_SIGNATURE,
            Self::Canonicalize { algorithm, .. } => algorithm.uri(),
        }
    }
}

/// XML Signature structure.
///
/// A parsed `<ds:Signature>` element. Parsing only succeeds for the
/// enveloped shape this crate accepts: one `SignedInfo`, one same-document
/// `Reference`, known algorithms and permitted transforms.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// The signature algorithm used.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm applied to `SignedInfo`.
    pub canonicalization: CanonicalizationAlgorithm,
    /// `InclusiveNamespaces/@PrefixList` of the `SignedInfo` canonicalization.
    pub inclusive_prefixes: Option<String>,
    /// The reference URI, `#` followed by the signed element's ID.
    pub reference_uri: String,
    /// Reference transforms in document order.
    pub transforms: Vec<Transform>,
    /// The reference digest algorithm.
    pub digest_algorithm: DigestAlgorithm,
    /// The digest value (base64 encoded, whitespace removed).
    pub digest_value: String,
    /// The signature value (base64 encoded, whitespace removed).
    pub signature_value: String,
    /// Embedded X.509 certificate (base64 encoded DER). Never trusted.
    pub x509_certificate: Option<String>,
}

impl XmlSignature {
    /// Parses a `ds:Signature` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] for any structural anomaly:
    /// missing or repeated elements, unknown algorithms, a reference that is
    /// not `#id`, or a transform chain other than enveloped-signature plus at
    /// most one canonicalization.
    pub fn from_element(signature: &Element) -> SamlResult<Self> {
        if !signature.is(XMLDSIG_NS, "Signature") {
            return Err(invalid("expected ds:Signature"));
        }

        let signed_info = one(signature, "SignedInfo")?;
        let c14n_method = one(signed_info, "CanonicalizationMethod")?;
        let canonicalization = CanonicalizationAlgorithm::from_uri(algorithm_uri(c14n_method)?)
            .ok_or_else(|| invalid("unsupported canonicalization method"))?;
        let signature_method = one(signed_info, "SignatureMethod")?;
        let algorithm = SignatureAlgorithm::from_uri(algorithm_uri(signature_method)?)
            .ok_or_else(|| invalid("unsupported signature method"))?;

        let reference = one(signed_info, "Reference")?;
        let reference_uri = reference
            .attribute("URI")
            .filter(|uri| uri.len() > 1 && uri.starts_with('#'))
            .ok_or_else(|| invalid("reference must be a non-empty same-document URI"))?
            .to_string();
        let transforms = parse_transforms(reference)?;
        let digest_method = one(reference, "DigestMethod")?;
        let digest_algorithm = DigestAlgorithm::from_uri(algorithm_uri(digest_method)?)
            .ok_or_else(|| invalid("unsupported digest method"))?;
        let digest_value = base64_text(one(reference, "DigestValue")?, "DigestValue")?;
        let signature_value = base64_text(one(signature, "SignatureValue")?, "SignatureValue")?;

        let x509_certificate = signature
            .child(XMLDSIG_NS, "KeyInfo")
            .and_then(|info| info.child(XMLDSIG_NS, "X509Data"))
            .and_then(|data| data.child(XMLDSIG_NS, "X509Certificate"))
            .map(|cert| strip_whitespace(&cert.text()));

        Ok(Self {
            algorithm,
            canonicalization,
            inclusive_prefixes: inclusive_prefixes(c14n_method),
            reference_uri,
            transforms,
            digest_algorithm,
            digest_value,
            signature_value,
            x509_certificate,
        })
    }

    /// Returns the referenced element ID, without the `#`.
    #[must_use]
    pub fn reference_id(&self) -> &str {
        &self.reference_uri[1..]
    }

    /// Returns true if either algorithm relies on SHA-1.
    #[must_use]
    pub const fn uses_sha1(&self) -> bool {
        self.algorithm.is_deprecated() || self.digest_algorithm.is_deprecated()
    }

    /// Returns the canonicalization applied to the referenced element and its
    /// prefix list. Without an explicit transform, inclusive C14N applies.
    #[must_use]
    pub fn reference_canonicalization(&self) -> (CanonicalizationAlgorithm, Option<&str>) {
        self.transforms
            .iter()
            .find_map(|transform| match transform {
                Transform::Canonicalize {
                    algorithm,
                    inclusive_prefixes,
                } => Some((*algorithm, inclusive_prefixes.as_deref())),
                Transform::EnvelopedSignature => None,
            })
            .unwrap_or((CanonicalizationAlgorithm::C14N, None))
    }

    /// Parses the embedded certificate, for display only.
    #[must_use]
    pub fn embedded_certificate(&self) -> Option<Certificate> {
        self.x509_certificate
            .as_deref()
            .and_then(|b64| Certificate::from_base64(b64).ok())
    }
}

/// Configuration for signature creation.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm to use.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Whether to include the X.509 certificate in the signature.
    pub include_certificate: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self::with_algorithm(SignatureAlgorithm::RsaSha256)
    }
}

impl SignatureConfig {
    /// Creates a new signature configuration with the given algorithm.
    #[must_use]
    pub const fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
        }
    }
}

fn parse_transforms(reference: &Element) -> SamlResult<Vec<Transform>> {
    let container = one(reference, "Transforms")?;
    let mut transforms = Vec::new();
    for element in container.elements() {
        if !element.is(XMLDSIG_NS, "Transform") {
            return Err(invalid("unexpected element in Transforms"));
        }
        let uri = algorithm_uri(element)?;
        let transform = if uri == transform_algorithms::ENVELOPED_SIGNATURE {
            Transform::EnvelopedSignature
        } else if let Some(algorithm) = CanonicalizationAlgorithm::from_uri(uri) {
            Transform::Canonicalize {
                algorithm,
                inclusive_prefixes: inclusive_prefixes(element),
            }
        } else {
            return Err(SamlError::SignatureInvalid(format!(
                "transform {uri} is not permitted"
            )));
        };
        transforms.push(transform);
    }

    let enveloped = transforms
        .iter()
        .filter(|t| **t == Transform::EnvelopedSignature)
        .count();
    if enveloped != 1 || transforms.len() > 2 {
        return Err(invalid(
            "transforms must be enveloped-signature plus at most one canonicalization",
        ));
    }
    Ok(transforms)
}

fn inclusive_prefixes(method: &Element) -> Option<String> {
    if !CanonicalizationAlgorithm::from_uri(method.attribute("Algorithm")?)?.is_exclusive() {
        return None;
    }
    method
        .elements()
        .find(|el| {
            el.name == "InclusiveNamespaces"
                && el.namespace.as_deref() == Some(canonicalization_algorithms::EXCLUSIVE_C14N)
        })
        .and_then(|el| el.attribute("PrefixList"))
        .map(str::to_string)
}

fn one<'a>(parent: &'a Element, name: &str) -> SamlResult<&'a Element> {
    let mut matches = parent.elements().filter(|el| el.is(XMLDSIG_NS, name));
    match (matches.next(), matches.next()) {
        (Some(element), None) => Ok(element),
        (None, _) => Err(SamlError::SignatureInvalid(format!("missing ds:{name}"))),
        (Some(_), Some(_)) => Err(SamlError::SignatureInvalid(format!(
            "more than one ds:{name}"
        ))),
    }
}

fn algorithm_uri(element: &Element) -> SamlResult<&str> {
    element.attribute("Algorithm").ok_or_else(|| {
        SamlError::SignatureInvalid(format!("ds:{} has no Algorithm", element.name))
    })
}

fn base64_text(element: &Element, what: &str) -> SamlResult<String> {
    let value = strip_whitespace(&element.text());
    if value.is_empty() || decode_base64_body(&value).is_none() {
        return Err(SamlError::SignatureInvalid(format!("{what} is not valid base64")));
    }
    Ok(value)
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

fn invalid(message: &str) -> SamlError {
    SamlError::SignatureInvalid(message.to_string())
}
