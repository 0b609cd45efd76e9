//! SAML 2.0 and SPID constants and URIs.
//!
//! Namespace URIs, name ID formats, status codes, XML-DSig algorithm
//! identifiers and the SPID authentication levels.

use serde::{Deserialize, Serialize};

/// SAML 2.0 assertion namespace URI.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace URI.
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// XML Digital Signature namespace URI.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// The only protocol version accepted and emitted.
pub const SAML_VERSION: &str = "2.0";

/// Prefix used for the protocol namespace in generated documents.
pub const SAMLP_PREFIX: &str = "saml2p";

/// Prefix used for the assertion namespace in generated documents.
pub const SAML_PREFIX: &str = "saml2";

/// Prefix used for the signature namespace in generated documents.
pub const DS_PREFIX: &str = "ds";

/// Bearer subject confirmation method.
pub const SUBJECT_CONFIRMATION_BEARER: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

// ============================================================================
// Name ID Formats
// ============================================================================

/// SAML Name ID formats used by SPID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameIdFormat {
    /// Unspecified name ID format.
    #[default]
    Unspecified,
    /// Entity identifier format.
    Entity,
    /// Persistent identifier format.
    Persistent,
    /// Transient identifier format.
    Transient,
}

impl NameIdFormat {
    /// Returns the URI for this name ID format.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
            Self::Entity => "urn:oasis:names:tc:SAML:2.0:nameid-format:entity",
            Self::Persistent => "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
            Self::Transient => "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
        }
    }

    /// Parses a name ID format from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified" => Some(Self::Unspecified),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:entity" => Some(Self::Entity),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent" => Some(Self::Persistent),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:transient" => Some(Self::Transient),
            _ => None,
        }
    }
}

// ============================================================================
// SPID Authentication Levels
// ============================================================================

/// SPID assurance levels, serialized as authentication context classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpidLevel {
    /// No assurance requirement; never forces authentication.
    #[serde(rename = "0")]
    L0,
    /// Single-factor authentication.
    #[serde(rename = "1")]
    L1,
    /// Two-factor authentication.
    #[serde(rename = "2")]
    L2,
    /// Two-factor authentication with a secure device.
    #[serde(rename = "3")]
    L3,
}

impl SpidLevel {
    /// Maps an ordinal to a level. Only 0 to 3 exist.
    #[must_use]
    pub const fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(Self::L0),
            1 => Some(Self::L1),
            2 => Some(Self::L2),
            3 => Some(Self::L3),
            _ => None,
        }
    }

    /// Returns the ordinal of this level.
    #[must_use]
    pub const fn level(&self) -> u8 {
        match self {
            Self::L0 => 0,
            Self::L1 => 1,
            Self::L2 => 2,
            Self::L3 => 3,
        }
    }

    /// Returns the authentication context class URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::L0 => "https://www.spid.gov.it/SpidL0",
            Self::L1 => "https://www.spid.gov.it/SpidL1",
            Self::L2 => "https://www.spid.gov.it/SpidL2",
            Self::L3 => "https://www.spid.gov.it/SpidL3",
        }
    }

    /// Parses a level from its authentication context class URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "https://www.spid.gov.it/SpidL0" => Some(Self::L0),
            "https://www.spid.gov.it/SpidL1" => Some(Self::L1),
            "https://www.spid.gov.it/SpidL2" => Some(Self::L2),
            "https://www.spid.gov.it/SpidL3" => Some(Self::L3),
            _ => None,
        }
    }

    /// Levels above the lowest tier require a fresh authentication.
    #[must_use]
    pub const fn force_authn(&self) -> bool {
        !matches!(self, Self::L0 | Self::L1)
    }
}

/// Authentication context comparison methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// Exact match required.
    Exact,
    /// Match must be at least as strong.
    #[default]
    Minimum,
    /// Match must be at most as strong.
    Maximum,
    /// Match must be stronger.
    Better,
}

impl AuthnContextComparison {
    /// Returns the string value for this comparison.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }
}

// ============================================================================
// Status Codes
// ============================================================================

/// Top-level SAML status codes.
pub mod status_codes {
    /// Success status code.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

    /// Requester error status code.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";

    /// Responder error status code.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";
}

/// Second-level SAML status codes.
pub mod sub_status_codes {
    /// Authentication failed.
    pub const AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";

    /// Request denied.
    pub const REQUEST_DENIED: &str = "urn:oasis:names:tc:SAML:2.0:status:RequestDenied";
}

// ============================================================================
// Signature Algorithms
// ============================================================================

/// XML signature algorithms.
pub mod signature_algorithms {
    /// RSA-SHA256 signature algorithm.
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

    /// RSA-SHA384 signature algorithm.
    pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";

    /// RSA-SHA512 signature algorithm.
    pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

    /// ECDSA-SHA256 signature algorithm.
    pub const ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";

    /// ECDSA-SHA384 signature algorithm.
    pub const ECDSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384";

    /// ECDSA-SHA512 signature algorithm.
    pub const ECDSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512";

    /// Legacy RSA-SHA1 signature algorithm (not recommended).
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
}

/// Digest algorithms.
pub mod digest_algorithms {
    /// SHA-256 digest algorithm.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

    /// SHA-384 digest algorithm.
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";

    /// SHA-512 digest algorithm.
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

    /// Legacy SHA-1 digest algorithm (not recommended).
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
}

/// Canonicalization algorithms.
pub mod canonicalization_algorithms {
    /// Exclusive C14N without comments.
    pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

    /// Exclusive C14N with comments.
    pub const EXCLUSIVE_C14N_WITH_COMMENTS: &str =
        "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

    /// C14N without comments.
    pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";

    /// C14N with comments.
    pub const C14N_WITH_COMMENTS: &str =
        "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
}

/// Reference transforms.
pub mod transform_algorithms {
    /// Enveloped signature transform.
    pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
}
