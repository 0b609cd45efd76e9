//! Digest and signature algorithm definitions.
//!
//! SHA-1 is present only so that legacy signatures can be checked when a
//! caller explicitly opts in. Nothing in this crate signs with SHA-1.

use serde::{Deserialize, Serialize};

/// Digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1 (legacy, verification only).
    #[serde(rename = "SHA1")]
    Sha1,

    /// SHA-256.
    #[serde(rename = "SHA256")]
    Sha256,

    /// SHA-384.
    #[serde(rename = "SHA384")]
    Sha384,

    /// SHA-512.
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Returns true for hashes kept only for backward compatibility.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Sha1)
    }
}

/// Elliptic curves usable for ECDSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcCurve {
    /// NIST P-256.
    P256,
    /// NIST P-384.
    P384,
    /// NIST P-521.
    P521,
}

impl EcCurve {
    /// Identifies the curve from the length of an encoded public point.
    ///
    /// Accepts both uncompressed (`04 || x || y`) and compressed encodings.
    #[must_use]
    pub const fn from_point_len(len: usize) -> Option<Self> {
        match len {
            65 | 33 => Some(Self::P256),
            97 | 49 => Some(Self::P384),
            133 | 67 => Some(Self::P521),
            _ => None,
        }
    }

    /// Returns the signature algorithm bound to this curve.
    #[must_use]
    pub const fn signature_algorithm(self) -> SignatureAlgorithm {
        match self {
            Self::P256 => SignatureAlgorithm::Es256,
            Self::P384 => SignatureAlgorithm::Es384,
            Self::P521 => SignatureAlgorithm::Es512,
        }
    }
}

/// Kind of asymmetric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// RSA key of any supported modulus size.
    Rsa,
    /// Elliptic curve key on the given curve.
    Ec(EcCurve),
}

/// Signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-1 (legacy, verification only).
    #[serde(rename = "RS1")]
    Rs1,

    /// RSA PKCS#1 v1.5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,

    /// RSA PKCS#1 v1.5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,

    /// RSA PKCS#1 v1.5 with SHA-512.
    #[serde(rename = "RS512")]
    Rs512,

    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,

    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,

    /// ECDSA using P-521 and SHA-512.
    #[serde(rename = "ES512")]
    Es512,
}

impl SignatureAlgorithm {
    /// Returns the short algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rs1 => "RS1",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// Returns the digest used by this algorithm.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::Rs1 => HashAlgorithm::Sha1,
            Self::Rs256 | Self::Es256 => HashAlgorithm::Sha256,
            Self::Rs384 | Self::Es384 => HashAlgorithm::Sha384,
            Self::Rs512 | Self::Es512 => HashAlgorithm::Sha512,
        }
    }

    /// Returns true if this is an RSA algorithm.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::Rs1 | Self::Rs256 | Self::Rs384 | Self::Rs512)
    }

    /// Returns true if this is an ECDSA algorithm.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::Es256 | Self::Es384 | Self::Es512)
    }

    /// Returns true if this algorithm relies on a legacy hash.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        self.hash_algorithm().is_legacy()
    }

    /// Returns true if a key of the given type can produce or check this signature.
    #[must_use]
    pub fn is_compatible_with(self, key_type: KeyType) -> bool {
        match key_type {
            KeyType::Rsa => self.is_rsa(),
            KeyType::Ec(curve) => curve.signature_algorithm() == self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_output_lengths() {
        assert_eq!(HashAlgorithm::Sha1.output_len(), 20);
        assert_eq!(HashAlgorithm::Sha256.output_len(), 32);
        assert_eq!(HashAlgorithm::Sha512.output_len(), 64);
    }

    #[test]
    fn signature_algorithm_hashes() {
        assert_eq!(SignatureAlgorithm::Rs256.hash_algorithm(), HashAlgorithm::Sha256);
        assert_eq!(SignatureAlgorithm::Es384.hash_algorithm(), HashAlgorithm::Sha384);
        assert!(SignatureAlgorithm::Rs1.is_legacy());
        assert!(!SignatureAlgorithm::Rs256.is_legacy());
    }

    #[test]
    fn curve_binds_algorithm() {
        let p256 = KeyType::Ec(EcCurve::P256);
        assert!(SignatureAlgorithm::Es256.is_compatible_with(p256));
        assert!(!SignatureAlgorithm::Es384.is_compatible_with(p256));
        assert!(!SignatureAlgorithm::Rs256.is_compatible_with(p256));
        assert!(SignatureAlgorithm::Rs512.is_compatible_with(KeyType::Rsa));
    }

    #[test]
    fn curve_from_point_length() {
        assert_eq!(EcCurve::from_point_len(65), Some(EcCurve::P256));
        assert_eq!(EcCurve::from_point_len(97), Some(EcCurve::P384));
        assert_eq!(EcCurve::from_point_len(133), Some(EcCurve::P521));
        assert_eq!(EcCurve::from_point_len(64), None);
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(SignatureAlgorithm::Es256.name(), "ES256");
        assert_eq!(SignatureAlgorithm::Rs384.name(), "RS384");
    }
}
