//! X.509 certificates used as verification keys.

use std::fmt;

use aws_lc_rs::signature::{
    UnparsedPublicKey, VerificationAlgorithm, ECDSA_P256_SHA256_FIXED,
    ECDSA_P384_SHA384_FIXED, ECDSA_P521_SHA512_FIXED, RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
    RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
};
use x509_parser::prelude::*;

use crate::algorithm::{EcCurve, KeyType, SignatureAlgorithm};
use crate::pem::{decode_base64_body, pem_to_der};
use crate::signature::SignatureError;

/// A parsed X.509 certificate.
///
/// Only the DER bytes, the subject and the public key are retained; chain
/// building and validity periods are out of scope, trust comes from the
/// certificate being configured.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    key_type: KeyType,
    public_key: Vec<u8>,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed or carries an
    /// unsupported public key.
    pub fn from_der(der: Vec<u8>) -> Result<Self, SignatureError> {
        let (subject, key_type, public_key) = {
            let (_, cert) = X509Certificate::from_der(&der)
                .map_err(|e| SignatureError::InvalidCertificate(format!("parse error: {e}")))?;

            let spki = cert.public_key();
            let public_key = spki.subject_public_key.data.to_vec();
            let key_type = match spki.parsed() {
                Ok(x509_parser::public_key::PublicKey::RSA(_)) => KeyType::Rsa,
                Ok(x509_parser::public_key::PublicKey::EC(_)) => EcCurve::from_point_len(public_key.len())
                    .map(KeyType::Ec)
                    .ok_or_else(|| {
                        SignatureError::InvalidCertificate("unsupported EC curve".to_string())
                    })?,
                _ => {
                    return Err(SignatureError::InvalidCertificate(
                        "unsupported public key algorithm".to_string(),
                    ))
                }
            };

            (cert.subject().to_string(), key_type, public_key)
        };

        Ok(Self {
            der,
            subject,
            key_type,
            public_key,
        })
    }

    /// Parses a PEM `CERTIFICATE` block.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no certificate block or it is invalid.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        let der = pem_to_der(pem, "CERTIFICATE").ok_or_else(|| {
            SignatureError::InvalidCertificate("no CERTIFICATE block found".to_string())
        })?;
        Self::from_der(der)
    }

    /// Parses bare base64 DER, as found in `ds:X509Certificate` or metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not base64 or not a certificate.
    pub fn from_base64(text: &str) -> Result<Self, SignatureError> {
        let der = decode_base64_body(text)
            .ok_or_else(|| SignatureError::InvalidCertificate("invalid base64".to_string()))?;
        Self::from_der(der)
    }

    /// Parses either PEM or bare base64 DER.
    ///
    /// # Errors
    ///
    /// Returns an error if neither form yields a certificate.
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        if text.contains("-----BEGIN") {
            Self::from_pem(text)
        } else {
            Self::from_base64(text)
        }
    }

    /// Returns the DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the subject distinguished name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the kind of public key.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Verifies `sig` over `data` with this certificate's public key.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::UnsupportedAlgorithm`] if the algorithm does
    /// not match the key, and [`SignatureError::Verification`] if the
    /// signature is wrong.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8],
        sig: &[u8],
    ) -> Result<(), SignatureError> {
        let verification_alg: &'static dyn VerificationAlgorithm = match (algorithm, self.key_type) {
            (SignatureAlgorithm::Rs1, KeyType::Rsa) => &RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
            (SignatureAlgorithm::Rs256, KeyType::Rsa) => &RSA_PKCS1_2048_8192_SHA256,
            (SignatureAlgorithm::Rs384, KeyType::Rsa) => &RSA_PKCS1_2048_8192_SHA384,
            (SignatureAlgorithm::Rs512, KeyType::Rsa) => &RSA_PKCS1_2048_8192_SHA512,
            (SignatureAlgorithm::Es256, KeyType::Ec(EcCurve::P256)) => &ECDSA_P256_SHA256_FIXED,
            (SignatureAlgorithm::Es384, KeyType::Ec(EcCurve::P384)) => &ECDSA_P384_SHA384_FIXED,
            (SignatureAlgorithm::Es512, KeyType::Ec(EcCurve::P521)) => &ECDSA_P521_SHA512_FIXED,
            _ => {
                return Err(SignatureError::UnsupportedAlgorithm(format!(
                    "{} does not match a {:?} certificate",
                    algorithm.name(),
                    self.key_type
                )))
            }
        };

        UnparsedPublicKey::new(verification_alg, &self.public_key)
            .verify(data, sig)
            .map_err(|_| SignatureError::Verification)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}
