//! XML Signature validation.
//!
//! Verification is anchored on configured certificates only. The certificate
//! a document carries in `KeyInfo` is never used to check its own signature.

use spid_crypto::pem::decode_base64_body;
use spid_crypto::Certificate;
use tracing::{debug, warn};

use crate::error::{SamlError, SamlResult};
use crate::types::XMLDSIG_NS;
use crate::xml::{Canonicalizer, Document, Located};

use super::XmlSignature;

/// XML signature validator.
///
/// Validates signatures on SAML documents using configured trusted certificates.
#[derive(Debug, Clone)]
pub struct XmlSignatureValidator {
    /// Trusted certificates for signature validation.
    trusted_certificates: Vec<Certificate>,
    /// Whether to allow SHA-1 signatures (deprecated but sometimes needed).
    allow_sha1: bool,
}

impl XmlSignatureValidator {
    /// Creates a new validator with the given trusted certificates.
    #[must_use]
    pub const fn new(trusted_certificates: Vec<Certificate>) -> Self {
        Self {
            trusted_certificates,
            allow_sha1: false,
        }
    }

    /// Creates a validator from PEM-encoded certificates.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if a certificate cannot be parsed.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let certs = certificates_pem
            .iter()
            .map(|pem| Certificate::from_pem(pem))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(certs))
    }

    /// Allows SHA-1 based signatures (not recommended).
    #[must_use]
    pub fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Returns the trust anchors.
    #[must_use]
    pub fn trusted_certificates(&self) -> &[Certificate] {
        &self.trusted_certificates
    }

    /// Parses and validates every signature in an XML document.
    ///
    /// # Errors
    ///
    /// See [`XmlSignatureValidator::verify_document`]; parse failures are
    /// [`SamlError::MalformedDocument`].
    pub fn validate(&self, xml: &str) -> SamlResult<Vec<String>> {
        let document = Document::parse(xml)?;
        self.verify_document(&document)
    }

    /// Returns true only if the document parses and every signature verifies.
    #[must_use]
    pub fn verify(&self, xml: &str) -> bool {
        self.validate(xml).is_ok()
    }

    /// Verifies every `ds:Signature` in `document`.
    ///
    /// # Returns
    ///
    /// The IDs of the elements covered by a verified signature, in document
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] if no trust anchor is
    /// configured, the document carries no signature, or any signature fails
    /// a structural, digest or cryptographic check.
    pub fn verify_document(&self, document: &Document) -> SamlResult<Vec<String>> {
        if self.trusted_certificates.is_empty() {
            return Err(SamlError::SignatureInvalid(
                "no trusted certificates configured".to_string(),
            ));
        }

        let signatures = document.find_all(|el| el.is(XMLDSIG_NS, "Signature"));
        if signatures.is_empty() {
            return Err(SamlError::SignatureInvalid("document is not signed".to_string()));
        }

        signatures
            .iter()
            .map(|located| self.verify_signature(document, located))
            .collect()
    }

    fn verify_signature(&self, document: &Document, located: &Located<'_>) -> SamlResult<String> {
        let signature = XmlSignature::from_element(located.element)?;

        if signature.uses_sha1() && !self.allow_sha1 {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }

        let reference_id = signature.reference_id();
        let targets = document.find_by_id(reference_id);
        let target = match targets.as_slice() {
            [only] => only,
            [] => {
                return Err(SamlError::SignatureInvalid(format!(
                    "referenced element '{reference_id}' not found"
                )))
            }
            _ => {
                return Err(SamlError::SignatureInvalid(format!(
                    "ID '{reference_id}' is not unique"
                )))
            }
        };

        // Enveloped placement: the signature must be a direct child of what it signs.
        if !target
            .element
            .elements()
            .any(|child| std::ptr::eq(child, located.element))
        {
            return Err(SamlError::SignatureInvalid(format!(
                "signature is not enveloped by '{reference_id}'"
            )));
        }

        self.verify_digest(&signature, target, located)?;
        self.verify_signature_value(&signature, located)?;

        debug!(reference_id, algorithm = signature.algorithm.uri(), "signature verified");
        Ok(reference_id.to_string())
    }

    /// Recomputes the reference digest over the target minus the signature.
    fn verify_digest(
        &self,
        signature: &XmlSignature,
        target: &Located<'_>,
        located: &Located<'_>,
    ) -> SamlResult<()> {
        let (algorithm, prefixes) = signature.reference_canonicalization();
        let mut canonicalizer = Canonicalizer::new(algorithm).excluding(located.element);
        if let Some(prefixes) = prefixes {
            canonicalizer = canonicalizer.with_inclusive_prefixes(prefixes);
        }
        let canonical = canonicalizer.canonicalize(target.element, &target.inherited);
        let calculated =
            spid_crypto::digest(signature.digest_algorithm.to_crypto(), canonical.as_bytes());

        let expected = decode_base64_body(&signature.digest_value)
            .ok_or_else(|| SamlError::SignatureInvalid("invalid digest encoding".to_string()))?;
        if calculated != expected {
            warn!(reference_id = signature.reference_id(), "digest mismatch");
            return Err(SamlError::SignatureInvalid("digest value mismatch".to_string()));
        }
        Ok(())
    }

    /// Checks the signature over canonical `SignedInfo` against the anchors.
    fn verify_signature_value(&self, signature: &XmlSignature, located: &Located<'_>) -> SamlResult<()> {
        let signed_info = located
            .element
            .child(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| SamlError::SignatureInvalid("missing ds:SignedInfo".to_string()))?;

        let mut canonicalizer = Canonicalizer::new(signature.canonicalization);
        if let Some(prefixes) = &signature.inclusive_prefixes {
            canonicalizer = canonicalizer.with_inclusive_prefixes(prefixes);
        }
        let canonical = canonicalizer.canonicalize(signed_info, &located.scope());

        let signature_bytes = decode_base64_body(&signature.signature_value)
            .ok_or_else(|| SamlError::SignatureInvalid("invalid signature encoding".to_string()))?;

        let algorithm = signature.algorithm.to_crypto();
        if self
            .trusted_certificates
            .iter()
            .any(|cert| cert.verify(algorithm, canonical.as_bytes(), &signature_bytes).is_ok())
        {
            return Ok(());
        }

        let embedded = signature
            .embedded_certificate()
            .map(|cert| cert.subject().to_string())
            .unwrap_or_default();
        warn!(
            reference_id = signature.reference_id(),
            embedded_subject = %embedded,
            "signature does not verify against any trusted certificate"
        );
        Err(SamlError::SignatureInvalid(
            "signature verification failed with all trusted certificates".to_string(),
        ))
    }
}
