//! XML Signature creation.
//!
//! Produces enveloped signatures: the `ds:Signature` element is inserted into
//! the element it signs, right after that element's first child element.

use base64::Engine;
use spid_crypto::{Certificate, SigningKey};
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::types::{transform_algorithms, DS_PREFIX, XMLDSIG_NS};
use crate::xml::{Canonicalizer, Document, Element, Node};

use super::{SignatureAlgorithm, SignatureConfig};

/// XML document signer.
///
/// Signs SAML documents using the configured private key. Immutable once
/// built, so one signer can be shared across threads.
#[derive(Debug)]
pub struct XmlSigner {
    /// The private key.
    key: SigningKey,
    /// The X.509 certificate embedded in `KeyInfo` (optional).
    certificate: Option<Certificate>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a new signer.
    ///
    /// The signature algorithm defaults to the key's natural one: RSA-SHA256
    /// for RSA keys, ECDSA with the curve's hash for EC keys.
    ///
    /// # Arguments
    ///
    /// * `key` - The private key
    /// * `certificate` - Optional X.509 certificate to embed
    #[must_use]
    pub fn new(key: SigningKey, certificate: Option<Certificate>) -> Self {
        let algorithm = SignatureAlgorithm::from_crypto(key.default_algorithm());
        Self {
            key,
            certificate,
            config: SignatureConfig::with_algorithm(algorithm),
        }
    }

    /// Creates a new signer from PEM-encoded key and certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if the key or the certificate cannot be
    /// loaded.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let key = SigningKey::from_pem(private_key_pem)?;
        let certificate = certificate_pem.map(Certificate::from_pem).transpose()?;
        Ok(Self::new(key, certificate))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the signature configuration.
    #[must_use]
    pub const fn config(&self) -> &SignatureConfig {
        &self.config
    }

    /// Returns the embedded certificate, if any.
    #[must_use]
    pub const fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Signs an XML document.
    ///
    /// # Arguments
    ///
    /// * `xml` - The XML document to sign
    /// * `reference_id` - The ID of the element to sign (without the '#' prefix)
    ///
    /// # Returns
    ///
    /// The signed XML document with the `<ds:Signature>` element inserted,
    /// without an XML declaration.
    ///
    /// # Errors
    ///
    /// See [`XmlSigner::sign_document`].
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let mut document = Document::parse(xml)?;
        self.sign_document(&mut document, reference_id)?;
        Ok(document.to_xml())
    }

    /// Signs the element of `document` whose ID is `reference_id`, in place.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] if no element or more than one
    /// element carries the ID, if the element already holds a signature, or
    /// if the key cannot produce the configured algorithm.
    pub fn sign_document(&self, document: &mut Document, reference_id: &str) -> SamlResult<()> {
        if reference_id.is_empty() {
            return Err(SamlError::SignatureCreation("empty reference ID".to_string()));
        }

        let matches = document.find_by_id(reference_id);
        let target = match matches.as_slice() {
            [only] => only,
            [] => {
                return Err(SamlError::SignatureCreation(format!(
                    "element with ID '{reference_id}' not found"
                )))
            }
            _ => {
                return Err(SamlError::SignatureCreation(format!(
                    "ID '{reference_id}' is not unique"
                )))
            }
        };
        if target.element.child(XMLDSIG_NS, "Signature").is_some() {
            return Err(SamlError::SignatureCreation(format!(
                "element '{reference_id}' is already signed"
            )));
        }

        let algorithm = self.config.algorithm;
        let canonicalization = self.config.canonicalization;
        let digest_algorithm = algorithm.digest_algorithm();

        let canonical =
            Canonicalizer::new(canonicalization).canonicalize(target.element, &target.inherited);
        let digest = spid_crypto::digest(digest_algorithm.to_crypto(), canonical.as_bytes());

        let transforms = ds("Transforms")
            .with_child(
                ds("Transform").with_attribute("Algorithm", transform_algorithms::ENVELOPED_SIGNATURE),
            )
            .with_child(ds("Transform").with_attribute("Algorithm", canonicalization.uri()));
        let reference = ds("Reference")
            .with_attribute("URI", format!("#{reference_id}"))
            .with_child(transforms)
            .with_child(ds("DigestMethod").with_attribute("Algorithm", digest_algorithm.uri()))
            .with_child(ds("DigestValue").with_text(encode(&digest)));
        let signed_info = ds("SignedInfo")
            .with_child(
                ds("CanonicalizationMethod").with_attribute("Algorithm", canonicalization.uri()),
            )
            .with_child(ds("SignatureMethod").with_attribute("Algorithm", algorithm.uri()))
            .with_child(reference);

        // SignedInfo will sit inside ds:Signature, inside the target.
        let mut signed_info_scope = target.scope();
        signed_info_scope.declare(Some(DS_PREFIX), XMLDSIG_NS);
        let canonical_signed_info =
            Canonicalizer::new(canonicalization).canonicalize(&signed_info, &signed_info_scope);
        let signature_value = self
            .key
            .sign(algorithm.to_crypto(), canonical_signed_info.as_bytes())
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;

        let mut signature = ds("Signature")
            .with_namespace_declaration(Some(DS_PREFIX), XMLDSIG_NS)
            .with_child(signed_info)
            .with_child(ds("SignatureValue").with_text(encode(&signature_value)));
        if let (true, Some(certificate)) = (self.config.include_certificate, &self.certificate) {
            let x509 = ds("X509Certificate").with_text(encode(certificate.der()));
            signature = signature
                .with_child(ds("KeyInfo").with_child(ds("X509Data").with_child(x509)));
        }

        let path = target.path.clone();
        drop(matches);
        let target = document
            .root_mut()
            .element_at_mut(&path)
            .ok_or_else(|| SamlError::SignatureCreation("signed element vanished".to_string()))?;
        insert_after_first_element(target, signature);

        debug!(reference_id, algorithm = algorithm.uri(), "signed element");
        Ok(())
    }
}

fn ds(name: &str) -> Element {
    Element::new(Some(DS_PREFIX), name, Some(XMLDSIG_NS))
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn insert_after_first_element(target: &mut Element, signature: Element) {
    let position = target
        .children
        .iter()
        .position(|node| matches!(node, Node::Element(_)))
        .map_or(target.children.len(), |index| index + 1);
    target.children.insert(position, Node::Element(signature));
}
