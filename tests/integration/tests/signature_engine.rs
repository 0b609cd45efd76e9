//! Canonicalization and XML signature tests.

use spid_saml::xml::{canonicalize, Document, NamespaceScope};
use spid_saml::{
    CanonicalizationAlgorithm, SamlError, SignatureAlgorithm, SignatureConfig,
    XmlSignatureValidator, XmlSigner,
};

use crate::common::*;

fn canonical(xml: &str, algorithm: CanonicalizationAlgorithm) -> anyhow::Result<String> {
    let document = Document::parse(xml)?;
    Ok(canonicalize(document.root(), &NamespaceScope::new(), algorithm))
}

#[test]
fn canonical_form_ignores_attribute_order_and_tag_whitespace() -> anyhow::Result<()> {
    let a = r#"<p:a xmlns:p="urn:p" b="1" c="2"><p:b/></p:a>"#;
    let b = r#"<p:a   c="2"
        b="1"  xmlns:p="urn:p" ><p:b
    /></p:a >"#;

    for algorithm in [
        CanonicalizationAlgorithm::C14N,
        CanonicalizationAlgorithm::ExclusiveC14N,
    ] {
        assert_eq!(canonical(a, algorithm)?, canonical(b, algorithm)?);
    }
    assert_eq!(
        canonical(a, CanonicalizationAlgorithm::ExclusiveC14N)?,
        r#"<p:a xmlns:p="urn:p" b="1" c="2"><p:b></p:b></p:a>"#
    );
    Ok(())
}

#[test]
fn signature_survives_reserialization() -> anyhow::Result<()> {
    let fixture = ResponseFixture::default();
    let signed = fixture.signed_xml()?;

    // Parse and serialize again: attribute quoting and empty tags change.
    let reserialized = Document::parse(&signed)?.to_xml();
    let validator = XmlSignatureValidator::from_pem(&[IDP_CERT])?;
    assert_eq!(validator.validate(&reserialized)?, [fixture.response_id]);
    Ok(())
}

#[test]
fn flipping_a_content_byte_breaks_the_signature() -> anyhow::Result<()> {
    let signed = ResponseFixture::default().signed_xml()?;
    let validator = XmlSignatureValidator::from_pem(&[IDP_CERT])?;
    assert!(validator.verify(&signed));

    let tampered = signed.replacen("Rossi", "Rosso", 1);
    assert_ne!(tampered, signed);
    assert!(!validator.verify(&tampered));
    Ok(())
}

#[test]
fn flipping_a_signature_byte_breaks_the_signature() -> anyhow::Result<()> {
    let signed = ResponseFixture::default().signed_xml()?;
    let marker = "<ds:SignatureValue>";
    let start = signed.find(marker).ok_or_else(|| anyhow::anyhow!("unsigned"))? + marker.len();

    let mut bytes = signed.into_bytes();
    // Stay inside the base64 alphabet.
    bytes[start + 10] = if bytes[start + 10] == b'Q' { b'R' } else { b'Q' };
    let tampered = String::from_utf8(bytes)?;

    let validator = XmlSignatureValidator::from_pem(&[IDP_CERT])?;
    assert!(matches!(
        validator.validate(&tampered),
        Err(SamlError::SignatureInvalid(_))
    ));
    Ok(())
}

#[test]
fn ecdsa_signatures_round_trip() -> anyhow::Result<()> {
    let signer = XmlSigner::from_pem(IDP_EC_KEY, Some(IDP_EC_CERT))?;
    assert_eq!(signer.config().algorithm, SignatureAlgorithm::EcdsaSha256);

    let fixture = ResponseFixture::default();
    let signed = signer.sign(&fixture.to_xml(), &fixture.response_id)?;
    assert!(signed.contains("http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256"));

    assert!(XmlSignatureValidator::from_pem(&[IDP_EC_CERT])?.verify(&signed));
    assert!(!XmlSignatureValidator::from_pem(&[IDP_CERT])?.verify(&signed));
    Ok(())
}

#[test]
fn rsa_sha512_round_trip() -> anyhow::Result<()> {
    let signer = idp_signer()?.with_config(SignatureConfig::with_algorithm(
        SignatureAlgorithm::RsaSha512,
    ));
    let fixture = ResponseFixture::default();
    let signed = signer.sign(&fixture.to_xml(), &fixture.assertion_id)?;
    assert!(signed.contains("http://www.w3.org/2001/04/xmlenc#sha512"));
    assert!(XmlSignatureValidator::from_pem(&[IDP_CERT])?.verify(&signed));
    Ok(())
}

#[test]
fn embedded_certificate_is_never_trusted() -> anyhow::Result<()> {
    let fixture = ResponseFixture::default();
    let forged = XmlSigner::from_pem(ROGUE_KEY, Some(ROGUE_CERT))?
        .sign(&fixture.to_xml(), &fixture.response_id)?;

    assert!(!XmlSignatureValidator::from_pem(&[IDP_CERT])?.verify(&forged));
    Ok(())
}

#[test]
fn key_rollover_accepts_either_certificate() -> anyhow::Result<()> {
    let signed = ResponseFixture::default().signed_xml()?;
    let validator = XmlSignatureValidator::from_pem(&[IDP_EC_CERT, IDP_CERT])?;
    assert!(validator.verify(&signed));
    Ok(())
}
