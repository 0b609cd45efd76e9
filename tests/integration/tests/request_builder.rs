//! AuthnRequest builder tests.

use chrono::Duration;
use spid_saml::xml::Document;
use spid_saml::{
    build_request, request_element_id, AuthnRequestBuilder, SamlError, TimestampPolicy,
    TimestampPrecision, XmlSignatureValidator, SAMLP_NS, SAML_NS,
};

use crate::common::*;

#[test]
fn request_verifies_with_sp_certificate() -> anyhow::Result<()> {
    init_tracing();
    let signer = sp_signer()?;
    let encoded = build_request("req-1", SSO_URL, ACS_URL, 2, t0(), Some(&signer))?;
    let xml = decode(&encoded)?;

    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));

    let verified = XmlSignatureValidator::from_pem(&[SP_CERT])?.validate(&xml)?;
    assert_eq!(verified, ["_req-1"]);

    // The IdP certificate does not verify the SP's signature.
    assert!(!XmlSignatureValidator::from_pem(&[IDP_CERT])?.verify(&xml));
    Ok(())
}

#[test]
fn request_fields() -> anyhow::Result<()> {
    let signer = sp_signer()?;
    let xml = decode(&build_request("req-1", SSO_URL, ACS_URL, 3, t0(), Some(&signer))?)?;
    let document = Document::parse(&xml)?;
    let root = document.root();

    assert!(root.is(SAMLP_NS, "AuthnRequest"));
    assert_eq!(root.attribute("ID"), Some("_req-1"));
    assert_eq!(root.attribute("Version"), Some("2.0"));
    assert_eq!(root.attribute("Destination"), Some(SSO_URL));
    assert_eq!(root.attribute("ForceAuthn"), Some("true"));
    assert_eq!(root.attribute("AssertionConsumerServiceIndex"), Some("0"));
    assert_eq!(root.attribute("AttributeConsumingServiceIndex"), Some("1"));

    let issuer = root.child(SAML_NS, "Issuer").ok_or_else(|| anyhow::anyhow!("no issuer"))?;
    assert_eq!(issuer.text(), ACS_URL);
    assert_eq!(issuer.attribute("NameQualifier"), Some(ACS_URL));
    assert_eq!(
        issuer.attribute("Format"),
        Some("urn:oasis:names:tc:SAML:2.0:nameid-format:entity")
    );

    let conditions = root
        .child(SAML_NS, "Conditions")
        .ok_or_else(|| anyhow::anyhow!("no conditions"))?;
    assert_eq!(conditions.attribute("NotBefore"), Some("2026-03-01T09:30:00Z"));
    assert_eq!(conditions.attribute("NotOnOrAfter"), Some("2026-03-01T09:40:00Z"));

    let context = root
        .child(SAMLP_NS, "RequestedAuthnContext")
        .ok_or_else(|| anyhow::anyhow!("no authn context"))?;
    assert_eq!(context.attribute("Comparison"), Some("minimum"));
    let class_refs = context.descendants_named(SAML_NS, "AuthnContextClassRef");
    assert_eq!(class_refs.len(), 1);
    assert_eq!(class_refs[0].text(), "https://www.spid.gov.it/SpidL3");
    Ok(())
}

#[test]
fn level_one_does_not_force_authn() -> anyhow::Result<()> {
    let signer = sp_signer()?;
    let xml = decode(&build_request("req-1", SSO_URL, ACS_URL, 1, t0(), Some(&signer))?)?;
    let document = Document::parse(&xml)?;
    assert_eq!(document.root().attribute("ForceAuthn"), None);
    Ok(())
}

#[test]
fn signature_sits_after_issuer() -> anyhow::Result<()> {
    let signer = sp_signer()?;
    let xml = decode(&build_request("req-1", SSO_URL, ACS_URL, 2, t0(), Some(&signer))?)?;
    let document = Document::parse(&xml)?;

    let names: Vec<String> = document.root().elements().map(|el| el.qualified_name()).collect();
    assert_eq!(names[0], "saml2:Issuer");
    assert_eq!(names[1], "ds:Signature");
    Ok(())
}

#[test]
fn timestamp_policy_is_applied() -> anyhow::Result<()> {
    let signer = sp_signer()?;
    let policy = TimestampPolicy {
        precision: TimestampPrecision::Milliseconds,
        not_before_skew_seconds: 60,
    };
    let encoded = AuthnRequestBuilder::new("req-1", SSO_URL, ACS_URL, 2)
        .with_timestamp_policy(policy)
        .with_signer(&signer)
        .build_at(t0() + Duration::milliseconds(250))?;
    let xml = decode(&encoded)?;
    let document = Document::parse(&xml)?;
    let root = document.root();

    assert_eq!(root.attribute("IssueInstant"), Some("2026-03-01T09:30:00.250Z"));
    let conditions = root
        .child(SAML_NS, "Conditions")
        .ok_or_else(|| anyhow::anyhow!("no conditions"))?;
    assert_eq!(conditions.attribute("NotBefore"), Some("2026-03-01T09:29:00.250Z"));
    assert_eq!(conditions.attribute("NotOnOrAfter"), Some("2026-03-01T09:40:00.250Z"));

    assert!(XmlSignatureValidator::from_pem(&[SP_CERT])?.verify(&xml));
    Ok(())
}

#[test]
fn invalid_inputs_are_rejected() -> anyhow::Result<()> {
    let signer = sp_signer()?;
    let cases = [
        ("", SSO_URL, ACS_URL, 2),
        ("req-1", "", ACS_URL, 2),
        ("req-1", SSO_URL, " \t", 2),
        ("req-1", SSO_URL, ACS_URL, 5),
        ("req-1", SSO_URL, ACS_URL, -3),
        ("req-1", SSO_URL, ACS_URL, 4),
    ];
    for (id, destination, consumer, level) in cases {
        let result = build_request(id, destination, consumer, level, t0(), Some(&signer));
        assert!(
            matches!(result, Err(SamlError::InvalidInput(_))),
            "{id:?} {destination:?} {consumer:?} {level}"
        );
    }

    let unsigned = build_request("req-1", SSO_URL, ACS_URL, 2, t0(), None);
    assert!(matches!(unsigned, Err(SamlError::InvalidInput(_))));
    Ok(())
}

#[test]
fn request_id_round_trips_through_correlation() -> anyhow::Result<()> {
    let signer = sp_signer()?;
    let builder = AuthnRequestBuilder::new("4f1c", SSO_URL, ACS_URL, 2).with_signer(&signer);
    builder.build_at(t0())?;
    assert_eq!(builder.element_id(), request_element_id("4f1c"));

    let response = ResponseFixture {
        in_response_to: builder.element_id(),
        ..ResponseFixture::default()
    };
    let claims = validator()?
        .parse_and_validate_at(&response.encoded()?, t0())
        .map_err(|failure| failure.into_reason())?;
    claims.check_correlation("4f1c", ACS_URL)?;
    Ok(())
}
