//! Response validator tests.

use chrono::Duration;
use spid_saml::{
    sub_status_codes, validate_correlation, CorrelationField, ResponseValidator, SamlError,
    SpidLevel, TimeCheck, XmlSigner,
};

use crate::common::*;

#[test]
fn valid_response_yields_claims() -> anyhow::Result<()> {
    init_tracing();
    let fixture = ResponseFixture::default();
    let result = validator()?.parse_and_validate_at(&fixture.encoded()?, t0() + Duration::minutes(1));

    assert!(validate_correlation(&result, "req-1", ACS_URL));
    let claims = result.map_err(|failure| failure.into_reason())?;

    assert_eq!(claims.issuer, IDP_ENTITY);
    assert_eq!(claims.subject.value, "_transient-subject");
    assert_eq!(claims.session_index, "_session-1");
    assert_eq!(claims.attribute("name"), Some("Mario"));
    assert_eq!(claims.attribute("familyName"), Some("Rossi"));
    assert_eq!(claims.spid_level(), Some(SpidLevel::L2));
    assert_eq!(claims.response.id, "_resp-1");
    assert_eq!(claims.assertion.id, "_assert-1");

    let profile = claims.profile();
    assert_eq!(profile.fiscal_code(), Some("RSSMRA80A01H501U"));
    assert!(profile.extra.is_empty());
    Ok(())
}

#[test]
fn foreign_audience_is_rejected() -> anyhow::Result<()> {
    let fixture = ResponseFixture {
        audience: "https://other-sp.example.it".to_string(),
        ..ResponseFixture::default()
    };
    let failure = validator()?
        .parse_and_validate_at(&fixture.encoded()?, t0() + Duration::minutes(1))
        .unwrap_err();

    assert!(matches!(
        failure.reason,
        SamlError::AudienceMismatch { ref expected, ref actual }
            if expected == SP_ENTITY && actual == "https://other-sp.example.it"
    ));
    Ok(())
}

#[test]
fn not_on_or_after_boundary() -> anyhow::Result<()> {
    let encoded = ResponseFixture::default().encoded()?;
    let validator = validator()?;
    let bound = t0() + Duration::minutes(5);

    assert!(validator.parse_and_validate_at(&encoded, bound).is_ok());

    let failure = validator
        .parse_and_validate_at(&encoded, bound + Duration::microseconds(1))
        .unwrap_err();
    assert!(matches!(
        failure.reason,
        SamlError::TemporalViolation { check: TimeCheck::ConditionsNotOnOrAfter, bound: b, .. } if b == bound
    ));
    Ok(())
}

#[test]
fn not_yet_valid_response_is_rejected() -> anyhow::Result<()> {
    let encoded = ResponseFixture::default().encoded()?;
    let failure = validator()?
        .parse_and_validate_at(&encoded, t0() - Duration::microseconds(1))
        .unwrap_err();
    assert!(matches!(
        failure.reason,
        SamlError::TemporalViolation { check: TimeCheck::ConditionsNotBefore, .. }
    ));
    Ok(())
}

#[test]
fn clock_skew_is_tolerated() -> anyhow::Result<()> {
    let encoded = ResponseFixture::default().encoded()?;
    let lenient = ResponseValidator::new(&idp_profile().with_clock_skew(30), SP_ENTITY)?;

    assert!(lenient
        .parse_and_validate_at(&encoded, t0() - Duration::seconds(30))
        .is_ok());
    assert!(lenient
        .parse_and_validate_at(&encoded, t0() + Duration::minutes(5) + Duration::seconds(30))
        .is_ok());
    assert!(lenient
        .parse_and_validate_at(&encoded, t0() - Duration::seconds(31))
        .is_err());
    Ok(())
}

#[test]
fn expired_subject_confirmation_is_rejected() -> anyhow::Result<()> {
    let fixture = ResponseFixture {
        confirmation_not_on_or_after: t0() + Duration::minutes(1),
        ..ResponseFixture::default()
    };
    let failure = validator()?
        .parse_and_validate_at(&fixture.encoded()?, t0() + Duration::minutes(2))
        .unwrap_err();
    assert!(matches!(
        failure.reason,
        SamlError::TemporalViolation { check: TimeCheck::SubjectConfirmationNotOnOrAfter, .. }
    ));
    Ok(())
}

#[test]
fn replayed_response_fails_correlation() -> anyhow::Result<()> {
    let encoded = ResponseFixture::default().encoded()?;
    let result = validator()?.parse_and_validate_at(&encoded, t0());

    assert!(validate_correlation(&result, "_req-1", ACS_URL));
    assert!(!validate_correlation(&result, "req-2", ACS_URL));
    assert!(!validate_correlation(&result, "req-1", "https://sp.example.it/other-acs"));

    let claims = result.map_err(|failure| failure.into_reason())?;
    let err = claims.check_correlation("req-2", ACS_URL).unwrap_err();
    assert!(matches!(
        err,
        SamlError::CorrelationMismatch { field: CorrelationField::InResponseTo, ref expected, ref actual }
            if expected == "_req-2" && actual == "_req-1"
    ));
    Ok(())
}

#[test]
fn failed_validation_never_correlates() -> anyhow::Result<()> {
    let result = validator()?.parse_and_validate_at("bm90IHhtbA==", t0());
    assert!(!validate_correlation(&result, "req-1", ACS_URL));
    Ok(())
}

#[test]
fn non_success_status_short_circuits() -> anyhow::Result<()> {
    let fixture = ResponseFixture {
        status: concat!(
            r#"<samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Responder">"#,
            r#"<samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:AuthnFailed"/>"#,
            r#"</samlp:StatusCode>"#,
            r#"<samlp:StatusMessage>ErrorCode nr22</samlp:StatusMessage>"#,
        )
        .to_string(),
        // Would be rejected if the assertion were read.
        audience: "https://other-sp.example.it".to_string(),
        ..ResponseFixture::default()
    };
    let failure = validator()?
        .parse_and_validate_at(&fixture.encoded()?, t0())
        .unwrap_err();

    let SamlError::StatusFailure { status } = failure.reason else {
        panic!("expected a status failure, got {:?}", failure.reason);
    };
    assert!(!status.is_success());
    assert_eq!(status.status_code.sub_status_value(), Some(sub_status_codes::AUTHN_FAILED));
    assert_eq!(status.status_message.as_deref(), Some("ErrorCode nr22"));
    Ok(())
}

#[test]
fn duplicate_attribute_is_malformed() -> anyhow::Result<()> {
    let mut fixture = ResponseFixture::default();
    fixture
        .attributes
        .push(("name".to_string(), vec!["Luigi".to_string()]));
    let failure = validator()?
        .parse_and_validate_at(&fixture.encoded()?, t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::MalformedDocument(_)));
    Ok(())
}

#[test]
fn multi_valued_attribute_is_malformed() -> anyhow::Result<()> {
    let mut fixture = ResponseFixture::default();
    fixture.attributes.push((
        "email".to_string(),
        vec!["a@example.it".to_string(), "b@example.it".to_string()],
    ));
    let failure = validator()?
        .parse_and_validate_at(&fixture.encoded()?, t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::MalformedDocument(_)));
    Ok(())
}

#[test]
fn doctype_is_malformed() -> anyhow::Result<()> {
    let xml = format!(
        "<!DOCTYPE r [<!ENTITY x \"boom\">]>{}",
        ResponseFixture::default().signed_xml()?
    );
    let failure = validator()?
        .parse_and_validate_at(&encode(&xml), t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::MalformedDocument(_)));
    Ok(())
}

#[test]
fn rogue_signature_is_rejected_before_extraction() -> anyhow::Result<()> {
    let fixture = ResponseFixture::default();
    let forged = XmlSigner::from_pem(ROGUE_KEY, Some(ROGUE_CERT))?
        .sign(&fixture.to_xml(), &fixture.response_id)?;

    let failure = validator()?
        .parse_and_validate_at(&encode(&forged), t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::SignatureInvalid(_)));
    assert_eq!(failure.raw_response.as_deref(), Some(forged.as_str()));
    assert!(!failure.to_string().contains("Mario"));
    Ok(())
}

#[test]
fn unsigned_response_is_rejected() -> anyhow::Result<()> {
    let failure = validator()?
        .parse_and_validate_at(&encode(&ResponseFixture::default().to_xml()), t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::SignatureInvalid(_)));
    Ok(())
}

#[test]
fn signed_assertion_without_signed_response_is_accepted() -> anyhow::Result<()> {
    let fixture = ResponseFixture::default();
    let signed = idp_signer()?.sign(&fixture.to_xml(), &fixture.assertion_id)?;
    let claims = validator()?
        .parse_and_validate_at(&encode(&signed), t0())
        .map_err(|failure| failure.into_reason())?;
    assert_eq!(claims.assertion.id, fixture.assertion_id);
    Ok(())
}

#[test]
fn unsigned_assertion_beside_signed_one_is_rejected() -> anyhow::Result<()> {
    let genuine = ResponseFixture::default();
    let signed = idp_signer()?.sign(&genuine.to_xml(), &genuine.assertion_id)?;

    let injected = ResponseFixture {
        assertion_id: "_evil".to_string(),
        subject: "_attacker".to_string(),
        ..ResponseFixture::default()
    }
    .assertion_xml();
    let wrapped = signed.replacen(
        r#"<saml:Assertion ID="_assert-1""#,
        &format!(r#"{injected}<saml:Assertion ID="_assert-1""#),
        1,
    );
    assert_ne!(wrapped, signed);

    let failure = validator()?
        .parse_and_validate_at(&encode(&wrapped), t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::SignatureInvalid(_)));
    Ok(())
}

#[test]
fn sha1_is_refused_by_default() -> anyhow::Result<()> {
    let signed = ResponseFixture::default().signed_xml()?;
    let downgraded = signed.replace(
        "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
        "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
    );

    let failure = validator()?
        .parse_and_validate_at(&encode(&downgraded), t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::SignatureInvalid(ref m) if m.contains("SHA-1")));
    Ok(())
}

#[test]
fn wrong_issuer_is_rejected() -> anyhow::Result<()> {
    let fixture = ResponseFixture {
        issuer: "https://evil.example.it".to_string(),
        ..ResponseFixture::default()
    };
    let failure = validator()?
        .parse_and_validate_at(&fixture.encoded()?, t0())
        .unwrap_err();
    assert!(matches!(
        failure.reason,
        SamlError::InvalidIssuer { ref expected, .. } if expected == IDP_ENTITY
    ));
    Ok(())
}

#[test]
fn encrypted_assertion_is_unsupported() -> anyhow::Result<()> {
    let fixture = ResponseFixture::default();
    let xml = fixture.to_xml().replace(
        &fixture.assertion_xml(),
        "<saml:EncryptedAssertion><xenc:EncryptedData xmlns:xenc=\"http://www.w3.org/2001/04/xmlenc#\"/></saml:EncryptedAssertion>",
    );
    let signed = idp_signer()?.sign(&xml, &fixture.response_id)?;
    let failure = validator()?
        .parse_and_validate_at(&encode(&signed), t0())
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::MalformedDocument(ref m) if m.contains("encrypted")));
    Ok(())
}

#[test]
fn validator_is_shareable_across_threads() -> anyhow::Result<()> {
    let validator = std::sync::Arc::new(validator()?);
    let encoded = ResponseFixture::default().encoded()?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let validator = std::sync::Arc::clone(&validator);
            let encoded = encoded.clone();
            std::thread::spawn(move || validator.parse_and_validate_at(&encoded, t0()).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().map_err(|_| anyhow::anyhow!("thread panicked"))?);
    }
    Ok(())
}
