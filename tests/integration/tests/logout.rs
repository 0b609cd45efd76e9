//! Single logout tests: the SP builds a LogoutRequest from the login claims
//! and validates the IdP's LogoutResponse.

use chrono::Duration;
use spid_saml::xml::Document;
use spid_saml::{
    status_codes, sub_status_codes, CorrelationField, LogoutRequestBuilder, SamlError,
    XmlSignatureValidator, XmlSigner, SAMLP_NS, SAML_NS,
};

use crate::common::*;

const SLO_URL: &str = "https://idp.example.it/slo";

fn logout_response(in_response_to: &str, status: &str) -> String {
    format!(
        r#"<samlp:LogoutResponse xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_logout-resp-1" Version="2.0" IssueInstant="2026-03-01T10:00:05Z" InResponseTo="{in_response_to}" Destination="https://sp.example.it/slo">
  <saml:Issuer>{IDP_ENTITY}</saml:Issuer>
  <samlp:Status>{status}</samlp:Status>
</samlp:LogoutResponse>"#
    )
}

const SUCCESS: &str = r#"<samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/>"#;

fn signed_by(signer: &XmlSigner, xml: &str) -> anyhow::Result<String> {
    Ok(encode(&signer.sign(xml, "_logout-resp-1")?))
}

#[test]
fn logout_request_carries_login_subject_and_session() -> anyhow::Result<()> {
    init_tracing();
    let claims = validator()?
        .parse_and_validate_at(&ResponseFixture::default().encoded()?, t0() + Duration::minutes(1))
        .map_err(|failure| failure.into_reason())?;

    let sp = sp_signer()?;
    let encoded = LogoutRequestBuilder::new("logout-1", SLO_URL, SP_ENTITY, claims.subject.clone())
        .with_session_index(claims.session_index.clone())
        .with_timestamp_policy(idp_profile().timestamp_policy)
        .with_signer(&sp)
        .build_at(t0() + Duration::minutes(30))?;

    let xml = decode(&encoded)?;
    let document = Document::parse(&xml)?;
    let root = document.root();
    assert!(root.is(SAMLP_NS, "LogoutRequest"));
    assert_eq!(root.id(), Some("_logout-1"));
    assert_eq!(root.attribute("Destination"), Some(SLO_URL));

    let issuer = root.child(SAML_NS, "Issuer").ok_or_else(|| anyhow::anyhow!("no issuer"))?;
    assert_eq!(issuer.text(), SP_ENTITY);
    let name_id = root.child(SAML_NS, "NameID").ok_or_else(|| anyhow::anyhow!("no subject"))?;
    assert_eq!(name_id.text(), "_transient-subject");
    assert_eq!(name_id.attribute("NameQualifier"), Some(IDP_ENTITY));
    let session = root
        .child(SAMLP_NS, "SessionIndex")
        .ok_or_else(|| anyhow::anyhow!("no session index"))?;
    assert_eq!(session.text(), "_session-1");

    assert_eq!(XmlSignatureValidator::from_pem(&[SP_CERT])?.validate(&xml)?, ["_logout-1"]);
    Ok(())
}

#[test]
fn successful_logout_response_is_accepted() -> anyhow::Result<()> {
    init_tracing();
    let encoded = signed_by(&idp_signer()?, &logout_response("_logout-1", SUCCESS))?;

    let response = validator()?
        .validate_logout_response(&encoded, "logout-1")
        .map_err(|failure| failure.into_reason())?;
    assert!(response.is_success());
    assert_eq!(response.in_response_to.as_deref(), Some("_logout-1"));
    assert_eq!(response.issuer.map(|issuer| issuer.value).as_deref(), Some(IDP_ENTITY));
    Ok(())
}

#[test]
fn logout_response_for_another_request_is_rejected() -> anyhow::Result<()> {
    let encoded = signed_by(&idp_signer()?, &logout_response("_logout-other", SUCCESS))?;

    let failure = validator()?
        .validate_logout_response(&encoded, "logout-1")
        .unwrap_err();
    match failure.reason {
        SamlError::CorrelationMismatch {
            field,
            expected,
            actual,
        } => {
            assert_eq!(field, CorrelationField::InResponseTo);
            assert_eq!(expected, "_logout-1");
            assert_eq!(actual, "_logout-other");
        }
        other => anyhow::bail!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn failed_logout_reports_the_idp_status() -> anyhow::Result<()> {
    let status = r#"<samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Requester"><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:RequestDenied"/></samlp:StatusCode><samlp:StatusMessage>session not found</samlp:StatusMessage>"#;
    let encoded = signed_by(&idp_signer()?, &logout_response("_logout-1", status))?;

    let failure = validator()?
        .validate_logout_response(&encoded, "logout-1")
        .unwrap_err();
    assert_eq!(failure.reason.reason_code(), "status_failure");
    match failure.reason {
        SamlError::StatusFailure { status } => {
            assert_eq!(status.status_code.value, status_codes::REQUESTER);
            assert_eq!(
                status.status_code.sub_status_value(),
                Some(sub_status_codes::REQUEST_DENIED)
            );
            assert_eq!(status.status_message.as_deref(), Some("session not found"));
        }
        other => anyhow::bail!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn logout_response_signed_by_another_key_is_rejected() -> anyhow::Result<()> {
    let rogue = XmlSigner::from_pem(ROGUE_KEY, Some(ROGUE_CERT))?;
    let encoded = signed_by(&rogue, &logout_response("_logout-1", SUCCESS))?;

    let failure = validator()?
        .validate_logout_response(&encoded, "logout-1")
        .unwrap_err();
    assert!(matches!(failure.reason, SamlError::SignatureInvalid(_)));
    Ok(())
}
