//! Common test utilities and fixtures.

use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use spid_saml::{IdentityProviderProfile, ResponseValidator, XmlSigner};

pub use spid_integration_tests::*;

/// Identity provider entity ID.
pub const IDP_ENTITY: &str = "https://idp.example.it";
/// Identity provider SSO endpoint.
pub const SSO_URL: &str = "https://idp.example.it/sso";
/// Service provider entity ID.
pub const SP_ENTITY: &str = "https://sp.example.it";
/// Service provider assertion consumer URL.
pub const ACS_URL: &str = "https://sp.example.it/acs";

/// Installs a test log subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("spid_saml=debug")
        .with_test_writer()
        .try_init();
}

/// The instant every fixture is issued at.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
}

/// The RSA identity provider trusting `IDP_CERT`.
pub fn idp_profile() -> IdentityProviderProfile {
    IdentityProviderProfile::new(IDP_ENTITY)
        .with_name("test")
        .with_sso_url(SSO_URL)
        .with_certificate(IDP_CERT)
}

/// A response validator for `idp_profile` and `SP_ENTITY`.
pub fn validator() -> anyhow::Result<ResponseValidator> {
    Ok(ResponseValidator::new(&idp_profile(), SP_ENTITY)?)
}

/// Signs as the RSA identity provider.
pub fn idp_signer() -> anyhow::Result<XmlSigner> {
    Ok(XmlSigner::from_pem(IDP_KEY, Some(IDP_CERT))?)
}

/// Signs as the service provider.
pub fn sp_signer() -> anyhow::Result<XmlSigner> {
    Ok(XmlSigner::from_pem(SP_KEY, Some(SP_CERT))?)
}

/// Base64 encodes a document the way the HTTP-POST binding does.
pub fn encode(xml: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xml)
}

/// Decodes a base64 form value.
pub fn decode(encoded: &str) -> anyhow::Result<String> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    Ok(String::from_utf8(bytes)?)
}

fn instant(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A configurable IdP response.
#[derive(Debug, Clone)]
pub struct ResponseFixture {
    pub response_id: String,
    pub assertion_id: String,
    pub issuer: String,
    pub in_response_to: String,
    pub recipient: String,
    pub audience: String,
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub not_on_or_after: DateTime<Utc>,
    pub confirmation_not_on_or_after: DateTime<Utc>,
    /// Inner XML of `samlp:Status`.
    pub status: String,
    pub attributes: Vec<(String, Vec<String>)>,
}

impl Default for ResponseFixture {
    /// Success, valid from `t0` for five minutes, answering `_req-1`.
    fn default() -> Self {
        Self {
            response_id: "_resp-1".to_string(),
            assertion_id: "_assert-1".to_string(),
            issuer: IDP_ENTITY.to_string(),
            in_response_to: "_req-1".to_string(),
            recipient: ACS_URL.to_string(),
            audience: SP_ENTITY.to_string(),
            subject: "_transient-subject".to_string(),
            not_before: t0(),
            not_on_or_after: t0() + Duration::minutes(5),
            confirmation_not_on_or_after: t0() + Duration::minutes(5),
            status: r#"<samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/>"#
                .to_string(),
            attributes: vec![
                ("name".to_string(), vec!["Mario".to_string()]),
                ("familyName".to_string(), vec!["Rossi".to_string()]),
                (
                    "fiscalNumber".to_string(),
                    vec!["TINIT-RSSMRA80A01H501U".to_string()],
                ),
            ],
        }
    }
}

impl ResponseFixture {
    /// Renders the assertion element alone.
    pub fn assertion_xml(&self) -> String {
        let attributes: String = self
            .attributes
            .iter()
            .map(|(name, values)| {
                let values: String = values
                    .iter()
                    .map(|value| format!("<saml:AttributeValue>{value}</saml:AttributeValue>"))
                    .collect();
                format!(r#"<saml:Attribute Name="{name}">{values}</saml:Attribute>"#)
            })
            .collect();

        format!(
            r#"<saml:Assertion ID="{id}" Version="2.0" IssueInstant="{t0}">
    <saml:Issuer>{issuer}</saml:Issuer>
    <saml:Subject>
      <saml:NameID Format="urn:oasis:names:tc:SAML:2.0:nameid-format:transient" NameQualifier="{issuer}">{subject}</saml:NameID>
      <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
        <saml:SubjectConfirmationData InResponseTo="{in_response_to}" NotOnOrAfter="{scd}" Recipient="{recipient}"/>
      </saml:SubjectConfirmation>
    </saml:Subject>
    <saml:Conditions NotBefore="{not_before}" NotOnOrAfter="{not_on_or_after}">
      <saml:AudienceRestriction><saml:Audience>{audience}</saml:Audience></saml:AudienceRestriction>
    </saml:Conditions>
    <saml:AuthnStatement AuthnInstant="{t0}" SessionIndex="_session-1">
      <saml:AuthnContext><saml:AuthnContextClassRef>https://www.spid.gov.it/SpidL2</saml:AuthnContextClassRef></saml:AuthnContext>
    </saml:AuthnStatement>
    <saml:AttributeStatement>{attributes}</saml:AttributeStatement>
  </saml:Assertion>"#,
            id = self.assertion_id,
            t0 = instant(t0()),
            issuer = self.issuer,
            subject = self.subject,
            in_response_to = self.in_response_to,
            scd = instant(self.confirmation_not_on_or_after),
            recipient = self.recipient,
            not_before = instant(self.not_before),
            not_on_or_after = instant(self.not_on_or_after),
            audience = self.audience,
        )
    }

    /// Renders the unsigned response.
    pub fn to_xml(&self) -> String {
        format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="{t0}" InResponseTo="{in_response_to}" Destination="{recipient}">
  <saml:Issuer>{issuer}</saml:Issuer>
  <samlp:Status>{status}</samlp:Status>
  {assertion}
</samlp:Response>"#,
            id = self.response_id,
            t0 = instant(t0()),
            in_response_to = self.in_response_to,
            recipient = self.recipient,
            issuer = self.issuer,
            status = self.status,
            assertion = self.assertion_xml(),
        )
    }

    /// Signs the response root with the IdP key.
    pub fn signed_xml(&self) -> anyhow::Result<String> {
        Ok(idp_signer()?.sign(&self.to_xml(), &self.response_id)?)
    }

    /// Signs the response root and base64 encodes it.
    pub fn encoded(&self) -> anyhow::Result<String> {
        Ok(encode(&self.signed_xml()?))
    }
}
