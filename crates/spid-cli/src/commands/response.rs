//! SAMLResponse validation command.

use serde::Serialize;
use spid_saml::{AuthnClaims, ResponseValidator, SpidProfile};

use crate::cli::ValidateArgs;
use crate::output::{output_single, success, OutputFormat};
use crate::CliConfig;

/// What `validate` prints.
#[derive(Debug, Serialize)]
struct ValidatedResponse<'a> {
    issuer: &'a str,
    subject: &'a str,
    session_index: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u8>,
    profile: SpidProfile,
}

impl<'a> From<&'a AuthnClaims> for ValidatedResponse<'a> {
    fn from(claims: &'a AuthnClaims) -> Self {
        Self {
            issuer: &claims.issuer,
            subject: &claims.subject.value,
            session_index: &claims.session_index,
            level: claims.spid_level().map(|level| level.level()),
            profile: claims.profile(),
        }
    }
}

/// Runs the validate command.
pub fn run_validate(args: ValidateArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let profile = config.idp_profile(&args.idp)?;
    let validator = ResponseValidator::new(&profile, &config.service_provider.entity_id)?;
    let encoded = super::read_input(&args.input)?;
    let recipient = args
        .recipient
        .as_deref()
        .unwrap_or(&config.service_provider.acs_url);

    let claims = validator.parse_and_validate(&encoded)?;
    claims.check_correlation(&args.request_id, recipient)?;

    success("response is valid");
    output_single(&ValidatedResponse::from(&claims), format)
}
