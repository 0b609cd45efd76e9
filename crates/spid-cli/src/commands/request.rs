//! AuthnRequest command.

use serde::Serialize;
use spid_saml::{new_request_id, AuthnRequestBuilder};

use crate::cli::RequestArgs;
use crate::output::{output_single, OutputFormat};
use crate::CliConfig;

/// What `request` prints.
#[derive(Debug, Serialize)]
struct BuiltRequest {
    /// The on-wire request ID, to correlate the response against.
    request_id: String,
    /// Where to POST the request.
    destination: String,
    /// The `SAMLRequest` form value.
    saml_request: String,
}

/// Runs the request command.
pub fn run_request(args: RequestArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let idp = config.identity_provider(&args.idp)?;
    let signer = config.signer()?;
    let sp = &config.service_provider;

    let id = args.id.unwrap_or_else(new_request_id);
    let builder = AuthnRequestBuilder::new(
        &id,
        &idp.sso_url,
        &sp.acs_url,
        args.level.unwrap_or(sp.default_level),
    )
    .with_acs_index(sp.acs_index)
    .with_attribute_index(sp.attribute_index)
    .with_timestamp_policy(idp.timestamp_policy)
    .with_signer(&signer);

    let built = BuiltRequest {
        request_id: builder.element_id(),
        destination: idp.sso_url.clone(),
        saml_request: builder.build()?,
    };
    tracing::info!(request_id = %built.request_id, idp = %idp.name, "built authn request");
    output_single(&built, format)
}
