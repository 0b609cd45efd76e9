//! XML signature and canonicalization commands.

use serde::Serialize;
use spid_saml::xml::{canonicalize, NamespaceScope};
use spid_saml::{CanonicalizationAlgorithm, Document};

use crate::cli::{C14nMethod, CanonicalizeArgs, VerifyArgs};
use crate::output::{output_single, success, warning, OutputFormat};
use crate::CliConfig;

/// What `verify` prints.
#[derive(Debug, Serialize)]
struct VerifiedDocument {
    /// IDs of the elements covered by a verified signature.
    verified_ids: Vec<String>,
}

/// Runs the verify command.
pub fn run_verify(args: VerifyArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let validator = config
        .idp_profile(&args.idp)?
        .signature_validator()?
        .allow_sha1(args.allow_sha1);
    if args.allow_sha1 {
        warning("SHA-1 signatures are accepted");
    }
    let xml = super::read_input(&args.input)?;

    let verified_ids = validator.validate(&xml)?;
    success(&format!("{} signature(s) verified", verified_ids.len()));
    output_single(&VerifiedDocument { verified_ids }, format)
}

/// Runs the canonicalize command.
///
/// Prints the raw canonical bytes of the document element, without a
/// trailing newline, whatever the output format.
pub fn run_canonicalize(args: CanonicalizeArgs) -> crate::CliResult<()> {
    let algorithm = algorithm(args.algorithm, args.with_comments);
    let xml = super::read_input(&args.input)?;
    let document = Document::parse(&xml)?;

    print!("{}", canonicalize(document.root(), &NamespaceScope::new(), algorithm));
    Ok(())
}

const fn algorithm(method: C14nMethod, with_comments: bool) -> CanonicalizationAlgorithm {
    match (method, with_comments) {
        (C14nMethod::C14n, false) => CanonicalizationAlgorithm::C14N,
        (C14nMethod::C14n, true) => CanonicalizationAlgorithm::C14NWithComments,
        (C14nMethod::ExcC14n, false) => CanonicalizationAlgorithm::ExclusiveC14N,
        (C14nMethod::ExcC14n, true) => CanonicalizationAlgorithm::ExclusiveC14NWithComments,
    }
}
