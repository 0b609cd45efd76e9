//! SAML 2.0 requesting-party engine for SPID.
//!
//! This crate implements the service provider side of a SPID login:
//!
//! - **Canonical XML** - Inclusive and exclusive C14N over an owned DOM
//! - **XML signature** - Enveloped XML-DSig signing and verification
//! - **AuthnRequest building** - Signed, base64 encoded HTTP-POST requests
//! - **Response validation** - Signature, status, time window, audience and
//!   correlation checks ending in a set of identity claims
//! - **Single logout** - Signed LogoutRequests and validated LogoutResponses
//!
//! # Architecture
//!
//! - [`xml`] - Document model and canonicalization
//! - [`signature`] - XML signature signing and validation
//! - [`types`] - Core SAML types and data structures
//! - [`request`] - AuthnRequest and LogoutRequest builders
//! - [`validation`] - Response and LogoutResponse validator
//! - [`idp`] - Identity provider trust configuration
//! - [`profile`] - SPID attribute mapping
//! - [`error`] - Error types for SAML operations
//!
//! # Example
//!
//! ```rust,ignore
//! use spid_saml::{build_request, IdentityProviderProfile, ResponseValidator, XmlSigner};
//!
//! let signer = XmlSigner::from_pem(&sp_key_pem, Some(&sp_cert_pem))?;
//! let saml_request = build_request(
//!     &request_id,
//!     "https://idp.example.it/sso",
//!     "https://sp.example.it/acs",
//!     2,
//!     chrono::Utc::now(),
//!     Some(&signer),
//! )?;
//!
//! let idp = IdentityProviderProfile::new("https://idp.example.it").with_certificate(idp_cert_pem);
//! let validator = ResponseValidator::new(&idp, "https://sp.example.it")?;
//! let result = validator.parse_and_validate(&saml_response);
//! if spid_saml::validate_correlation(&result, &request_id, "https://sp.example.it/acs") {
//!     let claims = result?;
//! }
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [Canonical XML 1.0](https://www.w3.org/TR/xml-c14n) and
//!   [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod idp;
pub mod profile;
pub mod request;
pub mod signature;
pub mod types;
pub mod validation;
pub mod xml;

pub use error::{CorrelationField, SamlError, SamlResult, TimeCheck};
pub use idp::{IdentityProviderProfile, TimestampPolicy, TimestampPrecision};
pub use profile::{SpidAttribute, SpidProfile};
pub use request::{
    build_request, new_request_id, request_element_id, AuthnRequestBuilder, LogoutRequestBuilder,
};
pub use signature::{SignatureAlgorithm, SignatureConfig, XmlSignatureValidator, XmlSigner};
pub use types::*;
pub use validation::{
    validate_correlation, AuthnClaims, LogoutValidationResult, ResponseValidator,
    ValidationFailure, ValidationResult,
};
pub use xml::{CanonicalizationAlgorithm, Document};
