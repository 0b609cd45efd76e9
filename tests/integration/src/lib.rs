//! Shared fixtures for the SPID integration tests.
//!
//! Key pairs are self-signed test material generated for this suite only:
//! an RSA identity provider, an RSA service provider, a P-256 identity
//! provider and an attacker key that is never trusted.

#![forbid(unsafe_code)]

/// Identity provider RSA private key (PKCS#8).
pub const IDP_KEY: &str = include_str!("../../fixtures/idp.key.pem");
/// Identity provider RSA certificate.
pub const IDP_CERT: &str = include_str!("../../fixtures/idp.cert.pem");

/// Identity provider P-256 private key.
pub const IDP_EC_KEY: &str = include_str!("../../fixtures/idp-ec.key.pem");
/// Identity provider P-256 certificate.
pub const IDP_EC_CERT: &str = include_str!("../../fixtures/idp-ec.cert.pem");

/// Service provider RSA private key.
pub const SP_KEY: &str = include_str!("../../fixtures/sp.key.pem");
/// Service provider RSA certificate.
pub const SP_CERT: &str = include_str!("../../fixtures/sp.cert.pem");

/// Attacker key, never configured as a trust anchor.
pub const ROGUE_KEY: &str = include_str!("../../fixtures/rogue.key.pem");
/// Attacker certificate.
pub const ROGUE_CERT: &str = include_str!("../../fixtures/rogue.cert.pem");
