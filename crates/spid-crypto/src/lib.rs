//! # spid-crypto
//!
//! Cryptographic primitives for the SPID requesting-party engine, built on aws-lc-rs.
//!
//! ## Supported algorithms
//!
//! - RSA PKCS#1 v1.5 with SHA-256, SHA-384 and SHA-512
//! - ECDSA on P-256, P-384 and P-521 with fixed-width `r || s` signatures
//! - RSA with SHA-1, for verification of legacy documents only
//!
//! Keys are loaded from PKCS#8 (or PKCS#1 for RSA) and public keys are taken
//! from X.509 certificates via `x509-parser`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod certificate;
pub mod hash;
pub mod keys;
pub mod pem;
pub mod signature;

pub use algorithm::{EcCurve, HashAlgorithm, KeyType, SignatureAlgorithm};
pub use certificate::Certificate;
pub use hash::{digest, sha256, sha384, sha512};
pub use keys::SigningKey;
pub use pem::pem_to_der;
pub use signature::SignatureError;
