//! Hash functions.

use aws_lc_rs::digest;

use crate::algorithm::HashAlgorithm;

/// Computes a digest of the input data.
#[must_use]
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let alg = match algorithm {
        HashAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        HashAlgorithm::Sha256 => &digest::SHA256,
        HashAlgorithm::Sha384 => &digest::SHA384,
        HashAlgorithm::Sha512 => &digest::SHA512,
    };

    digest::digest(alg, data).as_ref().to_vec()
}

/// Computes a SHA-256 hash of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest(HashAlgorithm::Sha256, data)
}

/// Computes a SHA-384 hash of the input data.
#[must_use]
pub fn sha384(data: &[u8]) -> Vec<u8> {
    digest(HashAlgorithm::Sha384, data)
}

/// Computes a SHA-512 hash of the input data.
#[must_use]
pub fn sha512(data: &[u8]) -> Vec<u8> {
    digest(HashAlgorithm::Sha512, data)
}
