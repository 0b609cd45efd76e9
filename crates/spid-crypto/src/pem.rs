//! PEM armour handling.

use base64::Engine;

/// Extracts the DER payload of the first PEM block carrying `label`.
///
/// Returns `None` when no such block exists or its body is not valid base64.
#[must_use]
pub fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let stop = start + pem[start..].find(&end)?;

    decode_base64_body(&pem[start..stop])
}

/// Decodes base64 text that may be wrapped across lines.
#[must_use]
pub fn decode_base64_body(body: &str) -> Option<Vec<u8>> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact).ok()
}
