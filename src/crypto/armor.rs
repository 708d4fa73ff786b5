use data_encoding::BASE64;

use crate::crypto::CryptoError;

/// Base64 characters per armored line.
const LINE_WIDTH: usize = 64;

/// Wrap `bytes` in a labelled base64 block.
pub fn armor(label: &str, bytes: &[u8]) -> String {
    let encoded = BASE64.encode(bytes);
    let mut armored = format!("-----BEGIN {label}-----\n");
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % LINE_WIDTH == 0 {
            armored.push('\n');
        }
        armored.push(c);
    }
    armored.push_str(&format!("\n-----END {label}-----\n"));
    armored
}

/// Unwrap a block produced by [`armor`], checking it carries the expected label.
/// Surrounding whitespace and line breaks within the body are ignored.
pub fn dearmor(label: &str, text: &str) -> Result<Vec<u8>, CryptoError> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");
    let body = text
        .trim()
        .strip_prefix(begin.as_str())
        .and_then(|rest| rest.strip_suffix(end.as_str()))
        .ok_or_else(|| CryptoError::Armor(format!("expected a {label} block")))?;
    let joined: String = body.split_whitespace().collect();
    Ok(BASE64.decode(joined.as_bytes())?)
}
