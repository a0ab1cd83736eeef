use rand::RngExt;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Number of hex digest characters at the start of a generated code
pub const HASH_PREFIX_LEN: usize = 6;
/// Number of random characters appended to the digest prefix
pub const SUFFIX_LEN: usize = 2;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a short code for `url`.
///
/// The first six characters are the lowercase hex prefix of the URL's SHA-256
/// digest, followed by two random alphanumerics. Shortening the same URL twice
/// therefore shares the prefix but almost always differs in the suffix.
pub fn generate_code(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());

    let mut code = String::with_capacity(HASH_PREFIX_LEN + SUFFIX_LEN);
    for byte in digest.iter().take(HASH_PREFIX_LEN / 2) {
        // Writing into a String cannot fail
        let _ = write!(code, "{byte:02x}");
    }

    let mut rng = rand::rng();
    for _ in 0..SUFFIX_LEN {
        let idx = rng.random_range(0..SUFFIX_ALPHABET.len());
        code.push(SUFFIX_ALPHABET[idx] as char);
    }

    code
}

/// Build the shareable link for `code`: `{base_url}/s/{code}`
pub fn short_url(base_url: &str, code: &str) -> String {
    format!("{}/s/{}", base_url.trim_end_matches('/'), code)
}
