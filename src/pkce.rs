use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE challenge method sent to the provider. Only `S256` is supported.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Random PKCE code verifier: 48 bytes, base64url, 64 characters (RFC 7636: 43-128).
#[must_use]
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// `BASE64URL(SHA256(verifier))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Fresh single-use `state` nonce: 16 random bytes as 32 lowercase hex characters.
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    hex::encode(random_bytes)
}

/// Compares the `state` echoed by the provider with the one we issued.
///
/// Runs over every byte regardless of where the first difference is.
#[must_use]
pub fn state_matches(issued: &str, returned: &str) -> bool {
    issued.len() == returned.len()
        && issued
            .bytes()
            .zip(returned.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
