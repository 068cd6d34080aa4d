//! Keyed hashing for passcodes
//!
//! Codes are stored only as HMAC-SHA256 digests under a server secret, and
//! digest comparison is constant-time.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 digest of a passcode under the server secret
#[must_use]
pub fn hash_code(secret: &SecretString, code: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take a key of any size");
    mac.update(code.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time equality over two hex digests
#[must_use]
pub fn digests_match(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Draw a 6-digit code from the thread-local CSPRNG
#[must_use]
pub fn generate_code() -> String {
    let value = rand::random_range(0..1_000_000_u32);
    format!("{value:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("test-secret")
    }

    #[test]
    fn hashing_is_deterministic_per_secret() {
        let a = hash_code(&secret(), "123456");
        let b = hash_code(&secret(), "123456");
        let c = hash_code(&SecretString::from("other"), "123456");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn digest_comparison() {
        let digest = hash_code(&secret(), "654321");
        assert!(digests_match(&digest, &digest));
        assert!(!digests_match(&digest, &hash_code(&secret(), "654322")));
        assert!(!digests_match("", &digest));
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
