use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";

/// Salted SHA-256, stored as `sha256$<salt>$<hex digest>`.
///
/// Placeholder scheme; swap for a memory-hard KDF before production use.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}${}", SCHEME, salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(SCHEME), Some(salt), Some(expected)) => constant_time_eq(digest(salt, password).as_bytes(), expected.as_bytes()),
        _ => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_matching_password_only() {
        let stored = hash_password("motdepasse123");
        assert!(stored.starts_with("sha256$"));
        assert!(verify_password("motdepasse123", &stored));
        assert!(!verify_password("motdepasse124", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(!verify_password("x", "plaintext"));
        assert!(!verify_password("x", "bcrypt$abc$def"));
    }
}
