//! Salted password hashing.
//!
//! Stored records have the form `salt:hash`, where `salt` is 16 random
//! bytes base64-encoded and `hash` is the lowercase hex SHA-256 digest of
//! the salt concatenated with the plaintext password.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const SALT_LEN: usize = 16;

/// Generate a fresh base64-encoded random salt.
fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    BASE64.encode(salt)
}

fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Produce a `salt:hash` record for a password, with a fresh salt.
pub fn seal(password: &str) -> String {
    let salt = generate_salt();
    let hash = hash_with_salt(password, &salt);
    format!("{}:{}", salt, hash)
}

/// Verify a password against a stored `salt:hash` record.
///
/// A record that does not split on the first `:` into two non-empty parts
/// fails closed: it is reported as malformed, never treated as a match.
pub fn verify(password: &str, record: &str) -> Result<bool> {
    let (salt, stored_hash) = record
        .split_once(':')
        .ok_or_else(|| Error::MalformedRecord("missing separator".to_string()))?;

    if salt.is_empty() || stored_hash.is_empty() {
        return Err(Error::MalformedRecord("empty salt or hash".to_string()));
    }

    Ok(hash_with_salt(password, salt) == stored_hash)
}
