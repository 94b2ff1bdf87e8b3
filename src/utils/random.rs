use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

/// Random alphanumeric one-time password of `len` characters.
///
/// Drawn from the OS RNG; 128 characters gives ~760 bits of entropy.
pub fn generate_otp(len: usize) -> String {
    rand::rngs::OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Short random organization id.
///
/// The id space is small on purpose (ids show up in URLs), so callers must
/// handle collisions.
pub fn generate_org_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Unique token identifier (`jti`).
pub fn generate_jti() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of an OTP, for storage.
pub fn hash_otp(otp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(otp.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
