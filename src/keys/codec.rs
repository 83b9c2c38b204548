//! Secret generation and digesting.
//!
//! A secret is `nf_live_` followed by 32 bytes from the OS CSPRNG,
//! hex-encoded. Only the SHA-256 digest of the secret is ever stored;
//! validation works by exact digest match. No salt is applied; the secret
//! itself carries 256 bits of entropy, so equal digests imply equal secrets
//! and rainbow tables buy an attacker nothing.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const KEY_PREFIX: &str = "nf_live_";

const SECRET_BYTES: usize = 32;

/// Characters of the secret retained for display in listings.
const DISPLAY_PREFIX_LEN: usize = 12;

/// Generate a fresh secret. Fails closed: if the OS random source is
/// unavailable the operation errors instead of degrading to a weak generator.
pub fn generate() -> anyhow::Result<String> {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| anyhow::anyhow!("secure random source unavailable: {e}"))?;
    Ok(format!("{KEY_PREFIX}{}", hex::encode(bytes)))
}

/// Deterministic one-way digest of a presented secret, used both at issuance
/// and at validation time.
pub fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short prefix of the secret, safe to store and show in listings.
pub fn display_prefix(secret: &str) -> String {
    secret.chars().take(DISPLAY_PREFIX_LEN).collect()
}
